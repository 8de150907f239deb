use std::{io, net::SocketAddr, sync::Arc};

use socket2::Socket;
use tokio::net::TcpListener;

use crate::{
    config::EngineConfig,
    error::TransportError,
    recv::{RecvSocket, spawn_receive_engine},
    sink::MessageSink,
    util::{ShutdownHandle, ShutdownToken, shutdown_pair},
};

/// 把已绑定的 TCP 套接字标记为监听，并启动后台接受循环。
///
/// # 教案式注释
///
/// ## 契约（What）
/// - 积压取自配置（默认 10）；监听或反应器注册失败判
///   [`TransportError::AcceptFailed`]；
/// - 每个接受的连接获得自己的 TCP 模式接收引擎，并共享监听器的关停
///   令牌：关停监听句柄即连带拆除全部连接任务；
/// - 接受循环遇到“将会阻塞”短暂停顿后重试；其余接受错误记录日志并终止
///   循环——监听器自此不再接受新连接，不做重启。
///
/// ## 前置条件（Preconditions）
/// - 套接字已完成绑定；必须在 Tokio 多线程运行时内调用。
pub fn exec_tcp_listen(
    config: &EngineConfig,
    socket: Socket,
    sink: Arc<dyn MessageSink>,
) -> Result<TcpListenerHandle, TransportError> {
    socket
        .listen(config.accept_backlog() as i32)
        .map_err(TransportError::AcceptFailed)?;
    let std_listener: std::net::TcpListener = socket.into();
    let listener = TcpListener::from_std(std_listener).map_err(TransportError::AcceptFailed)?;
    let local_addr = listener
        .local_addr()
        .map_err(TransportError::LocalAddrFailed)?;

    let (shutdown, token) = shutdown_pair();
    tokio::spawn(accept_loop(*config, listener, sink, token));
    tracing::info!(%local_addr, "TCP 监听已启动");
    Ok(TcpListenerHandle {
        local_addr,
        shutdown,
    })
}

/// 后台接受循环：每个新连接一个接收引擎，接受失败即终局。
async fn accept_loop(
    config: EngineConfig,
    listener: TcpListener,
    sink: Arc<dyn MessageSink>,
    token: ShutdownToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!("收到关停信号，接受循环退出");
                return;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    // Tokio 接受的连接天然处于非阻塞模式
                    tracing::debug!(%peer, "接受新连接");
                    spawn_receive_engine(
                        config,
                        RecvSocket::Stream(Arc::new(stream)),
                        sink.clone(),
                        token.clone(),
                    );
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    tokio::time::sleep(config.accept_retry_pause()).await;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    tracing::error!(%err, "接受连接失败，接受循环终止");
                    return;
                }
            }
        }
    }
}

/// 监听套接字的所有者句柄。
#[derive(Debug)]
pub struct TcpListenerHandle {
    local_addr: SocketAddr,
    shutdown: ShutdownHandle,
}

impl TcpListenerHandle {
    /// 监听的本地地址（绑定端口为 0 时从这里取真实端口）。
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 显式关停接受循环与全部派生的连接任务。
    pub fn shutdown(self) {
        self.shutdown.shutdown();
    }
}
