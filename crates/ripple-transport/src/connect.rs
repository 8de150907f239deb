use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use ripple_net::{NetAddress, resolve_socket_addr};
use socket2::{SockAddr, Socket};
use tokio::net::TcpStream;

use crate::{
    config::EngineConfig,
    error::TransportError,
    recv::{RecvSocket, spawn_receive_engine},
    send::{SendSocket, poll_send},
    sink::MessageSink,
    util::{ShutdownHandle, shutdown_pair},
};

/// 连接执行器：非阻塞建连 + 有界等待 + 显式取回挂起错误。
///
/// # 教案式注释
///
/// ## 逻辑（How）
/// 1. 在非阻塞套接字上发起 `connect`；`Interrupted` 立即重试，
///    `EINPROGRESS` 转入等待，其余错误直接判
///    [`TransportError::ConnectRefusedOrFailed`]；
/// 2. 等待可写以 `timeout_secs` 为上限；传 0 时以配置的默认值（8 小时）
///    替代，而不是“无超时”——该替代值是沿用的契约；
/// 3. 等待成功并不等于建连成功：还须经 `take_error` 显式取回挂起的
///    `SO_ERROR`，非零即判失败；
/// 4. 成功后隐式启动 TCP 模式的接收引擎，返回 [`TcpHandle`]。
///
/// ## 前置条件（Preconditions）
/// - 必须在 Tokio 多线程运行时内调用。
pub async fn exec_connect(
    config: &EngineConfig,
    socket: Socket,
    address: &NetAddress,
    timeout_secs: u32,
    sink: Arc<dyn MessageSink>,
) -> Result<TcpHandle, TransportError> {
    let target = resolve_socket_addr(address)?;
    let sockaddr = SockAddr::from(target);

    let pending = loop {
        match socket.connect(&sockaddr) {
            Ok(()) => break false,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err)
                if err.raw_os_error() == Some(libc::EINPROGRESS)
                    || err.kind() == io::ErrorKind::WouldBlock =>
            {
                break true;
            }
            Err(source) => {
                return Err(TransportError::ConnectRefusedOrFailed {
                    addr: address.to_string(),
                    source,
                });
            }
        }
    };

    let std_stream: std::net::TcpStream = socket.into();
    let stream = TcpStream::from_std(std_stream).map_err(|source| {
        TransportError::ConnectRefusedOrFailed {
            addr: address.to_string(),
            source,
        }
    })?;

    if pending {
        let wait = if timeout_secs == 0 {
            config.connect_timeout_default()
        } else {
            Duration::from_secs(u64::from(timeout_secs))
        };
        match tokio::time::timeout(wait, stream.writable()).await {
            Err(_elapsed) => {
                return Err(TransportError::ConnectTimeout {
                    addr: address.to_string(),
                    waited: wait,
                });
            }
            Ok(Err(source)) => {
                return Err(TransportError::ConnectRefusedOrFailed {
                    addr: address.to_string(),
                    source,
                });
            }
            Ok(Ok(())) => {}
        }
        // 可写就绪后仍须显式取回挂起的套接字错误
        let pending_err = stream.take_error().map_err(|source| {
            TransportError::ConnectRefusedOrFailed {
                addr: address.to_string(),
                source,
            }
        })?;
        if let Some(source) = pending_err {
            return Err(TransportError::ConnectRefusedOrFailed {
                addr: address.to_string(),
                source,
            });
        }
    }

    tracing::debug!(%address, "建连成功，启动接收引擎");
    let stream = Arc::new(stream);
    let (shutdown, token) = shutdown_pair();
    spawn_receive_engine(*config, RecvSocket::Stream(stream.clone()), sink, token);
    Ok(TcpHandle {
        stream,
        shutdown,
        config: *config,
    })
}

/// 已建连 TCP 套接字的所有者句柄。
///
/// 与 [`UdpHandle`](crate::UdpHandle) 同一所有权模型：接收任务只持共享
/// 引用，拆除经由关停信号；对端关闭时任务自行结束并释放引用，不会关掉
/// 调用方手里的句柄。
#[derive(Debug)]
pub struct TcpHandle {
    stream: Arc<TcpStream>,
    shutdown: ShutdownHandle,
    config: EngineConfig,
}

impl TcpHandle {
    /// 本地地址。
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.stream
            .local_addr()
            .map_err(TransportError::LocalAddrFailed)
    }

    /// 已连接的对端地址。
    pub fn peer_addr(&self) -> Result<SocketAddr, TransportError> {
        self.stream
            .peer_addr()
            .map_err(TransportError::PeerAddrFailed)
    }

    /// 向已连接的对端发送一段负载。
    ///
    /// 发送前先确认连接仍然成立（对端查询失败即判发送失败），随后交给
    /// 发送引擎整段写出。
    pub async fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.stream
            .peer_addr()
            .map_err(TransportError::SendFailed)?;
        poll_send(&self.config, SendSocket::Stream(&self.stream), payload).await
    }

    /// 显式关停接收任务并放弃句柄。
    pub fn shutdown(self) {
        self.shutdown.shutdown();
    }
}
