use std::{io, net::SocketAddr, sync::Arc};

use ripple_net::{NetAddress, resolve_socket_addr};
use socket2::Socket;
use tokio::net::UdpSocket;

use crate::{
    config::EngineConfig,
    error::TransportError,
    recv::{RecvSocket, spawn_receive_engine},
    send::{SendSocket, poll_send},
    sink::MessageSink,
    util::{ShutdownHandle, shutdown_pair},
};

/// 绑定执行器：直接绑定，仅在“地址被占用”时以临时端口回退一次。
///
/// # 教案式注释
///
/// ## 契约（What）
/// - 至多两次 bind 尝试：第一次按调用方给出的端口，第二次（仅当第一次
///   报 `AddrInUse`）把端口清零交给 OS 分配；
/// - 其余绑定失败、或回退后的再次失败，对本次调用都是终局的
///   [`TransportError::BindFailed`]。
///
/// ## 意图（Why）
/// - 这套不对称的回退（只针对占用、只回退一次）让 UDP 客户端的临时端口
///   绑定可以自愈，同时不会演变成无界的重试风暴；语义必须原样保留。
pub fn exec_bind(socket: &Socket, address: &NetAddress) -> Result<(), TransportError> {
    let target = resolve_socket_addr(address)?;
    match socket.bind(&target.into()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AddrInUse => {
            tracing::debug!(%address, "端口被占用，回退申请临时端口");
            let fallback = resolve_socket_addr(&address.with_port(0))?;
            socket
                .bind(&fallback.into())
                .map_err(|source| TransportError::BindFailed {
                    addr: address.to_string(),
                    source,
                })
        }
        Err(source) => Err(TransportError::BindFailed {
            addr: address.to_string(),
            source,
        }),
    }
}

/// UDP 绑定：绑定执行器 + 隐式启动数据报模式的接收引擎。
///
/// # 前置条件（Preconditions）
/// - 必须在 Tokio 多线程运行时内调用，套接字要注册进反应器。
///
/// # 后置条件（Postconditions）
/// - 返回的 [`UdpHandle`] 是套接字的唯一外部句柄；接收任务只持有共享
///   引用，丢弃或显式关停句柄即拆除任务。
pub fn exec_udp_bind(
    config: &EngineConfig,
    socket: Socket,
    address: &NetAddress,
    sink: Arc<dyn MessageSink>,
) -> Result<UdpHandle, TransportError> {
    exec_bind(&socket, address)?;
    let std_sock: std::net::UdpSocket = socket.into();
    let sock = UdpSocket::from_std(std_sock).map_err(|source| TransportError::BindFailed {
        addr: address.to_string(),
        source,
    })?;
    let sock = Arc::new(sock);
    let (shutdown, token) = shutdown_pair();
    spawn_receive_engine(*config, RecvSocket::Datagram(sock.clone()), sink, token);
    Ok(UdpHandle {
        sock,
        shutdown,
        config: *config,
    })
}

/// 已绑定 UDP 套接字的所有者句柄。
///
/// 接收任务与句柄共享同一套接字，但关闭权只在句柄侧：任务在流程上只会
/// 因硬错误或关停信号退出，从不抢先关闭调用方仍持有的套接字。
#[derive(Debug)]
pub struct UdpHandle {
    sock: Arc<UdpSocket>,
    shutdown: ShutdownHandle,
    config: EngineConfig,
}

impl UdpHandle {
    /// 实际绑定到的本地地址（端口回退后从这里取真实端口）。
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.sock.local_addr().map_err(TransportError::LocalAddrFailed)
    }

    /// 向目标地址发送一段负载，由发送引擎按数据报分块写出。
    pub async fn send(
        &self,
        address: &NetAddress,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let dest = resolve_socket_addr(address)?;
        poll_send(
            &self.config,
            SendSocket::Datagram {
                sock: &self.sock,
                dest,
            },
            payload,
        )
        .await
    }

    /// 显式关停接收任务并放弃句柄。
    pub fn shutdown(self) {
        self.shutdown.shutdown();
    }
}
