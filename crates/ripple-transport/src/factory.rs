use std::fmt;

use ripple_net::AddressFamily;
use socket2::{Domain, Protocol, Socket, Type};

use crate::error::TransportError;

/// 套接字的传输种类。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SocketKind {
    /// 面向连接的字节流（TCP）。
    Tcp,
    /// 无连接的数据报（UDP）。
    Udp,
}

impl fmt::Display for SocketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SocketKind::Tcp => "TCP",
            SocketKind::Udp => "UDP",
        })
    }
}

/// 创建非阻塞 TCP 套接字。
///
/// # 后置条件（Postconditions）
/// - 返回的套接字已处于非阻塞模式，并在整个生命周期保持该模式；
/// - 非阻塞切换失败时套接字随错误路径一并关闭，不泄露半成品资源。
pub fn make_tcp_socket(family: AddressFamily) -> Result<Socket, TransportError> {
    make_socket(family, SocketKind::Tcp)
}

/// 创建非阻塞 UDP 套接字。语义与 [`make_tcp_socket`] 一致。
pub fn make_udp_socket(family: AddressFamily) -> Result<Socket, TransportError> {
    make_socket(family, SocketKind::Udp)
}

fn make_socket(family: AddressFamily, kind: SocketKind) -> Result<Socket, TransportError> {
    let domain = match family {
        AddressFamily::Ipv4 => Domain::IPV4,
        AddressFamily::Ipv6 => Domain::IPV6,
    };
    let (ty, protocol) = match kind {
        SocketKind::Tcp => (Type::STREAM, Protocol::TCP),
        SocketKind::Udp => (Type::DGRAM, Protocol::UDP),
    };
    let socket = Socket::new(domain, ty, Some(protocol))
        .map_err(|source| TransportError::SocketCreateFailed { kind, source })?;
    // 失败时 `socket` 随 `?` 析构关闭
    socket
        .set_nonblocking(true)
        .map_err(TransportError::NonBlockingSetupFailed)?;
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn is_nonblocking(socket: &Socket) -> bool {
        use std::os::fd::AsRawFd;
        let flags = unsafe { libc::fcntl(socket.as_raw_fd(), libc::F_GETFL) };
        flags >= 0 && (flags & libc::O_NONBLOCK) != 0
    }

    #[cfg(unix)]
    #[test]
    fn every_family_kind_pair_yields_nonblocking_socket() {
        let cases = [
            (AddressFamily::Ipv4, SocketKind::Tcp),
            (AddressFamily::Ipv4, SocketKind::Udp),
            (AddressFamily::Ipv6, SocketKind::Tcp),
            (AddressFamily::Ipv6, SocketKind::Udp),
        ];
        for (family, kind) in cases {
            let socket = match kind {
                SocketKind::Tcp => make_tcp_socket(family),
                SocketKind::Udp => make_udp_socket(family),
            }
            .expect("合法 (族, 种类) 组合必须创建成功");
            assert!(
                is_nonblocking(&socket),
                "{family} {kind} 套接字未处于非阻塞模式"
            );
        }
    }
}
