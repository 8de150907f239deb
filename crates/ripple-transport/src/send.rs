use std::{io, net::SocketAddr};

use socket2::SockRef;
use tokio::net::{TcpStream, UdpSocket};

use crate::{config::EngineConfig, error::TransportError};

/// 发送引擎面向的套接字标签，按传输种类决定分块策略。
pub(crate) enum SendSocket<'a> {
    /// 面向连接的流套接字，目的地取已连接的对端。
    Stream(&'a TcpStream),
    /// 数据报套接字，目的地逐次显式给出。
    Datagram { sock: &'a UdpSocket, dest: SocketAddr },
}

impl SendSocket<'_> {
    async fn writable(&self) -> io::Result<()> {
        match self {
            SendSocket::Stream(stream) => stream.writable().await,
            SendSocket::Datagram { sock, .. } => sock.writable().await,
        }
    }

    fn try_send(&self, chunk: &[u8]) -> io::Result<usize> {
        match self {
            SendSocket::Stream(stream) => stream.try_write(chunk),
            SendSocket::Datagram { sock, dest } => sock.try_send_to(chunk, *dest),
        }
    }

    /// `SO_SNDBUF` 提示，不可用或为零时退回配置的回退值。
    fn send_buffer_hint(&self, config: &EngineConfig) -> usize {
        let hint = match self {
            SendSocket::Stream(stream) => SockRef::from(*stream).send_buffer_size(),
            SendSocket::Datagram { sock, .. } => SockRef::from(*sock).send_buffer_size(),
        };
        hint.ok()
            .filter(|&size| size > 0)
            .unwrap_or(config.buffer_size_fallback())
    }
}

/// 就绪轮询驱动的发送循环。
///
/// # 教案式注释
///
/// ## 意图（Why）
/// - 非阻塞套接字的写出可能是部分写；循环推进偏移量直到全部写完，或者
///   遇到硬错误/超时为止。
///
/// ## 逻辑（How）
/// 1. 每轮先等待可写，等待以 `poll_timeout`（默认 500 ms）为上限，超时
///    即判 [`TransportError::SendTimeout`]；
/// 2. 流套接字一次尝试写出全部剩余；数据报套接字把单次写出压到
///    `min(剩余, SO_SNDBUF 提示)`，避免超出 OS 缓冲提示的分片；
/// 3. `WouldBlock`/`Interrupted` 不消耗输入，回到等待直接重试；
/// 4. 写出 0 字节视作对端终止写路径，提前退出循环；若仍有剩余字节则判
///    [`TransportError::SendIncomplete`]；
/// 5. 其余写错误对本次调用是致命的，映射为 [`TransportError::SendFailed`]。
///
/// ## 前置条件（Preconditions）
/// - 同一套接字上的并发发送未在内部串行化，调用方需自行保证。
pub(crate) async fn poll_send(
    config: &EngineConfig,
    socket: SendSocket<'_>,
    payload: &[u8],
) -> Result<(), TransportError> {
    let hint = socket.send_buffer_hint(config);
    let mut offset = 0;

    while offset < payload.len() {
        match tokio::time::timeout(config.poll_timeout(), socket.writable()).await {
            Err(_elapsed) => return Err(TransportError::SendTimeout),
            Ok(Err(source)) => return Err(TransportError::SendFailed(source)),
            Ok(Ok(())) => {}
        }

        let remaining = payload.len() - offset;
        let chunk = match socket {
            SendSocket::Stream(_) => remaining,
            SendSocket::Datagram { .. } => remaining.min(hint),
        };
        match socket.try_send(&payload[offset..offset + chunk]) {
            Ok(0) => break,
            Ok(written) => offset += written,
            Err(err)
                if err.kind() == io::ErrorKind::WouldBlock
                    || err.kind() == io::ErrorKind::Interrupted =>
            {
                continue;
            }
            Err(source) => return Err(TransportError::SendFailed(source)),
        }
    }

    if offset != payload.len() {
        return Err(TransportError::SendIncomplete {
            remaining: payload.len() - offset,
        });
    }
    Ok(())
}
