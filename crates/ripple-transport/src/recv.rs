use std::{io, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use ripple_net::SocketRemoteInfo;
use socket2::SockRef;
use tokio::net::{TcpStream, UdpSocket};

use crate::{
    config::EngineConfig,
    error::TransportError,
    sink::{InboundMessage, MessageSink},
    util::ShutdownToken,
};

/// 接收引擎绑定的套接字，构造时即选定传输模式。
///
/// 同时承担对端解析的两种变体：数据报用 `recv_from` 自带的来源地址，
/// 流套接字在派发时向 OS 查询已连接的对端。
pub(crate) enum RecvSocket {
    Stream(Arc<TcpStream>),
    Datagram(Arc<UdpSocket>),
}

impl RecvSocket {
    fn is_stream(&self) -> bool {
        matches!(self, RecvSocket::Stream(_))
    }

    async fn readable(&self) -> io::Result<()> {
        match self {
            RecvSocket::Stream(stream) => stream.readable().await,
            RecvSocket::Datagram(sock) => sock.readable().await,
        }
    }

    fn try_recv(&self, buf: &mut [u8]) -> io::Result<(usize, Option<SocketAddr>)> {
        match self {
            RecvSocket::Stream(stream) => stream.try_read(buf).map(|len| (len, None)),
            RecvSocket::Datagram(sock) => sock
                .try_recv_from(buf)
                .map(|(len, peer)| (len, Some(peer))),
        }
    }

    /// 解析本条消息的对端地址。
    fn resolve_peer(&self, datagram_peer: Option<SocketAddr>) -> io::Result<SocketAddr> {
        match self {
            RecvSocket::Stream(stream) => stream.peer_addr(),
            RecvSocket::Datagram(_) => {
                datagram_peer.ok_or_else(|| io::Error::other("数据报缺少来源地址"))
            }
        }
    }

    /// `SO_RCVBUF` 提示，不可用或为零时退回配置的回退值。
    fn recv_buffer_hint(&self, config: &EngineConfig) -> usize {
        let hint = match self {
            RecvSocket::Stream(stream) => SockRef::from(&**stream).recv_buffer_size(),
            RecvSocket::Datagram(sock) => SockRef::from(&**sock).recv_buffer_size(),
        };
        hint.ok()
            .filter(|&size| size > 0)
            .unwrap_or(config.buffer_size_fallback())
    }
}

/// 启动一个接收引擎后台任务。
///
/// 任务是分离的：创建者拿不到 `JoinHandle`，拆除只能经由关停令牌。
pub(crate) fn spawn_receive_engine(
    config: EngineConfig,
    socket: RecvSocket,
    sink: Arc<dyn MessageSink>,
    token: ShutdownToken,
) {
    tokio::spawn(receive_loop(config, socket, sink, token));
}

/// 接收循环本体。
///
/// # 教案式注释
///
/// ## 逻辑（How）
/// 1. 循环开始前按 `SO_RCVBUF` 提示（回退 8192）分配一次复用缓冲；
/// 2. 每轮在关停令牌与“可读等待”之间 `select`；可读等待以
///    `poll_timeout` 为上限，超时不是错误——接收是开放式的，直接重试；
/// 3. 每次读取前清零缓冲；`WouldBlock` 说明并未真正就绪，回到等待；
/// 4. 流套接字读到 0 字节即对端关闭：记录日志、任务结束并释放自己持有
///    的套接字引用；数据报的 0 长报文则忽略并继续轮询；
/// 5. 非零读取把负载拷贝进全新的 `Bytes`，解析对端后按读取顺序派发；
/// 6. 硬错误记录日志后终止任务——错误只到此为止，不会跨任务边界上抛。
async fn receive_loop(
    config: EngineConfig,
    socket: RecvSocket,
    sink: Arc<dyn MessageSink>,
    token: ShutdownToken,
) {
    let buffer_size = socket.recv_buffer_hint(&config);
    let mut buf = vec![0u8; buffer_size];
    tracing::debug!(buffer_size, "接收循环启动");

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!("收到关停信号，接收循环退出");
                return;
            }
            ready = tokio::time::timeout(config.poll_timeout(), socket.readable()) => {
                let ready = match ready {
                    // 等待可读超时只触发重新轮询
                    Err(_elapsed) => continue,
                    Ok(ready) => ready,
                };
                if let Err(err) = ready {
                    tracing::warn!(%err, "等待可读失败，接收循环终止");
                    return;
                }

                buf.fill(0);
                match socket.try_recv(&mut buf) {
                    Err(err)
                        if err.kind() == io::ErrorKind::WouldBlock
                            || err.kind() == io::ErrorKind::Interrupted =>
                    {
                        continue;
                    }
                    Err(err) => {
                        let err = TransportError::ReceiveFailed(err);
                        tracing::warn!(%err, "接收循环终止");
                        return;
                    }
                    Ok((0, _)) => {
                        if socket.is_stream() {
                            tracing::debug!("对端关闭连接，接收循环退出");
                            return;
                        }
                        // 0 长数据报不终止循环
                        continue;
                    }
                    Ok((len, datagram_peer)) => {
                        let peer = match socket.resolve_peer(datagram_peer) {
                            Ok(peer) => peer,
                            Err(err) => {
                                tracing::warn!(%err, "解析对端地址失败，丢弃本条消息");
                                continue;
                            }
                        };
                        let payload = Bytes::copy_from_slice(&buf[..len]);
                        let remote = SocketRemoteInfo::from_peer(peer, len as u32);
                        sink.on_message(InboundMessage::new(payload, remote));
                    }
                }
            }
        }
    }
}
