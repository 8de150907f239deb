//! 传输层端到端闭环：绑定/建连/收发/拆除的合同回归。
//!
//! # 教案式说明
//! - **Why**：核心引擎的契约（就绪轮询、一次性端口回退、对端元数据、
//!   EOF 终止、关停拆除）一旦回归，上层前端毫无感知；本套件在回环上
//!   直接重放这些场景。
//! - **How**：以通道回调作为测试替身收集派发结果，对端用原生 Tokio
//!   套接字扮演，全部流量走 127.0.0.1。
//! - **What**：每个测试返回 `()`；断言失败即 panic 并附上下文。

use std::{sync::Arc, time::Duration};

use ripple_net::{AddressFamily, NetAddress};
use ripple_transport::{
    EngineConfig, InboundMessage, MessageSink, TransportError, exec_bind, exec_connect,
    exec_tcp_listen, exec_udp_bind, make_tcp_socket, make_udp_socket,
};
use tokio::sync::mpsc;

/// 把每条派发塞进通道的测试回调。
struct ChannelSink(mpsc::UnboundedSender<InboundMessage>);

impl MessageSink for ChannelSink {
    fn on_message(&self, message: InboundMessage) {
        let _ = self.0.send(message);
    }
}

fn channel_sink() -> (Arc<dyn MessageSink>, mpsc::UnboundedReceiver<InboundMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(ChannelSink(tx)), rx)
}

async fn next_message(
    rx: &mut mpsc::UnboundedReceiver<InboundMessage>,
    context: &str,
) -> InboundMessage {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap_or_else(|_| panic!("等待派发超时：{context}"))
        .unwrap_or_else(|| panic!("派发通道提前关闭：{context}"))
}

/// 场景 A：UDP 回环收发 `"hello 1234"`，校验负载与对端元数据。
#[tokio::test(flavor = "multi_thread")]
async fn udp_loopback_delivers_payload_with_remote_info() {
    let cfg = EngineConfig::default();

    let (sink, mut rx) = channel_sink();
    let receiver_sock = make_udp_socket(AddressFamily::Ipv4).expect("创建接收套接字失败");
    let receiver = exec_udp_bind(&cfg, receiver_sock, &NetAddress::ipv4("127.0.0.1", 0), sink)
        .expect("接收端绑定失败");
    let receiver_addr = receiver.local_addr().expect("查询接收端地址失败");

    let (sender_sink, _sender_rx) = channel_sink();
    let sender_sock = make_udp_socket(AddressFamily::Ipv4).expect("创建发送套接字失败");
    let sender = exec_udp_bind(&cfg, sender_sock, &NetAddress::ipv4("127.0.0.1", 0), sender_sink)
        .expect("发送端绑定失败");

    sender
        .send(
            &NetAddress::ipv4("127.0.0.1", receiver_addr.port()),
            b"hello 1234",
        )
        .await
        .expect("UDP 发送失败");

    let message = next_message(&mut rx, "UDP 回环消息").await;
    assert_eq!(message.payload().as_ref(), b"hello 1234");
    assert_eq!(message.remote().size(), 10);
    assert_eq!(message.remote().family().as_str(), "IPv4");
    assert_eq!(
        message.remote().port(),
        sender.local_addr().expect("查询发送端地址失败").port()
    );
}

/// 场景 B：TCP 监听 + 5 秒超时建连，100 字节消息在服务端完整重组。
#[tokio::test(flavor = "multi_thread")]
async fn tcp_roundtrip_reassembles_full_message() {
    let cfg = EngineConfig::default();

    let (server_sink, mut server_rx) = channel_sink();
    let listen_sock = make_tcp_socket(AddressFamily::Ipv4).expect("创建监听套接字失败");
    exec_bind(&listen_sock, &NetAddress::ipv4("127.0.0.1", 0))
        .expect("监听端绑定失败");
    let listener = exec_tcp_listen(&cfg, listen_sock, server_sink).expect("启动监听失败");
    let port = listener.local_addr().port();

    let (client_sink, _client_rx) = channel_sink();
    let client_sock = make_tcp_socket(AddressFamily::Ipv4).expect("创建客户端套接字失败");
    let client = exec_connect(
        &cfg,
        client_sock,
        &NetAddress::ipv4("127.0.0.1", port),
        5,
        client_sink,
    )
    .await
    .expect("5 秒超时内建连失败");

    let payload: Vec<u8> = (0..100u8).collect();
    client.send(&payload).await.expect("TCP 发送失败");

    // 即使被拆成多次读取，服务端也必须重组出完整的 100 字节
    let mut assembled = Vec::new();
    while assembled.len() < payload.len() {
        let message = next_message(&mut server_rx, "TCP 服务端分片").await;
        assert_eq!(
            usize::try_from(message.remote().size()).expect("size 溢出"),
            message.payload().len()
        );
        assembled.extend_from_slice(message.payload());
    }
    assert_eq!(assembled, payload);
}

/// 场景 C：向无监听方的地址建连，1 秒超时内必须返回失败而非悬挂。
#[tokio::test(flavor = "multi_thread")]
async fn connect_without_listener_fails_within_timeout() {
    let cfg = EngineConfig::default();
    let (sink, _rx) = channel_sink();
    let socket = make_tcp_socket(AddressFamily::Ipv4).expect("创建套接字失败");

    let started = std::time::Instant::now();
    // 10.255.255.1 为回环外的黑洞地址：要么立即被拒，要么等满 1 秒超时
    let result = exec_connect(
        &cfg,
        socket,
        &NetAddress::ipv4("10.255.255.1", 9),
        1,
        sink,
    )
    .await;
    let elapsed = started.elapsed();

    let err = result.err().expect("无监听方的建连必须失败");
    assert!(
        matches!(
            err,
            TransportError::ConnectTimeout { .. } | TransportError::ConnectRefusedOrFailed { .. }
        ),
        "意外的错误类别: {err}"
    );
    assert!(elapsed < Duration::from_secs(3), "建连失败耗时 {elapsed:?}，疑似悬挂");
}

/// 对端关闭流后，接收引擎停止派发并结束任务。
#[tokio::test(flavor = "multi_thread")]
async fn stream_eof_terminates_receive_engine() {
    let cfg = EngineConfig::default();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("原生监听失败");
    let addr = listener.local_addr().expect("查询监听地址失败");

    let (sink, mut rx) = channel_sink();
    let client_sock = make_tcp_socket(AddressFamily::Ipv4).expect("创建客户端套接字失败");
    let _client = exec_connect(
        &cfg,
        client_sock,
        &NetAddress::ipv4("127.0.0.1", addr.port()),
        5,
        sink,
    )
    .await
    .expect("建连失败");

    let (mut peer, _) = listener.accept().await.expect("接受连接失败");
    tokio::io::AsyncWriteExt::write_all(&mut peer, b"ping")
        .await
        .expect("对端写入失败");
    let message = next_message(&mut rx, "EOF 前的最后一条消息").await;
    assert_eq!(message.payload().as_ref(), b"ping");

    // 对端关闭：引擎应随 EOF 退出并释放回调，通道随之关闭
    drop(peer);
    let closed = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("等待引擎退出超时");
    assert!(closed.is_none(), "EOF 之后不应再有任何派发");
}

/// 0 长数据报不终止数据报接收引擎。
#[tokio::test(flavor = "multi_thread")]
async fn empty_datagram_keeps_engine_polling() {
    let cfg = EngineConfig::default();
    let (sink, mut rx) = channel_sink();
    let sock = make_udp_socket(AddressFamily::Ipv4).expect("创建套接字失败");
    let handle = exec_udp_bind(&cfg, sock, &NetAddress::ipv4("127.0.0.1", 0), sink)
        .expect("绑定失败");
    let addr = handle.local_addr().expect("查询地址失败");

    let probe = tokio::net::UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("原生套接字绑定失败");
    probe.send_to(b"", addr).await.expect("发送空数据报失败");
    probe.send_to(b"after", addr).await.expect("发送后续数据报失败");

    let message = next_message(&mut rx, "空数据报之后的消息").await;
    assert_eq!(
        message.payload().as_ref(),
        b"after",
        "空数据报不应产生派发，也不应终止引擎"
    );
}

/// 数据报发送按 `SO_SNDBUF` 提示分块，接收侧可重组完整负载。
#[tokio::test(flavor = "multi_thread")]
async fn datagram_send_chunks_to_buffer_hint() {
    let cfg = EngineConfig::default();
    let sender_sock = make_udp_socket(AddressFamily::Ipv4).expect("创建发送套接字失败");
    sender_sock
        .set_send_buffer_size(4096)
        .expect("压缩发送缓冲失败");
    // 内核可能把实际值上调（Linux 翻倍），以套接字回读的提示为准
    let hint = sender_sock.send_buffer_size().expect("读取缓冲提示失败");

    let (sink, _rx) = channel_sink();
    let sender = exec_udp_bind(&cfg, sender_sock, &NetAddress::ipv4("127.0.0.1", 0), sink)
        .expect("发送端绑定失败");

    let receiver = tokio::net::UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("接收端绑定失败");
    let dest = receiver.local_addr().expect("查询接收端地址失败");

    let payload: Vec<u8> = (0..20_000usize).map(|i| (i % 251) as u8).collect();
    let dest_addr = NetAddress::ipv4("127.0.0.1", dest.port());
    let send_task = sender.send(&dest_addr, &payload);

    let mut assembled = Vec::new();
    let mut buf = vec![0u8; 65_536];
    let recv_task = async {
        while assembled.len() < payload.len() {
            let (len, _) = receiver.recv_from(&mut buf).await.expect("接收数据报失败");
            assert!(len <= hint, "单个数据报 {len} 字节超出缓冲提示 {hint}");
            assert!(len < payload.len(), "负载未被分块");
            assembled.extend_from_slice(&buf[..len]);
        }
    };

    let (sent, ()) = tokio::join!(send_task, recv_task);
    sent.expect("分块发送失败");
    assert_eq!(assembled, payload, "接收侧必须重组出完整负载");
}

/// 关停句柄确定性地拆除接收任务。
#[tokio::test(flavor = "multi_thread")]
async fn shutdown_tears_down_receive_engine() {
    let cfg = EngineConfig::default();
    let (sink, mut rx) = channel_sink();
    let sock = make_udp_socket(AddressFamily::Ipv4).expect("创建套接字失败");
    let handle = exec_udp_bind(&cfg, sock, &NetAddress::ipv4("127.0.0.1", 0), sink)
        .expect("绑定失败");
    let addr = handle.local_addr().expect("查询地址失败");

    let probe = tokio::net::UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("原生套接字绑定失败");
    probe.send_to(b"before", addr).await.expect("发送失败");
    let message = next_message(&mut rx, "关停前的消息").await;
    assert_eq!(message.payload().as_ref(), b"before");

    handle.shutdown();
    // 任务退出后回调被释放，通道关闭即拆除完成的信号
    let closed = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("等待拆除超时");
    assert!(closed.is_none(), "关停之后不应再有任何派发");
}

/// 关停监听句柄连带拆除接受循环与既有连接任务。
#[tokio::test(flavor = "multi_thread")]
async fn listener_shutdown_stops_connection_tasks() {
    let cfg = EngineConfig::default();
    let (sink, mut rx) = channel_sink();
    let listen_sock = make_tcp_socket(AddressFamily::Ipv4).expect("创建监听套接字失败");
    exec_bind(&listen_sock, &NetAddress::ipv4("127.0.0.1", 0))
        .expect("绑定失败");
    let listener = exec_tcp_listen(&cfg, listen_sock, sink).expect("启动监听失败");
    let port = listener.local_addr().port();

    let mut peer = tokio::net::TcpStream::connect(("127.0.0.1", port))
        .await
        .expect("原生建连失败");
    tokio::io::AsyncWriteExt::write_all(&mut peer, b"ping")
        .await
        .expect("写入失败");
    let message = next_message(&mut rx, "关停前的连接消息").await;
    assert_eq!(message.payload().as_ref(), b"ping");

    listener.shutdown();
    let closed = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("等待监听拆除超时");
    assert!(closed.is_none(), "监听关停后不应再有任何派发");
}
