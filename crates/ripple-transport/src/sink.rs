use bytes::Bytes;
use ripple_net::SocketRemoteInfo;

/// 一条已完成对端解析的入站消息。
///
/// # 契约（What）
/// - `payload`：本次收包的字节拷贝，生命周期与引擎内部缓冲无关；
/// - `remote`：为本条消息新建的对端元数据，从不跨消息复用。
#[derive(Clone, Debug)]
pub struct InboundMessage {
    payload: Bytes,
    remote: SocketRemoteInfo,
}

impl InboundMessage {
    pub(crate) fn new(payload: Bytes, remote: SocketRemoteInfo) -> Self {
        Self { payload, remote }
    }

    /// 消息负载。
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// 对端元数据。
    pub fn remote(&self) -> &SocketRemoteInfo {
        &self.remote
    }

    /// 拆出负载与元数据的所有权。
    pub fn into_parts(self) -> (Bytes, SocketRemoteInfo) {
        (self.payload, self.remote)
    }
}

/// 入站消息回调，应用层的扩展点。
///
/// # 教案式注释
///
/// ## 意图（Why）
/// - 接收引擎只负责把字节读出来并解析对端，消息最终去向由调用方决定；
///   本 trait 就是那条缝。
///
/// ## 契约（What）
/// - 同一套接字的消息按读取顺序依次派发，不会乱序（跨套接字无序保证）；
/// - `on_message` 在接收任务内同步执行，实现应保持轻量，重活自行转投
///   其它任务。
pub trait MessageSink: Send + Sync {
    /// 处理一条入站消息。
    fn on_message(&self, message: InboundMessage);
}

/// 默认回调：把消息落到一条结构化日志上。
///
/// 没有应用层消费者时，派发在此终止；这也是集成方替换的第一站。
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl MessageSink for LogSink {
    fn on_message(&self, message: InboundMessage) {
        let remote = message.remote();
        tracing::info!(
            address = remote.address(),
            family = %remote.family(),
            port = remote.port(),
            size = remote.size(),
            "收到入站消息"
        );
    }
}
