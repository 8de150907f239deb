use std::{io, time::Duration};

use ripple_net::AddressError;
use thiserror::Error;

use crate::factory::SocketKind;

/// 传输层统一错误类型。
///
/// # 契约说明（What）
/// - 每个包裹操作系统失败的变体都保留原始 `std::io::Error`，错误码与
///   文案完整透传；
/// - 后台任务（接收循环、接受循环）内部的失败不会以该类型回传——任务
///   记录日志后自行终止，错误只对发起任务前的同步/异步调用可见。
#[derive(Debug, Error)]
pub enum TransportError {
    /// 地址族或文本地址非法，任何下游操作都必须据此失败。
    #[error("地址族错误: {0}")]
    AddressFamily(#[from] AddressError),
    /// 创建套接字失败。
    #[error("创建 {kind} 套接字失败: {source}")]
    SocketCreateFailed { kind: SocketKind, source: io::Error },
    /// 非阻塞模式切换失败；此时套接字已被关闭，不会泄露半成品资源。
    #[error("设置非阻塞模式失败: {0}")]
    NonBlockingSetupFailed(#[source] io::Error),
    /// 绑定失败，含一次临时端口回退仍失败的情况。
    #[error("绑定 {addr} 失败: {source}")]
    BindFailed { addr: String, source: io::Error },
    /// 建连等待超出上限。
    #[error("连接 {addr} 超时（等待 {waited:?}）")]
    ConnectTimeout { addr: String, waited: Duration },
    /// 建连被拒绝，或就绪后取回的挂起错误非零。
    #[error("连接 {addr} 失败: {source}")]
    ConnectRefusedOrFailed { addr: String, source: io::Error },
    /// 等待可写超出轮询上限。
    #[error("发送等待可写超时")]
    SendTimeout,
    /// 对端提前终止写路径，仍有未写出的字节。
    #[error("发送不完整，剩余 {remaining} 字节未写出")]
    SendIncomplete { remaining: usize },
    /// 发送路径上的硬错误。
    #[error("发送失败: {0}")]
    SendFailed(#[source] io::Error),
    /// 接收路径上的硬错误。
    #[error("接收失败: {0}")]
    ReceiveFailed(#[source] io::Error),
    /// 监听或接受连接失败。
    #[error("接受连接失败: {0}")]
    AcceptFailed(#[source] io::Error),
    /// 查询本地地址失败。
    #[error("无法获取套接字本地地址: {0}")]
    LocalAddrFailed(#[source] io::Error),
    /// 查询对端地址失败。
    #[error("无法获取套接字对端地址: {0}")]
    PeerAddrFailed(#[source] io::Error),
}
