#![doc = r#"
# ripple-transport

## 模块使命（Why）
- **最小非阻塞传输层**：创建 TCP/UDP 套接字、完成绑定与建连，并以后台
  任务驱动收发，把每条入站消息交给消息回调；不含任何应用层协议。
- **就绪轮询语义**：所有套接字自创建起终生处于非阻塞模式，看似阻塞的
  操作（connect/send/recv）一律实现为“等待就绪 → 重试”，绝不直接陷入
  阻塞系统调用。

## 核心契约（What）
- `factory`：按地址族创建非阻塞 TCP/UDP 套接字；
- `exec_bind` / `exec_udp_bind`：绑定执行器，地址被占用时仅以临时端口
  回退一次（至多两次 bind）；UDP 绑定成功后隐式启动接收引擎；
- `exec_connect`：有界等待的非阻塞建连，就绪后显式取回挂起的套接字
  错误；成功后隐式启动 TCP 模式接收引擎；
- `exec_tcp_listen`：标记监听并启动后台接受循环，每个新连接获得独立的
  接收引擎；
- 发送引擎：可写就绪轮询 + 分块写出，直到写完或硬错误/超时；
- 所有公开操作返回 [`TransportError`]；后台任务内的失败只终止该任务，
  从不回传给早已返回的调用方。

## 实现策略（How）
- 就绪等待由 Tokio 的 `readable()`/`writable()` 承担，并以
  `tokio::time::timeout` 施加轮询上限（默认 500 ms）；
- 原始套接字的创建、非阻塞切换与缓冲区提示读取委托给 `socket2`；
- 接收/接受循环是 `tokio::spawn` 的分离任务，但每个任务都在关停令牌上
  `select`，持有句柄的一方可以确定性地拆除套接字与任务（见 `util`）；
- 派发给回调的负载以 `bytes::Bytes` 拷贝交付，生命周期与引擎的复用
  缓冲区彼此独立。

## 风险与考量（Trade-offs）
- 每个接收中的套接字对应一个长驻任务，无池化与背压；高连接数场景应由
  上层限制接受速率；
- 同一套接字上的并发发送未在内部串行化，调用方需自行保证（前置条件，
  非内部保证）。
"#]

mod bind;
mod config;
mod connect;
mod error;
mod factory;
mod listen;
mod recv;
mod send;
mod sink;
mod util;

pub use bind::{UdpHandle, exec_bind, exec_udp_bind};
pub use config::EngineConfig;
pub use connect::{TcpHandle, exec_connect};
pub use error::TransportError;
pub use factory::{SocketKind, make_tcp_socket, make_udp_socket};
pub use listen::{TcpListenerHandle, exec_tcp_listen};
pub use sink::{InboundMessage, LogSink, MessageSink};
pub use util::ShutdownHandle;
