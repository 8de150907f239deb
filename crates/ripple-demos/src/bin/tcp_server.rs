//! TCP 演示服务端：绑定、监听，然后驻留等待入站连接。
//!
//! 入站消息由默认的日志回调落盘；进程不做优雅退出编排，驻留一段固定
//! 时长后直接结束。参数不足时打印用法并以状态 0 退出——这是演示前端
//! 沿用的既有行为，核心 API 的错误模型不受其影响。

use std::{sync::Arc, time::Duration};

use ripple_net::{AddressFamily, NetAddress};
use ripple_transport::{EngineConfig, LogSink, exec_bind, exec_tcp_listen, make_tcp_socket};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("用法: tcp_server <ip> <port>");
        return;
    }
    let ip = args[1].clone();
    let port: u16 = args[2].parse().unwrap_or(0);
    tracing::info!(%ip, port, "TCP 演示服务端启动");

    let socket = match make_tcp_socket(AddressFamily::Ipv4) {
        Ok(socket) => socket,
        Err(err) => {
            tracing::error!(%err, "创建 TCP 套接字失败");
            return;
        }
    };

    let address = NetAddress::ipv4(ip, port);
    if let Err(err) = exec_bind(&socket, &address) {
        tracing::error!(%err, "绑定失败");
        return;
    }

    let config = EngineConfig::default();
    let listener = match exec_tcp_listen(&config, socket, Arc::new(LogSink)) {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%err, "启动监听失败");
            return;
        }
    };
    tracing::info!(addr = %listener.local_addr(), "监听中，等待入站连接");

    tokio::time::sleep(Duration::from_secs(100)).await;
}
