//! UDP 演示客户端：绑定本地端口、向目标发送一条问候，然后驻留收包。
//!
//! 本地固定使用 `127.0.0.1:7777`；端口被占用时绑定执行器会自动回退到
//! 临时端口。参数不足时打印用法并以状态 0 退出（沿用的前端行为）。

use std::{sync::Arc, time::Duration};

use ripple_net::{AddressFamily, NetAddress};
use ripple_transport::{EngineConfig, LogSink, exec_udp_bind, make_udp_socket};
use tracing_subscriber::EnvFilter;

const CLIENT_IP: &str = "127.0.0.1";
const CLIENT_PORT: u16 = 7777;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("用法: udp_client <ip> <port>");
        return;
    }
    let ip = args[1].clone();
    let port: u16 = args[2].parse().unwrap_or(0);
    tracing::info!(%ip, port, "UDP 演示客户端启动");

    let socket = match make_udp_socket(AddressFamily::Ipv4) {
        Ok(socket) => socket,
        Err(err) => {
            tracing::error!(%err, "创建 UDP 套接字失败");
            return;
        }
    };

    let config = EngineConfig::default();
    let client_addr = NetAddress::ipv4(CLIENT_IP, CLIENT_PORT);
    let handle = match exec_udp_bind(&config, socket, &client_addr, Arc::new(LogSink)) {
        Ok(handle) => handle,
        Err(err) => {
            tracing::error!(%err, "绑定失败");
            return;
        }
    };

    let server_addr = NetAddress::ipv4(ip, port);
    match handle.send(&server_addr, b"hello 1234").await {
        Ok(()) => tracing::info!(%server_addr, "问候已发送"),
        Err(err) => tracing::error!(%err, "发送失败"),
    }

    tokio::time::sleep(Duration::from_secs(100)).await;
}
