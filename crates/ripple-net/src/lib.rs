#![doc = r#"
# ripple-net

## 模块使命（Why）
- **统一地址值对象**：为传输层提供 `NetAddress` 与 `SocketRemoteInfo` 两类
  不可变值对象，使上层以一致方式描述绑定/连接目标与收包来源。
- **纯转换层**：把外部传入的抽象地址（族、文本地址、端口）翻译为标准库
  `SocketAddr`，供 bind/connect/send 直接消费；本 crate 不做任何 IO。

## 核心契约（What）
- `AddressFamily`：仅 IPv4/IPv6 两种合法取值；外部数值编码通过
  `TryFrom<u32>` 转换，非法值立即失败，不会构造出半成品地址。
- `NetAddress`：{ 族, 文本地址, 端口 } 三元组，调用方持有、按引用传入核心
  操作，核心不长期保留。
- `SocketRemoteInfo`：每条入站消息新建一份的对端元数据（地址、族、端口、
  本次报文字节数）。
- `resolve_socket_addr`：纯函数翻译入口；族与文本不匹配或文本不可解析时
  返回 [`AddressError`]，下游统一映射为地址族错误。

## 实现策略（How）
- 地址解析直接复用标准库 `Ipv4Addr`/`Ipv6Addr` 的 `FromStr`，按声明的族
  分派，避免自行扫描字节。
- 族的展示名固定为 `"IPv4" / "IPv6" / "Others"`，与对端元数据消费方的
  既有约定保持一致。
"#]

use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    str::FromStr,
};

use thiserror::Error;

/// 地址层统一错误类型。
#[derive(Debug, Error)]
pub enum AddressError {
    /// 外部数值编码不在合法地址族范围内。
    #[error("非法地址族编码 {0}，仅支持 1 (IPv4) 与 2 (IPv6)")]
    InvalidFamily(u32),
    /// 文本地址与声明的地址族不匹配。
    #[error("地址 {address} 与声明的地址族 {family} 不匹配")]
    FamilyMismatch { address: String, family: AddressFamily },
    /// 文本地址无法解析为 IP。
    #[error("无法解析文本地址 {0}")]
    InvalidAddress(String),
}

/// 传输层支持的地址族。
///
/// # 契约说明（What）
/// - 合法取值只有 IPv4 与 IPv6；其余外部编码在 [`TryFrom<u32>`] 处被拒绝，
///   后续任何操作都不会再见到非法族。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    /// 返回族的展示名。
    pub const fn as_str(self) -> &'static str {
        match self {
            AddressFamily::Ipv4 => "IPv4",
            AddressFamily::Ipv6 => "IPv6",
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u32> for AddressFamily {
    type Error = AddressError;

    /// 按外部数值编码（1 = IPv4，2 = IPv6）转换地址族。
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AddressFamily::Ipv4),
            2 => Ok(AddressFamily::Ipv6),
            other => Err(AddressError::InvalidFamily(other)),
        }
    }
}

/// 抽象网络地址值对象。
///
/// # 教案式注释
///
/// ## 意图（Why）
/// - 调用方在发起 bind/connect/send 前构造一次，在单次操作期间不可变；
///   核心按引用消费，需要跨调用存活时由核心自行拷贝所需字段。
///
/// ## 契约（What）
/// - `family`：地址族；
/// - `address`：文本形式的 IP 地址；
/// - `port`：16 位端口，`0` 表示请求临时端口；
/// - `with_port`：派生一个仅端口不同的新地址，供绑定回退路径使用。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetAddress {
    family: AddressFamily,
    address: String,
    port: u16,
}

impl NetAddress {
    /// 构造网络地址。
    pub fn new(family: AddressFamily, address: impl Into<String>, port: u16) -> Self {
        Self {
            family,
            address: address.into(),
            port,
        }
    }

    /// IPv4 地址的便捷构造。
    pub fn ipv4(address: impl Into<String>, port: u16) -> Self {
        Self::new(AddressFamily::Ipv4, address, port)
    }

    /// IPv6 地址的便捷构造。
    pub fn ipv6(address: impl Into<String>, port: u16) -> Self {
        Self::new(AddressFamily::Ipv6, address, port)
    }

    /// 地址族。
    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// 文本地址。
    pub fn address(&self) -> &str {
        &self.address
    }

    /// 端口号。
    pub fn port(&self) -> u16 {
        self.port
    }

    /// 派生一个端口不同、其余字段一致的新地址。
    pub fn with_port(&self, port: u16) -> Self {
        Self {
            family: self.family,
            address: self.address.clone(),
            port,
        }
    }
}

impl fmt::Display for NetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.family {
            AddressFamily::Ipv4 => write!(f, "{}:{}", self.address, self.port),
            AddressFamily::Ipv6 => write!(f, "[{}]:{}", self.address, self.port),
        }
    }
}

/// 将 [`NetAddress`] 翻译为标准库 `SocketAddr`。
///
/// # 核心逻辑（How）
/// 1. 按声明的族选择 IPv4 或 IPv6 的解析路径；
/// 2. 文本无法解析为任何 IP 时返回 [`AddressError::InvalidAddress`]；
/// 3. 能解析但与声明的族不符时返回 [`AddressError::FamilyMismatch`]，
///    下游操作据此统一失败，不会带着错误族继续执行。
pub fn resolve_socket_addr(address: &NetAddress) -> Result<SocketAddr, AddressError> {
    let ip = match address.family() {
        AddressFamily::Ipv4 => Ipv4Addr::from_str(address.address())
            .map(IpAddr::V4)
            .map_err(|_| mismatch_or_invalid(address)),
        AddressFamily::Ipv6 => Ipv6Addr::from_str(address.address())
            .map(IpAddr::V6)
            .map_err(|_| mismatch_or_invalid(address)),
    }?;
    Ok(SocketAddr::new(ip, address.port()))
}

/// 区分“文本本身非法”与“文本合法但族不符”两种失败。
fn mismatch_or_invalid(address: &NetAddress) -> AddressError {
    if IpAddr::from_str(address.address()).is_ok() {
        AddressError::FamilyMismatch {
            address: address.address().to_owned(),
            family: address.family(),
        }
    } else {
        AddressError::InvalidAddress(address.address().to_owned())
    }
}

/// 对端地址族的展示形式。
///
/// 与 [`AddressFamily`] 不同，收包路径可能遇到既非 IPv4 也非 IPv6 的来源
/// （理论上不会发生，但契约上保留 `Others` 档），因此单独建模。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteFamily {
    Ipv4,
    Ipv6,
    Others,
}

impl RemoteFamily {
    /// 返回展示名。
    pub const fn as_str(self) -> &'static str {
        match self {
            RemoteFamily::Ipv4 => "IPv4",
            RemoteFamily::Ipv6 => "IPv6",
            RemoteFamily::Others => "Others",
        }
    }
}

impl fmt::Display for RemoteFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一条入站消息的对端元数据。
///
/// # 契约（What）
/// - 每条收到的消息新建一份，随消息一起交给回调方，从不跨消息复用；
/// - `size` 是本次收包的有效负载字节数。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SocketRemoteInfo {
    address: String,
    family: RemoteFamily,
    port: u16,
    size: u32,
}

impl SocketRemoteInfo {
    /// 由对端 `SocketAddr` 与本次收包长度构造元数据。
    pub fn from_peer(peer: SocketAddr, size: u32) -> Self {
        let family = match peer.ip() {
            IpAddr::V4(_) => RemoteFamily::Ipv4,
            IpAddr::V6(_) => RemoteFamily::Ipv6,
        };
        Self {
            address: peer.ip().to_string(),
            family,
            port: peer.port(),
            size,
        }
    }

    /// 对端文本地址。
    pub fn address(&self) -> &str {
        &self.address
    }

    /// 对端地址族。
    pub fn family(&self) -> RemoteFamily {
        self.family
    }

    /// 对端端口。
    pub fn port(&self) -> u16 {
        self.port
    }

    /// 本次报文的字节数。
    pub fn size(&self) -> u32 {
        self.size
    }
}
