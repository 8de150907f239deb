use std::time::Duration;

/// 引擎级配置，把散落的缓冲与超时常量收拢为显式结构。
///
/// # 教案式注释
///
/// ## 意图（Why）
/// - 缓冲区回退值、轮询超时、默认建连超时与接受积压原先是各处的自由
///   常量；收拢到一个在引擎构造时传入的结构体，调用方才能按场景覆盖。
///
/// ## 契约（What）
/// - `buffer_size_fallback`：`SO_RCVBUF`/`SO_SNDBUF` 提示不可用时的缓冲
///   字节数，默认 8192；
/// - `poll_timeout`：单次可读/可写等待的上限，默认 500 ms；
/// - `connect_timeout_default`：调用方把建连超时传 0 时的替代值，默认
///   8 小时（沿用既有契约的约定，而非“无超时”）；
/// - `accept_backlog`：监听积压，默认 10；
/// - `accept_retry_pause`：接受循环遇到“将会阻塞”时的重试间隔，默认 1 s。
///
/// ## 注意事项（Trade-offs）
/// - 8 小时的默认建连超时异常地长，保留它是出于接口兼容；对延迟敏感的
///   调用方应显式传入非零超时或覆盖本字段。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    buffer_size_fallback: usize,
    poll_timeout: Duration,
    connect_timeout_default: Duration,
    accept_backlog: u32,
    accept_retry_pause: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_size_fallback: 8192,
            poll_timeout: Duration::from_millis(500),
            connect_timeout_default: Duration::from_secs(8 * 60 * 60),
            accept_backlog: 10,
            accept_retry_pause: Duration::from_secs(1),
        }
    }
}

impl EngineConfig {
    /// 覆盖缓冲区回退值。
    pub fn with_buffer_size_fallback(mut self, bytes: usize) -> Self {
        self.buffer_size_fallback = bytes;
        self
    }

    /// 覆盖单次就绪等待的上限。
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// 覆盖零值建连超时的替代值。
    pub fn with_connect_timeout_default(mut self, timeout: Duration) -> Self {
        self.connect_timeout_default = timeout;
        self
    }

    /// 覆盖监听积压。
    pub fn with_accept_backlog(mut self, backlog: u32) -> Self {
        self.accept_backlog = backlog;
        self
    }

    /// 覆盖接受循环的重试间隔。
    pub fn with_accept_retry_pause(mut self, pause: Duration) -> Self {
        self.accept_retry_pause = pause;
        self
    }

    /// 缓冲区回退值。
    pub fn buffer_size_fallback(&self) -> usize {
        self.buffer_size_fallback
    }

    /// 单次就绪等待上限。
    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    /// 零值建连超时的替代值。
    pub fn connect_timeout_default(&self) -> Duration {
        self.connect_timeout_default
    }

    /// 监听积压。
    pub fn accept_backlog(&self) -> u32 {
        self.accept_backlog
    }

    /// 接受循环的重试间隔。
    pub fn accept_retry_pause(&self) -> Duration {
        self.accept_retry_pause
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.buffer_size_fallback(), 8192);
        assert_eq!(cfg.poll_timeout(), Duration::from_millis(500));
        assert_eq!(cfg.connect_timeout_default(), Duration::from_secs(28_800));
        assert_eq!(cfg.accept_backlog(), 10);
        assert_eq!(cfg.accept_retry_pause(), Duration::from_secs(1));
    }

    #[test]
    fn builders_override_fields() {
        let cfg = EngineConfig::default()
            .with_buffer_size_fallback(4096)
            .with_poll_timeout(Duration::from_millis(50))
            .with_connect_timeout_default(Duration::from_secs(5))
            .with_accept_backlog(64)
            .with_accept_retry_pause(Duration::from_millis(10));
        assert_eq!(cfg.buffer_size_fallback(), 4096);
        assert_eq!(cfg.poll_timeout(), Duration::from_millis(50));
        assert_eq!(cfg.connect_timeout_default(), Duration::from_secs(5));
        assert_eq!(cfg.accept_backlog(), 64);
        assert_eq!(cfg.accept_retry_pause(), Duration::from_millis(10));
    }
}
