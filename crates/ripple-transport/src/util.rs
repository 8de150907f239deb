use tokio::sync::watch;

/// 关停信号的持有端。
///
/// # 教案式注释
///
/// ## 意图（Why）
/// - 后台接收/接受任务是分离任务，创建者不持有 `JoinHandle`；若没有显式
///   信号，套接字与任务会存活到进程结束。句柄把“拆除权”还给创建者。
///
/// ## 契约（What）
/// - `shutdown`：显式发出关停信号；
/// - 句柄被丢弃等价于发出信号——发送端消失时所有令牌同样被唤醒；
/// - 一个句柄可以对应多个令牌克隆（监听器与它派生的连接任务共用）。
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// 发出关停信号；与直接丢弃句柄等效，但语义上更显式。
    pub fn shutdown(self) {
        let _ = self.tx.send(true);
    }
}

/// 关停信号的观察端，交给每个后台任务在 `select` 中等待。
#[derive(Clone, Debug)]
pub(crate) struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// 等待关停信号；信号已发出或发送端已消失时立即返回。
    ///
    /// 内部克隆一份观察端，令本方法只借用 `&self`，便于在 `select` 的
    /// 其它分支里继续克隆令牌。
    pub(crate) async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// 构造一对关停句柄与令牌。
pub(crate) fn shutdown_pair() -> (ShutdownHandle, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, ShutdownToken { rx })
}
