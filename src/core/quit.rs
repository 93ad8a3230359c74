//! 退出控制
//!
//! 弹出哨兵条目或显式 quit 时触发。引擎不直接终止进程，只广播原因并
//! 取消令牌，宿主主循环等到信号后做自己的清理再退出。触发之前历史栈
//! 已经清算完毕：挂起的返回通道全部解析，保留实例尽力销毁。

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// 退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitReason {
    /// 哨兵条目出栈，历史栈被弹空
    RootPopped,
    /// 调用方显式请求
    Requested,
}

/// 退出信号控制器
#[derive(Debug, Clone)]
pub struct QuitController {
    quit_token: CancellationToken,
    reason_tx: broadcast::Sender<QuitReason>,
}

impl QuitController {
    pub fn new() -> Self {
        let (reason_tx, _) = broadcast::channel(1);
        Self {
            quit_token: CancellationToken::new(),
            reason_tx,
        }
    }

    /// 获取退出 token，宿主可用它取消自己的任务
    pub fn token(&self) -> CancellationToken {
        self.quit_token.clone()
    }

    /// 触发退出，重复触发只保留第一个原因
    pub fn trigger(&self, reason: QuitReason) {
        if self.quit_token.is_cancelled() {
            return;
        }
        let _ = self.reason_tx.send(reason);
        self.quit_token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.quit_token.is_cancelled()
    }

    /// 订阅退出原因，必须在触发前订阅才能收到
    pub fn subscribe(&self) -> broadcast::Receiver<QuitReason> {
        self.reason_tx.subscribe()
    }

    /// 等待退出信号
    pub async fn wait(&self) {
        self.quit_token.cancelled().await;
    }
}

impl Default for QuitController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_controller_starts_idle() {
        let quit = QuitController::new();
        assert!(!quit.is_triggered());
    }

    #[test]
    fn test_trigger_cancels_token() {
        let quit = QuitController::new();
        let token = quit.token();
        assert!(!token.is_cancelled());

        quit.trigger(QuitReason::Requested);
        assert!(quit.is_triggered());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_subscriber_receives_first_reason_only() {
        let quit = QuitController::new();
        let mut rx = quit.subscribe();

        quit.trigger(QuitReason::RootPopped);
        quit.trigger(QuitReason::Requested);

        assert_eq!(rx.recv().await.unwrap(), QuitReason::RootPopped);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_wait_returns_after_trigger() {
        let quit = QuitController::new();
        let waiter = quit.clone();
        let handle = tokio::spawn(async move {
            waiter.wait().await;
        });

        quit.trigger(QuitReason::Requested);
        handle.await.unwrap();
    }
}
