//! 模板加载重试包装
//!
//! 对任意模板源的薄重试层。次数与间隔来自配置，attempts 为 1 时等价于
//! 直接透传。只重试 load，exists 的结果不缓存也不重试。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::LoaderSection;
use crate::core::error::StageError;
use crate::host::SceneTemplate;
use crate::loader::traits::TemplateSource;

pub struct RetrySource {
    inner: Arc<dyn TemplateSource>,
    attempts: u32,
    delay: Duration,
}

impl RetrySource {
    pub fn new(inner: Arc<dyn TemplateSource>, attempts: u32, delay_ms: u64) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            delay: Duration::from_millis(delay_ms),
        }
    }

    pub fn from_config(inner: Arc<dyn TemplateSource>, cfg: &LoaderSection) -> Self {
        Self::new(inner, cfg.retry_attempts, cfg.retry_delay_ms)
    }
}

#[async_trait]
impl TemplateSource for RetrySource {
    async fn exists(&self, path: &str) -> bool {
        self.inner.exists(path).await
    }

    async fn load(
        &self,
        path: &str,
        progress: mpsc::UnboundedSender<u8>,
    ) -> Result<Arc<dyn SceneTemplate>, StageError> {
        let mut last = None;
        for attempt in 1..=self.attempts {
            match self.inner.load(path, progress.clone()).await {
                Ok(template) => return Ok(template),
                Err(err) => {
                    if attempt < self.attempts {
                        tracing::warn!(
                            "load of {} failed (attempt {}/{}), retrying: {}",
                            path,
                            attempt,
                            self.attempts,
                            err
                        );
                        tokio::time::sleep(self.delay).await;
                    }
                    last = Some(err);
                }
            }
        }
        Err(last.unwrap_or_else(|| StageError::Load(format!("no load attempt made for {path}"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::mock::MockSource;

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failure() {
        let source = Arc::new(MockSource::new());
        source.insert_stub("scenes/menu.scn", "menu");
        source.fail_times("scenes/menu.scn", 1);

        let retry = RetrySource::new(source, 2, 5);
        let (tx, _rx) = mpsc::unbounded_channel();
        let template = retry.load("scenes/menu.scn", tx).await.unwrap();
        assert_eq!(template.type_name(), "menu");
    }

    #[tokio::test]
    async fn test_retry_budget_exhausted_returns_last_error() {
        let source = Arc::new(MockSource::new());
        source.insert_stub("scenes/menu.scn", "menu");
        source.fail_times("scenes/menu.scn", 5);

        let retry = RetrySource::new(source, 3, 1);
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = retry.load("scenes/menu.scn", tx).await;
        assert!(matches!(result, Err(StageError::Load(_))));
    }
}
