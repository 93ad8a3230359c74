//! Mock 模板源与测试模板
//!
//! 行为可脚本化：按路径注册模板、注入若干次失败、设置加载延迟与进度序列。
//! 延迟会均摊到每个进度步之间，便于测试转场与进度检查点的交错。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::error::StageError;
use crate::host::mock::StubScene;
use crate::host::{SceneHandle, SceneTemplate};
use crate::loader::traits::TemplateSource;

/// 产出 StubScene 的最简模板
pub struct StubTemplate {
    type_name: String,
}

impl StubTemplate {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }
}

impl SceneTemplate for StubTemplate {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn instantiate(&self) -> anyhow::Result<SceneHandle> {
        Ok(StubScene::new(self.type_name.clone()))
    }
}

/// 由闭包产出实例的模板，测试自定义场景类型时使用
pub struct FactoryTemplate {
    type_name: String,
    factory: Box<dyn Fn() -> SceneHandle + Send + Sync>,
}

impl FactoryTemplate {
    pub fn new<F>(type_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> SceneHandle + Send + Sync + 'static,
    {
        Self {
            type_name: type_name.into(),
            factory: Box::new(factory),
        }
    }
}

impl SceneTemplate for FactoryTemplate {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn instantiate(&self) -> anyhow::Result<SceneHandle> {
        Ok((self.factory)())
    }
}

/// 脚本化模板源
pub struct MockSource {
    templates: Mutex<HashMap<String, Arc<dyn SceneTemplate>>>,
    failures: Mutex<HashMap<String, u32>>,
    latency: Mutex<Duration>,
    progress_steps: Mutex<Vec<u8>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            templates: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            latency: Mutex::new(Duration::ZERO),
            progress_steps: Mutex::new(vec![25, 50, 75, 100]),
        }
    }

    pub fn insert(&self, path: impl Into<String>, template: Arc<dyn SceneTemplate>) {
        self.templates
            .lock()
            .expect("mock source lock poisoned")
            .insert(path.into(), template);
    }

    /// 注册一个产出 StubScene 的模板
    pub fn insert_stub(&self, path: impl Into<String>, type_name: impl Into<String>) {
        self.insert(path, Arc::new(StubTemplate::new(type_name)));
    }

    /// 让指定路径接下来 n 次 load 失败
    pub fn fail_times(&self, path: impl Into<String>, n: u32) {
        self.failures
            .lock()
            .expect("mock source lock poisoned")
            .insert(path.into(), n);
    }

    pub fn set_latency_ms(&self, ms: u64) {
        *self.latency.lock().expect("mock source lock poisoned") = Duration::from_millis(ms);
    }

    pub fn set_progress_steps(&self, steps: Vec<u8>) {
        *self.progress_steps.lock().expect("mock source lock poisoned") = steps;
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TemplateSource for MockSource {
    async fn exists(&self, path: &str) -> bool {
        self.templates
            .lock()
            .expect("mock source lock poisoned")
            .contains_key(path)
    }

    async fn load(
        &self,
        path: &str,
        progress: mpsc::UnboundedSender<u8>,
    ) -> Result<Arc<dyn SceneTemplate>, StageError> {
        {
            let mut failures = self.failures.lock().expect("mock source lock poisoned");
            if let Some(remaining) = failures.get_mut(path) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(StageError::Load(format!("scripted load failure for {path}")));
                }
            }
        }

        let latency = *self.latency.lock().expect("mock source lock poisoned");
        let steps = self.progress_steps.lock().expect("mock source lock poisoned").clone();
        let pause = if steps.is_empty() {
            latency
        } else {
            latency / steps.len() as u32
        };
        if steps.is_empty() && !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        for step in steps {
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
            // 接收端可能已关闭，进度是尽力而为
            let _ = progress.send(step);
        }

        self.templates
            .lock()
            .expect("mock source lock poisoned")
            .get(path)
            .cloned()
            .ok_or_else(|| StageError::Load(format!("template not registered for {path}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_source_reports_progress_then_template() {
        let source = MockSource::new();
        source.insert_stub("scenes/menu.scn", "menu");

        assert!(source.exists("scenes/menu.scn").await);
        assert!(!source.exists("scenes/missing.scn").await);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let template = source.load("scenes/menu.scn", tx).await.unwrap();
        assert_eq!(template.type_name(), "menu");

        let mut seen = Vec::new();
        while let Ok(p) = rx.try_recv() {
            seen.push(p);
        }
        assert_eq!(seen, vec![25, 50, 75, 100]);
    }

    #[tokio::test]
    async fn test_mock_source_scripted_failures_run_out() {
        let source = MockSource::new();
        source.insert_stub("scenes/menu.scn", "menu");
        source.fail_times("scenes/menu.scn", 2);

        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(source.load("scenes/menu.scn", tx.clone()).await.is_err());
        assert!(source.load("scenes/menu.scn", tx.clone()).await.is_err());
        assert!(source.load("scenes/menu.scn", tx).await.is_ok());
    }
}
