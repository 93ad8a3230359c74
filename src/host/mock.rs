//! Mock 展示宿主与测试场景
//!
//! 不依赖任何真实渲染环境，把每个实例的挂接/可见/置灰/处理模式/销毁
//! 记录成可断言的状态表。按 Arc 指针身份索引，句柄保存在表里以避免
//! 地址复用造成的混淆。

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::host::traits::{ProcessMode, SceneHandle, SceneNode, StageHost};

/// 单个实例在 Mock 宿主中的状态快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceState {
    pub attached: bool,
    pub visible: bool,
    pub dimmed: bool,
    pub process: ProcessMode,
    pub destroyed: bool,
}

impl Default for InstanceState {
    fn default() -> Self {
        Self {
            attached: false,
            visible: true,
            dimmed: false,
            process: ProcessMode::Inherit,
            destroyed: false,
        }
    }
}

struct MockInner {
    current: Option<SceneHandle>,
    states: HashMap<usize, (SceneHandle, InstanceState)>,
}

/// 记录型展示宿主
pub struct MockStageHost {
    inner: Mutex<MockInner>,
    fail_destroy: AtomicBool,
}

impl MockStageHost {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MockInner {
                current: None,
                states: HashMap::new(),
            }),
            fail_destroy: AtomicBool::new(false),
        }
    }

    /// 模拟应用启动：实例已在树中且是当前场景
    pub fn boot(&self, scene: &SceneHandle) {
        let mut inner = self.inner.lock().expect("mock host lock poisoned");
        inner.states.insert(
            key(scene),
            (
                scene.clone(),
                InstanceState {
                    attached: true,
                    ..InstanceState::default()
                },
            ),
        );
        inner.current = Some(scene.clone());
    }

    /// 让后续的 destroy 调用失败（测试销毁失败时的回滚路径）
    pub fn set_fail_destroy(&self, fail: bool) {
        self.fail_destroy.store(fail, Ordering::SeqCst);
    }

    pub fn state_of(&self, scene: &SceneHandle) -> Option<InstanceState> {
        let inner = self.inner.lock().expect("mock host lock poisoned");
        inner.states.get(&key(scene)).map(|(_, s)| s.clone())
    }

    pub fn destroyed_count(&self) -> usize {
        let inner = self.inner.lock().expect("mock host lock poisoned");
        inner.states.values().filter(|(_, s)| s.destroyed).count()
    }

    /// 按实例名查状态（销毁后测试侧往往已不持有句柄）
    pub fn state_by_name(&self, name: &str) -> Option<InstanceState> {
        let inner = self.inner.lock().expect("mock host lock poisoned");
        inner
            .states
            .values()
            .find(|(h, _)| h.name() == name)
            .map(|(_, s)| s.clone())
    }

    fn with_state<R>(&self, scene: &SceneHandle, f: impl FnOnce(&mut InstanceState) -> R) -> R {
        let mut inner = self.inner.lock().expect("mock host lock poisoned");
        let (_, state) = inner
            .states
            .entry(key(scene))
            .or_insert_with(|| (scene.clone(), InstanceState::default()));
        f(state)
    }
}

impl Default for MockStageHost {
    fn default() -> Self {
        Self::new()
    }
}

fn key(scene: &SceneHandle) -> usize {
    Arc::as_ptr(scene) as *const () as usize
}

#[async_trait]
impl StageHost for MockStageHost {
    async fn destroy(&self, scene: &SceneHandle) -> anyhow::Result<()> {
        // 保持异步语义，销毁在让出点之后才生效
        tokio::task::yield_now().await;
        if self.fail_destroy.load(Ordering::SeqCst) {
            anyhow::bail!("mock host refused to destroy [{}]", scene.name());
        }
        let mut inner = self.inner.lock().expect("mock host lock poisoned");
        if let Some(cur) = &inner.current {
            if key(cur) == key(scene) {
                inner.current = None;
            }
        }
        let (_, state) = inner
            .states
            .entry(key(scene))
            .or_insert_with(|| (scene.clone(), InstanceState::default()));
        state.destroyed = true;
        state.attached = false;
        Ok(())
    }

    fn attach(&self, scene: &SceneHandle) {
        self.with_state(scene, |s| s.attached = true);
    }

    fn detach(&self, scene: &SceneHandle) {
        self.with_state(scene, |s| s.attached = false);
    }

    fn set_visible(&self, scene: &SceneHandle, visible: bool) {
        self.with_state(scene, |s| s.visible = visible);
    }

    fn set_dimmed(&self, scene: &SceneHandle, dimmed: bool) {
        self.with_state(scene, |s| s.dimmed = dimmed);
    }

    fn set_processing(&self, scene: &SceneHandle, mode: ProcessMode) {
        self.with_state(scene, |s| s.process = mode);
    }

    fn processing(&self, scene: &SceneHandle) -> ProcessMode {
        self.with_state(scene, |s| s.process)
    }

    fn set_current(&self, scene: &SceneHandle) {
        let mut inner = self.inner.lock().expect("mock host lock poisoned");
        inner
            .states
            .entry(key(scene))
            .or_insert_with(|| (scene.clone(), InstanceState::default()));
        inner.current = Some(scene.clone());
    }

    fn current(&self) -> Option<SceneHandle> {
        let inner = self.inner.lock().expect("mock host lock poisoned");
        inner.current.clone()
    }
}

/// 最简场景实例，只有名字
#[derive(Debug)]
pub struct StubScene {
    name: String,
}

impl StubScene {
    pub fn new(name: impl Into<String>) -> SceneHandle {
        Arc::new(Self { name: name.into() })
    }
}

impl SceneNode for StubScene {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 带 before_enter 挂钩的测试场景：可注入延迟与失败，并记录收到的参数
#[derive(Debug)]
pub struct HookScene {
    name: String,
    delay: Duration,
    fail: bool,
    seen_args: Mutex<Option<Vec<Value>>>,
    calls: AtomicUsize,
}

impl HookScene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delay: Duration::ZERO,
            fail: false,
            seen_args: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(name: impl Into<String>, delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            ..Self::new(name)
        }
    }

    pub fn failing(name: impl Into<String>) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    /// 挂钩收到的参数（未被调用时为 None）
    pub fn seen_args(&self) -> Option<Vec<Value>> {
        self.seen_args.lock().expect("hook scene lock poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SceneNode for HookScene {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn before_enter(&self, args: &[Value]) -> anyhow::Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_args.lock().expect("hook scene lock poisoned") = Some(args.to_vec());
        if self.fail {
            anyhow::bail!("hook scene [{}] rejected entry", self.name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_host_tracks_instance_state() {
        let host = MockStageHost::new();
        let scene = StubScene::new("menu");
        host.boot(&scene);

        let state = host.state_of(&scene).unwrap();
        assert!(state.attached);
        assert!(state.visible);
        assert!(!state.destroyed);
        assert!(host.current().is_some());

        host.set_visible(&scene, false);
        host.set_processing(&scene, ProcessMode::Disabled);
        let state = host.state_of(&scene).unwrap();
        assert!(!state.visible);
        assert_eq!(state.process, ProcessMode::Disabled);
    }

    #[tokio::test]
    async fn test_mock_host_destroy_clears_current() {
        let host = MockStageHost::new();
        let scene = StubScene::new("menu");
        host.boot(&scene);

        host.destroy(&scene).await.unwrap();
        assert!(host.current().is_none());
        assert!(host.state_of(&scene).unwrap().destroyed);
        assert_eq!(host.destroyed_count(), 1);
    }

    #[tokio::test]
    async fn test_hook_scene_records_args_and_fails_on_demand() {
        let ok = HookScene::new("dialog");
        ok.before_enter(&[Value::from(7)]).await.unwrap();
        assert_eq!(ok.seen_args().unwrap(), vec![Value::from(7)]);
        assert_eq!(ok.call_count(), 1);

        let bad = HookScene::failing("dialog");
        assert!(bad.before_enter(&[]).await.is_err());
    }
}
