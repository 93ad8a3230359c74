//! 转场检查点：五个生命周期通知点
//!
//! 一对多同步通知，无重试。观察者返回 Err 直接中止转场，由引擎负责回滚。
//! 发射前先快照处理器列表，调用时不持锁，因此观察者可以在回调里重入地
//! 订阅新处理器或挂起转场。

use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::core::error::StageError;
use crate::host::SceneHandle;

/// 检查点种类，订阅时用于过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointKind {
    BeforeExit,
    AfterExit,
    LoadProgress,
    BeforeEnter,
    AfterEnter,
}

/// 检查点载荷
///
/// LoadProgress 不参与暂停门，其余四个发射后引擎会停在暂停门上直到
/// resume（若有观察者挂起了转场）。
#[derive(Clone)]
pub enum Checkpoint {
    /// 即将按退出策略处置当前场景，scene 为空表示宿主尚无当前场景
    BeforeExit { scene: Option<SceneHandle> },
    /// 退出处置完成（Delete 已等到销毁确认）
    AfterExit,
    /// 模板加载进度
    LoadProgress {
        percent: u8,
        to_scene: String,
        from_scene: String,
    },
    /// 新实例已就绪但尚未挂接，随后执行实例的 before_enter 挂钩
    BeforeEnter {
        scene_name: String,
        scene: SceneHandle,
        args: Vec<Value>,
    },
    /// 新实例已挂接并成为当前场景
    AfterEnter {
        scene_name: String,
        scene: SceneHandle,
        args: Vec<Value>,
    },
}

impl Checkpoint {
    pub fn kind(&self) -> CheckpointKind {
        match self {
            Checkpoint::BeforeExit { .. } => CheckpointKind::BeforeExit,
            Checkpoint::AfterExit => CheckpointKind::AfterExit,
            Checkpoint::LoadProgress { .. } => CheckpointKind::LoadProgress,
            Checkpoint::BeforeEnter { .. } => CheckpointKind::BeforeEnter,
            Checkpoint::AfterEnter { .. } => CheckpointKind::AfterEnter,
        }
    }
}

/// 观察者回调，返回 Err 则转场以 Observer 错误中止
pub type CheckpointHandler = Arc<dyn Fn(&Checkpoint) -> anyhow::Result<()> + Send + Sync>;

/// 检查点总线
#[derive(Default)]
pub struct CheckpointBus {
    handlers: RwLock<Vec<(CheckpointKind, CheckpointHandler)>>,
}

impl CheckpointBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: CheckpointKind, handler: F)
    where
        F: Fn(&Checkpoint) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .expect("checkpoint bus lock poisoned")
            .push((kind, Arc::new(handler)));
    }

    /// 依订阅顺序同步通知，首个 Err 短路
    pub fn emit(&self, checkpoint: &Checkpoint) -> Result<(), StageError> {
        let interested: Vec<CheckpointHandler> = {
            let handlers = self.handlers.read().expect("checkpoint bus lock poisoned");
            handlers
                .iter()
                .filter(|(kind, _)| *kind == checkpoint.kind())
                .map(|(_, h)| h.clone())
                .collect()
        };
        for handler in interested {
            handler(checkpoint).map_err(|e| StageError::Observer(e.to_string()))?;
        }
        Ok(())
    }

    pub fn observer_count(&self, kind: CheckpointKind) -> usize {
        self.handlers
            .read()
            .expect("checkpoint bus lock poisoned")
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_only_reaches_matching_kind() {
        let bus = CheckpointBus::new();
        let exits = Arc::new(AtomicUsize::new(0));
        let enters = Arc::new(AtomicUsize::new(0));

        let counter = exits.clone();
        bus.subscribe(CheckpointKind::AfterExit, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let counter = enters.clone();
        bus.subscribe(CheckpointKind::AfterEnter, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        bus.emit(&Checkpoint::AfterExit).unwrap();
        bus.emit(&Checkpoint::AfterExit).unwrap();
        assert_eq!(exits.load(Ordering::SeqCst), 2);
        assert_eq!(enters.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_observer_error_short_circuits() {
        let bus = CheckpointBus::new();
        let reached = Arc::new(AtomicUsize::new(0));

        bus.subscribe(CheckpointKind::AfterExit, |_| anyhow::bail!("refused"));
        let counter = reached.clone();
        bus.subscribe(CheckpointKind::AfterExit, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let err = bus.emit(&Checkpoint::AfterExit).unwrap_err();
        assert!(matches!(err, StageError::Observer(_)));
        // 后续处理器不再被调用
        assert_eq!(reached.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reentrant_subscribe_inside_handler_does_not_deadlock() {
        let bus = Arc::new(CheckpointBus::new());
        let inner = bus.clone();
        bus.subscribe(CheckpointKind::AfterExit, move |_| {
            inner.subscribe(CheckpointKind::AfterEnter, |_| Ok(()));
            Ok(())
        });

        bus.emit(&Checkpoint::AfterExit).unwrap();
        assert_eq!(bus.observer_count(CheckpointKind::AfterEnter), 1);
    }
}
