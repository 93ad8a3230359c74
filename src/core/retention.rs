//! 退出策略：被换下场景实例的处置与恢复
//!
//! 策略在退出阶段应用，在条目回到栈顶时镜像恢复。处理模式的捕获必须在
//! 改写之前读取，恢复才是逐字的。只有 Delete 需要等待宿主确认，其余
//! 都是同步状态翻转。

use serde::Serialize;

use crate::core::error::StageError;
use crate::host::{ProcessMode, SceneHandle, StageHost};

/// 对被换下场景实例的处置策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ExitStrategy {
    /// 从展示树移除并销毁，默认值。与带返回通道的 push 搭配会记录警告：
    /// 被销毁的实例在返回时只能整场重载。
    #[default]
    Delete,
    /// 从展示树摘除但不销毁，返回时重新挂接，内部状态原样保留
    Detach,
    /// 留在树中但不可见
    Hide,
    /// 留在树中但停止处理，先捕获当前处理模式
    Disable,
    /// Hide 与 Disable 的组合
    HideAndDisable,
    /// 压上置灰遮罩，处理继续，只是不再是当前场景
    Tint,
    /// 置灰且停止处理
    DisableAndTint,
    /// 不做任何处置，仅当前场景指针改变
    Nothing,
}

impl ExitStrategy {
    /// 是否保留被换下的实例（Delete 之外都保留）
    pub fn preserves_instance(&self) -> bool {
        !matches!(self, ExitStrategy::Delete)
    }

    /// 是否停止处理（这些策略需要捕获处理模式）
    pub fn disables_processing(&self) -> bool {
        matches!(
            self,
            ExitStrategy::Disable | ExitStrategy::HideAndDisable | ExitStrategy::DisableAndTint
        )
    }
}

/// 禁用处理的策略在改写之前捕获当前处理模式
pub(crate) fn capture_process(
    host: &dyn StageHost,
    scene: &SceneHandle,
    strategy: ExitStrategy,
) -> Option<ProcessMode> {
    if strategy.disables_processing() {
        Some(host.processing(scene))
    } else {
        None
    }
}

/// 按策略处置被换下的实例
pub(crate) async fn apply_exit(
    host: &dyn StageHost,
    scene: &SceneHandle,
    strategy: ExitStrategy,
) -> Result<(), StageError> {
    match strategy {
        ExitStrategy::Delete => {
            host.destroy(scene)
                .await
                .map_err(|e| StageError::Host(format!("destroy failed: {e}")))?;
        }
        ExitStrategy::Detach => host.detach(scene),
        ExitStrategy::Hide => host.set_visible(scene, false),
        ExitStrategy::Disable => host.set_processing(scene, ProcessMode::Disabled),
        ExitStrategy::HideAndDisable => {
            host.set_visible(scene, false);
            host.set_processing(scene, ProcessMode::Disabled);
        }
        ExitStrategy::Tint => host.set_dimmed(scene, true),
        ExitStrategy::DisableAndTint => {
            host.set_dimmed(scene, true);
            host.set_processing(scene, ProcessMode::Disabled);
        }
        ExitStrategy::Nothing => {}
    }
    Ok(())
}

/// 条目回到栈顶时，把保留的实例设回当前场景并镜像撤销退出时的处置
pub(crate) fn restore(
    host: &dyn StageHost,
    scene: &SceneHandle,
    strategy: ExitStrategy,
    captured: Option<ProcessMode>,
) {
    host.set_current(scene);
    match strategy {
        // Delete 不保留实例，这里不可达，留空以保持穷举
        ExitStrategy::Delete => {}
        ExitStrategy::Detach => host.attach(scene),
        ExitStrategy::Hide => host.set_visible(scene, true),
        ExitStrategy::Disable => host.set_processing(scene, captured.unwrap_or_default()),
        ExitStrategy::HideAndDisable => {
            host.set_visible(scene, true);
            host.set_processing(scene, captured.unwrap_or_default());
        }
        ExitStrategy::Tint => host.set_dimmed(scene, false),
        ExitStrategy::DisableAndTint => {
            host.set_dimmed(scene, false);
            host.set_processing(scene, captured.unwrap_or_default());
        }
        ExitStrategy::Nothing => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::{MockStageHost, StubScene};

    #[tokio::test]
    async fn test_delete_waits_for_destroy() {
        let host = MockStageHost::new();
        let scene = StubScene::new("menu");
        host.boot(&scene);

        apply_exit(&host, &scene, ExitStrategy::Delete).await.unwrap();
        assert!(host.state_of(&scene).unwrap().destroyed);
    }

    #[tokio::test]
    async fn test_hide_and_disable_round_trip() {
        let host = MockStageHost::new();
        let scene = StubScene::new("menu");
        host.boot(&scene);
        host.set_processing(&scene, ProcessMode::Always);

        let captured = capture_process(&host, &scene, ExitStrategy::HideAndDisable);
        assert_eq!(captured, Some(ProcessMode::Always));

        apply_exit(&host, &scene, ExitStrategy::HideAndDisable).await.unwrap();
        let state = host.state_of(&scene).unwrap();
        assert!(!state.visible);
        assert_eq!(state.process, ProcessMode::Disabled);

        restore(&host, &scene, ExitStrategy::HideAndDisable, captured);
        let state = host.state_of(&scene).unwrap();
        assert!(state.visible);
        // 恢复写回捕获值而不是默认值
        assert_eq!(state.process, ProcessMode::Always);
    }

    #[tokio::test]
    async fn test_tint_round_trip() {
        let host = MockStageHost::new();
        let scene = StubScene::new("menu");
        host.boot(&scene);

        assert_eq!(capture_process(&host, &scene, ExitStrategy::Tint), None);
        apply_exit(&host, &scene, ExitStrategy::Tint).await.unwrap();
        assert!(host.state_of(&scene).unwrap().dimmed);

        restore(&host, &scene, ExitStrategy::Tint, None);
        let state = host.state_of(&scene).unwrap();
        assert!(!state.dimmed);
    }

    #[tokio::test]
    async fn test_detach_round_trip() {
        let host = MockStageHost::new();
        let scene = StubScene::new("menu");
        host.boot(&scene);

        apply_exit(&host, &scene, ExitStrategy::Detach).await.unwrap();
        assert!(!host.state_of(&scene).unwrap().attached);
        assert!(!host.state_of(&scene).unwrap().destroyed);

        restore(&host, &scene, ExitStrategy::Detach, None);
        assert!(host.state_of(&scene).unwrap().attached);
    }

    #[tokio::test]
    async fn test_nothing_leaves_instance_untouched() {
        let host = MockStageHost::new();
        let scene = StubScene::new("menu");
        host.boot(&scene);
        let before = host.state_of(&scene).unwrap();

        apply_exit(&host, &scene, ExitStrategy::Nothing).await.unwrap();
        assert_eq!(host.state_of(&scene).unwrap(), before);
    }

    #[tokio::test]
    async fn test_restore_sets_current() {
        let host = MockStageHost::new();
        let old = StubScene::new("menu");
        let new = StubScene::new("settings");
        host.boot(&old);
        apply_exit(&host, &old, ExitStrategy::Hide).await.unwrap();
        host.attach(&new);
        host.set_current(&new);

        restore(&host, &old, ExitStrategy::Hide, None);
        assert_eq!(host.current().map(|s| s.name().to_string()), Some("menu".into()));
    }
}
