//! 展示宿主抽象
//!
//! 场景图的真正持有者在引擎外部。编排器不接触任何渲染细节，只通过
//! StageHost 契约操作实例：销毁（异步，必须等确认）、挂接/摘除、
//! 可见性、置灰、处理模式与当前场景指针。除 destroy 外都是同步状态翻转。

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

/// 场景实例句柄，宿主树与历史栈共享所有权
pub type SceneHandle = Arc<dyn SceneNode>;

/// 实例处理模式（宿主侧词汇表）
///
/// 禁用处理的退出策略先捕获当前值，恢复时逐字写回。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessMode {
    #[default]
    Inherit,
    Pausable,
    WhenPaused,
    Always,
    Disabled,
}

/// 场景实例契约
///
/// before_enter 是可选能力：默认实现直接成功，需要初始化参数的场景
/// 覆盖它即可，引擎无需运行时探测。
#[async_trait]
pub trait SceneNode: fmt::Debug + Send + Sync + 'static {
    /// 实例名，日志与诊断用
    fn name(&self) -> &str;

    /// 类型预期检查的入口（见 TypeExpectation）
    fn as_any(&self) -> &dyn Any;

    /// 实例挂接到展示树之前调用，参数来自发起转场的调用方。
    /// 返回 Err 将中止转场，栈回滚后错误向调用方传播。
    async fn before_enter(&self, _args: &[Value]) -> anyhow::Result<()> {
        Ok(())
    }
}

/// 可实例化的场景模板（模板源的加载产物）
pub trait SceneTemplate: Send + Sync {
    /// 模板对应的场景类型名，诊断用
    fn type_name(&self) -> &str;

    /// 实例化一个新的场景实例
    fn instantiate(&self) -> anyhow::Result<SceneHandle>;
}

/// 展示宿主契约
///
/// destroy 必须在实例真正释放后才返回，编排器靠这一点保证
/// 退出阶段完成之前不会进入加载阶段。
#[async_trait]
pub trait StageHost: Send + Sync {
    /// 异步销毁一个实例，完成或失败之前编排器不会继续
    async fn destroy(&self, scene: &SceneHandle) -> anyhow::Result<()>;

    /// 挂接到展示树（不改变当前场景指针）
    fn attach(&self, scene: &SceneHandle);

    /// 从展示树摘除但不销毁
    fn detach(&self, scene: &SceneHandle);

    fn set_visible(&self, scene: &SceneHandle, visible: bool);

    /// 压上或撤掉置灰遮罩（Tint 类策略的视觉效果）
    fn set_dimmed(&self, scene: &SceneHandle, dimmed: bool);

    fn set_processing(&self, scene: &SceneHandle, mode: ProcessMode);

    /// 读取实例当前的处理模式，捕获必须发生在改写之前
    fn processing(&self, scene: &SceneHandle) -> ProcessMode;

    /// 将实例设为当前场景
    fn set_current(&self, scene: &SceneHandle);

    /// 当前场景，宿主启动早期可能为空
    fn current(&self) -> Option<SceneHandle>;
}
