//! 场景栈错误类型
//!
//! 转场协议的每个阶段返回类型化 Result，回滚由调用方在非成功结果上显式执行，
//! 不依赖栈展开语义。Replaced / PoppedWithoutValue / Terminated 是合成失败，
//! 仅用于解析挂起的返回通道，保证等待方永不悬挂。

use thiserror::Error;

/// 场景导航与转场过程中可能出现的错误
///
/// 派生 Clone：同一个失败可能既要解析返回通道、又要向调用方传播。
#[derive(Error, Debug, Clone)]
pub enum StageError {
    /// 场景名未注册，或解析出的路径在存储中不存在（fail-fast，未改动任何状态）
    #[error("scene not found: {0}")]
    SceneNotFound(String),

    /// 单飞约束：已有转场在飞行中
    #[error("a scene transition is already in progress")]
    TransitionInProgress,

    /// 实例化出的场景不满足调用方声明的类型预期（实例已在报错前销毁）
    #[error("scene [{name}] does not match expected type {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
    },

    /// 模板加载或实例化失败（栈已回滚）
    #[error("scene load failed: {0}")]
    Load(String),

    /// 历史栈为空（退出之后的 pop 会重新触发退出并返回此错误）
    #[error("scene stack is empty")]
    EmptyStack,

    /// 持有返回通道的条目被替换
    #[error("scene was replaced before returning a value")]
    Replaced,

    /// 条目被弹出但未携带返回值
    #[error("scene was popped without a return value")]
    PoppedWithoutValue,

    /// 应用退出时条目仍在栈上，返回通道随栈一起解析
    #[error("scene stack was torn down before a value was returned")]
    Terminated,

    /// Checkpoint 观察者返回错误，转场中止
    #[error("checkpoint observer rejected the transition: {0}")]
    Observer(String),

    /// 场景实例的 before_enter 挂钩失败
    #[error("before-enter hook failed: {0}")]
    Hook(String),

    /// 展示宿主操作失败（销毁等）
    #[error("presentation host failure: {0}")]
    Host(String),
}
