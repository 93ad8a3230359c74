//! Stagehand - 场景栈编排器
//!
//! 模块划分：
//! - **catalog**: 场景目录（符号名 → 可加载路径，启动时读取一次）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误、历史栈、检查点、退出策略、转场引擎、退出控制
//! - **host**: 展示宿主契约（实例 / 模板 / 处理模式）与 Mock 宿主
//! - **loader**: 模板源契约、重试包装与 Mock 源
//! - **observability**: tracing 订阅器初始化

pub mod catalog;
pub mod config;
pub mod core;
pub mod host;
pub mod loader;
pub mod observability;

pub use catalog::SceneCatalog;
pub use config::{load_config, StageConfig};
pub use core::{
    ChangeOptions, Checkpoint, CheckpointKind, EntryId, EntryInfo, ExitStrategy, QuitController,
    QuitReason, ReturnTicket, SceneDirector, StageError, TypeExpectation,
};
pub use host::{ProcessMode, SceneHandle, SceneNode, SceneTemplate, StageHost};
pub use loader::{RetrySource, TemplateSource};
