//! 核心编排层：错误类型、历史栈、检查点、退出策略、转场引擎与退出控制

pub mod checkpoint;
pub mod director;
pub mod error;
pub mod history;
pub mod quit;
pub mod retention;

pub use checkpoint::{Checkpoint, CheckpointBus, CheckpointHandler, CheckpointKind};
pub use director::SceneDirector;
pub use error::StageError;
pub use history::{ChangeOptions, EntryId, EntryInfo, HistoryEntry, HistoryStack, ReturnTicket, TypeExpectation};
pub use quit::{QuitController, QuitReason};
pub use retention::ExitStrategy;
