//! 展示宿主层：场景实例与宿主树的契约，以及测试用 Mock 宿主

pub mod mock;
pub mod traits;

pub use mock::{HookScene, InstanceState, MockStageHost, StubScene};
pub use traits::{ProcessMode, SceneHandle, SceneNode, SceneTemplate, StageHost};
