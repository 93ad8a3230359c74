//! 加载层：模板源契约、重试包装与测试用 Mock 源

pub mod mock;
pub mod retry;
pub mod traits;

pub use mock::{FactoryTemplate, MockSource, StubTemplate};
pub use retry::RetrySource;
pub use traits::TemplateSource;
