//! 可观测性
//!
//! 库代码只发射 tracing 事件，订阅器由宿主应用装配。这里是缺省装配，
//! RUST_LOG 可按模块覆盖级别。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 以 info 为默认级别初始化全局订阅器
pub fn init() {
    init_with_default_directive("info");
}

/// 自定义默认级别，RUST_LOG 仍然优先
pub fn init_with_default_directive(directive: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(
            directive.parse().unwrap_or_else(|_| "info".parse().expect("static directive")),
        ))
        .with(fmt::layer())
        .init();
}
