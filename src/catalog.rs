//! 场景目录：符号名到可加载路径的映射
//!
//! 调用方永远以符号名发起导航，路径解析只发生在这里。表在启动时从配置
//! 读取一次，运行期只读，因此不需要锁。主场景名是历史栈哨兵条目的来源。

use std::collections::HashMap;

use crate::config::StageConfig;
use crate::core::error::StageError;

#[derive(Debug, Clone)]
pub struct SceneCatalog {
    table: HashMap<String, String>,
    main_scene: String,
}

impl SceneCatalog {
    pub fn new(table: HashMap<String, String>, main_scene: impl Into<String>) -> Self {
        Self {
            table,
            main_scene: main_scene.into(),
        }
    }

    pub fn from_config(cfg: &StageConfig) -> Self {
        Self::new(cfg.scenes.clone(), cfg.stage.main_scene.clone())
    }

    /// 解析符号名，未注册时返回 SceneNotFound
    pub fn resolve(&self, name: &str) -> Result<&str, StageError> {
        self.table
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| StageError::SceneNotFound(format!("not registered in scene table: {name}")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn main_scene_name(&self) -> &str {
        &self.main_scene
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
