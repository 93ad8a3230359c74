//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `STAGEHAND__*` 覆盖（双下划线表示嵌套，
//! 如 `STAGEHAND__STAGE__MAIN_SCENE=lobby`）。场景表在启动时读取一次，运行期只读。

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    #[serde(default)]
    pub stage: StageSection,
    #[serde(default)]
    pub loader: LoaderSection,
    /// [scenes] 段：符号名 → 可加载路径
    #[serde(default)]
    pub scenes: HashMap<String, String>,
}

/// [stage] 段：主场景与转场覆盖层
#[derive(Debug, Clone, Deserialize)]
pub struct StageSection {
    /// 哨兵条目对应的场景名，必须出现在 [scenes] 表里
    #[serde(default = "default_main_scene")]
    pub main_scene: String,
    /// 转场期间挂接的覆盖场景（加载画面），未设置则不启用
    pub transition_scene: Option<String>,
}

impl Default for StageSection {
    fn default() -> Self {
        Self {
            main_scene: default_main_scene(),
            transition_scene: None,
        }
    }
}

fn default_main_scene() -> String {
    "main".to_string()
}

/// [loader] 段：模板加载的重试预算
#[derive(Debug, Clone, Deserialize)]
pub struct LoaderSection {
    /// 总尝试次数，1 表示不重试
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for LoaderSection {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    200
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            stage: StageSection::default(),
            loader: LoaderSection::default(),
            scenes: HashMap::new(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 STAGEHAND__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 STAGEHAND__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<StageConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("STAGEHAND")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_any_source() {
        let cfg = StageConfig::default();
        assert_eq!(cfg.stage.main_scene, "main");
        assert!(cfg.stage.transition_scene.is_none());
        assert_eq!(cfg.loader.retry_attempts, 2);
        assert!(cfg.scenes.is_empty());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stage.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[stage]
main_scene = "lobby"
transition_scene = "scenes/loading.scn"

[loader]
retry_attempts = 3

[scenes]
lobby = "scenes/lobby.scn"
match = "scenes/match.scn"
"#
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.stage.main_scene, "lobby");
        assert_eq!(cfg.stage.transition_scene.as_deref(), Some("scenes/loading.scn"));
        assert_eq!(cfg.loader.retry_attempts, 3);
        assert_eq!(cfg.scenes.get("match").map(String::as_str), Some("scenes/match.scn"));
    }
}
