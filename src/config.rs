//! 应用配置模块
//!
//! 所有配置保存在配置目录下的 `config.json` 中，每个模块占用一个独立的节。

use crate::core::SyncConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_MANIFEST_NAME: &str = "addins.csv";

/// 读取配置文件中的某一节，不存在或格式错误时返回 None
pub fn load_section<T: DeserializeOwned>(config_dir: &Path, section: &str) -> Option<T> {
    let content = fs::read_to_string(config_dir.join(CONFIG_FILE_NAME)).ok()?;
    let config: serde_json::Value = serde_json::from_str(&content).ok()?;
    serde_json::from_value(config.get(section)?.clone()).ok()
}

/// 写入配置文件中的某一节，保留其他节
pub fn save_section<T: Serialize>(config_dir: &Path, section: &str, value: &T) -> io::Result<()> {
    let config_file = config_dir.join(CONFIG_FILE_NAME);

    // 读取现有配置
    let mut config: serde_json::Value = if config_file.exists() {
        let content = fs::read_to_string(&config_file)?;
        serde_json::from_str(&content).unwrap_or_else(|_| serde_json::json!({}))
    } else {
        serde_json::json!({})
    };
    if !config.is_object() {
        config = serde_json::json!({});
    }

    config[section] = serde_json::to_value(value)?;

    fs::create_dir_all(config_dir)?;
    fs::write(&config_file, serde_json::to_string_pretty(&config)?)
}

/// 同步配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    /// 清单文件路径，未设置时使用配置目录下的 addins.csv
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<PathBuf>,
    /// 二进制文件更新后是否复制依赖文件
    #[serde(default = "default_replicate")]
    pub replicate_dependencies: bool,
    /// 依赖文件扩展名（覆盖从二进制文件推导的扩展名）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_extension: Option<String>,
}

fn default_replicate() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            manifest_path: None,
            replicate_dependencies: default_replicate(),
            dependency_extension: None,
        }
    }
}

impl SyncSettings {
    /// 从配置文件加载同步配置
    pub fn load(config_dir: &Path) -> Self {
        load_section(config_dir, "sync").unwrap_or_default()
    }

    /// 保存同步配置
    pub fn save(&self, config_dir: &Path) -> io::Result<()> {
        save_section(config_dir, "sync", self)
    }

    /// 实际使用的清单路径
    pub fn manifest_path(&self, config_dir: &Path) -> PathBuf {
        self.manifest_path
            .clone()
            .unwrap_or_else(|| config_dir.join(DEFAULT_MANIFEST_NAME))
    }

    pub fn engine_config(&self) -> SyncConfig {
        SyncConfig {
            replicate_dependencies: self.replicate_dependencies,
            dependency_extension: self.dependency_extension.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_missing_or_broken() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SyncSettings::load(dir.path());
        assert!(settings.replicate_dependencies);
        assert_eq!(
            settings.manifest_path(dir.path()),
            dir.path().join(DEFAULT_MANIFEST_NAME)
        );

        fs::write(dir.path().join(CONFIG_FILE_NAME), "{ not json").unwrap();
        assert!(SyncSettings::load(dir.path()).manifest_path.is_none());
    }

    #[test]
    fn test_save_keeps_other_sections() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{"data_path": "/elsewhere", "log": {"level": "debug"}}"#,
        )
        .unwrap();

        let settings = SyncSettings {
            manifest_path: Some(PathBuf::from("/share/addins.csv")),
            replicate_dependencies: false,
            dependency_extension: Some("so".into()),
        };
        settings.save(dir.path()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(CONFIG_FILE_NAME)).unwrap()).unwrap();
        assert_eq!(raw["data_path"], "/elsewhere");
        assert_eq!(raw["log"]["level"], "debug");
        assert_eq!(raw["sync"]["manifestPath"], "/share/addins.csv");

        let loaded = SyncSettings::load(dir.path());
        assert!(!loaded.replicate_dependencies);
        assert_eq!(loaded.engine_config().dependency_extension.as_deref(), Some("so"));
    }
}
