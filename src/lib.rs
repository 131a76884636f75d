use std::path::PathBuf;

pub mod commands;
pub mod config;
pub mod core;
pub mod gate;
pub mod logging;

pub use config::SyncSettings;
pub use core::{SyncConfig, SyncEngine, SyncRecord, SyncReport};
pub use gate::{DailyGate, GateStatus};

/// 应用状态，在各个命令之间共享
#[derive(Debug, Clone)]
pub struct AppState {
    /// 配置目录（config.json、清单、标记文件、日志）
    pub config_dir: PathBuf,
    pub settings: SyncSettings,
}

impl AppState {
    pub fn new() -> anyhow::Result<Self> {
        // 获取默认应用配置目录
        let default_config_dir = dirs::config_dir()
            .map(|p| p.join("addinsync"))
            .unwrap_or_else(|| PathBuf::from(".addinsync"));

        std::fs::create_dir_all(&default_config_dir)?;

        // 尝试读取自定义数据路径
        let config_file = default_config_dir.join(config::CONFIG_FILE_NAME);
        let config_dir = std::fs::read_to_string(&config_file)
            .ok()
            .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok())
            .and_then(|config| config.get("data_path")?.as_str().map(PathBuf::from))
            .filter(|p| p.exists() && p.is_dir())
            .inspect(|p| tracing::debug!("使用自定义数据路径: {:?}", p))
            .unwrap_or(default_config_dir);

        Ok(Self::with_config_dir(config_dir))
    }

    /// 使用指定配置目录（测试或便携模式）
    pub fn with_config_dir(config_dir: PathBuf) -> Self {
        let settings = SyncSettings::load(&config_dir);
        Self {
            config_dir,
            settings,
        }
    }

    pub fn gate(&self) -> DailyGate {
        DailyGate::new(&self.config_dir)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.settings.manifest_path(&self.config_dir)
    }
}
