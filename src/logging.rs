//! 日志模块 - 按天滚动的文件日志和保留数量管理

use crate::config::{load_section, save_section};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};

pub const LOG_FILE_PREFIX: &str = "addinsync";
pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    /// 是否启用日志记录
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 日志级别: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_level")]
    pub level: String,
    /// 保留的日志文件数（每天一个文件）
    #[serde(default = "default_retain_files")]
    pub retain_files: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

fn default_retain_files() -> usize {
    10 // 默认保留 10 天
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            level: default_level(),
            retain_files: default_retain_files(),
        }
    }
}

impl LogConfig {
    /// 从配置文件加载日志配置
    pub fn load(config_dir: &Path) -> Self {
        load_section(config_dir, "log").unwrap_or_default()
    }

    /// 保存日志配置
    pub fn save(&self, config_dir: &Path) -> io::Result<()> {
        save_section(config_dir, "log", self)
    }

    /// 将配置的日志级别转换为 tracing Level
    pub fn tracing_level(&self) -> tracing::Level {
        match self.level.to_lowercase().as_str() {
            "error" => tracing::Level::ERROR,
            "warn" => tracing::Level::WARN,
            "debug" => tracing::Level::DEBUG,
            "trace" => tracing::Level::TRACE,
            _ => tracing::Level::INFO,
        }
    }

    /// 设置日志级别，无效级别返回错误
    pub fn set_level(&mut self, level: &str) -> Result<(), String> {
        let level = level.to_lowercase();
        if LOG_LEVELS.contains(&level.as_str()) {
            self.level = level;
            Ok(())
        } else {
            Err(format!("无效的日志级别: {}", level))
        }
    }

    /// 设置保留文件数（限制范围 1-100）
    pub fn set_retain_files(&mut self, count: usize) {
        self.retain_files = count.clamp(1, 100);
    }
}

/// 创建按天滚动的日志写入器，超出保留数量的旧文件会被删除
pub fn file_appender(log_dir: &Path, config: &LogConfig) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(config.retain_files.max(1))
        .build(log_dir)
}

/// 日志目录
pub fn get_log_dir(config_dir: &Path) -> PathBuf {
    config_dir.join("logs")
}
