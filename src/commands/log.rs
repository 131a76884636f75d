//! 日志相关命令

use crate::logging::LogConfig;
use crate::AppState;
use anyhow::{anyhow, Context, Result};

/// 获取日志配置
pub fn get_log_config(state: &AppState) -> LogConfig {
    LogConfig::load(&state.config_dir)
}

/// 设置日志配置
pub fn set_log_config(
    state: &AppState,
    enabled: Option<bool>,
    level: Option<String>,
    retain_files: Option<usize>,
) -> Result<LogConfig> {
    let mut config = LogConfig::load(&state.config_dir);

    if let Some(e) = enabled {
        config.enabled = e;
    }
    if let Some(count) = retain_files {
        config.set_retain_files(count);
    }
    if let Some(l) = level {
        config.set_level(&l).map_err(|e| anyhow!(e))?;
    }

    config
        .save(&state.config_dir)
        .context("保存日志配置失败")?;

    Ok(config)
}
