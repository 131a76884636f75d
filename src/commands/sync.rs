//! 同步命令 - 每日检查、加载清单、执行同步

use crate::core::manifest::{self, ParsedManifest};
use crate::core::{SyncEngine, SyncError, SyncReport};
use crate::gate::GateStatus;
use crate::AppState;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// 同步命令参数
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// 覆盖配置中的清单路径
    pub manifest: Option<PathBuf>,
    /// 忽略每日运行标记
    pub force: bool,
}

/// 同步命令结果
#[derive(Debug, Clone)]
pub enum RunResult {
    /// 今天已运行过
    AlreadyRanToday,
    /// 清单不存在，已创建模板
    ManifestProvisioned(PathBuf),
    /// 同步完成
    Completed(SyncReport),
}

impl RunResult {
    /// 需要展示给用户的消息，无更新时返回 None
    pub fn notification(&self) -> Option<String> {
        match self {
            RunResult::AlreadyRanToday => None,
            RunResult::ManifestProvisioned(path) => Some(format!(
                "The manifest file has been created. Please populate it with the addins you want to manage.\n{}",
                path.display()
            )),
            RunResult::Completed(report) => report.notification(),
        }
    }
}

/// 执行同步
pub fn run_sync(state: &AppState, options: &RunOptions) -> Result<RunResult> {
    run_sync_at(state, options, Local::now())
}

pub fn run_sync_at(state: &AppState, options: &RunOptions, now: DateTime<Local>) -> Result<RunResult> {
    info!("===================== addinsync =====================");

    if !options.force && state.gate().check_and_mark(now) == GateStatus::AlreadyRanToday {
        return Ok(RunResult::AlreadyRanToday);
    }

    let manifest_path = options
        .manifest
        .clone()
        .unwrap_or_else(|| state.manifest_path());

    let parsed = match manifest::load(&manifest_path) {
        Ok(parsed) => parsed,
        Err(SyncError::ManifestMissing(path)) => {
            error!("清单文件不存在: {}", path.display());
            manifest::write_template(&path)
                .with_context(|| format!("创建清单模板失败: {}", path.display()))?;
            return Ok(RunResult::ManifestProvisioned(path));
        }
        Err(e) => return Err(e).context("加载清单失败"),
    };

    log_manifest(&parsed);

    let engine = SyncEngine::with_config(state.settings.engine_config());
    let report = engine.run_manifest(&parsed);

    if report.is_noop() {
        info!("没有插件被更新");
    }
    for failure in &report.failures {
        warn!("{:?} {}: {}", failure.scope, failure.path.display(), failure.message);
    }

    Ok(RunResult::Completed(report))
}

/// 把清单内容写入日志
fn log_manifest(parsed: &ParsedManifest) {
    info!("清单中的插件:");
    for r in &parsed.records {
        info!(
            "Local Addin File: {},Local DLL File: {},Server Addin File: {},Server DLL File: {}",
            r.local_descriptor.display(),
            r.local_binary.display(),
            r.remote_descriptor.display(),
            r.remote_binary.display()
        );
    }
    for row in &parsed.skipped {
        warn!("跳过第 {} 行: {} ({})", row.line, row.content, row.reason);
    }
}
