//! 同步报告

use super::manifest::SkippedRow;
use super::transfer::TransferSnapshot;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// 每条记录跟踪的文件角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    /// 插件描述文件（.addin）
    Descriptor,
    /// 插件二进制文件（.dll）
    Binary,
}

/// 单个文件的同步结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum SyncOutcome {
    Unchanged,
    Created,
    Updated,
    Failed(String),
}

impl SyncOutcome {
    /// 是否写入了文件
    pub fn is_change(&self) -> bool {
        matches!(self, SyncOutcome::Created | SyncOutcome::Updated)
    }
}

/// 失败发生的范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureScope {
    Descriptor,
    Binary,
    Dependency,
}

impl From<FileRole> for FailureScope {
    fn from(role: FileRole) -> Self {
        match role {
            FileRole::Descriptor => FailureScope::Descriptor,
            FileRole::Binary => FailureScope::Binary,
        }
    }
}

/// 被捕获的失败
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
    pub path: PathBuf,
    pub scope: FailureScope,
    pub message: String,
}

/// 同步报告
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub start_time: i64,
    pub end_time: i64,
    pub records_processed: u32,
    pub new_descriptors: u32,
    pub updated_descriptors: u32,
    pub new_binaries: u32,
    pub updated_binaries: u32,
    /// 新建或更新的二进制文件名，按处理顺序
    pub updated_names: Vec<String>,
    pub dependencies_copied: u32,
    pub dependencies_updated: u32,
    pub files_written: u64,
    pub bytes_transferred: u64,
    pub failures: Vec<SyncFailure>,
    pub skipped_rows: Vec<SkippedRow>,
}

impl SyncReport {
    /// 没有任何插件被更新
    pub fn is_noop(&self) -> bool {
        self.updated_names.is_empty()
    }

    /// 面向用户的通知文本，无更新时返回 None
    pub fn notification(&self) -> Option<String> {
        if self.is_noop() {
            return None;
        }
        Some(format!(
            "The following addins have been updated: {}",
            self.updated_names.join(", ")
        ))
    }
}

/// 报告构建器，在一次同步过程中逐条累积结果
#[derive(Debug, Default)]
pub struct SyncReportBuilder {
    report: SyncReport,
}

impl SyncReportBuilder {
    pub fn new(start_time: i64) -> Self {
        Self {
            report: SyncReport {
                start_time,
                ..Default::default()
            },
        }
    }

    pub fn record_processed(&mut self) {
        self.report.records_processed += 1;
    }

    /// 记录一个角色的结果
    ///
    /// 只有二进制文件的新建或更新会被写入更新名单。
    pub fn record_outcome(&mut self, role: FileRole, local: &Path, outcome: &SyncOutcome) {
        let r = &mut self.report;
        match (role, outcome) {
            (FileRole::Descriptor, SyncOutcome::Created) => r.new_descriptors += 1,
            (FileRole::Descriptor, SyncOutcome::Updated) => r.updated_descriptors += 1,
            (FileRole::Binary, SyncOutcome::Created) => r.new_binaries += 1,
            (FileRole::Binary, SyncOutcome::Updated) => r.updated_binaries += 1,
            (_, SyncOutcome::Failed(message)) => {
                r.failures.push(SyncFailure {
                    path: local.to_path_buf(),
                    scope: role.into(),
                    message: message.clone(),
                });
            }
            (_, SyncOutcome::Unchanged) => {}
        }

        if role == FileRole::Binary && outcome.is_change() {
            r.updated_names.push(display_name(local));
        }
    }

    /// 记录依赖文件复制结果
    pub fn record_dependency(&mut self, local: &Path, outcome: &SyncOutcome) {
        match outcome {
            SyncOutcome::Created => self.report.dependencies_copied += 1,
            SyncOutcome::Updated => self.report.dependencies_updated += 1,
            SyncOutcome::Failed(message) => self.record_failure(local, FailureScope::Dependency, message),
            SyncOutcome::Unchanged => {}
        }
    }

    pub fn record_failure(&mut self, path: &Path, scope: FailureScope, message: &str) {
        self.report.failures.push(SyncFailure {
            path: path.to_path_buf(),
            scope,
            message: message.to_string(),
        });
    }

    pub fn record_skipped_rows(&mut self, rows: &[SkippedRow]) {
        self.report.skipped_rows.extend_from_slice(rows);
    }

    /// 生成最终报告
    pub fn finish(mut self, end_time: i64, transfer: TransferSnapshot) -> SyncReport {
        self.report.end_time = end_time;
        self.report.files_written = transfer.files_written;
        self.report.bytes_transferred = transfer.bytes_transferred;
        self.report
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
