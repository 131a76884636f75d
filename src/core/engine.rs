use crate::core::comparator::FileComparator;
use crate::core::dependency::DependencyReplicator;
use crate::core::manifest::{ParsedManifest, SyncRecord};
use crate::core::report::{FailureScope, FileRole, SyncOutcome, SyncReport, SyncReportBuilder};
use crate::core::transfer::{FileTransfer, TransferSnapshot};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// 同步配置
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// 二进制文件更新后是否复制同目录的依赖文件
    pub replicate_dependencies: bool,
    /// 依赖文件扩展名，为空时使用二进制文件自身的扩展名
    pub dependency_extension: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            replicate_dependencies: true,
            dependency_extension: None,
        }
    }
}

/// 单条记录的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub descriptor: SyncOutcome,
    pub binary: SyncOutcome,
}

/// 同步引擎
///
/// 按清单顺序逐条处理记录；每条记录先处理描述文件再处理二进制文件。
/// 任何单个文件的失败都只影响它自己。
pub struct SyncEngine {
    config: SyncConfig,
    comparator: FileComparator,
    transfer: FileTransfer,
}

impl SyncEngine {
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    pub fn with_config(config: SyncConfig) -> Self {
        Self {
            config,
            comparator: FileComparator::new(),
            transfer: FileTransfer::new(),
        }
    }

    /// 运行一次同步，包括清单中被跳过的行
    pub fn run_manifest(&self, manifest: &ParsedManifest) -> SyncReport {
        self.run_with(&manifest.records, |builder| {
            builder.record_skipped_rows(&manifest.skipped)
        })
    }

    /// 运行一次同步
    pub fn run(&self, records: &[SyncRecord]) -> SyncReport {
        self.run_with(records, |_| {})
    }

    fn run_with(
        &self,
        records: &[SyncRecord],
        prepare: impl FnOnce(&mut SyncReportBuilder),
    ) -> SyncReport {
        let start_time = chrono::Utc::now().timestamp();
        let before = self.transfer.stats();
        let mut builder = SyncReportBuilder::new(start_time);
        prepare(&mut builder);

        info!("开始同步: {} 条记录", records.len());

        for record in records {
            self.sync_record(record, &mut builder);
        }

        let after = self.transfer.stats();
        let delta = TransferSnapshot {
            files_written: after.files_written - before.files_written,
            bytes_transferred: after.bytes_transferred - before.bytes_transferred,
        };
        let report = builder.finish(chrono::Utc::now().timestamp(), delta);

        info!(
            "同步完成: 新描述文件 {}, 更新描述文件 {}, 新二进制 {}, 更新二进制 {}, 失败 {}",
            report.new_descriptors,
            report.updated_descriptors,
            report.new_binaries,
            report.updated_binaries,
            report.failures.len()
        );

        report
    }

    /// 处理单条记录
    pub fn sync_record(&self, record: &SyncRecord, builder: &mut SyncReportBuilder) -> RecordOutcome {
        builder.record_processed();

        let descriptor = self.sync_role(
            FileRole::Descriptor,
            &record.local_descriptor,
            &record.remote_descriptor,
        );
        builder.record_outcome(FileRole::Descriptor, &record.local_descriptor, &descriptor);

        let binary = self.sync_role(FileRole::Binary, &record.local_binary, &record.remote_binary);
        builder.record_outcome(FileRole::Binary, &record.local_binary, &binary);

        if binary.is_change() && self.config.replicate_dependencies {
            self.replicate_dependencies(record, builder);
        }

        RecordOutcome { descriptor, binary }
    }

    /// 对单个角色执行“先判断，后执行”
    fn sync_role(&self, role: FileRole, local: &Path, remote: &Path) -> SyncOutcome {
        let result = self
            .comparator
            .decide(local, remote)
            .and_then(|decision| self.transfer.execute(decision, remote, local));

        match result {
            Ok(outcome) => {
                let name = local.file_name().unwrap_or_default().to_string_lossy();
                match outcome {
                    SyncOutcome::Created => info!("新{}: {}", role_label(role), name),
                    SyncOutcome::Updated => info!("更新{}: {}", role_label(role), name),
                    _ => debug!("{}未变化: {}", role_label(role), name),
                }
                outcome
            }
            Err(e) => {
                error!("同步{}失败: {} - {}", role_label(role), local.display(), e);
                SyncOutcome::Failed(e.to_string())
            }
        }
    }

    fn replicate_dependencies(&self, record: &SyncRecord, builder: &mut SyncReportBuilder) {
        let replicator = DependencyReplicator::new(&self.comparator, &self.transfer)
            .with_extension(self.config.dependency_extension.as_deref());

        match replicator.replicate_siblings(&record.remote_binary, &record.local_binary) {
            Ok(results) => {
                for sibling in results {
                    builder.record_dependency(&sibling.local, &sibling.outcome);
                }
            }
            Err(e) => {
                warn!("复制依赖文件失败: {} - {}", record.remote_binary.display(), e);
                builder.record_failure(&record.remote_binary, FailureScope::Dependency, &e.to_string());
            }
        }
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn role_label(role: FileRole) -> &'static str {
    match role {
        FileRole::Descriptor => "描述文件",
        FileRole::Binary => "二进制文件",
    }
}
