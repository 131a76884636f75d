//! 依赖文件复制
//!
//! 插件二进制文件常常依赖同目录下的其他库文件。这些文件不在清单中单独列出，
//! 而是按扩展名从服务器目录中匹配，并使用与主文件相同的新旧规则复制到本地目录。

use super::comparator::FileComparator;
use super::error::{SyncError, SyncResult};
use super::report::SyncOutcome;
use super::transfer::{parent_dir, FileTransfer};
use regex::{Regex, RegexBuilder};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// 同级文件匹配规则（`*.<ext>`，忽略大小写）
#[derive(Debug, Clone)]
pub struct SiblingPattern {
    extension: String,
    regex: Regex,
}

impl SiblingPattern {
    pub fn for_extension(extension: &str) -> Option<Self> {
        let extension = extension.trim().trim_start_matches("*.").trim_start_matches('.');
        if extension.is_empty() {
            return None;
        }
        let regex = RegexBuilder::new(&format!(r"^.+\.{}$", regex::escape(extension)))
            .case_insensitive(true)
            .build()
            .ok()?;
        Some(Self {
            extension: extension.to_string(),
            regex,
        })
    }

    /// 从二进制文件的扩展名推导
    pub fn for_binary(binary: &Path) -> Option<Self> {
        binary
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::for_extension)
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.regex.is_match(file_name)
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }
}

/// 单个同级文件的处理结果，`local` 始终是本地目标路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiblingResult {
    pub local: PathBuf,
    pub outcome: SyncOutcome,
}

/// 依赖文件复制器
pub struct DependencyReplicator<'a> {
    comparator: &'a FileComparator,
    transfer: &'a FileTransfer,
    extension_override: Option<&'a str>,
}

impl<'a> DependencyReplicator<'a> {
    pub fn new(comparator: &'a FileComparator, transfer: &'a FileTransfer) -> Self {
        Self {
            comparator,
            transfer,
            extension_override: None,
        }
    }

    /// 使用固定扩展名，而不是从二进制文件推导
    pub fn with_extension(mut self, extension: Option<&'a str>) -> Self {
        self.extension_override = extension;
        self
    }

    fn pattern_for(&self, server_binary: &Path) -> SyncResult<SiblingPattern> {
        let pattern = match self.extension_override {
            Some(ext) => SiblingPattern::for_extension(ext),
            None => SiblingPattern::for_binary(server_binary),
        };
        pattern.ok_or_else(|| SyncError::unresolved(server_binary, "no file extension to match siblings"))
    }

    /// 把服务器目录中的同级文件复制到本地目录
    ///
    /// 返回 `Err` 表示整个步骤无法进行（目录无法解析或无法枚举）；单个文件的失败记录在
    /// 对应的 `SiblingResult` 中，不影响其余文件。
    pub fn replicate_siblings(
        &self,
        server_binary: &Path,
        local_binary: &Path,
    ) -> SyncResult<Vec<SiblingResult>> {
        let server_dir = parent_dir(server_binary)?;
        let local_dir = parent_dir(local_binary)?;
        let pattern = self.pattern_for(server_binary)?;

        self.transfer.ensure_dir(local_dir)?;

        let meta = fs::metadata(server_dir).map_err(|e| SyncError::io("enumerate", server_dir, e))?;
        if !meta.is_dir() {
            return Err(SyncError::unresolved(server_dir, "not a directory"));
        }

        debug!(
            "扫描依赖文件: {} (*.{})",
            server_dir.display(),
            pattern.extension()
        );

        let mut results = Vec::new();
        let walker = WalkDir::new(server_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    // 记录为本地目标路径
                    let local = e
                        .path()
                        .filter(|_| e.depth() > 0)
                        .and_then(Path::file_name)
                        .map(|name| local_dir.join(name))
                        .unwrap_or_else(|| local_dir.to_path_buf());
                    warn!("枚举依赖文件失败: {}", e);
                    results.push(SiblingResult {
                        local,
                        outcome: SyncOutcome::Failed(io::Error::from(e).to_string()),
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name();
            if !pattern.matches(&name.to_string_lossy()) {
                continue;
            }

            let local = local_dir.join(name);
            let outcome = self
                .comparator
                .decide(&local, entry.path())
                .and_then(|decision| self.transfer.execute(decision, entry.path(), &local))
                .unwrap_or_else(|e| SyncOutcome::Failed(e.to_string()));

            match &outcome {
                SyncOutcome::Created => info!("已复制依赖: {} -> {}", name.to_string_lossy(), local_dir.display()),
                SyncOutcome::Updated => info!("已更新依赖: {} ({})", name.to_string_lossy(), local_dir.display()),
                SyncOutcome::Unchanged => debug!("跳过依赖: {} (本地已是最新)", name.to_string_lossy()),
                SyncOutcome::Failed(reason) => warn!("复制依赖失败: {} - {}", name.to_string_lossy(), reason),
            }

            results.push(SiblingResult { local, outcome });
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testutil::{at, mtime, read, write_file};

    fn replicate(server_binary: &Path, local_binary: &Path) -> SyncResult<Vec<SiblingResult>> {
        let comparator = FileComparator::new();
        let transfer = FileTransfer::new();
        DependencyReplicator::new(&comparator, &transfer).replicate_siblings(server_binary, local_binary)
    }

    fn outcome_of<'r>(results: &'r [SiblingResult], name: &str) -> &'r SyncOutcome {
        &results
            .iter()
            .find(|r| r.local.file_name().unwrap() == name)
            .unwrap()
            .outcome
    }

    #[test]
    fn test_pattern_matching() {
        let pattern = SiblingPattern::for_binary(Path::new("/srv/Plugin.dll")).unwrap();

        assert!(pattern.matches("helper.dll"));
        assert!(pattern.matches("HELPER.DLL"));
        assert!(!pattern.matches("helper.dll.config"));
        assert!(!pattern.matches("helper.pdb"));
        assert!(!pattern.matches(".dll"));
        assert!(SiblingPattern::for_binary(Path::new("/srv/plugin")).is_none());
        assert_eq!(SiblingPattern::for_extension("*.so").unwrap().extension(), "so");
    }

    #[test]
    fn test_siblings_copied_updated_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let srv = dir.path().join("srv");
        let local = dir.path().join("local");

        let server_binary = write_file(&srv.join("a.dll"), b"a", at(100));
        write_file(&srv.join("b.dll"), b"b-new", at(200));
        write_file(&srv.join("c.dll"), b"c", at(100));
        write_file(&srv.join("readme.txt"), b"ignored", at(100));
        write_file(&srv.join("nested/d.dll"), b"not recursed", at(100));

        write_file(&local.join("a.dll"), b"a", at(100));
        write_file(&local.join("b.dll"), b"b-old", at(150));

        let results = replicate(&server_binary, &local.join("a.dll")).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(outcome_of(&results, "a.dll"), &SyncOutcome::Unchanged);
        assert_eq!(outcome_of(&results, "b.dll"), &SyncOutcome::Updated);
        assert_eq!(outcome_of(&results, "c.dll"), &SyncOutcome::Created);
        assert_eq!(read(&local.join("b.dll")), "b-new");
        assert_eq!(mtime(&local.join("c.dll")), at(100));
        assert!(!local.join("readme.txt").exists());
        assert!(!local.join("d.dll").exists());
        assert!(!local.join("nested").exists());
    }

    #[test]
    fn test_local_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let server_binary = write_file(&dir.path().join("srv/a.dll"), b"a", at(100));
        write_file(&dir.path().join("srv/b.dll"), b"b", at(100));
        let local_binary = dir.path().join("fresh/install/a.dll");

        let results = replicate(&server_binary, &local_binary).unwrap();

        assert!(results.iter().all(|r| r.outcome == SyncOutcome::Created));
        assert_eq!(read(&dir.path().join("fresh/install/b.dll")), "b");
    }

    #[test]
    fn test_extension_override() {
        let dir = tempfile::tempdir().unwrap();
        let server_binary = write_file(&dir.path().join("srv/plugin"), b"bin", at(100));
        write_file(&dir.path().join("srv/libdep.so"), b"so", at(100));
        let local = dir.path().join("local");

        let comparator = FileComparator::new();
        let transfer = FileTransfer::new();
        let results = DependencyReplicator::new(&comparator, &transfer)
            .with_extension(Some("so"))
            .replicate_siblings(&server_binary, &local.join("plugin"))
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(local.join("libdep.so").exists());
    }

    #[test]
    fn test_unresolvable_step_fails_without_copying() {
        let dir = tempfile::tempdir().unwrap();

        // 没有扩展名
        let server_binary = write_file(&dir.path().join("srv/plugin"), b"bin", at(100));
        let err = replicate(&server_binary, &dir.path().join("local/plugin")).unwrap_err();
        assert!(matches!(err, SyncError::PathResolutionFailed { .. }));

        // 服务器目录不存在
        let err = replicate(
            &dir.path().join("gone/a.dll"),
            &dir.path().join("local/a.dll"),
        )
        .unwrap_err();
        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_sibling_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let srv = dir.path().join("srv");
        let local = dir.path().join("local");

        let server_binary = write_file(&srv.join("a.dll"), b"a", at(100));
        std::os::unix::fs::symlink(srv.join("missing.dll"), srv.join("b.dll")).unwrap();
        write_file(&srv.join("c.dll"), b"c", at(100));

        let results = replicate(&server_binary, &local.join("a.dll")).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(outcome_of(&results, "a.dll"), &SyncOutcome::Created);
        assert!(matches!(outcome_of(&results, "b.dll"), SyncOutcome::Failed(_)));
        assert_eq!(outcome_of(&results, "c.dll"), &SyncOutcome::Created);
        assert!(results.iter().all(|r| r.local.starts_with(&local)));
        assert!(!local.join("b.dll").exists());
        assert_eq!(read(&local.join("c.dll")), "c");
    }
}
