//! 文件传输 - 同步流程中唯一修改文件系统的组件

use super::comparator::SyncDecision;
use super::error::{SyncError, SyncResult};
use super::report::SyncOutcome;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tracing::{debug, info};

/// 复制模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// 目标必须不存在，存在则失败
    CreateNew,
    /// 覆盖已有目标
    Overwrite,
}

/// 传输统计
#[derive(Debug, Default)]
struct TransferStats {
    files_written: AtomicU64,
    bytes_transferred: AtomicU64,
}

/// 传输统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSnapshot {
    pub files_written: u64,
    pub bytes_transferred: u64,
}

/// 文件传输执行器
#[derive(Debug, Default)]
pub struct FileTransfer {
    stats: TransferStats,
}

impl FileTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前统计
    pub fn stats(&self) -> TransferSnapshot {
        TransferSnapshot {
            files_written: self.stats.files_written.load(Ordering::Relaxed),
            bytes_transferred: self.stats.bytes_transferred.load(Ordering::Relaxed),
        }
    }

    /// 确保目录存在，返回是否新建
    pub fn ensure_dir(&self, dir: &Path) -> SyncResult<bool> {
        if dir.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(dir).map_err(|e| SyncError::io("create directory", dir, e))?;
        info!("已创建目录: {}", dir.display());
        Ok(true)
    }

    /// 确保文件的父目录存在
    pub fn ensure_parent_dir(&self, path: &Path) -> SyncResult<()> {
        let parent = parent_dir(path)?;
        self.ensure_dir(parent)?;
        Ok(())
    }

    /// 按决策执行：新建、覆盖或跳过
    pub fn execute(
        &self,
        decision: SyncDecision,
        remote: &Path,
        local: &Path,
    ) -> SyncResult<SyncOutcome> {
        match decision {
            SyncDecision::Skip => Ok(SyncOutcome::Unchanged),
            SyncDecision::Create => {
                self.ensure_parent_dir(local)?;
                self.copy(remote, local, CopyMode::CreateNew)?;
                Ok(SyncOutcome::Created)
            }
            SyncDecision::Update => {
                self.copy(remote, local, CopyMode::Overwrite)?;
                Ok(SyncOutcome::Updated)
            }
        }
    }

    /// 复制文件，并把源文件的修改时间带到目标文件上
    pub fn copy(&self, from: &Path, to: &Path, mode: CopyMode) -> SyncResult<u64> {
        debug!("复制: {} -> {} ({:?})", from.display(), to.display(), mode);

        let bytes = match mode {
            CopyMode::CreateNew => copy_new(from, to)?,
            CopyMode::Overwrite => copy_replace(from, to)?,
        };

        self.stats.files_written.fetch_add(1, Ordering::Relaxed);
        self.stats
            .bytes_transferred
            .fetch_add(bytes, Ordering::Relaxed);
        Ok(bytes)
    }
}

/// 获取父目录，空路径视为无法解析
pub fn parent_dir(path: &Path) -> SyncResult<&Path> {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| SyncError::unresolved(path, "path has no parent directory"))
}

fn open_source(from: &Path) -> SyncResult<(File, SystemTime)> {
    let file = File::open(from).map_err(|e| SyncError::io("open", from, e))?;
    let modified = file
        .metadata()
        .and_then(|m| m.modified())
        .map_err(|e| SyncError::io("read modification time", from, e))?;
    Ok((file, modified))
}

/// 写入目标并设置修改时间
fn write_into(src: &mut File, dst: &mut File, modified: SystemTime, to: &Path) -> SyncResult<u64> {
    let bytes = io::copy(src, dst).map_err(|e| SyncError::io("copy", to, e))?;
    dst.set_modified(modified)
        .map_err(|e| SyncError::io("set modification time", to, e))?;
    Ok(bytes)
}

fn copy_new(from: &Path, to: &Path) -> SyncResult<u64> {
    let (mut src, modified) = open_source(from)?;
    let mut dst = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(to)
        .map_err(|e| SyncError::io("create", to, e))?;

    let result = write_into(&mut src, &mut dst, modified, to);
    drop(dst);

    // 不留下半截文件，否则下次运行会把它当成最新版本
    if result.is_err() {
        let _ = fs::remove_file(to);
    }
    result
}

/// 临时文件路径（与目标同目录，便于原子重命名）
fn staging_path(to: &Path) -> SyncResult<PathBuf> {
    let name = to
        .file_name()
        .ok_or_else(|| SyncError::unresolved(to, "path has no file name"))?;
    let mut staged = std::ffi::OsString::from(".");
    staged.push(name);
    staged.push(".addinsync.tmp");
    Ok(to.with_file_name(staged))
}

fn copy_replace(from: &Path, to: &Path) -> SyncResult<u64> {
    let (mut src, modified) = open_source(from)?;
    let staging = staging_path(to)?;

    // 先写临时文件，再重命名覆盖目标
    let result = File::create(&staging)
        .map_err(|e| SyncError::io("create", &staging, e))
        .and_then(|mut dst| write_into(&mut src, &mut dst, modified, &staging))
        .and_then(|bytes| {
            fs::rename(&staging, to)
                .map(|_| bytes)
                .map_err(|e| SyncError::io("replace", to, e))
        });

    if result.is_err() {
        let _ = fs::remove_file(&staging);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testutil::{at, mtime, read, write_file};

    #[test]
    fn test_create_copies_and_keeps_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let remote = write_file(&dir.path().join("srv/a.dll"), b"remote", at(100));
        let local = dir.path().join("local/deep/a.dll");
        let transfer = FileTransfer::new();

        let outcome = transfer
            .execute(SyncDecision::Create, &remote, &local)
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Created);
        assert_eq!(read(&local), "remote");
        assert_eq!(mtime(&local), at(100));
        assert_eq!(
            transfer.stats(),
            TransferSnapshot {
                files_written: 1,
                bytes_transferred: 6
            }
        );
    }

    #[test]
    fn test_create_fails_if_destination_exists() {
        let dir = tempfile::tempdir().unwrap();
        let remote = write_file(&dir.path().join("srv/a.dll"), b"remote", at(100));
        let local = write_file(&dir.path().join("local/a.dll"), b"raced", at(50));
        let transfer = FileTransfer::new();

        let err = transfer
            .copy(&remote, &local, CopyMode::CreateNew)
            .unwrap_err();

        assert_eq!(err.io_kind(), Some(io::ErrorKind::AlreadyExists));
        assert_eq!(read(&local), "raced");
        assert_eq!(transfer.stats().files_written, 0);
    }

    #[test]
    fn test_overwrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let remote = write_file(&dir.path().join("srv/a.dll"), b"new build", at(200));
        let local = write_file(&dir.path().join("local/a.dll"), b"old", at(100));

        let outcome = FileTransfer::new()
            .execute(SyncDecision::Update, &remote, &local)
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Updated);
        assert_eq!(read(&local), "new build");
        assert_eq!(mtime(&local), at(200));
        assert!(!staging_path(&local).unwrap().exists());
    }

    #[test]
    fn test_missing_source_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("local/a.dll");
        let transfer = FileTransfer::new();

        let err = transfer
            .execute(SyncDecision::Create, &dir.path().join("srv/a.dll"), &local)
            .unwrap_err();

        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
        assert!(!local.exists());
        assert_eq!(transfer.stats().files_written, 0);
    }

    #[test]
    fn test_skip_does_no_io() {
        let dir = tempfile::tempdir().unwrap();
        let transfer = FileTransfer::new();

        let outcome = transfer
            .execute(
                SyncDecision::Skip,
                &dir.path().join("nope"),
                &dir.path().join("missing/dir/a.dll"),
            )
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Unchanged);
        assert!(!dir.path().join("missing").exists());
    }

    #[test]
    fn test_parent_dir_of_bare_name_is_unresolved() {
        let err = parent_dir(Path::new("a.dll")).unwrap_err();
        assert!(matches!(err, SyncError::PathResolutionFailed { .. }));
    }
}
