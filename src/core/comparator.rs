use super::error::{SyncError, SyncResult};
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// 同步决策
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// 本地不存在，需要新建
    Create,
    /// 服务器文件更新，需要覆盖
    Update,
    /// 本地已是最新
    Skip,
}

/// 文件时间比较结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRelation {
    /// 修改时间相同
    Equal,
    /// 服务器文件更新
    RemoteNewer,
    /// 本地文件更新
    LocalNewer,
}

/// 文件比较器
///
/// 只使用修改时间判断新旧，不比较内容。服务器时间必须严格大于本地时间才会触发更新，
/// 相同时间视为未变化。
#[derive(Debug, Clone, Default)]
pub struct FileComparator;

impl FileComparator {
    pub fn new() -> Self {
        Self
    }

    /// 比较两个修改时间
    pub fn compare_times(&self, remote: SystemTime, local: SystemTime) -> FileRelation {
        if remote > local {
            FileRelation::RemoteNewer
        } else if remote < local {
            FileRelation::LocalNewer
        } else {
            FileRelation::Equal
        }
    }

    /// 判断本地文件需要执行的动作
    pub fn decide(&self, local: &Path, remote: &Path) -> SyncResult<SyncDecision> {
        let local_modified = match fs::metadata(local) {
            Ok(meta) => meta
                .modified()
                .map_err(|e| SyncError::io("read modification time", local, e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("本地文件不存在: {}", local.display());
                return Ok(SyncDecision::Create);
            }
            Err(e) => return Err(SyncError::io("stat", local, e)),
        };

        let remote_modified = modified_time(remote)?;

        match self.compare_times(remote_modified, local_modified) {
            FileRelation::RemoteNewer => {
                tracing::debug!("服务器文件较新: {}", remote.display());
                Ok(SyncDecision::Update)
            }
            FileRelation::Equal | FileRelation::LocalNewer => Ok(SyncDecision::Skip),
        }
    }
}

/// 读取文件修改时间
pub fn modified_time(path: &Path) -> SyncResult<SystemTime> {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|e| SyncError::io("stat", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testutil::{at, write_file};
    use std::time::Duration;

    #[test]
    fn test_compare_times_is_strict() {
        let comparator = FileComparator::new();
        let t = at(1_000);

        assert_eq!(comparator.compare_times(t, t), FileRelation::Equal);
        assert_eq!(
            comparator.compare_times(t + Duration::from_secs(1), t),
            FileRelation::RemoteNewer
        );
        assert_eq!(
            comparator.compare_times(t, t + Duration::from_millis(1)),
            FileRelation::LocalNewer
        );
    }

    #[test]
    fn test_decide_missing_local_creates() {
        let dir = tempfile::tempdir().unwrap();
        let remote = write_file(&dir.path().join("srv/a.dll"), b"remote", at(100));

        let decision = FileComparator::new()
            .decide(&dir.path().join("local/a.dll"), &remote)
            .unwrap();
        assert_eq!(decision, SyncDecision::Create);
    }

    #[test]
    fn test_decide_by_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let remote = write_file(&dir.path().join("srv/a.dll"), b"remote", at(200));
        let comparator = FileComparator::new();

        let older = write_file(&dir.path().join("local/older.dll"), b"local", at(100));
        assert_eq!(comparator.decide(&older, &remote).unwrap(), SyncDecision::Update);

        let same = write_file(&dir.path().join("local/same.dll"), b"local", at(200));
        assert_eq!(comparator.decide(&same, &remote).unwrap(), SyncDecision::Skip);

        let newer = write_file(&dir.path().join("local/newer.dll"), b"local", at(300));
        assert_eq!(comparator.decide(&newer, &remote).unwrap(), SyncDecision::Skip);
    }

    #[test]
    fn test_decide_missing_remote_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let local = write_file(&dir.path().join("local/a.dll"), b"local", at(100));

        let err = FileComparator::new()
            .decide(&local, &dir.path().join("srv/a.dll"))
            .unwrap_err();
        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
    }
}
