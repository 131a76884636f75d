//! 同步错误类型

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 同步过程中的错误
///
/// 除 `ManifestMissing` 外，所有错误都在最小的处理单元（单个角色或单个依赖文件）内被捕获并记录，
/// 不会中断整个同步过程。
#[derive(Debug, Error)]
pub enum SyncError {
    /// 清单行格式错误（字段不足或字段为空）
    #[error("manifest line {line}: {reason}")]
    RowMalformed { line: usize, reason: String },

    /// 无法从路径推导出目录
    #[error("cannot resolve directory of {path}: {reason}")]
    PathResolutionFailed { path: PathBuf, reason: String },

    /// 文件系统操作失败
    #[error("{op} failed for {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 清单文件不存在
    #[error("manifest file not found: {0}")]
    ManifestMissing(PathBuf),
}

impl SyncError {
    pub fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        SyncError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn unresolved(path: &Path, reason: impl Into<String>) -> Self {
        SyncError::PathResolutionFailed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// 底层 IO 错误类型（用于测试和诊断）
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            SyncError::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
