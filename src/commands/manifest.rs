//! 清单相关命令

use crate::core::manifest::{self, ParsedManifest};
use crate::core::SyncError;
use crate::AppState;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// 创建清单模板的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitResult {
    Created(PathBuf),
    AlreadyExists(PathBuf),
}

fn resolve(state: &AppState, path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| state.manifest_path())
}

/// 创建清单模板（已存在时不覆盖）
pub fn init_manifest(state: &AppState, path: Option<&Path>) -> Result<InitResult> {
    let path = resolve(state, path);
    if path.exists() {
        return Ok(InitResult::AlreadyExists(path));
    }

    manifest::write_template(&path)
        .with_context(|| format!("创建清单模板失败: {}", path.display()))?;
    Ok(InitResult::Created(path))
}

/// 读取并解析清单
pub fn list_manifest(state: &AppState, path: Option<&Path>) -> Result<ParsedManifest> {
    let path = resolve(state, path);
    match manifest::load(&path) {
        Ok(parsed) => Ok(parsed),
        Err(e @ SyncError::ManifestMissing(_)) => {
            Err(anyhow::Error::new(e).context("清单不存在，请先运行 `addinsync manifest init`"))
        }
        Err(e) => Err(e).context("加载清单失败"),
    }
}
