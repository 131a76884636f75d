//! 每日标记相关命令

use crate::AppState;
use anyhow::{Context, Result};

/// 删除每日标记，下次运行时重新检查更新
///
/// 返回标记是否存在。
pub fn reset_flag(state: &AppState) -> Result<bool> {
    let gate = state.gate();
    gate.reset()
        .with_context(|| format!("删除标记文件失败: {}", gate.flag_file().display()))
}
