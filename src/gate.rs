//! 每日运行标记 - 保证同步每天只执行一次

use chrono::{DateTime, Local};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const FLAG_FILE_NAME: &str = "addinsync.flag";

/// 标记检查结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    /// 今天已经运行过
    AlreadyRanToday,
    /// 继续执行（标记已写入）
    Proceed,
}

/// 每日运行标记
#[derive(Debug, Clone)]
pub struct DailyGate {
    flag_file: PathBuf,
}

impl DailyGate {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            flag_file: state_dir.join(FLAG_FILE_NAME),
        }
    }

    pub fn flag_file(&self) -> &Path {
        &self.flag_file
    }

    /// 检查今天是否已运行；未运行则写入标记
    ///
    /// 检查或写入出错时记录日志并放行。
    pub fn check_and_mark(&self, now: DateTime<Local>) -> GateStatus {
        match self.flag_date() {
            Ok(Some(date)) if date == now.date_naive() => {
                warn!("今天已经运行过同步，跳过");
                return GateStatus::AlreadyRanToday;
            }
            Ok(Some(_)) => warn!("标记文件存在但不是今天创建的，继续执行"),
            Ok(None) => warn!("标记文件不存在，继续执行"),
            Err(e) => error!("检查标记文件失败: {}", e),
        }

        if let Err(e) = self.write_flag(now) {
            error!("写入标记文件失败: {} - {}", self.flag_file.display(), e);
        }
        GateStatus::Proceed
    }

    /// 删除标记，下次启动时重新检查更新
    pub fn reset(&self) -> io::Result<bool> {
        match fs::remove_file(&self.flag_file) {
            Ok(()) => {
                info!("标记文件已删除，下次启动将检查更新");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// 标记文件的修改日期（本地时区）
    fn flag_date(&self) -> io::Result<Option<chrono::NaiveDate>> {
        match fs::metadata(&self.flag_file) {
            Ok(meta) => {
                let modified: DateTime<Local> = meta.modified()?.into();
                Ok(Some(modified.date_naive()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write_flag(&self, now: DateTime<Local>) -> io::Result<()> {
        if let Some(parent) = self.flag_file.parent() {
            fs::create_dir_all(parent)?;
        }
        let existed = self.flag_file.exists();

        fs::write(
            &self.flag_file,
            format!(
                "Flag file created/updated on: {}\n",
                now.format("%Y-%m-%d %H:%M:%S")
            ),
        )?;
        fs::File::options()
            .write(true)
            .open(&self.flag_file)?
            .set_modified(now.into())?;

        if existed {
            info!("标记文件已更新");
        } else {
            info!("标记文件已创建");
        }
        Ok(())
    }
}
