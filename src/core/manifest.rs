//! 清单解析 - 把 CSV 清单转换为同步记录

use super::error::{SyncError, SyncResult};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 清单表头
pub const MANIFEST_HEADER: &str = "LocalAddinFile,LocalDllFile,ServerAddinFile,ServerDllFile";

/// 模板中的示例行
const TEMPLATE_SAMPLE_ROW: &str = r"C:\ProgramData\Autodesk\Revit\Addins\AddinSync\SAMPLE_addin_FILE.addin, C:\ProgramData\Autodesk\Revit\Addins\AddinSync\SAMPLE_dll_File.dll, \\server\share\SAMPLE_addin_FILE.addin, \\server\share\SAMPLE_dll_File.dll";

const DELIMITER: char = ',';
const FIELD_COUNT: usize = 4;

/// 清单中的一行：本地描述文件/二进制文件与服务器端对应文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    pub local_descriptor: PathBuf,
    pub local_binary: PathBuf,
    pub remote_descriptor: PathBuf,
    pub remote_binary: PathBuf,
}

/// 被跳过的清单行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRow {
    /// 行号（从 1 开始，表头为第 1 行）
    pub line: usize,
    pub content: String,
    pub reason: String,
}

/// 解析结果
#[derive(Debug, Clone, Default)]
pub struct ParsedManifest {
    pub records: Vec<SyncRecord>,
    pub skipped: Vec<SkippedRow>,
}

/// 去掉字段两侧的空白和引号
fn clean_field(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim()
}

/// 解析单行，返回记录或格式错误
fn parse_row(line_no: usize, line: &str) -> SyncResult<SyncRecord> {
    let columns: Vec<&str> = line.split(DELIMITER).collect();
    if columns.len() < FIELD_COUNT {
        return Err(SyncError::RowMalformed {
            line: line_no,
            reason: format!(
                "expected {} columns, found {}",
                FIELD_COUNT,
                columns.len()
            ),
        });
    }

    let fields: Vec<&str> = columns[..FIELD_COUNT].iter().map(|c| clean_field(c)).collect();
    if let Some(idx) = fields.iter().position(|f| f.is_empty()) {
        return Err(SyncError::RowMalformed {
            line: line_no,
            reason: format!("column {} is empty", idx + 1),
        });
    }

    Ok(SyncRecord {
        local_descriptor: PathBuf::from(fields[0]),
        local_binary: PathBuf::from(fields[1]),
        remote_descriptor: PathBuf::from(fields[2]),
        remote_binary: PathBuf::from(fields[3]),
    })
}

/// 解析清单内容
///
/// 第一行总是被当作表头跳过。格式错误的行被跳过并记录，不会中断解析。
pub fn parse<I, S>(lines: I) -> ParsedManifest
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed = ParsedManifest::default();

    for (idx, line) in lines.into_iter().enumerate().skip(1) {
        let line = line.as_ref();
        let line_no = idx + 1;

        if line.trim().is_empty() {
            continue;
        }

        match parse_row(line_no, line) {
            Ok(record) => parsed.records.push(record),
            Err(e) => {
                debug!("跳过清单行: {} ({})", line, e);
                parsed.skipped.push(SkippedRow {
                    line: line_no,
                    content: line.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    parsed
}

/// 从文件加载清单
pub fn load(path: &Path) -> SyncResult<ParsedManifest> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SyncError::ManifestMissing(path.to_path_buf()));
        }
        Err(e) => return Err(SyncError::io("read manifest", path, e)),
    };

    let content = String::from_utf8_lossy(&bytes);
    let parsed = parse(content.lines());

    info!(
        "清单加载完成: {} 条记录, {} 行被跳过",
        parsed.records.len(),
        parsed.skipped.len()
    );

    Ok(parsed)
}

/// 创建清单模板（表头 + 一行示例）
pub fn write_template(path: &Path) -> SyncResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| SyncError::io("create directory", parent, e))?;
    }

    let content = format!("{}\n{}\n", MANIFEST_HEADER, TEMPLATE_SAMPLE_ROW);
    fs::write(path, content).map_err(|e| SyncError::io("write manifest template", path, e))?;

    info!("已创建清单模板: {}", path.display());
    Ok(())
}
