// ==========================================
// 能力框架导入系统 - 表格读取器实现
// ==========================================
// 职责: 上传文本 → 解码 → CSV 解析 → 临时存储 → 逐行读取
// 支持: 任意 encoding_rs 标签 / auto 自动识别; 逗号/分号/冒号/制表符
// ==========================================

use crate::domain::Delimiter;
use crate::i18n::{t, t_with_args};
use crate::importer::error::{ImportError, ImportResult};
use chardetng::EncodingDetector;
use csv::ReaderBuilder;
use encoding_rs::Encoding;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

// ==========================================
// TabularReader Trait
// ==========================================
// 用途: 表格数据源（上传内容的暂存与逐行读取）
// 实现者: CsvImportReader
pub trait TabularReader {
    /// 本次导入的 ID（同一 ID 可在后续会话中重新打开）
    fn import_id(&self) -> &str;

    /// 载入上传内容并暂存
    ///
    /// # 返回
    /// - Ok(usize): 数据行数（不含表头）
    /// - Err: 编码/格式错误
    fn load(&mut self, content: &[u8], encoding: &str, delimiter: Delimiter)
        -> ImportResult<usize>;

    /// 打开暂存内容并读取表头
    fn init(&mut self) -> ImportResult<()>;

    /// 表头列名
    fn columns(&self) -> &[String];

    /// 读取下一行（None = 结束）
    fn next_row(&mut self) -> ImportResult<Option<Vec<String>>>;

    /// 结束读取（保留暂存内容）
    fn close(&mut self);

    /// 删除暂存内容（幂等）
    fn cleanup(&mut self) -> ImportResult<()>;
}

// ==========================================
// CsvImportReader 实现
// ==========================================
// 暂存格式: <storage_dir>/<import_id>.jsonl
// 第一行为表头 JSON 数组,其后每行一个数据行 JSON 数组
pub struct CsvImportReader {
    import_id: String,
    storage_dir: PathBuf,
    columns: Vec<String>,
    lines: Option<Lines<BufReader<File>>>,
}

impl CsvImportReader {
    /// 生成新的导入 ID
    pub fn new_import_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn new(import_id: impl Into<String>, storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            import_id: import_id.into(),
            storage_dir: storage_dir.into(),
            columns: Vec::new(),
            lines: None,
        }
    }

    /// 暂存文件路径
    pub fn storage_path(&self) -> PathBuf {
        self.storage_dir.join(format!("{}.jsonl", self.import_id))
    }

    /// 导入 ID 只允许字母/数字/-/_，防止路径穿越
    fn ensure_valid_import_id(&self) -> ImportResult<()> {
        let valid = !self.import_id.is_empty()
            && self
                .import_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(())
        } else {
            Err(ImportError::InvalidImportFile(t_with_args(
                "import.invalid_file_reason",
                &[("reason", &self.import_id)],
            )))
        }
    }
}

impl TabularReader for CsvImportReader {
    fn import_id(&self) -> &str {
        &self.import_id
    }

    fn load(
        &mut self,
        content: &[u8],
        encoding: &str,
        delimiter: Delimiter,
    ) -> ImportResult<usize> {
        self.ensure_valid_import_id()?;

        let text = decode_content(content, encoding)?;
        if text.trim().is_empty() {
            return Err(ImportError::InvalidImportFile(t("import.empty_file")));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致（短行按空值读取）
            .delimiter(delimiter.as_byte())
            .from_reader(text.as_bytes());

        let mut records = reader.records();
        let header: Vec<String> = match records.next() {
            Some(record) => record?.iter().map(|h| h.trim().to_string()).collect(),
            None => return Err(ImportError::InvalidImportFile(t("import.empty_file"))),
        };
        if header.iter().all(|h| h.is_empty()) {
            return Err(ImportError::InvalidImportFile(t("import.empty_header")));
        }

        fs::create_dir_all(&self.storage_dir)?;
        let path = self.storage_path();
        let mut writer = BufWriter::new(File::create(&path)?);
        writeln!(writer, "{}", serde_json::to_string(&header)?)?;

        let mut row_count = 0;
        for (idx, result) in records.enumerate() {
            let record = result?;
            let row: Vec<String> = record.iter().map(str::to_string).collect();

            // 表头占第 1 行
            let row_number = idx + 2;
            if row.len() > header.len() {
                drop(writer);
                let _ = fs::remove_file(&path);
                return Err(ImportError::InvalidImportFile(t_with_args(
                    "import.weird_columns",
                    &[("row", &row_number.to_string())],
                )));
            }

            // 跳过完全空白的行
            if row.iter().all(|v| v.trim().is_empty()) {
                continue;
            }

            writeln!(writer, "{}", serde_json::to_string(&row)?)?;
            row_count += 1;
        }
        writer.flush()?;

        debug!(
            import_id = %self.import_id,
            columns = header.len(),
            rows = row_count,
            "导入内容已暂存"
        );
        Ok(row_count)
    }

    fn init(&mut self) -> ImportResult<()> {
        self.ensure_valid_import_id()?;

        let file = File::open(self.storage_path())?;
        let mut lines = BufReader::new(file).lines();
        let header_line = lines
            .next()
            .ok_or_else(|| ImportError::InvalidImportFile(t("import.empty_header")))??;

        self.columns = serde_json::from_str(&header_line)?;
        self.lines = Some(lines);
        Ok(())
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> ImportResult<Option<Vec<String>>> {
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };
        match lines.next() {
            Some(line) => {
                let row: Vec<String> = serde_json::from_str(&line?)?;
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.lines = None;
    }

    fn cleanup(&mut self) -> ImportResult<()> {
        self.close();
        if self.ensure_valid_import_id().is_err() {
            return Ok(());
        }
        remove_if_exists(&self.storage_path())
    }
}

/// 按标签解码上传内容（auto/空 → 自动识别；BOM 由 encoding_rs 处理）
fn decode_content(content: &[u8], label: &str) -> ImportResult<String> {
    let label = label.trim();
    let detect = label.is_empty() || label.eq_ignore_ascii_case("auto");
    let encoding = if detect {
        let mut detector = EncodingDetector::new();
        detector.feed(content, true);
        detector.guess(None, true)
    } else {
        Encoding::for_label(label.as_bytes()).ok_or_else(|| {
            ImportError::EncodingError(t_with_args(
                "import.unknown_encoding",
                &[("encoding", label)],
            ))
        })?
    };

    let (decoded, _, had_errors) = encoding.decode(content);
    // 显式指定的编码必须能完整解码
    if had_errors && !detect {
        return Err(ImportError::EncodingError(t_with_args(
            "import.undecodable",
            &[("encoding", encoding.name())],
        )));
    }
    if had_errors {
        warn!(
            encoding = encoding.name(),
            "解码过程中出现无法识别的字节，已替换为占位符"
        );
    }
    Ok(decoded.into_owned())
}

fn remove_if_exists(path: &Path) -> ImportResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
