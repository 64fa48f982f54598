// ==========================================
// 能力框架导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 输入错误（持久化之前终止）=====
    #[error("{0}")]
    InvalidImportFile(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("字符编码错误: {0}")]
    EncodingError(String),

    #[error("能力层级存在循环引用: {idnumber}")]
    CycleDetected { idnumber: String },

    // ===== 数据质量错误（向上传播）=====
    #[error("评分标准配置无效: {0}")]
    ScaleConfiguration(String),

    #[error("规则配置迁移失败 (ruletype={rule_type}): {message}")]
    RuleMigration { rule_type: String, message: String },

    // ===== 持久化错误（原样向上传播）=====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::FileReadError(format!("临时导入数据损坏: {}", err))
    }
}

impl ImportError {
    /// 是否为输入错误（应记录在会话上，不触达持久化）
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ImportError::InvalidImportFile(_)
                | ImportError::FileReadError(_)
                | ImportError::CsvParseError(_)
                | ImportError::EncodingError(_)
                | ImportError::CycleDetected { .. }
        )
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
