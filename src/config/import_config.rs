// ==========================================
// 能力框架导入系统 - 导入配置
// ==========================================
// 职责: 导入会话所需的配置值对象 + 配置读取接口
// 红线: 会话构造时显式传入，导入流程内不再读取全局配置
// ==========================================

use crate::domain::ImportField;
use crate::repository::error::{RepositoryError, RepositoryResult};
use std::path::PathBuf;

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    use crate::domain::ImportField;

    /// 表头名配置键前缀（import.header.<field>）
    pub const HEADER_PREFIX: &str = "import.header.";
    /// 所属上下文 ID
    pub const CONTEXT_ID: &str = "import.context_id";
    /// 新建评分标准的所有者
    pub const USER_ID: &str = "import.user_id";
    /// 导入临时文件目录
    pub const STORAGE_DIR: &str = "import.storage_dir";
    /// 已保存列映射前缀（import.mapping.<name>）
    pub const MAPPING_PREFIX: &str = "import.mapping.";

    pub fn header_key(field: ImportField) -> String {
        format!("{}{}", HEADER_PREFIX, field.as_str())
    }

    pub fn mapping_key(name: &str) -> String {
        format!("{}{}", MAPPING_PREFIX, name.trim())
    }
}

/// 系统上下文 ID
pub const SYSTEM_CONTEXT_ID: i64 = 1;
/// 默认导入用户（管理员）
pub const DEFAULT_USER_ID: i64 = 2;

// ==========================================
// ImportConfig - 导入配置值对象
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    /// 期望表头名（按 ImportField 默认顺序）
    pub header_names: Vec<String>,
    /// 框架所属上下文
    pub context_id: i64,
    /// 新建评分标准的所有者
    pub user_id: i64,
    /// 表格读取器的临时存储目录
    pub storage_dir: PathBuf,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            header_names: ImportField::ALL
                .iter()
                .map(|f| f.as_str().to_string())
                .collect(),
            context_id: SYSTEM_CONTEXT_ID,
            user_id: DEFAULT_USER_ID,
            storage_dir: default_storage_dir(),
        }
    }
}

impl ImportConfig {
    /// 字段对应的期望表头名
    pub fn header_name(&self, field: ImportField) -> &str {
        self.header_names
            .get(field.position())
            .map(String::as_str)
            .unwrap_or_else(|| field.as_str())
    }

    /// 覆盖存储目录
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }
}

/// 默认临时目录: <tmp>/competency_import
pub fn default_storage_dir() -> PathBuf {
    std::env::temp_dir().join("competency_import")
}

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 读取 key-value 配置
// 实现者: ConfigManager（从 config_kv 表读取）
pub trait ImportConfigReader {
    /// 读取配置值（不存在返回 None）
    fn get(&self, key: &str) -> RepositoryResult<Option<String>>;

    /// 组装导入配置（缺失项取默认值）
    fn load_import_config(&self) -> RepositoryResult<ImportConfig> {
        let mut config = ImportConfig::default();

        for field in ImportField::ALL {
            if let Some(name) = self.get(&config_keys::header_key(field))? {
                let trimmed = name.trim();
                if !trimmed.is_empty() {
                    config.header_names[field.position()] = trimmed.to_string();
                }
            }
        }

        if let Some(raw) = self.get(config_keys::CONTEXT_ID)? {
            config.context_id = parse_i64(config_keys::CONTEXT_ID, &raw)?;
        }
        if let Some(raw) = self.get(config_keys::USER_ID)? {
            config.user_id = parse_i64(config_keys::USER_ID, &raw)?;
        }
        if let Some(raw) = self.get(config_keys::STORAGE_DIR)? {
            if !raw.trim().is_empty() {
                config.storage_dir = PathBuf::from(raw.trim());
            }
        }

        Ok(config)
    }
}

fn parse_i64(key: &str, raw: &str) -> RepositoryResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|e| RepositoryError::FieldValueError {
            field: key.to_string(),
            message: format!("无法解析为整数: {} ({})", raw, e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapReader(HashMap<String, String>);

    impl ImportConfigReader for MapReader {
        fn get(&self, key: &str) -> RepositoryResult<Option<String>> {
            Ok(self.0.get(key).cloned())
        }
    }

    #[test]
    fn test_defaults_when_empty() {
        let reader = MapReader(HashMap::new());
        let config = reader.load_import_config().unwrap();
        assert_eq!(config.header_name(ImportField::IdNumber), "idnumber");
        assert_eq!(config.context_id, SYSTEM_CONTEXT_ID);
        assert_eq!(config.user_id, DEFAULT_USER_ID);
    }

    #[test]
    fn test_overrides_applied() {
        let mut values = HashMap::new();
        values.insert(config_keys::header_key(ImportField::ShortName), " name ".to_string());
        values.insert(config_keys::USER_ID.to_string(), "7".to_string());
        let config = MapReader(values).load_import_config().unwrap();
        assert_eq!(config.header_name(ImportField::ShortName), "name");
        assert_eq!(config.user_id, 7);
    }

    #[test]
    fn test_invalid_number_rejected() {
        let mut values = HashMap::new();
        values.insert(config_keys::CONTEXT_ID.to_string(), "abc".to_string());
        assert!(MapReader(values).load_import_config().is_err());
    }
}
