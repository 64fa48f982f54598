// ==========================================
// 能力框架导入系统 - 列映射解析器
// ==========================================
// 职责: 表头选择 → 逻辑字段 → 单元格下标
// 两种来源: 位置默认（第 N 个字段 → 第 N 列）/ 表头名匹配
// ==========================================

use crate::config::ImportConfig;
use crate::domain::ImportField;
use serde::{Deserialize, Serialize};

// ==========================================
// MappingData - 用户提交的表头选择
// ==========================================
// selections[field.position()] = 选中的列下标（None = 未提供该列）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingData {
    pub selections: Vec<Option<usize>>,
}

impl MappingData {
    /// 位置默认映射: 字段 0..13 → 列 0..13
    pub fn positional() -> Self {
        Self {
            selections: (0..ImportField::COUNT).map(Some).collect(),
        }
    }

    /// 按表头名匹配（去空白、忽略大小写）
    ///
    /// 未匹配的字段 → None
    pub fn from_header_names(found: &[String], config: &ImportConfig) -> Self {
        let normalized: Vec<String> = found.iter().map(|h| h.trim().to_lowercase()).collect();
        let selections = ImportField::ALL
            .iter()
            .map(|field| {
                let expected = config.header_name(*field).trim().to_lowercase();
                normalized.iter().position(|h| *h == expected)
            })
            .collect();
        Self { selections }
    }

    pub fn set(&mut self, field: ImportField, index: Option<usize>) {
        if self.selections.len() < ImportField::COUNT {
            self.selections.resize(ImportField::COUNT, None);
        }
        self.selections[field.position()] = index;
    }

    pub fn get(&self, field: ImportField) -> Option<usize> {
        self.selections.get(field.position()).copied().flatten()
    }
}

// ==========================================
// ColumnMapping - 字段 → 下标查找表
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    indexes: [Option<usize>; ImportField::COUNT],
}

impl ColumnMapping {
    pub fn positional() -> Self {
        Self::from_mapping_data(&MappingData::positional())
    }

    pub fn from_mapping_data(data: &MappingData) -> Self {
        let mut indexes = [None; ImportField::COUNT];
        for field in ImportField::ALL {
            indexes[field.position()] = data.get(field);
        }
        Self { indexes }
    }

    pub fn index(&self, field: ImportField) -> Option<usize> {
        self.indexes[field.position()]
    }

    /// 读取字段值（下标缺失或越界 → 空字符串）
    pub fn cell<'a>(&self, row: &'a [String], field: ImportField) -> &'a str {
        self.index(field)
            .and_then(|idx| row.get(idx))
            .map(String::as_str)
            .unwrap_or("")
    }
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self::positional()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_positional_mapping() {
        let mapping = ColumnMapping::positional();
        assert_eq!(mapping.index(ImportField::ParentIdNumber), Some(0));
        assert_eq!(mapping.index(ImportField::Taxonomies), Some(13));
    }

    #[test]
    fn test_short_row_yields_empty() {
        let mapping = ColumnMapping::positional();
        let r = row(&["", "COMP1", "Competency 1"]);
        assert_eq!(mapping.cell(&r, ImportField::IdNumber), "COMP1");
        assert_eq!(mapping.cell(&r, ImportField::ExportId), "");
        assert_eq!(mapping.cell(&r, ImportField::Taxonomies), "");
    }

    #[test]
    fn test_absent_field_yields_empty() {
        let mut data = MappingData::positional();
        data.set(ImportField::ShortName, None);
        let mapping = ColumnMapping::from_mapping_data(&data);
        let r = row(&["", "COMP1", "Competency 1"]);
        assert_eq!(mapping.cell(&r, ImportField::ShortName), "");
    }

    #[test]
    fn test_from_header_names_reordered() {
        let found = row(&[" IdNumber ", "shortname", "isframework", "unrelated"]);
        let data = MappingData::from_header_names(&found, &ImportConfig::default());
        assert_eq!(data.get(ImportField::IdNumber), Some(0));
        assert_eq!(data.get(ImportField::ShortName), Some(1));
        assert_eq!(data.get(ImportField::IsFramework), Some(2));
        assert_eq!(data.get(ImportField::ParentIdNumber), None);

        let mapping = ColumnMapping::from_mapping_data(&data);
        let r = row(&["FW1", "Framework One", "1"]);
        assert_eq!(mapping.cell(&r, ImportField::ShortName), "Framework One");
        assert_eq!(mapping.cell(&r, ImportField::Description), "");
    }

    #[test]
    fn test_truncated_mapping_data_tolerated() {
        let data = MappingData {
            selections: vec![Some(0)],
        };
        assert_eq!(data.get(ImportField::ParentIdNumber), Some(0));
        assert_eq!(data.get(ImportField::IdNumber), None);
    }
}
