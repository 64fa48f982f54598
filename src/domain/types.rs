// ==========================================
// 能力框架导入系统 - 领域类型定义
// ==========================================
// 职责: 导入字段枚举、分隔符、规则结果等基础类型
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 导入字段 (Import Field)
// ==========================================
// 顺序即默认列位置: 第 N 个字段 → 第 N 列
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportField {
    ParentIdNumber,
    IdNumber,
    ShortName,
    Description,
    DescriptionFormat,
    ScaleValues,
    ScaleConfiguration,
    RuleType,
    RuleOutcome,
    RuleConfig,
    RelatedIdNumbers,
    ExportId,
    IsFramework,
    Taxonomies,
}

impl ImportField {
    /// 字段总数
    pub const COUNT: usize = 14;

    /// 按默认列顺序排列的全部字段
    pub const ALL: [ImportField; ImportField::COUNT] = [
        ImportField::ParentIdNumber,
        ImportField::IdNumber,
        ImportField::ShortName,
        ImportField::Description,
        ImportField::DescriptionFormat,
        ImportField::ScaleValues,
        ImportField::ScaleConfiguration,
        ImportField::RuleType,
        ImportField::RuleOutcome,
        ImportField::RuleConfig,
        ImportField::RelatedIdNumbers,
        ImportField::ExportId,
        ImportField::IsFramework,
        ImportField::Taxonomies,
    ];

    /// 默认列位置
    pub fn position(self) -> usize {
        self as usize
    }

    /// 字段名（同时作为默认表头名与配置键后缀）
    pub fn as_str(self) -> &'static str {
        match self {
            ImportField::ParentIdNumber => "parentidnumber",
            ImportField::IdNumber => "idnumber",
            ImportField::ShortName => "shortname",
            ImportField::Description => "description",
            ImportField::DescriptionFormat => "descriptionformat",
            ImportField::ScaleValues => "scalevalues",
            ImportField::ScaleConfiguration => "scaleconfiguration",
            ImportField::RuleType => "ruletype",
            ImportField::RuleOutcome => "ruleoutcome",
            ImportField::RuleConfig => "ruleconfig",
            ImportField::RelatedIdNumbers => "relatedidnumbers",
            ImportField::ExportId => "exportid",
            ImportField::IsFramework => "isframework",
            ImportField::Taxonomies => "taxonomies",
        }
    }

    /// 从字段名解析
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase();
        ImportField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == normalized)
    }
}

impl fmt::Display for ImportField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 分隔符 (Delimiter)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    #[default]
    Comma,
    Semicolon,
    Colon,
    Tab,
}

impl Delimiter {
    /// 分隔符字节
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Colon => b':',
            Delimiter::Tab => b'\t',
        }
    }

    /// 从名称解析（comma/semicolon/colon/tab）
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "comma" | "," => Some(Delimiter::Comma),
            "semicolon" | ";" => Some(Delimiter::Semicolon),
            "colon" | ":" => Some(Delimiter::Colon),
            "tab" | "\t" => Some(Delimiter::Tab),
            _ => None,
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delimiter::Comma => write!(f, "comma"),
            Delimiter::Semicolon => write!(f, "semicolon"),
            Delimiter::Colon => write!(f, "colon"),
            Delimiter::Tab => write!(f, "tab"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_positions_follow_declaration_order() {
        for (idx, field) in ImportField::ALL.iter().enumerate() {
            assert_eq!(field.position(), idx);
        }
        assert_eq!(ImportField::Taxonomies.position(), 13);
    }

    #[test]
    fn test_field_from_name() {
        assert_eq!(
            ImportField::from_name(" IdNumber "),
            Some(ImportField::IdNumber)
        );
        assert_eq!(ImportField::from_name("unknown"), None);
    }

    #[test]
    fn test_delimiter_from_name() {
        assert_eq!(Delimiter::from_name("tab"), Some(Delimiter::Tab));
        assert_eq!(Delimiter::from_name(";"), Some(Delimiter::Semicolon));
        assert_eq!(Delimiter::from_name("pipe"), None);
        assert_eq!(Delimiter::Tab.as_byte(), b'\t');
    }
}
