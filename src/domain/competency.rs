// ==========================================
// 能力框架导入系统 - 能力领域模型
// ==========================================
// 职责: 解析记录、持久化载荷、持久化句柄、导出映射
// 用途: 导入层产出,仓储层消费
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

// ==========================================
// FrameworkRecord - 框架行解析结果
// ==========================================
// 每次导入恰好一个,缺失即为导入文件无效
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkRecord {
    pub idnumber: String,           // 框架编号（已清洗,≤100 字符）
    pub shortname: String,          // 框架简称（已清洗,≤100 字符）
    pub description: String,        // 描述（富文本原样保留）
    pub descriptionformat: i32,     // 描述格式
    pub scalevalues: String,        // 评分标准取值（原始字符串）
    pub scaleconfiguration: String, // 评分标准配置（原始 JSON）
    pub taxonomies: String,         // 层级分类名（原始字符串）
    pub row_number: usize,          // 源文件行号
}

// ==========================================
// CompetencyRecord - 能力行解析结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencyRecord {
    pub parentidnumber: String,     // 父能力编号（空 = 框架直属）
    pub idnumber: String,           // 能力编号（扁平表主键）
    pub shortname: String,          // 能力简称
    pub description: String,        // 描述（富文本原样保留）
    pub descriptionformat: i32,     // 描述格式
    pub ruletype: String,           // 规则类型（完全限定名或空）
    pub ruleoutcome: i32,           // 规则结果
    pub ruleconfig: String,         // 规则配置（JSON 或字面量 "null"）
    pub relatedidnumbers: String,   // 关联能力编号（逗号分隔,单个编号内的逗号转义为 %2C）
    pub exportid: String,           // 导出 ID（仅用于本次导入内的行间引用）
    pub scalevalues: String,        // 评分标准取值（原始字符串）
    pub scaleconfiguration: String, // 评分标准配置（原始 JSON）
    pub row_number: usize,          // 源文件行号
}

impl CompetencyRecord {
    /// 是否满足创建条件（编号与简称均非空）
    pub fn is_creatable(&self) -> bool {
        !self.idnumber.is_empty() && !self.shortname.is_empty()
    }

    /// 拆分关联能力编号
    ///
    /// 逗号为分隔符,`%2C` 还原为编号内部的字面逗号
    pub fn related_idnumbers(&self) -> Vec<String> {
        if self.relatedidnumbers.is_empty() {
            return Vec::new();
        }
        self.relatedidnumbers
            .split(',')
            .map(|raw| raw.replace("%2C", ","))
            .filter(|idnumber| !idnumber.is_empty())
            .collect()
    }
}

// ==========================================
// 持久化载荷 (Payload)
// ==========================================

/// 框架创建载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkPayload {
    pub shortname: String,
    pub idnumber: String,
    pub description: String,
    pub descriptionformat: i32,
    pub scale_id: Option<i64>,
    pub scale_configuration: Option<String>,
    pub taxonomies: String,
    pub context_id: i64,
}

/// 能力创建载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencyPayload {
    pub framework_id: i64,
    pub shortname: String,
    pub idnumber: String,
    pub description: Option<String>,
    pub descriptionformat: Option<i32>,
    pub scale_id: Option<i64>,
    pub scale_configuration: Option<String>,
    pub parent_id: i64, // 0 = 顶层能力
}

/// 规则写入载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencyRule {
    pub rule_type: String,
    pub rule_outcome: i32,
    pub rule_config: Option<String>,
}

/// 评分标准创建载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewScale {
    pub name: String,
    pub user_id: i64,
    pub values: Vec<String>,
    pub description: String,
}

// ==========================================
// 持久化句柄 (Handle)
// ==========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkHandle {
    pub id: i64,
    pub idnumber: String,
    pub shortname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencyHandle {
    pub id: i64,
    pub framework_id: i64,
    pub idnumber: String,
    pub shortname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleHandle {
    pub id: i64,
    pub name: String,
    pub values: Vec<String>,
}

// ==========================================
// ExportMapping - 导出 ID → 新建能力
// ==========================================
// 作用域: 单次导入会话,import() 返回后丢弃
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportMapping {
    entries: HashMap<String, CompetencyHandle>,
}

impl ExportMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, exportid: impl Into<String>, handle: CompetencyHandle) {
        self.entries.insert(exportid.into(), handle);
    }

    pub fn get(&self, exportid: &str) -> Option<&CompetencyHandle> {
        self.entries.get(exportid)
    }

    /// 导出 ID 对应的新建能力 ID
    pub fn resolve_id(&self, exportid: &str) -> Option<i64> {
        self.entries.get(exportid).map(|h| h.id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ==========================================
// ImportSummary - 导入汇总
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub import_id: String,
    pub framework: FrameworkHandle,
    pub competencies_created: usize,
    pub competencies_skipped: usize, // 编号或简称为空而跳过的节点（含整棵子树）
    pub orphans_omitted: usize,      // 父编号无法解析而未进入树的记录
    pub scales_created: usize,
    pub scales_reused: usize,
    pub rules_migrated: usize,
    pub rules_skipped: usize,        // 未知规则类型
    pub relations_linked: usize,
    pub relations_skipped: usize,    // 悬空关联编号
    pub export_mappings: usize,
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_related(related: &str) -> CompetencyRecord {
        CompetencyRecord {
            parentidnumber: String::new(),
            idnumber: "COMP1".to_string(),
            shortname: "Competency 1".to_string(),
            description: String::new(),
            descriptionformat: 0,
            ruletype: String::new(),
            ruleoutcome: 0,
            ruleconfig: String::new(),
            relatedidnumbers: related.to_string(),
            exportid: String::new(),
            scalevalues: String::new(),
            scaleconfiguration: String::new(),
            row_number: 2,
        }
    }

    #[test]
    fn test_related_idnumbers_unescape_comma() {
        let record = record_with_related("A%2CB,C");
        assert_eq!(record.related_idnumbers(), vec!["A,B".to_string(), "C".to_string()]);
    }

    #[test]
    fn test_related_idnumbers_empty() {
        let record = record_with_related("");
        assert!(record.related_idnumbers().is_empty());
    }

    #[test]
    fn test_is_creatable() {
        let mut record = record_with_related("");
        assert!(record.is_creatable());
        record.shortname.clear();
        assert!(!record.is_creatable());
    }

    #[test]
    fn test_export_mapping_resolve() {
        let mut mapping = ExportMapping::new();
        assert!(mapping.is_empty());
        mapping.insert(
            "exp-1",
            CompetencyHandle {
                id: 42,
                framework_id: 1,
                idnumber: "COMP1".to_string(),
                shortname: "Competency 1".to_string(),
            },
        );
        assert_eq!(mapping.resolve_id("exp-1"), Some(42));
        assert_eq!(mapping.resolve_id("exp-2"), None);
        assert_eq!(mapping.len(), 1);
    }
}
