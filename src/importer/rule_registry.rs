// ==========================================
// 能力框架导入系统 - 规则能力注册表
// ==========================================
// 职责: 规则类型名 → 配置迁移能力
// 未知规则类型解析为 None,由调用方跳过
// ==========================================

use crate::domain::ExportMapping;
use crate::importer::error::{ImportError, ImportResult};
use serde_json::Value;
use std::collections::HashMap;

/// "全部子能力完成"规则
pub const RULE_ALL: &str = "core_competency\\competency_rule_all";
/// "子能力积分"规则
pub const RULE_POINTS: &str = "core_competency\\competency_rule_points";

// ==========================================
// RuleMigration Trait
// ==========================================
// 用途: 将规则配置中的导出 ID 改写为新建能力 ID
pub trait RuleMigration: Send + Sync {
    /// 规则类型完全限定名
    fn rule_type(&self) -> &'static str;

    /// 迁移配置（None = 无配置）
    fn migrate_config(
        &self,
        config: Option<&str>,
        mapping: &ExportMapping,
    ) -> ImportResult<Option<String>>;
}

/// 全部子能力完成: 配置原样返回
pub struct RuleAll;

impl RuleMigration for RuleAll {
    fn rule_type(&self) -> &'static str {
        RULE_ALL
    }

    fn migrate_config(
        &self,
        config: Option<&str>,
        _mapping: &ExportMapping,
    ) -> ImportResult<Option<String>> {
        Ok(config.map(str::to_string))
    }
}

/// 子能力积分: competencies[].id 按导出映射改写
///
/// 配置形如 `{"base":{"points":2},"competencies":[{"id":"exp-1","points":1,"required":0}]}`
pub struct RulePoints;

impl RuleMigration for RulePoints {
    fn rule_type(&self) -> &'static str {
        RULE_POINTS
    }

    fn migrate_config(
        &self,
        config: Option<&str>,
        mapping: &ExportMapping,
    ) -> ImportResult<Option<String>> {
        let Some(raw) = config else {
            return Ok(None);
        };
        let migration_error = |message: String| ImportError::RuleMigration {
            rule_type: RULE_POINTS.to_string(),
            message,
        };

        let mut value: Value =
            serde_json::from_str(raw).map_err(|e| migration_error(e.to_string()))?;

        if let Some(competencies) = value
            .get_mut("competencies")
            .and_then(Value::as_array_mut)
        {
            for entry in competencies.iter_mut() {
                let exportid = match entry.get("id") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    _ => return Err(migration_error("积分规则条目缺少 id".to_string())),
                };
                let new_id = mapping.resolve_id(&exportid).ok_or_else(|| {
                    migration_error(format!("导出 ID 未在本次导入中创建: {}", exportid))
                })?;
                if let Some(obj) = entry.as_object_mut() {
                    obj.insert("id".to_string(), Value::from(new_id));
                }
            }
        }

        serde_json::to_string(&value)
            .map(Some)
            .map_err(|e| migration_error(e.to_string()))
    }
}

// ==========================================
// RuleRegistry - 规则类型注册表
// ==========================================
pub struct RuleRegistry {
    rules: HashMap<&'static str, Box<dyn RuleMigration>>,
}

impl RuleRegistry {
    /// 空注册表
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    pub fn register(&mut self, rule: Box<dyn RuleMigration>) {
        self.rules.insert(rule.rule_type(), rule);
    }

    /// 查找规则能力（容忍前导反斜杠）
    pub fn lookup(&self, rule_type: &str) -> Option<&dyn RuleMigration> {
        let normalized = rule_type.trim().trim_start_matches('\\');
        self.rules.get(normalized).map(|rule| rule.as_ref())
    }
}

impl Default for RuleRegistry {
    /// 内置规则: rule_all / rule_points
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(RuleAll));
        registry.register(Box::new(RulePoints));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CompetencyHandle;

    fn mapping() -> ExportMapping {
        let mut mapping = ExportMapping::new();
        mapping.insert(
            "11",
            CompetencyHandle {
                id: 501,
                framework_id: 1,
                idnumber: "C1".to_string(),
                shortname: "C1".to_string(),
            },
        );
        mapping
    }

    #[test]
    fn test_lookup_tolerates_leading_backslash() {
        let registry = RuleRegistry::default();
        assert!(registry.lookup(RULE_ALL).is_some());
        assert!(registry
            .lookup("\\core_competency\\competency_rule_points")
            .is_some());
        assert!(registry.lookup("core_competency\\unknown_rule").is_none());
        assert!(registry.lookup("").is_none());
    }

    #[test]
    fn test_rule_all_passthrough() {
        let out = RuleAll.migrate_config(Some("{\"x\":1}"), &mapping()).unwrap();
        assert_eq!(out.as_deref(), Some("{\"x\":1}"));
        assert_eq!(RuleAll.migrate_config(None, &mapping()).unwrap(), None);
    }

    #[test]
    fn test_rule_points_remaps_ids() {
        let raw = r#"{"base":{"points":2},"competencies":[{"id":11,"points":2,"required":1}]}"#;
        let out = RulePoints.migrate_config(Some(raw), &mapping()).unwrap().unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["competencies"][0]["id"], 501);
        assert_eq!(value["base"]["points"], 2);

        let raw_str_id = r#"{"base":{"points":1},"competencies":[{"id":"11","points":1,"required":0}]}"#;
        let out = RulePoints
            .migrate_config(Some(raw_str_id), &mapping())
            .unwrap()
            .unwrap();
        assert!(out.contains("501"));
    }

    #[test]
    fn test_rule_points_unknown_export_id_fails() {
        let raw = r#"{"base":{"points":1},"competencies":[{"id":99,"points":1,"required":0}]}"#;
        let err = RulePoints.migrate_config(Some(raw), &mapping()).unwrap_err();
        assert!(matches!(err, ImportError::RuleMigration { .. }));
    }
}
