// ==========================================
// 能力框架导入系统 - 规则与关联解析
// ==========================================
// 前置: 创建阶段已完成（全部新建能力 ID 已知）
// 两次独立遍历: 规则迁移 / 关联建立,二者互不依赖
// ==========================================

use crate::domain::CompetencyRule;
use crate::importer::creation::CreationOutcome;
use crate::importer::error::ImportResult;
use crate::importer::rule_registry::RuleRegistry;
use crate::importer::tree_builder::FrameworkTree;
use crate::repository::CompetencyApi;
use tracing::{debug, info, warn};

/// 规则/关联阶段统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub rules_migrated: usize,
    pub rules_skipped: usize,
    pub relations_linked: usize,
    pub relations_skipped: usize,
}

pub struct Linker<'a> {
    api: &'a dyn CompetencyApi,
    registry: &'a RuleRegistry,
}

impl<'a> Linker<'a> {
    pub fn new(api: &'a dyn CompetencyApi, registry: &'a RuleRegistry) -> Self {
        Self { api, registry }
    }

    pub fn run(&self, tree: &FrameworkTree, outcome: &CreationOutcome) -> ImportResult<LinkStats> {
        let mut stats = LinkStats::default();
        self.migrate_rules(tree, outcome, &mut stats)?;
        self.link_relations(tree, outcome, &mut stats)?;

        info!(
            rules_migrated = stats.rules_migrated,
            rules_skipped = stats.rules_skipped,
            relations_linked = stats.relations_linked,
            relations_skipped = stats.relations_skipped,
            "规则与关联阶段完成"
        );
        Ok(stats)
    }

    /// 规则迁移: 已知规则类型 → 迁移配置并写入
    fn migrate_rules(
        &self,
        tree: &FrameworkTree,
        outcome: &CreationOutcome,
        stats: &mut LinkStats,
    ) -> ImportResult<()> {
        for (node, created) in tree.nodes.iter().zip(&outcome.created) {
            let Some(handle) = created else { continue };
            let record = &node.record;
            if record.ruletype.is_empty() {
                continue;
            }

            let Some(rule) = self.registry.lookup(&record.ruletype) else {
                warn!(
                    idnumber = %record.idnumber,
                    ruletype = %record.ruletype,
                    "未知规则类型,跳过"
                );
                stats.rules_skipped += 1;
                continue;
            };

            let old_config = match record.ruleconfig.as_str() {
                "" | "null" => None,
                raw => Some(raw),
            };
            let rule_config = rule.migrate_config(old_config, &outcome.export_mapping)?;

            self.api.update_competency_rule(
                handle.id,
                &CompetencyRule {
                    rule_type: rule.rule_type().to_string(),
                    rule_outcome: record.ruleoutcome,
                    rule_config,
                },
            )?;
            debug!(competency_id = handle.id, ruletype = rule.rule_type(), "规则已迁移");
            stats.rules_migrated += 1;
        }
        Ok(())
    }

    /// 关联建立: 关联编号须在本次导入中已创建
    fn link_relations(
        &self,
        tree: &FrameworkTree,
        outcome: &CreationOutcome,
        stats: &mut LinkStats,
    ) -> ImportResult<()> {
        for (node, created) in tree.nodes.iter().zip(&outcome.created) {
            let Some(handle) = created else { continue };

            for related_idnumber in node.record.related_idnumbers() {
                match outcome.by_idnumber.get(&related_idnumber) {
                    Some(related) if related.id == handle.id => {
                        warn!(idnumber = %node.record.idnumber, "能力不能与自身关联,跳过");
                        stats.relations_skipped += 1;
                    }
                    Some(related) => {
                        self.api.add_related(handle.id, related.id)?;
                        stats.relations_linked += 1;
                    }
                    None => {
                        warn!(
                            idnumber = %node.record.idnumber,
                            related = %related_idnumber,
                            "关联能力不在本次导入中,跳过"
                        );
                        stats.relations_skipped += 1;
                    }
                }
            }
        }
        Ok(())
    }
}
