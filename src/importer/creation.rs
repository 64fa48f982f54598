// ==========================================
// 能力框架导入系统 - 创建编排器
// ==========================================
// 职责: 先序遍历框架树,逐个持久化框架与能力,
//       产出 导出 ID → 新建能力 映射
// 失败语义: 持久化错误不在此处捕获,直接向上传播
// ==========================================

use crate::config::ImportConfig;
use crate::domain::{
    CompetencyHandle, CompetencyPayload, ExportMapping, FrameworkHandle, FrameworkPayload,
};
use crate::importer::error::ImportResult;
use crate::importer::scale_resolver::ScaleResolver;
use crate::importer::tree_builder::FrameworkTree;
use crate::repository::{CompetencyApi, ScaleCatalog};
use std::collections::HashMap;
use tracing::{debug, info, warn};

// ==========================================
// CreationOutcome - 创建阶段产出
// ==========================================
// 作为规则/关联阶段的显式输入
#[derive(Debug, Clone)]
pub struct CreationOutcome {
    pub framework: FrameworkHandle,
    /// 与 tree.nodes 一一对应（None = 未创建）
    pub created: Vec<Option<CompetencyHandle>>,
    /// idnumber → 新建能力
    pub by_idnumber: HashMap<String, CompetencyHandle>,
    pub export_mapping: ExportMapping,
    /// 因编号/简称为空而跳过的节点数（含其子树）
    pub skipped: usize,
}

impl CreationOutcome {
    pub fn created_count(&self) -> usize {
        self.by_idnumber.len()
    }
}

// ==========================================
// CreationOrchestrator - 创建编排器
// ==========================================
pub struct CreationOrchestrator<'a> {
    api: &'a dyn CompetencyApi,
    catalog: &'a dyn ScaleCatalog,
    config: &'a ImportConfig,
}

impl<'a> CreationOrchestrator<'a> {
    pub fn new(
        api: &'a dyn CompetencyApi,
        catalog: &'a dyn ScaleCatalog,
        config: &'a ImportConfig,
    ) -> Self {
        Self {
            api,
            catalog,
            config,
        }
    }

    /// 执行创建
    pub fn run(
        &self,
        tree: &FrameworkTree,
        scales: &mut ScaleResolver,
    ) -> ImportResult<CreationOutcome> {
        let framework = self.create_framework(tree, scales)?;

        let mut outcome = CreationOutcome {
            framework,
            created: vec![None; tree.len()],
            by_idnumber: HashMap::new(),
            export_mapping: ExportMapping::new(),
            skipped: 0,
        };

        // (节点下标, 父能力 ID; 0 = 顶层)
        let mut stack: Vec<(usize, i64)> = tree.roots.iter().rev().map(|&i| (i, 0)).collect();

        while let Some((index, parent_id)) = stack.pop() {
            let node = tree.node(index);
            let record = &node.record;

            if !record.is_creatable() {
                let subtree = subtree_size(tree, index);
                warn!(
                    row = record.row_number,
                    idnumber = %record.idnumber,
                    shortname = %record.shortname,
                    subtree = subtree,
                    "能力编号或简称为空,跳过该能力及其子能力"
                );
                outcome.skipped += subtree;
                continue;
            }

            let scale = scales.resolve(
                self.catalog,
                &record.scalevalues,
                &record.scaleconfiguration,
                &record.shortname,
                self.config.user_id,
            )?;
            let has_description = !record.description.is_empty();

            let payload = CompetencyPayload {
                framework_id: outcome.framework.id,
                shortname: record.shortname.clone(),
                idnumber: record.idnumber.clone(),
                description: has_description.then(|| record.description.clone()),
                descriptionformat: has_description.then_some(record.descriptionformat),
                scale_id: scale.as_ref().map(|s| s.scale_id),
                scale_configuration: scale.map(|s| s.configuration),
                parent_id,
            };
            let handle = self.api.create_competency(&payload)?;
            debug!(
                competency_id = handle.id,
                idnumber = %handle.idnumber,
                parent_id = parent_id,
                "能力已创建"
            );

            if !record.exportid.is_empty() {
                outcome
                    .export_mapping
                    .insert(record.exportid.clone(), handle.clone());
            }
            outcome
                .by_idnumber
                .insert(record.idnumber.clone(), handle.clone());

            stack.extend(node.children.iter().rev().map(|&child| (child, handle.id)));
            outcome.created[index] = Some(handle);
        }

        info!(
            framework_id = outcome.framework.id,
            created = outcome.created_count(),
            skipped = outcome.skipped,
            export_mappings = outcome.export_mapping.len(),
            "能力创建阶段完成"
        );
        Ok(outcome)
    }

    fn create_framework(
        &self,
        tree: &FrameworkTree,
        scales: &mut ScaleResolver,
    ) -> ImportResult<FrameworkHandle> {
        let record = &tree.framework;
        let scale = scales.resolve(
            self.catalog,
            &record.scalevalues,
            &record.scaleconfiguration,
            &record.shortname,
            self.config.user_id,
        )?;

        let payload = FrameworkPayload {
            shortname: record.shortname.clone(),
            idnumber: record.idnumber.clone(),
            description: record.description.clone(),
            descriptionformat: record.descriptionformat,
            scale_id: scale.as_ref().map(|s| s.scale_id),
            scale_configuration: scale.map(|s| s.configuration),
            taxonomies: record.taxonomies.clone(),
            context_id: self.config.context_id,
        };
        let handle = self.api.create_framework(&payload)?;
        info!(
            framework_id = handle.id,
            idnumber = %handle.idnumber,
            "能力框架已创建"
        );
        Ok(handle)
    }
}

/// 子树节点数（含自身）
fn subtree_size(tree: &FrameworkTree, index: usize) -> usize {
    let mut count = 0;
    let mut stack = vec![index];
    while let Some(i) = stack.pop() {
        count += 1;
        stack.extend(tree.node(i).children.iter().copied());
    }
    count
}
