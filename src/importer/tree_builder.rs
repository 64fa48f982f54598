// ==========================================
// 能力框架导入系统 - 扁平表 → 框架树
// ==========================================
// 算法: 一次线性扫描建立 parentidnumber → 子节点 索引,
//       再用显式栈做先序遍历（不递归）
// 同一父节点下的子节点保持源文件出现顺序
// ==========================================

use crate::domain::{CompetencyRecord, FrameworkRecord};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::record_builder::FlatRecordMap;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// 树节点（children 为 nodes 中的下标）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub record: CompetencyRecord,
    pub children: Vec<usize>,
}

// ==========================================
// FrameworkTree - 以框架为根的能力树
// ==========================================
#[derive(Debug, Clone)]
pub struct FrameworkTree {
    pub framework: FrameworkRecord,
    /// 先序排列的全部树成员
    pub nodes: Vec<TreeNode>,
    /// 框架直属子节点
    pub roots: Vec<usize>,
    /// 父编号无法解析而被略过的能力编号
    pub omitted: Vec<String>,
}

impl FrameworkTree {
    /// 树成员数
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: usize) -> &TreeNode {
        &self.nodes[index]
    }
}

pub struct TreeBuilder;

impl TreeBuilder {
    /// 构建框架树
    ///
    /// # 返回
    /// - Ok(FrameworkTree): 可达记录恰好出现一次
    /// - Err(CycleDetected): 父编号链成环（含自引用）
    pub fn build(framework: FrameworkRecord, flat: &FlatRecordMap) -> ImportResult<FrameworkTree> {
        let records = flat.records();

        let mut children_of: HashMap<&str, Vec<usize>> = HashMap::new();
        for (pos, record) in records.iter().enumerate() {
            children_of
                .entry(record.parentidnumber.as_str())
                .or_default()
                .push(pos);
        }

        let mut nodes: Vec<TreeNode> = Vec::with_capacity(records.len());
        let mut roots = Vec::new();
        let mut seen = vec![false; records.len()];

        // (扁平表位置, 父节点在 nodes 中的下标)
        let mut stack: Vec<(usize, Option<usize>)> = children_of
            .get("")
            .map(|positions| positions.iter().rev().map(|&p| (p, None)).collect())
            .unwrap_or_default();

        while let Some((pos, parent)) = stack.pop() {
            let record = &records[pos];
            if seen[pos] {
                return Err(ImportError::CycleDetected {
                    idnumber: record.idnumber.clone(),
                });
            }
            seen[pos] = true;

            let index = nodes.len();
            nodes.push(TreeNode {
                record: record.clone(),
                children: Vec::new(),
            });
            match parent {
                Some(parent_index) => nodes[parent_index].children.push(index),
                None => roots.push(index),
            }

            // 空编号不展开,否则会与框架直属节点混淆
            if record.idnumber.is_empty() {
                continue;
            }
            if let Some(positions) = children_of.get(record.idnumber.as_str()) {
                stack.extend(positions.iter().rev().map(|&p| (p, Some(index))));
            }
        }

        let mut omitted = Vec::new();
        for (pos, record) in records.iter().enumerate() {
            if seen[pos] {
                continue;
            }
            if let Some(idnumber) = find_parent_cycle(record, flat) {
                return Err(ImportError::CycleDetected { idnumber });
            }
            warn!(
                idnumber = %record.idnumber,
                parentidnumber = %record.parentidnumber,
                row = record.row_number,
                "父能力编号无法解析,该能力不会导入"
            );
            omitted.push(record.idnumber.clone());
        }

        debug!(
            members = nodes.len(),
            roots = roots.len(),
            omitted = omitted.len(),
            "能力树构建完成"
        );

        Ok(FrameworkTree {
            framework,
            nodes,
            roots,
            omitted,
        })
    }
}

/// 沿父编号链向上查找,链上重复出现即为环（返回环上的编号）
fn find_parent_cycle(record: &CompetencyRecord, flat: &FlatRecordMap) -> Option<String> {
    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(record.idnumber.as_str());

    let mut current = record;
    loop {
        let parent_id = current.parentidnumber.as_str();
        if parent_id.is_empty() {
            return None;
        }
        if !visited.insert(parent_id) {
            return Some(parent_id.to_string());
        }
        match flat.get(parent_id) {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}
