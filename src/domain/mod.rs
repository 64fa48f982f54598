// ==========================================
// 能力框架导入系统 - 领域模型层
// ==========================================
// 职责: 定义解析记录、持久化载荷与句柄、基础类型
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod competency;
pub mod types;

// 重导出核心类型
pub use competency::{
    CompetencyHandle, CompetencyPayload, CompetencyRecord, CompetencyRule, ExportMapping,
    FrameworkHandle, FrameworkPayload, FrameworkRecord, ImportSummary, NewScale, ScaleHandle,
};
pub use types::{Delimiter, ImportField};
