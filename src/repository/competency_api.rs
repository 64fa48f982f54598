// ==========================================
// 能力框架导入系统 - 持久化接口 Trait
// ==========================================
// 职责: 定义导入流程所依赖的持久化边界（不包含实现）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::{
    CompetencyHandle, CompetencyPayload, CompetencyRule, FrameworkHandle, FrameworkPayload,
    NewScale, ScaleHandle,
};
use crate::repository::error::RepositoryResult;

// ==========================================
// CompetencyApi Trait
// ==========================================
// 用途: 框架/能力的创建与关联
// 实现者: CompetencyRepository（使用 rusqlite）
pub trait CompetencyApi {
    /// 创建能力框架
    ///
    /// # 返回
    /// - Ok(FrameworkHandle): 持久化后的框架句柄
    /// - Err: 校验失败或数据库错误（原样向上传播）
    fn create_framework(&self, payload: &FrameworkPayload) -> RepositoryResult<FrameworkHandle>;

    /// 创建能力
    ///
    /// # 参数
    /// - payload.parent_id: 0 表示顶层能力
    fn create_competency(&self, payload: &CompetencyPayload)
        -> RepositoryResult<CompetencyHandle>;

    /// 写入能力的自动化规则（规则类型/结果/配置）
    fn update_competency_rule(
        &self,
        competency_id: i64,
        rule: &CompetencyRule,
    ) -> RepositoryResult<()>;

    /// 建立两个能力之间的关联
    fn add_related(&self, competency_id: i64, related_id: i64) -> RepositoryResult<()>;
}

// ==========================================
// ScaleCatalog Trait
// ==========================================
// 用途: 全局评分标准目录
// 实现者: ScaleRepository（使用 rusqlite）
pub trait ScaleCatalog {
    /// 读取全部全局评分标准
    fn fetch_all_scales(&self) -> RepositoryResult<Vec<ScaleHandle>>;

    /// 新建评分标准
    fn create_scale(&self, scale: &NewScale) -> RepositoryResult<ScaleHandle>;
}
