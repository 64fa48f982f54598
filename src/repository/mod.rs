// ==========================================
// 能力框架导入系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供持久化边界接口与 SQLite 实现,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod competency_api;
pub mod competency_repo;
pub mod error;
pub mod scale_repo;

// 重导出核心仓储
pub use competency_api::{CompetencyApi, ScaleCatalog};
pub use competency_repo::{CompetencyRepository, StoredCompetency};
pub use error::{RepositoryError, RepositoryResult};
pub use scale_repo::ScaleRepository;
