// ==========================================
// 能力框架导入系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + CSV
// 系统定位: 从扁平表格重建能力框架树并持久化
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 记录、载荷与句柄
pub mod domain;

// 数据仓储层 - 持久化边界与 SQLite 实现
pub mod repository;

// 导入层 - 导入流水线
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    CompetencyHandle, CompetencyRecord, Delimiter, ExportMapping, FrameworkHandle,
    FrameworkRecord, ImportField, ImportSummary, ScaleHandle,
};

// 导入
pub use importer::{
    CsvImportReader, ImportError, ImportResult, ImportSession, MappingData, RuleRegistry,
    TabularReader, UploadedContent,
};

// 仓储
pub use repository::{
    CompetencyApi, CompetencyRepository, RepositoryError, RepositoryResult, ScaleCatalog,
    ScaleRepository,
};

// 配置
pub use config::{ConfigManager, ImportConfig, ImportConfigReader};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "能力框架导入系统";
