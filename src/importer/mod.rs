// ==========================================
// 能力框架导入系统 - 导入层
// ==========================================
// 流水线: 表格读取 → 列映射 → 行分类 → 建树
//         → 评分标准解析 + 创建 → 规则迁移 + 关联建立
// ==========================================

// 模块声明
pub mod creation;
pub mod csv_reader;
pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod framework_importer;
pub mod linker;
pub mod record_builder;
pub mod rule_registry;
pub mod scale_resolver;
pub mod tree_builder;

// 重导出核心类型
pub use creation::{CreationOrchestrator, CreationOutcome};
pub use csv_reader::{CsvImportReader, TabularReader};
pub use data_cleaner::DataCleaner;
pub use error::{ImportError, ImportResult};
pub use field_mapper::{ColumnMapping, MappingData};
pub use framework_importer::{ImportSession, UploadedContent};
pub use linker::{LinkStats, Linker};
pub use record_builder::{FlatRecordMap, ParsedImport, ParsedRow, RecordBuilder};
pub use rule_registry::{RuleAll, RuleMigration, RulePoints, RuleRegistry};
pub use scale_resolver::{ResolvedScale, ScaleResolver};
pub use tree_builder::{FrameworkTree, TreeBuilder, TreeNode};
