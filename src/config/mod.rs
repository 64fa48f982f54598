// ==========================================
// 能力框架导入系统 - 配置层
// ==========================================
// 职责: 导入配置值对象、配置读取接口、配置管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config;

// 重导出核心配置类型
pub use config_manager::ConfigManager;
pub use import_config::{config_keys, ImportConfig, ImportConfigReader};
