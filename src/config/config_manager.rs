// ==========================================
// 能力框架导入系统 - 配置管理器
// ==========================================
// 职责: 配置读写、一次性默认值初始化、已保存列映射
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config::{config_keys, ImportConfig, ImportConfigReader};
use crate::db::open_sqlite_connection;
use crate::domain::ImportField;
use crate::importer::field_mapper::MappingData;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// 全局作用域
const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入配置值（UPSERT）
    pub fn set(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// 一次性初始化默认配置
    ///
    /// 只插入缺失的键，已有值保持不变（幂等）
    ///
    /// # 返回
    /// - Ok(usize): 新写入的配置项数量
    pub fn seed_defaults(&self) -> RepositoryResult<usize> {
        let defaults = ImportConfig::default();
        let mut entries: Vec<(String, String)> = ImportField::ALL
            .iter()
            .map(|f| (config_keys::header_key(*f), defaults.header_name(*f).to_string()))
            .collect();
        entries.push((config_keys::CONTEXT_ID.to_string(), defaults.context_id.to_string()));
        entries.push((config_keys::USER_ID.to_string(), defaults.user_id.to_string()));
        entries.push((
            config_keys::STORAGE_DIR.to_string(),
            defaults.storage_dir.display().to_string(),
        ));

        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let mut inserted = 0;
        for (key, value) in &entries {
            inserted += tx.execute(
                "INSERT OR IGNORE INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)",
                params![GLOBAL_SCOPE, key, value],
            )?;
        }
        tx.commit()?;

        info!(inserted = inserted, total = entries.len(), "默认导入配置初始化完成");
        Ok(inserted)
    }

    /// 保存列映射（JSON）
    pub fn save_mapping(&self, name: &str, mapping: &MappingData) -> RepositoryResult<()> {
        let json = serde_json::to_string(mapping)?;
        self.set(&config_keys::mapping_key(name), &json)?;
        debug!(name = %name, "列映射已保存");
        Ok(())
    }

    /// 读取已保存的列映射
    pub fn load_mapping(&self, name: &str) -> RepositoryResult<Option<MappingData>> {
        match self.get(&config_keys::mapping_key(name))? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

impl ImportConfigReader for ConfigManager {
    fn get(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn setup_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_seed_defaults_is_idempotent() {
        let manager = setup_manager();
        let first = manager.seed_defaults().unwrap();
        assert_eq!(first, ImportField::COUNT + 3);
        assert_eq!(manager.seed_defaults().unwrap(), 0);
        assert_eq!(
            manager
                .get(&config_keys::header_key(ImportField::ExportId))
                .unwrap()
                .as_deref(),
            Some("exportid")
        );
    }

    #[test]
    fn test_seed_keeps_existing_values() {
        let manager = setup_manager();
        manager
            .set(&config_keys::header_key(ImportField::ShortName), "Name")
            .unwrap();
        manager.seed_defaults().unwrap();

        let config = manager.load_import_config().unwrap();
        assert_eq!(config.header_name(ImportField::ShortName), "Name");
    }

    #[test]
    fn test_mapping_roundtrip() {
        let manager = setup_manager();
        assert!(manager.load_mapping("default").unwrap().is_none());

        let mut mapping = MappingData::positional();
        mapping.set(ImportField::Taxonomies, None);
        manager.save_mapping("default", &mapping).unwrap();

        let loaded = manager.load_mapping("default").unwrap().unwrap();
        assert_eq!(loaded, mapping);
    }
}
