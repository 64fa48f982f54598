// ==========================================
// 能力框架导入系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 提供建库脚本（框架/能力/评分标准/关联/配置）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS scale (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            user_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL DEFAULT 0,
            scale_values TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            standard INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS competency_framework (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            shortname TEXT NOT NULL,
            idnumber TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            descriptionformat INTEGER NOT NULL DEFAULT 0,
            scale_id INTEGER REFERENCES scale(id),
            scale_configuration TEXT,
            taxonomies TEXT NOT NULL DEFAULT '',
            context_id INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS competency (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            framework_id INTEGER NOT NULL REFERENCES competency_framework(id) ON DELETE CASCADE,
            parent_id INTEGER NOT NULL DEFAULT 0,
            path TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0,
            shortname TEXT NOT NULL,
            idnumber TEXT NOT NULL,
            description TEXT,
            descriptionformat INTEGER,
            scale_id INTEGER REFERENCES scale(id),
            scale_configuration TEXT,
            rule_type TEXT,
            rule_outcome INTEGER NOT NULL DEFAULT 0,
            rule_config TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (framework_id, idnumber)
        );

        CREATE INDEX IF NOT EXISTS idx_competency_parent ON competency(framework_id, parent_id);

        CREATE TABLE IF NOT EXISTS related_competency (
            competency_id INTEGER NOT NULL REFERENCES competency(id) ON DELETE CASCADE,
            related_competency_id INTEGER NOT NULL REFERENCES competency(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            PRIMARY KEY (competency_id, related_competency_id)
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), None);
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(
            read_schema_version(&conn).unwrap(),
            Some(CURRENT_SCHEMA_VERSION)
        );
    }
}
