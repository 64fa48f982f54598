// ==========================================
// 能力框架导入系统 - 评分标准仓储
// ==========================================
// 职责: 实现 ScaleCatalog（使用 rusqlite）
// 存储: scale 表（scale_values 以 JSON 数组落库，保持标签顺序）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::{NewScale, ScaleHandle};
use crate::repository::competency_api::ScaleCatalog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// ScaleRepository - 评分标准仓储
// ==========================================
pub struct ScaleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ScaleRepository {
    /// 创建新的 ScaleRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 统计评分标准数量
    pub fn count_scales(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM scale", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl ScaleCatalog for ScaleRepository {
    /// 全局评分标准 = course_id 为 0 的记录，按 ID 升序
    fn fetch_all_scales(&self) -> RepositoryResult<Vec<ScaleHandle>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, scale_values FROM scale WHERE course_id = 0 ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut scales = Vec::with_capacity(rows.len());
        for (id, name, raw_values) in rows {
            let values: Vec<String> = serde_json::from_str(&raw_values)?;
            scales.push(ScaleHandle { id, name, values });
        }
        Ok(scales)
    }

    fn create_scale(&self, scale: &NewScale) -> RepositoryResult<ScaleHandle> {
        if scale.values.is_empty() {
            return Err(RepositoryError::ValidationError(
                "评分标准至少需要一个取值".to_string(),
            ));
        }

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO scale (name, user_id, course_id, scale_values, description, standard, created_at)
            VALUES (?1, ?2, 0, ?3, ?4, 1, ?5)
            "#,
            params![
                scale.name,
                scale.user_id,
                serde_json::to_string(&scale.values)?,
                scale.description,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(ScaleHandle {
            id: conn.last_insert_rowid(),
            name: scale.name.clone(),
            values: scale.values.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};

    fn setup_repo() -> ScaleRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        ScaleRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_create_and_fetch_keeps_label_order() {
        let repo = setup_repo();
        let created = repo
            .create_scale(&NewScale {
                name: "Scale A".to_string(),
                user_id: 2,
                values: vec!["Not yet".to_string(), "Competent".to_string()],
                description: String::new(),
            })
            .unwrap();

        let all = repo.fetch_all_scales().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, created.id);
        assert_eq!(all[0].values, vec!["Not yet", "Competent"]);
        assert_eq!(repo.count_scales().unwrap(), 1);
    }

    #[test]
    fn test_empty_scale_rejected() {
        let repo = setup_repo();
        let result = repo.create_scale(&NewScale {
            name: "Empty".to_string(),
            user_id: 2,
            values: Vec::new(),
            description: String::new(),
        });
        assert!(matches!(result, Err(RepositoryError::ValidationError(_))));
    }
}
