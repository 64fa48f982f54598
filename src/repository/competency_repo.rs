// ==========================================
// 能力框架导入系统 - 能力数据仓储
// ==========================================
// 职责: 实现 CompetencyApi（使用 rusqlite）
// 红线: Repository 不含业务逻辑，只负责数据访问与完整性校验
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::{
    CompetencyHandle, CompetencyPayload, CompetencyRule, FrameworkHandle, FrameworkPayload,
};
use crate::repository::competency_api::CompetencyApi;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

/// 已落库能力的完整视图（查询用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCompetency {
    pub id: i64,
    pub framework_id: i64,
    pub parent_id: i64,
    pub path: String,
    pub sort_order: i64,
    pub shortname: String,
    pub idnumber: String,
    pub description: Option<String>,
    pub scale_id: Option<i64>,
    pub scale_configuration: Option<String>,
    pub rule_type: Option<String>,
    pub rule_outcome: i32,
    pub rule_config: Option<String>,
}

// ==========================================
// CompetencyRepository - 框架/能力仓储
// ==========================================
/// 框架/能力仓储
/// 职责: 管理 competency_framework / competency / related_competency 表
pub struct CompetencyRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CompetencyRepository {
    /// 创建新的 CompetencyRepository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
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

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按编号查询框架
    pub fn find_framework_by_idnumber(
        &self,
        idnumber: &str,
    ) -> RepositoryResult<Option<FrameworkHandle>> {
        let conn = self.get_conn()?;
        let handle = conn
            .query_row(
                "SELECT id, idnumber, shortname FROM competency_framework WHERE idnumber = ?1",
                params![idnumber],
                |row| {
                    Ok(FrameworkHandle {
                        id: row.get(0)?,
                        idnumber: row.get(1)?,
                        shortname: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(handle)
    }

    /// 按框架 + 编号查询能力
    pub fn find_competency(
        &self,
        framework_id: i64,
        idnumber: &str,
    ) -> RepositoryResult<Option<StoredCompetency>> {
        let conn = self.get_conn()?;
        let stored = conn
            .query_row(
                r#"
                SELECT id, framework_id, parent_id, path, sort_order, shortname, idnumber,
                       description, scale_id, scale_configuration,
                       rule_type, rule_outcome, rule_config
                FROM competency
                WHERE framework_id = ?1 AND idnumber = ?2
                "#,
                params![framework_id, idnumber],
                |row| {
                    Ok(StoredCompetency {
                        id: row.get(0)?,
                        framework_id: row.get(1)?,
                        parent_id: row.get(2)?,
                        path: row.get(3)?,
                        sort_order: row.get(4)?,
                        shortname: row.get(5)?,
                        idnumber: row.get(6)?,
                        description: row.get(7)?,
                        scale_id: row.get(8)?,
                        scale_configuration: row.get(9)?,
                        rule_type: row.get(10)?,
                        rule_outcome: row.get(11)?,
                        rule_config: row.get(12)?,
                    })
                },
            )
            .optional()?;
        Ok(stored)
    }

    /// 统计框架下的能力数量
    pub fn count_competencies(&self, framework_id: i64) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM competency WHERE framework_id = ?1",
            params![framework_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// 查询与指定能力关联的全部能力 ID（双向）
    pub fn list_related(&self, competency_id: i64) -> RepositoryResult<Vec<i64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT related_competency_id FROM related_competency WHERE competency_id = ?1
            UNION
            SELECT competency_id FROM related_competency WHERE related_competency_id = ?1
            ORDER BY 1
            "#,
        )?;
        let ids = stmt
            .query_map(params![competency_id], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// 读取能力所属框架（不存在则返回 NotFound）
    fn competency_framework_id(conn: &Connection, competency_id: i64) -> RepositoryResult<i64> {
        conn.query_row(
            "SELECT framework_id FROM competency WHERE id = ?1",
            params![competency_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| RepositoryError::NotFound {
            entity: "competency".to_string(),
            id: competency_id.to_string(),
        })
    }
}

impl CompetencyApi for CompetencyRepository {
    fn create_framework(&self, payload: &FrameworkPayload) -> RepositoryResult<FrameworkHandle> {
        if payload.idnumber.trim().is_empty() || payload.shortname.trim().is_empty() {
            return Err(RepositoryError::ValidationError(
                "框架编号与简称不能为空".to_string(),
            ));
        }

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO competency_framework (
                shortname, idnumber, description, descriptionformat,
                scale_id, scale_configuration, taxonomies, context_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                payload.shortname,
                payload.idnumber,
                payload.description,
                payload.descriptionformat,
                payload.scale_id,
                payload.scale_configuration,
                payload.taxonomies,
                payload.context_id,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(FrameworkHandle {
            id: conn.last_insert_rowid(),
            idnumber: payload.idnumber.clone(),
            shortname: payload.shortname.clone(),
        })
    }

    fn create_competency(
        &self,
        payload: &CompetencyPayload,
    ) -> RepositoryResult<CompetencyHandle> {
        if payload.idnumber.is_empty() || payload.shortname.is_empty() {
            return Err(RepositoryError::ValidationError(
                "能力编号与简称不能为空".to_string(),
            ));
        }

        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        // 父节点必须存在且属于同一框架
        let path = if payload.parent_id == 0 {
            "/0/".to_string()
        } else {
            let parent: Option<(i64, String)> = tx
                .query_row(
                    "SELECT framework_id, path FROM competency WHERE id = ?1",
                    params![payload.parent_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            match parent {
                Some((framework_id, parent_path)) if framework_id == payload.framework_id => {
                    format!("{}{}/", parent_path, payload.parent_id)
                }
                Some(_) => {
                    return Err(RepositoryError::ValidationError(format!(
                        "父能力 {} 不属于框架 {}",
                        payload.parent_id, payload.framework_id
                    )))
                }
                None => {
                    return Err(RepositoryError::NotFound {
                        entity: "competency".to_string(),
                        id: payload.parent_id.to_string(),
                    })
                }
            }
        };

        let sort_order: i64 = tx.query_row(
            r#"
            SELECT COALESCE(MAX(sort_order) + 1, 0) FROM competency
            WHERE framework_id = ?1 AND parent_id = ?2
            "#,
            params![payload.framework_id, payload.parent_id],
            |row| row.get(0),
        )?;

        let now = Utc::now().to_rfc3339();
        tx.execute(
            r#"
            INSERT INTO competency (
                framework_id, parent_id, path, sort_order, shortname, idnumber,
                description, descriptionformat, scale_id, scale_configuration,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                payload.framework_id,
                payload.parent_id,
                path,
                sort_order,
                payload.shortname,
                payload.idnumber,
                payload.description,
                payload.descriptionformat,
                payload.scale_id,
                payload.scale_configuration,
                now,
                now,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(CompetencyHandle {
            id,
            framework_id: payload.framework_id,
            idnumber: payload.idnumber.clone(),
            shortname: payload.shortname.clone(),
        })
    }

    fn update_competency_rule(
        &self,
        competency_id: i64,
        rule: &CompetencyRule,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE competency
            SET rule_type = ?1, rule_outcome = ?2, rule_config = ?3, updated_at = ?4
            WHERE id = ?5
            "#,
            params![
                rule.rule_type,
                rule.rule_outcome,
                rule.rule_config,
                Utc::now().to_rfc3339(),
                competency_id,
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "competency".to_string(),
                id: competency_id.to_string(),
            });
        }
        Ok(())
    }

    /// 关联为对称关系：每对能力只存一条（小 ID 在前），重复建立为幂等
    fn add_related(&self, competency_id: i64, related_id: i64) -> RepositoryResult<()> {
        if competency_id == related_id {
            return Err(RepositoryError::ValidationError(format!(
                "能力 {} 不能与自身关联",
                competency_id
            )));
        }

        let conn = self.get_conn()?;
        let framework_a = Self::competency_framework_id(&conn, competency_id)?;
        let framework_b = Self::competency_framework_id(&conn, related_id)?;
        if framework_a != framework_b {
            return Err(RepositoryError::ValidationError(format!(
                "关联能力必须属于同一框架: {} / {}",
                competency_id, related_id
            )));
        }

        let (low, high) = if competency_id < related_id {
            (competency_id, related_id)
        } else {
            (related_id, competency_id)
        };
        conn.execute(
            r#"
            INSERT OR IGNORE INTO related_competency (competency_id, related_competency_id, created_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![low, high, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};

    fn setup_repo() -> CompetencyRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        CompetencyRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn framework_payload(idnumber: &str) -> FrameworkPayload {
        FrameworkPayload {
            shortname: "Framework One".to_string(),
            idnumber: idnumber.to_string(),
            description: String::new(),
            descriptionformat: 1,
            scale_id: None,
            scale_configuration: None,
            taxonomies: String::new(),
            context_id: 1,
        }
    }

    fn competency_payload(framework_id: i64, idnumber: &str, parent_id: i64) -> CompetencyPayload {
        CompetencyPayload {
            framework_id,
            shortname: format!("Competency {}", idnumber),
            idnumber: idnumber.to_string(),
            description: None,
            descriptionformat: None,
            scale_id: None,
            scale_configuration: None,
            parent_id,
        }
    }

    #[test]
    fn test_create_competency_builds_path_and_sort_order() {
        let repo = setup_repo();
        let fw = repo.create_framework(&framework_payload("FW1")).unwrap();

        let a = repo.create_competency(&competency_payload(fw.id, "A", 0)).unwrap();
        let b = repo.create_competency(&competency_payload(fw.id, "B", 0)).unwrap();
        let a1 = repo.create_competency(&competency_payload(fw.id, "A1", a.id)).unwrap();

        let stored_b = repo.find_competency(fw.id, "B").unwrap().unwrap();
        assert_eq!(stored_b.id, b.id);
        assert_eq!(stored_b.sort_order, 1);
        assert_eq!(stored_b.path, "/0/");

        let stored_a1 = repo.find_competency(fw.id, "A1").unwrap().unwrap();
        assert_eq!(stored_a1.id, a1.id);
        assert_eq!(stored_a1.parent_id, a.id);
        assert_eq!(stored_a1.path, format!("/0/{}/", a.id));
        assert_eq!(repo.count_competencies(fw.id).unwrap(), 3);
    }

    #[test]
    fn test_duplicate_framework_idnumber_rejected() {
        let repo = setup_repo();
        repo.create_framework(&framework_payload("FW1")).unwrap();
        let result = repo.create_framework(&framework_payload("FW1"));
        assert!(matches!(
            result,
            Err(RepositoryError::UniqueConstraintViolation(_))
        ));
    }

    #[test]
    fn test_missing_parent_rejected() {
        let repo = setup_repo();
        let fw = repo.create_framework(&framework_payload("FW1")).unwrap();
        let result = repo.create_competency(&competency_payload(fw.id, "A", 999));
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
    }

    #[test]
    fn test_add_related_is_symmetric_and_idempotent() {
        let repo = setup_repo();
        let fw = repo.create_framework(&framework_payload("FW1")).unwrap();
        let a = repo.create_competency(&competency_payload(fw.id, "A", 0)).unwrap();
        let b = repo.create_competency(&competency_payload(fw.id, "B", 0)).unwrap();

        repo.add_related(b.id, a.id).unwrap();
        repo.add_related(a.id, b.id).unwrap();

        assert_eq!(repo.list_related(a.id).unwrap(), vec![b.id]);
        assert_eq!(repo.list_related(b.id).unwrap(), vec![a.id]);
        assert!(repo.add_related(a.id, a.id).is_err());
    }

    #[test]
    fn test_update_rule() {
        let repo = setup_repo();
        let fw = repo.create_framework(&framework_payload("FW1")).unwrap();
        let a = repo.create_competency(&competency_payload(fw.id, "A", 0)).unwrap();

        let rule = CompetencyRule {
            rule_type: "core_competency\\competency_rule_all".to_string(),
            rule_outcome: 2,
            rule_config: None,
        };
        repo.update_competency_rule(a.id, &rule).unwrap();

        let stored = repo.find_competency(fw.id, "A").unwrap().unwrap();
        assert_eq!(stored.rule_type.as_deref(), Some("core_competency\\competency_rule_all"));
        assert_eq!(stored.rule_outcome, 2);
        assert_eq!(stored.rule_config, None);

        assert!(repo.update_competency_rule(999, &rule).is_err());
    }
}
