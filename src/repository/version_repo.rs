// ==========================================
// 检验标本采集目录 - 目录版本仓储
// ==========================================
// 红线: 状态迁移、草稿创建、发布均在单事务内完成
// ==========================================

use crate::db::{format_datetime, parse_datetime};
use crate::domain::types::VersionStatus;
use crate::domain::version::{next_version_code, publish_snapshot, Version, VersionCounts};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const VERSION_COLUMNS: &str = r#"version_id, version_code, status, publisher_name, published_at,
    added_count, updated_count, disabled_count, changelog_json, summary, created_at, updated_at"#;

/// 文本列 → 时间
fn datetime_column(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_datetime_column(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_datetime(&s))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ==========================================
// VersionRepository - 目录版本仓储
// ==========================================
pub struct VersionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl VersionRepository {
    /// 创建新的VersionRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row) -> rusqlite::Result<Version> {
        let status_raw: String = row.get(2)?;
        let status = VersionStatus::from_str(&status_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                Type::Text,
                format!("未知版本状态: {}", status_raw).into(),
            )
        })?;

        Ok(Version {
            version_id: row.get(0)?,
            version_code: row.get(1)?,
            status,
            publisher_name: row.get(3)?,
            published_at: optional_datetime_column(row, 4)?,
            counts: VersionCounts {
                added: row.get(5)?,
                updated: row.get(6)?,
                disabled: row.get(7)?,
            },
            changelog: row.get(8)?,
            summary: row.get(9)?,
            created_at: datetime_column(row, 10)?,
            updated_at: datetime_column(row, 11)?,
        })
    }

    // ===== 事务内可复用的查询 =====

    pub(crate) fn find_by_id_in(conn: &Connection, version_id: &str) -> RepositoryResult<Option<Version>> {
        let sql = format!("SELECT {} FROM catalog_version WHERE version_id = ?1", VERSION_COLUMNS);
        Ok(conn
            .query_row(&sql, params![version_id], Self::map_row)
            .optional()?)
    }

    pub(crate) fn find_draft_in(conn: &Connection) -> RepositoryResult<Option<Version>> {
        let sql = format!(
            "SELECT {} FROM catalog_version WHERE status = 'draft' \
             ORDER BY created_at DESC, rowid DESC LIMIT 1",
            VERSION_COLUMNS
        );
        Ok(conn.query_row(&sql, [], Self::map_row).optional()?)
    }

    pub(crate) fn find_latest_published_in(conn: &Connection) -> RepositoryResult<Option<Version>> {
        let sql = format!(
            "SELECT {} FROM catalog_version WHERE status = 'published' \
             ORDER BY published_at DESC, rowid DESC LIMIT 1",
            VERSION_COLUMNS
        );
        Ok(conn.query_row(&sql, [], Self::map_row).optional()?)
    }

    pub(crate) fn insert_in(conn: &Connection, version: &Version) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO catalog_version (
                version_id, version_code, status, publisher_name, published_at,
                added_count, updated_count, disabled_count, changelog_json, summary,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
            params![
                &version.version_id,
                &version.version_code,
                version.status.to_db_str(),
                &version.publisher_name,
                version.published_at.as_ref().map(format_datetime),
                version.counts.added,
                version.counts.updated,
                version.counts.disabled,
                &version.changelog,
                &version.summary,
                format_datetime(&version.created_at),
                format_datetime(&version.updated_at),
            ],
        )?;
        Ok(())
    }

    pub(crate) fn update_in(conn: &Connection, version: &Version) -> RepositoryResult<()> {
        let rows_affected = conn.execute(
            r#"UPDATE catalog_version
               SET version_code = ?2, status = ?3, publisher_name = ?4, published_at = ?5,
                   added_count = ?6, updated_count = ?7, disabled_count = ?8,
                   changelog_json = ?9, summary = ?10, updated_at = ?11
               WHERE version_id = ?1"#,
            params![
                &version.version_id,
                &version.version_code,
                version.status.to_db_str(),
                &version.publisher_name,
                version.published_at.as_ref().map(format_datetime),
                version.counts.added,
                version.counts.updated,
                version.counts.disabled,
                &version.changelog,
                &version.summary,
                format_datetime(&version.updated_at),
            ],
        )?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "CatalogVersion".to_string(),
                id: version.version_id.clone(),
            });
        }
        Ok(())
    }

    /// 版本下的项目数
    pub(crate) fn count_items_in(conn: &Connection, version_id: &str) -> RepositoryResult<i64> {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM lab_item WHERE version_id = ?1",
            params![version_id],
            |row| row.get(0),
        )?)
    }

    // ===== 公开接口 =====

    /// 创建版本
    pub fn create(&self, version: &Version) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        Self::insert_in(&conn, version)?;
        Ok(version.version_id.clone())
    }

    /// 按version_id查询版本
    pub fn find_by_id(&self, version_id: &str) -> RepositoryResult<Option<Version>> {
        let conn = self.get_conn()?;
        Self::find_by_id_in(&conn, version_id)
    }

    /// 查询当前草稿（最近创建的一个）
    pub fn find_draft(&self) -> RepositoryResult<Option<Version>> {
        let conn = self.get_conn()?;
        Self::find_draft_in(&conn)
    }

    /// 查询已发布版本头（published_at 最新）
    pub fn find_latest_published(&self) -> RepositoryResult<Option<Version>> {
        let conn = self.get_conn()?;
        Self::find_latest_published_in(&conn)
    }

    /// 查询全部版本（按创建时间倒序）
    pub fn list_all(&self) -> RepositoryResult<Vec<Version>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM catalog_version ORDER BY created_at DESC, rowid DESC",
            VERSION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let versions = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<Version>, _>>()?;
        Ok(versions)
    }

    /// 更新版本
    pub fn update(&self, version: &Version) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::update_in(&conn, version)
    }

    /// 查找或创建草稿
    ///
    /// 说明：
    /// - 在同一事务内查询草稿，不存在时按最新已发布版本号递增创建
    /// - 部分唯一索引保证至多一个草稿；并发插入冲突时重新查询
    ///
    /// # 返回
    /// - (Version, true): 新建的草稿
    /// - (Version, false): 已存在的草稿
    pub fn find_or_create_draft(&self, now: NaiveDateTime) -> RepositoryResult<(Version, bool)> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        if let Some(existing) = Self::find_draft_in(&tx)? {
            return Ok((existing, false));
        }

        let latest = Self::find_latest_published_in(&tx)?;
        let code = next_version_code(latest.as_ref().map(|v| v.version_code.as_str()));
        let draft = Version::new_draft(Uuid::new_v4().to_string(), code, now);

        match Self::insert_in(&tx, &draft) {
            Ok(()) => {
                tx.commit()?;
                Ok((draft, true))
            }
            Err(RepositoryError::UniqueConstraintViolation(_)) => {
                drop(tx);
                let existing = Self::find_draft_in(&conn)?.ok_or_else(|| {
                    RepositoryError::InternalError("草稿唯一约束冲突后未找到草稿".to_string())
                })?;
                Ok((existing, false))
            }
            Err(e) => Err(e),
        }
    }

    /// 显式创建草稿（已有草稿时拒绝）
    pub fn create_draft(&self, now: NaiveDateTime) -> RepositoryResult<Version> {
        let (draft, created) = self.find_or_create_draft(now)?;
        if !created {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "已存在草稿版本 {}（{}）",
                draft.version_code, draft.version_id
            )));
        }
        Ok(draft)
    }

    /// 状态迁移（事务内校验当前状态）
    ///
    /// # 错误
    /// - `RepositoryError::NotFound`: version_id不存在
    /// - `RepositoryError::InvalidStateTransition`: 当前状态不允许迁移到目标状态
    pub fn transition(
        &self,
        version_id: &str,
        to: VersionStatus,
        now: NaiveDateTime,
    ) -> RepositoryResult<Version> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut version = Self::find_by_id_in(&tx, version_id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "CatalogVersion".to_string(),
            id: version_id.to_string(),
        })?;

        if !version.status.can_transition_to(to) {
            return Err(RepositoryError::InvalidStateTransition {
                from: version.status.to_string(),
                to: to.to_string(),
            });
        }

        version.status = to;
        version.updated_at = now;
        Self::update_in(&tx, &version)?;
        tx.commit()?;
        Ok(version)
    }

    /// 发布版本
    ///
    /// # 红线
    /// - 仅 draft / pending_review 可发布，其他状态拒绝且不修改任何字段
    /// - 计数取版本实际拥有的项目数
    /// - 状态、发布人、发布时间、计数、变更日志在同一事务内写入
    pub fn publish(
        &self,
        version_id: &str,
        publisher: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<Version> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut version = Self::find_by_id_in(&tx, version_id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "CatalogVersion".to_string(),
            id: version_id.to_string(),
        })?;

        if !version.status.is_publishable() {
            return Err(RepositoryError::InvalidStateTransition {
                from: version.status.to_string(),
                to: VersionStatus::Published.to_string(),
            });
        }

        let item_count = Self::count_items_in(&tx, version_id)?;
        let (changelog, summary) = publish_snapshot(&version.version_code, publisher, &now, item_count);

        version.status = VersionStatus::Published;
        version.publisher_name = Some(publisher.to_string());
        version.published_at = Some(now);
        version.counts = changelog.changes;
        version.changelog = Some(changelog.to_json());
        version.summary = Some(summary);
        version.updated_at = now;

        Self::update_in(&tx, &version)?;
        tx.commit()?;
        Ok(version)
    }
}
