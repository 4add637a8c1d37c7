// ==========================================
// 检验标本采集目录 - 导入记录仓储
// ==========================================
// 职责: 导入审计记录的写入与查询
// 约束: import_id 唯一；重复写入返回 UniqueConstraintViolation
// ==========================================

use crate::db::{format_datetime, parse_datetime};
use crate::domain::import::{CodeCount, ImportRecord, ImportSummary, ValidatedRow};
use crate::domain::types::ConflictStrategy;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const RECORD_COLUMNS: &str = r#"import_id, file_name, version_target, version_id,
    total_rows, success_rows, failed_rows, warning_rows, superseded_rows,
    conflict_strategy, error_summary_json, warning_summary_json, failed_details_json,
    operator_name, created_at"#;

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn count_column(row: &Row, idx: usize) -> rusqlite::Result<usize> {
    let value: i64 = row.get(idx)?;
    Ok(value.max(0) as usize)
}

// ==========================================
// ImportRecordRepository
// ==========================================
pub struct ImportRecordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportRecordRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row) -> rusqlite::Result<ImportRecord> {
        let strategy_raw: String = row.get(9)?;
        let conflict_strategy = ConflictStrategy::parse(&strategy_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                9,
                Type::Text,
                format!("未知冲突策略: {}", strategy_raw).into(),
            )
        })?;
        let created_raw: String = row.get(14)?;

        Ok(ImportRecord {
            summary: ImportSummary {
                import_id: row.get(0)?,
                file_name: row.get(1)?,
                version_target: row.get(2)?,
                total_rows: count_column(row, 4)?,
                success_rows: count_column(row, 5)?,
                failed_rows: count_column(row, 6)?,
                warning_rows: count_column(row, 7)?,
                superseded_rows: count_column(row, 8)?,
                conflict_strategy,
                error_summary: json_column::<Vec<CodeCount>>(row, 10)?,
                warning_summary: json_column::<Vec<CodeCount>>(row, 11)?,
            },
            version_id: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            failed_details: json_column::<Vec<ValidatedRow>>(row, 12)?,
            operator_name: row.get(13)?,
            created_at: parse_datetime(&created_raw).map_err(|e| conversion_error(14, e))?,
        })
    }

    /// 写入导入记录（可在事务内调用）
    pub(crate) fn insert_in(conn: &Connection, record: &ImportRecord) -> RepositoryResult<()> {
        let summary = &record.summary;
        conn.execute(
            r#"INSERT INTO import_record (
                import_id, file_name, version_target, version_id,
                total_rows, success_rows, failed_rows, warning_rows, superseded_rows,
                conflict_strategy, error_summary_json, warning_summary_json, failed_details_json,
                operator_name, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"#,
            params![
                &summary.import_id,
                &summary.file_name,
                &summary.version_target,
                &record.version_id,
                summary.total_rows as i64,
                summary.success_rows as i64,
                summary.failed_rows as i64,
                summary.warning_rows as i64,
                summary.superseded_rows as i64,
                summary.conflict_strategy.as_str(),
                serde_json::to_string(&summary.error_summary)?,
                serde_json::to_string(&summary.warning_summary)?,
                serde_json::to_string(&record.failed_details)?,
                &record.operator_name,
                format_datetime(&record.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn insert(&self, record: &ImportRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::insert_in(&conn, record)
    }

    /// 按 import_id 查询
    pub fn find_by_id(&self, import_id: &str) -> RepositoryResult<Option<ImportRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM import_record WHERE import_id = ?1", RECORD_COLUMNS);
        Ok(conn
            .query_row(&sql, params![import_id], Self::map_row)
            .optional()?)
    }

    /// 最近的导入记录（按时间倒序）
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<ImportRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM import_record ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            RECORD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![limit as i64], Self::map_row)?
            .collect::<Result<Vec<ImportRecord>, _>>()?;
        Ok(records)
    }

    /// 某版本下的导入记录
    pub fn list_by_version(&self, version_id: &str) -> RepositoryResult<Vec<ImportRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM import_record WHERE version_id = ?1 ORDER BY created_at DESC, rowid DESC",
            RECORD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![version_id], Self::map_row)?
            .collect::<Result<Vec<ImportRecord>, _>>()?;
        Ok(records)
    }
}
