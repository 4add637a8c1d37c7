// ==========================================
// 检验标本采集目录 - 检验项目仓储
// ==========================================
// 红线: Repository 不含业务规则，只做数据 CRUD
// 约束: 所有查询使用参数化
// ==========================================

use crate::db::{format_datetime, parse_datetime};
use crate::domain::item::{CatalogItem, ImportableItem, ReportTime, ScenarioTags};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};

const ITEM_COLUMNS: &str = r#"id, version_id, item_id, item_name, item_group, specimen_type,
    container_type, tube_color, tube_additive, recommended_volume, collection_requirements,
    report_time_json, needs_confirmation, alias, en_abbr, pinyin_abbr, scenario_tags_json,
    storage_temp, transport_limit, handling_summary, rejection_summary, prep_summary,
    enabled, frequency_score, is_high_freq, created_at, updated_at"#;

/// 关键字检索覆盖的列
const SEARCH_COLUMNS: [&str; 7] = [
    "item_name",
    "alias",
    "pinyin_abbr",
    "en_abbr",
    "tube_color",
    "specimen_type",
    "item_group",
];

fn json_column<T: serde::de::DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| serde_json::from_str::<T>(&s))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn datetime_column(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ==========================================
// ItemRepository - 检验项目仓储
// ==========================================
pub struct ItemRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ItemRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row) -> rusqlite::Result<CatalogItem> {
        Ok(CatalogItem {
            id: row.get(0)?,
            version_id: row.get(1)?,
            item: ImportableItem {
                item_id: row.get(2)?,
                item_name: row.get(3)?,
                item_group: row.get(4)?,
                specimen_type: row.get(5)?,
                container_type: row.get(6)?,
                tube_color: row.get(7)?,
                tube_additive: row.get(8)?,
                recommended_volume: row.get(9)?,
                collection_requirements: row.get(10)?,
                report_time: json_column::<ReportTime>(row, 11)?,
                needs_confirmation: row.get::<_, i64>(12)? != 0,
                alias: row.get(13)?,
                en_abbr: row.get(14)?,
                pinyin_abbr: row.get(15)?,
                scenario_tags: json_column::<ScenarioTags>(row, 16)?,
                storage_temp: row.get(17)?,
                transport_limit: row.get(18)?,
                handling_summary: row.get(19)?,
                rejection_summary: row.get(20)?,
                prep_summary: row.get(21)?,
                enabled: row.get::<_, i64>(22)? != 0,
            },
            frequency_score: row.get(23)?,
            is_high_freq: row.get::<_, i64>(24)? != 0,
            created_at: datetime_column(row, 25)?,
            updated_at: datetime_column(row, 26)?,
        })
    }

    fn query_items(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> RepositoryResult<Vec<CatalogItem>> {
        let mut stmt = conn.prepare(sql)?;
        let items = stmt
            .query_map(params, Self::map_row)?
            .collect::<Result<Vec<CatalogItem>, _>>()?;
        Ok(items)
    }

    // ===== 事务内写入 =====

    /// 在事务中批量插入项目
    ///
    /// # 返回
    /// - Ok(usize): 插入条数
    pub(crate) fn insert_items_tx(
        tx: &Transaction,
        version_id: &str,
        items: &[ImportableItem],
        now: &NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO lab_item (
                version_id, item_id, item_name, item_group, specimen_type,
                container_type, tube_color, tube_additive, recommended_volume,
                collection_requirements, report_time_json, needs_confirmation,
                alias, en_abbr, pinyin_abbr, scenario_tags_json,
                storage_temp, transport_limit, handling_summary, rejection_summary,
                prep_summary, enabled, frequency_score, is_high_freq,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, 0, 0, ?23, ?23
            )
            "#,
        )?;

        let ts = format_datetime(now);
        let mut count = 0;
        for item in items {
            let report_time_json = item.report_time.as_ref().map(serde_json::to_string).transpose()?;
            let scenario_tags_json = item.scenario_tags.as_ref().map(serde_json::to_string).transpose()?;

            stmt.execute(params![
                version_id,
                &item.item_id,
                &item.item_name,
                &item.item_group,
                &item.specimen_type,
                &item.container_type,
                &item.tube_color,
                &item.tube_additive,
                &item.recommended_volume,
                &item.collection_requirements,
                report_time_json,
                item.needs_confirmation as i64,
                &item.alias,
                &item.en_abbr,
                &item.pinyin_abbr,
                scenario_tags_json,
                &item.storage_temp,
                &item.transport_limit,
                &item.handling_summary,
                &item.rejection_summary,
                &item.prep_summary,
                item.enabled as i64,
                &ts,
            ])?;
            count += 1;
        }
        Ok(count)
    }

    /// 在事务中删除版本下的全部项目
    pub(crate) fn delete_by_version_tx(tx: &Transaction, version_id: &str) -> RepositoryResult<usize> {
        Ok(tx.execute("DELETE FROM lab_item WHERE version_id = ?1", params![version_id])?)
    }

    // ===== 公开接口 =====

    /// 批量插入项目（单事务）
    pub fn insert_items(
        &self,
        version_id: &str,
        items: &[ImportableItem],
        now: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let inserted = Self::insert_items_tx(&tx, version_id, items, &now)?;
        tx.commit()?;
        Ok(inserted)
    }

    /// 删除版本下的全部项目
    pub fn delete_by_version(&self, version_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        Ok(conn.execute("DELETE FROM lab_item WHERE version_id = ?1", params![version_id])?)
    }

    /// 整体替换版本下的项目（删除 + 插入，单事务）
    pub fn replace_version_items(
        &self,
        version_id: &str,
        items: &[ImportableItem],
        now: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        Self::delete_by_version_tx(&tx, version_id)?;
        let inserted = Self::insert_items_tx(&tx, version_id, items, &now)?;
        tx.commit()?;
        Ok(inserted)
    }

    /// 按版本查询项目（按导入顺序）
    ///
    /// # 参数
    /// - enabled_only: 仅返回启用项目
    pub fn find_by_version(&self, version_id: &str, enabled_only: bool) -> RepositoryResult<Vec<CatalogItem>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM lab_item WHERE version_id = ?1 {} ORDER BY id",
            ITEM_COLUMNS,
            if enabled_only { "AND enabled = 1" } else { "" }
        );
        Self::query_items(&conn, &sql, params![version_id])
    }

    /// 全部启用项目（不区分版本）
    pub fn find_enabled(&self) -> RepositoryResult<Vec<CatalogItem>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM lab_item WHERE enabled = 1 ORDER BY id", ITEM_COLUMNS);
        Self::query_items(&conn, &sql, params![])
    }

    /// 全部项目（含停用）
    pub fn find_all(&self) -> RepositoryResult<Vec<CatalogItem>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM lab_item ORDER BY id", ITEM_COLUMNS);
        Self::query_items(&conn, &sql, params![])
    }

    /// 按项目编号查询
    ///
    /// 说明：优先返回指定版本中的记录，否则返回最早写入的一条
    pub fn find_by_item_id(
        &self,
        item_id: &str,
        prefer_version: Option<&str>,
    ) -> RepositoryResult<Option<CatalogItem>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM lab_item WHERE item_id = ?1 \
             ORDER BY CASE WHEN version_id = ?2 THEN 0 ELSE 1 END, id LIMIT 1",
            ITEM_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![item_id.trim(), prefer_version.unwrap_or("")], Self::map_row)
            .optional()?)
    }

    /// 关键字检索
    ///
    /// # 参数
    /// - keyword: 子串匹配（名称/别名/拼音缩写/英文缩写/管色/样本类型/分组）
    /// - version_id: 限定版本；None 表示全部版本
    /// - limit: 最大返回条数
    ///
    /// # 返回
    /// 启用项目，按使用频次倒序
    pub fn search(
        &self,
        keyword: &str,
        version_id: Option<&str>,
        limit: usize,
    ) -> RepositoryResult<Vec<CatalogItem>> {
        let conn = self.get_conn()?;
        let pattern = format!("%{}%", escape_like(keyword.trim()));
        let match_clause = SEARCH_COLUMNS
            .iter()
            .map(|col| format!("{} LIKE ?1 ESCAPE '\\'", col))
            .collect::<Vec<_>>()
            .join(" OR ");

        let sql = format!(
            "SELECT {} FROM lab_item WHERE enabled = 1 AND ({}) \
             AND (?2 IS NULL OR version_id = ?2) \
             ORDER BY frequency_score DESC, id LIMIT ?3",
            ITEM_COLUMNS, match_clause
        );
        let limit = limit as i64;
        Self::query_items(&conn, &sql, params![pattern, version_id, limit])
    }

    /// 更新使用频次与高频标记
    pub fn update_frequency(
        &self,
        id: i64,
        frequency_score: i64,
        is_high_freq: bool,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows_affected = conn.execute(
            "UPDATE lab_item SET frequency_score = ?2, is_high_freq = ?3, updated_at = ?4 WHERE id = ?1",
            params![id, frequency_score, is_high_freq as i64, format_datetime(&now)],
        )?;
        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "LabItem".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

/// 转义 LIKE 通配符
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::collections::BTreeMap;

    fn item(item_id: &str, report_time: ReportTime) -> ImportableItem {
        ImportableItem {
            item_id: item_id.to_string(),
            item_name: "血糖".to_string(),
            item_group: None,
            specimen_type: "血清".to_string(),
            container_type: None,
            tube_color: None,
            tube_additive: None,
            recommended_volume: None,
            collection_requirements: None,
            report_time: Some(report_time),
            needs_confirmation: false,
            alias: None,
            en_abbr: None,
            pinyin_abbr: None,
            scenario_tags: None,
            storage_temp: None,
            transport_limit: None,
            handling_summary: None,
            rejection_summary: None,
            prep_summary: None,
            enabled: true,
        }
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("血常规"), "血常规");
        assert_eq!(escape_like("50%_a"), "50\\%\\_a");
    }

    #[test]
    fn test_report_time_column_keeps_variant() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO catalog_version (version_id, version_code, status, created_at, updated_at)
             VALUES ('V1', 'DRAFT-1', 'draft', '2026-01-01 00:00:00', '2026-01-01 00:00:00')",
            [],
        )
        .unwrap();
        let repo = ItemRepository::new(Arc::new(Mutex::new(conn)));

        let windows = ReportTime::Windows(BTreeMap::from([("raw".to_string(), "x".to_string())]));
        let raw = ReportTime::Raw("次日".to_string());
        repo.insert_items(
            "V1",
            &[item("LAB000001", windows.clone()), item("LAB000002", raw.clone())],
            Local::now().naive_local(),
        )
        .unwrap();

        let stored = repo.find_by_version("V1", false).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].item.report_time, Some(windows));
        assert_eq!(stored[1].item.report_time, Some(raw));
    }
}
