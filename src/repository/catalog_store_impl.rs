// ==========================================
// 检验标本采集目录 - 目录存储 SQLite 实现
// ==========================================
// 职责: 组合版本/项目/导入记录仓储，提供跨表事务
// 约束: 三个仓储共享同一个 Arc<Mutex<Connection>>
// ==========================================

use crate::db;
use crate::domain::import::ImportRecord;
use crate::domain::item::{CatalogItem, ImportableItem};
use crate::domain::types::VersionStatus;
use crate::domain::version::{Version, VersionCounts};
use crate::repository::catalog_store::CatalogStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::import_record_repo::ImportRecordRepository;
use crate::repository::item_repo::ItemRepository;
use crate::repository::version_repo::VersionRepository;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

// ==========================================
// SqliteCatalogStore
// ==========================================
pub struct SqliteCatalogStore {
    conn: Arc<Mutex<Connection>>,
    versions: VersionRepository,
    items: ItemRepository,
    imports: ImportRecordRepository,
}

impl SqliteCatalogStore {
    /// 打开数据库并确保 schema 就绪
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let conn = db::open_and_init(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 基于已有连接构造（连接需已完成 init_schema）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            versions: VersionRepository::new(conn.clone()),
            items: ItemRepository::new(conn.clone()),
            imports: ImportRecordRepository::new(conn.clone()),
            conn,
        }
    }

    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    // ===== 版本 =====

    async fn find_draft(&self) -> RepositoryResult<Option<Version>> {
        self.versions.find_draft()
    }

    async fn find_latest_published(&self) -> RepositoryResult<Option<Version>> {
        self.versions.find_latest_published()
    }

    async fn find_version(&self, version_id: &str) -> RepositoryResult<Option<Version>> {
        self.versions.find_by_id(version_id)
    }

    async fn list_versions(&self) -> RepositoryResult<Vec<Version>> {
        self.versions.list_all()
    }

    async fn create_version(&self, version: &Version) -> RepositoryResult<String> {
        self.versions.create(version)
    }

    async fn update_version(&self, version: &Version) -> RepositoryResult<()> {
        self.versions.update(version)
    }

    async fn find_or_create_draft(&self, now: NaiveDateTime) -> RepositoryResult<(Version, bool)> {
        let (draft, created) = self.versions.find_or_create_draft(now)?;
        if created {
            info!(version_id = %draft.version_id, version_code = %draft.version_code, "创建草稿版本");
        }
        Ok((draft, created))
    }

    async fn create_draft(&self, now: NaiveDateTime) -> RepositoryResult<Version> {
        self.versions.create_draft(now)
    }

    async fn transition_version(
        &self,
        version_id: &str,
        to: VersionStatus,
        now: NaiveDateTime,
    ) -> RepositoryResult<Version> {
        self.versions.transition(version_id, to, now)
    }

    async fn publish_version(
        &self,
        version_id: &str,
        publisher: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<Version> {
        self.versions.publish(version_id, publisher, now)
    }

    // ===== 项目 =====

    async fn insert_items(
        &self,
        version_id: &str,
        items: &[ImportableItem],
        now: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        self.items.insert_items(version_id, items, now)
    }

    async fn delete_items_by_version(&self, version_id: &str) -> RepositoryResult<usize> {
        self.items.delete_by_version(version_id)
    }

    async fn replace_version_items(
        &self,
        version_id: &str,
        items: &[ImportableItem],
        now: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        self.items.replace_version_items(version_id, items, now)
    }

    async fn items_by_version(&self, version_id: &str) -> RepositoryResult<Vec<CatalogItem>> {
        self.items.find_by_version(version_id, false)
    }

    async fn enabled_items_by_version(&self, version_id: &str) -> RepositoryResult<Vec<CatalogItem>> {
        self.items.find_by_version(version_id, true)
    }

    async fn all_enabled_items(&self) -> RepositoryResult<Vec<CatalogItem>> {
        self.items.find_enabled()
    }

    async fn all_items(&self) -> RepositoryResult<Vec<CatalogItem>> {
        self.items.find_all()
    }

    async fn item_by_item_id(
        &self,
        item_id: &str,
        prefer_version: Option<&str>,
    ) -> RepositoryResult<Option<CatalogItem>> {
        self.items.find_by_item_id(item_id, prefer_version)
    }

    async fn search_items(
        &self,
        keyword: &str,
        version_id: Option<&str>,
        limit: usize,
    ) -> RepositoryResult<Vec<CatalogItem>> {
        self.items.search(keyword, version_id, limit)
    }

    async fn update_item_frequency(
        &self,
        id: i64,
        frequency_score: i64,
        is_high_freq: bool,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        self.items.update_frequency(id, frequency_score, is_high_freq, now)
    }

    // ===== 导入记录 =====

    async fn create_import_record(&self, record: &ImportRecord) -> RepositoryResult<()> {
        self.imports.insert(record)
    }

    async fn list_import_records(&self, limit: usize) -> RepositoryResult<Vec<ImportRecord>> {
        self.imports.list_recent(limit)
    }

    async fn find_import_record(&self, import_id: &str) -> RepositoryResult<Option<ImportRecord>> {
        self.imports.find_by_id(import_id)
    }

    // ===== 组合写入 =====

    async fn stage_import(
        &self,
        version_id: &str,
        items: &[ImportableItem],
        record: &ImportRecord,
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut version = VersionRepository::find_by_id_in(&tx, version_id)?.ok_or_else(|| {
            RepositoryError::NotFound {
                entity: "CatalogVersion".to_string(),
                id: version_id.to_string(),
            }
        })?;
        if version.status != VersionStatus::Draft {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "版本 {} 状态为 {}，仅草稿可暂存导入数据",
                version.version_code, version.status
            )));
        }

        let removed = ItemRepository::delete_by_version_tx(&tx, version_id)?;
        let inserted = ItemRepository::insert_items_tx(&tx, version_id, items, &record.created_at)?;

        version.counts = VersionCounts {
            added: inserted as i64,
            updated: 0,
            disabled: 0,
        };
        version.updated_at = record.created_at;
        VersionRepository::update_in(&tx, &version)?;

        ImportRecordRepository::insert_in(&tx, record)?;
        tx.commit()?;

        debug!(
            version_id,
            import_id = %record.summary.import_id,
            removed,
            inserted,
            "导入数据已暂存到草稿"
        );
        Ok(inserted)
    }
}
