// ==========================================
// 检验标本采集目录 - 目录存储 Trait
// ==========================================
// 职责: 定义版本、项目、导入记录的数据访问接口（不包含业务逻辑）
// 红线: 查询缺失返回 None / 空 Vec；写入失败返回存储错误
// ==========================================

use crate::domain::import::ImportRecord;
use crate::domain::item::{CatalogItem, ImportableItem};
use crate::domain::types::VersionStatus;
use crate::domain::version::Version;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use chrono::NaiveDateTime;

// ==========================================
// CatalogStore Trait
// ==========================================
// 实现者: SqliteCatalogStore（使用 rusqlite）
#[async_trait]
pub trait CatalogStore: Send + Sync {
    // ===== 版本 =====

    /// 当前草稿（最近创建的一个）
    async fn find_draft(&self) -> RepositoryResult<Option<Version>>;

    /// 已发布版本头
    async fn find_latest_published(&self) -> RepositoryResult<Option<Version>>;

    async fn find_version(&self, version_id: &str) -> RepositoryResult<Option<Version>>;

    /// 全部版本（按创建时间倒序）
    async fn list_versions(&self) -> RepositoryResult<Vec<Version>>;

    async fn create_version(&self, version: &Version) -> RepositoryResult<String>;

    async fn update_version(&self, version: &Version) -> RepositoryResult<()>;

    /// 查找或创建草稿（事务内）
    ///
    /// # 返回
    /// - (Version, bool): 草稿，以及是否为本次新建
    async fn find_or_create_draft(&self, now: NaiveDateTime) -> RepositoryResult<(Version, bool)>;

    /// 显式创建草稿，已有草稿时返回 BusinessRuleViolation
    async fn create_draft(&self, now: NaiveDateTime) -> RepositoryResult<Version>;

    /// 状态迁移（非法迁移返回 InvalidStateTransition）
    async fn transition_version(
        &self,
        version_id: &str,
        to: VersionStatus,
        now: NaiveDateTime,
    ) -> RepositoryResult<Version>;

    /// 发布版本（单事务）
    async fn publish_version(
        &self,
        version_id: &str,
        publisher: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<Version>;

    // ===== 项目 =====

    async fn insert_items(
        &self,
        version_id: &str,
        items: &[ImportableItem],
        now: NaiveDateTime,
    ) -> RepositoryResult<usize>;

    async fn delete_items_by_version(&self, version_id: &str) -> RepositoryResult<usize>;

    /// 整体替换版本下的项目（单事务）
    async fn replace_version_items(
        &self,
        version_id: &str,
        items: &[ImportableItem],
        now: NaiveDateTime,
    ) -> RepositoryResult<usize>;

    async fn items_by_version(&self, version_id: &str) -> RepositoryResult<Vec<CatalogItem>>;

    async fn enabled_items_by_version(&self, version_id: &str) -> RepositoryResult<Vec<CatalogItem>>;

    /// 全部启用项目（不区分版本）
    async fn all_enabled_items(&self) -> RepositoryResult<Vec<CatalogItem>>;

    async fn all_items(&self) -> RepositoryResult<Vec<CatalogItem>>;

    /// 按项目编号查询，优先 prefer_version 中的记录
    async fn item_by_item_id(
        &self,
        item_id: &str,
        prefer_version: Option<&str>,
    ) -> RepositoryResult<Option<CatalogItem>>;

    /// 关键字检索（启用项目，按使用频次倒序）
    async fn search_items(
        &self,
        keyword: &str,
        version_id: Option<&str>,
        limit: usize,
    ) -> RepositoryResult<Vec<CatalogItem>>;

    async fn update_item_frequency(
        &self,
        id: i64,
        frequency_score: i64,
        is_high_freq: bool,
        now: NaiveDateTime,
    ) -> RepositoryResult<()>;

    // ===== 导入记录 =====

    /// 写入导入记录（import_id 重复时返回 UniqueConstraintViolation）
    async fn create_import_record(&self, record: &ImportRecord) -> RepositoryResult<()>;

    async fn list_import_records(&self, limit: usize) -> RepositoryResult<Vec<ImportRecord>>;

    async fn find_import_record(&self, import_id: &str) -> RepositoryResult<Option<ImportRecord>>;

    // ===== 组合写入 =====

    /// 暂存导入结果（单事务）
    ///
    /// # 说明
    /// - 替换草稿的全部项目为本批次成功数据
    /// - 版本计数: added = 项目数，updated = disabled = 0
    /// - 写入导入记录；任一步失败整体回滚
    ///
    /// # 返回
    /// - Ok(usize): 写入的项目数
    async fn stage_import(
        &self,
        version_id: &str,
        items: &[ImportableItem],
        record: &ImportRecord,
    ) -> RepositoryResult<usize>;
}
