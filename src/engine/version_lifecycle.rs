// ==========================================
// 检验标本采集目录 - 版本生命周期管理
// ==========================================
// 状态机: draft → pending_review → published → archived
//         draft → published（允许跳过审核）
//         pending_review → draft（退回）
// 红线: Engine 不拼 SQL，所有写入经 CatalogStore
// ==========================================

use crate::domain::import::ImportRecord;
use crate::domain::item::{CatalogItem, ImportableItem};
use crate::domain::types::VersionStatus;
use crate::domain::version::Version;
use crate::perf::PerfGuard;
use crate::repository::{CatalogStore, RepositoryError, RepositoryResult};
use chrono::{NaiveDateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

fn now_utc() -> NaiveDateTime {
    Utc::now().naive_utc()
}

// ==========================================
// VersionLifecycleManager
// ==========================================
pub struct VersionLifecycleManager<S: ?Sized>
where
    S: CatalogStore,
{
    store: Arc<S>,
}

impl<S: ?Sized> Clone for VersionLifecycleManager<S>
where
    S: CatalogStore,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: ?Sized> VersionLifecycleManager<S>
where
    S: CatalogStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // ===== 草稿 =====

    /// 获取当前草稿，不存在时创建
    ///
    /// # 规则
    /// - 取最近创建的 draft
    /// - 无 draft 时以最新已发布版本号补丁位 +1 创建（无已发布版本为 1.0.0）
    pub async fn get_or_create_draft(&self) -> RepositoryResult<Version> {
        let (draft, _created) = self.store.find_or_create_draft(now_utc()).await?;
        Ok(draft)
    }

    /// 显式创建草稿（已存在草稿时拒绝）
    #[instrument(skip(self))]
    pub async fn create_draft(&self) -> RepositoryResult<Version> {
        let draft = self.store.create_draft(now_utc()).await?;
        info!(version_id = %draft.version_id, version_code = %draft.version_code, "显式创建草稿版本");
        Ok(draft)
    }

    /// 暂存导入结果到草稿（替换草稿全部项目 + 写入导入记录）
    pub async fn stage_import(
        &self,
        version_id: &str,
        items: &[ImportableItem],
        record: &ImportRecord,
    ) -> RepositoryResult<usize> {
        self.store.stage_import(version_id, items, record).await
    }

    // ===== 状态迁移 =====

    /// 提交审核：draft → pending_review
    #[instrument(skip(self))]
    pub async fn submit_for_review(&self, version_id: &str) -> RepositoryResult<Version> {
        let version = self
            .store
            .transition_version(version_id, VersionStatus::PendingReview, now_utc())
            .await?;
        info!(version_code = %version.version_code, "版本已提交审核");
        Ok(version)
    }

    /// 退回草稿：pending_review → draft
    ///
    /// 说明：已存在其他草稿时由唯一索引拒绝
    pub async fn return_to_draft(&self, version_id: &str) -> RepositoryResult<Version> {
        self.store
            .transition_version(version_id, VersionStatus::Draft, now_utc())
            .await
            .map_err(|e| match e {
                RepositoryError::UniqueConstraintViolation(_) => RepositoryError::BusinessRuleViolation(
                    "已存在其他草稿版本，无法退回".to_string(),
                ),
                other => other,
            })
    }

    /// 发布版本
    ///
    /// # 参数
    /// - version_id: 目标版本
    /// - publisher: 发布人（调用方负责缺省值）
    ///
    /// # 错误
    /// - NotFound: 版本不存在
    /// - InvalidStateTransition: 当前状态不是 draft / pending_review
    #[instrument(skip(self))]
    pub async fn publish(&self, version_id: &str, publisher: &str) -> RepositoryResult<Version> {
        let _perf = PerfGuard::new("publish_version");
        let version = self
            .store
            .publish_version(version_id, publisher, now_utc())
            .await?;
        info!(
            version_code = %version.version_code,
            added = version.counts.added,
            publisher,
            "版本已发布"
        );
        Ok(version)
    }

    /// 归档：published → archived
    #[instrument(skip(self))]
    pub async fn archive(&self, version_id: &str) -> RepositoryResult<Version> {
        let version = self
            .store
            .transition_version(version_id, VersionStatus::Archived, now_utc())
            .await?;
        info!(version_code = %version.version_code, "版本已归档");
        Ok(version)
    }

    // ===== 查询 =====

    pub async fn list_versions(&self) -> RepositoryResult<Vec<Version>> {
        self.store.list_versions().await
    }

    pub async fn find_version(&self, version_id: &str) -> RepositoryResult<Option<Version>> {
        self.store.find_version(version_id).await
    }

    pub async fn current_draft(&self) -> RepositoryResult<Option<Version>> {
        self.store.find_draft().await
    }

    /// 已发布版本头
    pub async fn published_head(&self) -> RepositoryResult<Option<Version>> {
        self.store.find_latest_published().await
    }

    /// 版本下的全部项目（版本不存在返回 NotFound）
    pub async fn items_of_version(&self, version_id: &str) -> RepositoryResult<Vec<CatalogItem>> {
        if self.store.find_version(version_id).await?.is_none() {
            return Err(RepositoryError::NotFound {
                entity: "CatalogVersion".to_string(),
                id: version_id.to_string(),
            });
        }
        self.store.items_by_version(version_id).await
    }

    /// 当前生效项目
    ///
    /// # 规则
    /// - 已发布版本头中的启用项目
    /// - 从未发布过任何版本时，回退为全部启用项目（不区分版本）
    pub async fn active_items(&self) -> RepositoryResult<Vec<CatalogItem>> {
        match self.store.find_latest_published().await? {
            Some(head) => self.store.enabled_items_by_version(&head.version_id).await,
            None => self.store.all_enabled_items().await,
        }
    }
}
