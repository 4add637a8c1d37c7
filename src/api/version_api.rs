// ==========================================
// 目录版本API
// ==========================================
// 职责: 草稿获取/创建、提交审核、发布、归档、版本查询
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader};
use crate::domain::item::CatalogItem;
use crate::domain::version::Version;
use crate::engine::VersionLifecycleManager;
use crate::repository::SqliteCatalogStore;
use std::sync::Arc;

/// 发布结果
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub success: bool,
    pub version_id: String,
    pub version_code: String,
    pub added: i64,
    pub summary: Option<String>,
}

/// 版本API
pub struct VersionApi {
    lifecycle: VersionLifecycleManager<SqliteCatalogStore>,
    config: ConfigManager,
}

impl VersionApi {
    pub fn new(store: Arc<SqliteCatalogStore>, config: ConfigManager) -> Self {
        Self {
            lifecycle: VersionLifecycleManager::new(store),
            config,
        }
    }

    /// 全部版本（按创建时间倒序）
    pub async fn list_versions(&self) -> ApiResult<Vec<Version>> {
        Ok(self.lifecycle.list_versions().await?)
    }

    pub async fn get_version(&self, version_id: &str) -> ApiResult<Version> {
        self.lifecycle
            .find_version(version_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("版本(version_id={})不存在", version_id)))
    }

    /// 当前草稿（不存在时返回 None，不会创建）
    pub async fn current_draft(&self) -> ApiResult<Option<Version>> {
        Ok(self.lifecycle.current_draft().await?)
    }

    /// 最新已发布版本
    pub async fn latest_published(&self) -> ApiResult<Option<Version>> {
        Ok(self.lifecycle.published_head().await?)
    }

    pub async fn get_or_create_draft(&self) -> ApiResult<Version> {
        Ok(self.lifecycle.get_or_create_draft().await?)
    }

    /// 显式创建草稿（已存在草稿时返回 BusinessRuleViolation）
    pub async fn create_draft(&self) -> ApiResult<Version> {
        Ok(self.lifecycle.create_draft().await?)
    }

    pub async fn submit_for_review(&self, version_id: &str) -> ApiResult<Version> {
        Ok(self.lifecycle.submit_for_review(version_id).await?)
    }

    pub async fn return_to_draft(&self, version_id: &str) -> ApiResult<Version> {
        Ok(self.lifecycle.return_to_draft(version_id).await?)
    }

    /// 发布版本
    ///
    /// # 参数
    /// - version_id: 目标版本；None 时发布当前草稿
    /// - publisher: 发布人；None 或空白时取配置的默认发布人
    ///
    /// # 错误
    /// - NotFound: 版本不存在，或未指定版本且当前没有草稿
    /// - InvalidStateTransition: 版本状态不是 draft / pending_review
    pub async fn publish(
        &self,
        version_id: Option<&str>,
        publisher: Option<&str>,
    ) -> ApiResult<PublishResponse> {
        let version_id = match version_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => self
                .lifecycle
                .current_draft()
                .await?
                .map(|draft| draft.version_id)
                .ok_or_else(|| ApiError::NotFound("当前没有草稿版本".to_string()))?,
        };

        let publisher = match publisher.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => p.to_string(),
            None => self
                .config
                .get_default_publisher()
                .await
                .map_err(|e| ApiError::InternalError(format!("读取默认发布人失败: {}", e)))?,
        };

        let version = self.lifecycle.publish(&version_id, &publisher).await?;
        Ok(PublishResponse {
            success: true,
            version_id: version.version_id,
            version_code: version.version_code,
            added: version.counts.added,
            summary: version.summary,
        })
    }

    pub async fn archive(&self, version_id: &str) -> ApiResult<Version> {
        Ok(self.lifecycle.archive(version_id).await?)
    }

    /// 版本下的全部项目
    pub async fn version_items(&self, version_id: &str) -> ApiResult<Vec<CatalogItem>> {
        Ok(self.lifecycle.items_of_version(version_id).await?)
    }
}
