// ==========================================
// 目录查询API
// ==========================================
// 职责: 生效项目、检索、详情、分类筛选、高频项目、枚举目录
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader};
use crate::domain::item::CatalogItem;
use crate::engine::{CatalogQueryService, EnumCatalog, VersionLifecycleManager};
use crate::repository::SqliteCatalogStore;
use std::sync::Arc;

/// 目录查询API
pub struct CatalogApi {
    lifecycle: VersionLifecycleManager<SqliteCatalogStore>,
    query: CatalogQueryService<SqliteCatalogStore>,
    config: ConfigManager,
}

impl CatalogApi {
    pub fn new(store: Arc<SqliteCatalogStore>, config: ConfigManager) -> Self {
        Self {
            lifecycle: VersionLifecycleManager::new(store.clone()),
            query: CatalogQueryService::new(store),
            config,
        }
    }

    /// 当前生效项目
    pub async fn active_items(&self) -> ApiResult<Vec<CatalogItem>> {
        Ok(self.lifecycle.active_items().await?)
    }

    /// 关键字检索
    ///
    /// # 参数
    /// - keyword: 关键字（空白返回空列表）
    /// - limit: 最大返回条数；None 时取配置
    pub async fn search(&self, keyword: &str, limit: Option<usize>) -> ApiResult<Vec<CatalogItem>> {
        let limit = match limit {
            Some(limit) => limit,
            None => self
                .config
                .get_search_limit()
                .await
                .map_err(|e| ApiError::InternalError(format!("读取检索条数配置失败: {}", e)))?,
        };
        Ok(self.query.search(keyword, limit).await?)
    }

    /// 按项目编号查询详情
    pub async fn item_by_item_id(&self, item_id: &str) -> ApiResult<CatalogItem> {
        self.query
            .item_by_item_id(item_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("检验项目(item_id={})不存在", item_id)))
    }

    pub async fn by_specimen_type(&self, specimen_type: &str) -> ApiResult<Vec<CatalogItem>> {
        Ok(self.query.by_specimen_type(specimen_type).await?)
    }

    pub async fn by_tube_color(&self, tube_color: &str) -> ApiResult<Vec<CatalogItem>> {
        Ok(self.query.by_tube_color(tube_color).await?)
    }

    /// 高频项目
    pub async fn high_freq(&self, limit: Option<usize>) -> ApiResult<Vec<CatalogItem>> {
        let limit = match limit {
            Some(limit) => limit,
            None => self
                .config
                .get_high_freq_limit()
                .await
                .map_err(|e| ApiError::InternalError(format!("读取高频条数配置失败: {}", e)))?,
        };
        Ok(self.query.high_freq(limit).await?)
    }

    /// 更新项目使用频次
    pub async fn set_item_frequency(
        &self,
        id: i64,
        frequency_score: i64,
        is_high_freq: bool,
    ) -> ApiResult<()> {
        if frequency_score < 0 {
            return Err(ApiError::InvalidInput(format!(
                "使用频次不能为负数: {}",
                frequency_score
            )));
        }
        Ok(self
            .query
            .set_item_frequency(id, frequency_score, is_high_freq)
            .await?)
    }

    pub fn enum_catalog(&self) -> EnumCatalog {
        self.query.enum_catalog()
    }
}
