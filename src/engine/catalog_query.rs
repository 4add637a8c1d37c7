// ==========================================
// 检验标本采集目录 - 目录查询
// ==========================================
// 职责: 面向查询端的只读视图（检索、详情、分类筛选、高频项目、枚举目录）
// 口径: 以已发布版本头为准；从未发布时回退为全部启用项目
// ==========================================

use crate::domain::item::CatalogItem;
use crate::domain::types::{
    ConflictStrategy, SpecimenType, TubeAdditive, TubeColor, CONTAINER_TYPES, STORAGE_TEMPS,
};
use crate::engine::version_lifecycle::VersionLifecycleManager;
use crate::repository::{CatalogStore, RepositoryResult};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

// ==========================================
// EnumCatalog - 枚举目录（供前端下拉与导入模板使用）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumCatalog {
    pub specimen_types: Vec<&'static str>,
    pub tube_colors: Vec<&'static str>,
    pub tube_additives: Vec<&'static str>,
    pub container_types: Vec<&'static str>,
    pub storage_temps: Vec<&'static str>,
    pub conflict_strategies: Vec<&'static str>,
    /// 管色 → 常规添加剂
    pub tube_color_additives: Vec<TubeColorAdditives>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TubeColorAdditives {
    pub color: &'static str,
    pub additives: Vec<&'static str>,
}

impl EnumCatalog {
    pub fn build() -> Self {
        let tube_color_additives = TubeColor::LABELS
            .iter()
            .filter_map(|label| {
                TubeColor::from_label(label)
                    .expected_additives()
                    .map(|additives| TubeColorAdditives {
                        color: *label,
                        additives: additives.to_vec(),
                    })
            })
            .collect();

        Self {
            specimen_types: SpecimenType::LABELS.to_vec(),
            tube_colors: TubeColor::LABELS.to_vec(),
            tube_additives: TubeAdditive::LABELS.to_vec(),
            container_types: CONTAINER_TYPES.to_vec(),
            storage_temps: STORAGE_TEMPS.to_vec(),
            conflict_strategies: [
                ConflictStrategy::OverwriteById,
                ConflictStrategy::SkipById,
                ConflictStrategy::ErrorById,
            ]
            .iter()
            .map(|s| s.as_str())
            .collect(),
            tube_color_additives,
        }
    }
}

// ==========================================
// CatalogQueryService
// ==========================================
pub struct CatalogQueryService<S: ?Sized>
where
    S: CatalogStore,
{
    store: Arc<S>,
    lifecycle: VersionLifecycleManager<S>,
}

impl<S: ?Sized> CatalogQueryService<S>
where
    S: CatalogStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            lifecycle: VersionLifecycleManager::new(store.clone()),
            store,
        }
    }

    /// 关键字检索
    ///
    /// # 规则
    /// - 空关键字返回空列表
    /// - 有已发布版本时限定在版本头内
    /// - 仅启用项目，按使用频次倒序，最多 limit 条
    pub async fn search(&self, keyword: &str, limit: usize) -> RepositoryResult<Vec<CatalogItem>> {
        let keyword = keyword.trim();
        if keyword.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let head = self.store.find_latest_published().await?;
        let items = self
            .store
            .search_items(keyword, head.as_ref().map(|v| v.version_id.as_str()), limit)
            .await?;
        debug!(keyword, hits = items.len(), "目录检索完成");
        Ok(items)
    }

    /// 按项目编号查询（优先返回已发布版本头中的记录）
    pub async fn item_by_item_id(&self, item_id: &str) -> RepositoryResult<Option<CatalogItem>> {
        let item_id = item_id.trim();
        if item_id.is_empty() {
            return Ok(None);
        }
        let head = self.store.find_latest_published().await?;
        self.store
            .item_by_item_id(item_id, head.as_ref().map(|v| v.version_id.as_str()))
            .await
    }

    /// 按样本类型筛选当前生效项目（标签精确匹配）
    pub async fn by_specimen_type(&self, specimen_type: &str) -> RepositoryResult<Vec<CatalogItem>> {
        let wanted = specimen_type.trim();
        let items = self.lifecycle.active_items().await?;
        Ok(items
            .into_iter()
            .filter(|item| item.item.specimen_type == wanted)
            .collect())
    }

    /// 按管色筛选当前生效项目（标签精确匹配）
    pub async fn by_tube_color(&self, tube_color: &str) -> RepositoryResult<Vec<CatalogItem>> {
        let wanted = tube_color.trim();
        let items = self.lifecycle.active_items().await?;
        Ok(items
            .into_iter()
            .filter(|item| item.item.tube_color.as_deref() == Some(wanted))
            .collect())
    }

    /// 高频项目（当前生效项目中标记为高频的前 limit 条）
    pub async fn high_freq(&self, limit: usize) -> RepositoryResult<Vec<CatalogItem>> {
        let items = self.lifecycle.active_items().await?;
        Ok(items
            .into_iter()
            .filter(|item| item.is_high_freq)
            .take(limit)
            .collect())
    }

    /// 更新项目使用频次与高频标记
    pub async fn set_item_frequency(
        &self,
        id: i64,
        frequency_score: i64,
        is_high_freq: bool,
    ) -> RepositoryResult<()> {
        self.store
            .update_item_frequency(id, frequency_score, is_high_freq, Utc::now().naive_utc())
            .await
    }

    pub fn enum_catalog(&self) -> EnumCatalog {
        EnumCatalog::build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_catalog_contents() {
        let catalog = EnumCatalog::build();
        assert!(catalog.specimen_types.contains(&"全血"));
        assert!(catalog.tube_colors.contains(&"紫"));
        assert_eq!(catalog.conflict_strategies[0], "OVERWRITE_BY_ID");

        let purple = catalog
            .tube_color_additives
            .iter()
            .find(|entry| entry.color == "紫")
            .unwrap();
        assert_eq!(purple.additives, vec!["EDTA-K2"]);
        assert!(catalog.tube_color_additives.iter().all(|entry| entry.color != "其他"));
    }
}
