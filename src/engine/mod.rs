// ==========================================
// 检验标本采集目录 - 引擎层
// ==========================================
// 职责: 版本生命周期与目录查询规则
// 红线: Engine 不拼 SQL，数据访问统一经 CatalogStore
// ==========================================

pub mod catalog_query;
pub mod version_lifecycle;

// 重导出核心引擎
pub use catalog_query::{CatalogQueryService, EnumCatalog, TubeColorAdditives};
pub use version_lifecycle::VersionLifecycleManager;
