// ==========================================
// 检验标本采集目录 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口，屏蔽数据库细节
// 约束: 所有查询使用参数化，防止 SQL 注入
// ==========================================

pub mod catalog_store;
pub mod catalog_store_impl;
pub mod error;
pub mod import_record_repo;
pub mod item_repo;
pub mod version_repo;

// 重导出核心仓储
pub use catalog_store::CatalogStore;
pub use catalog_store_impl::SqliteCatalogStore;
pub use error::{RepositoryError, RepositoryResult};
pub use import_record_repo::ImportRecordRepository;
pub use item_repo::ItemRepository;
pub use version_repo::VersionRepository;
