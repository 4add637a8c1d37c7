// ==========================================
// 检验标本采集目录 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供命令行入口调用
// ==========================================

pub mod catalog_api;
pub mod error;
pub mod import_api;
pub mod version_api;

// 重导出核心类型
pub use catalog_api::CatalogApi;
pub use error::{ApiError, ApiResult};
pub use import_api::{parse_strategy_token, ImportApi, ImportApiResponse};
pub use version_api::{PublishResponse, VersionApi};
