// ==========================================
// 检验标本采集目录 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 检验项目目录的批量导入、校验与版本发布
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 版本生命周期与目录查询
pub mod engine;

// 导入层 - CSV 解析、映射、校验、冲突处理
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// 性能埋点
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ConflictStrategy, SpecimenType, TubeAdditive, TubeColor, VersionStatus};

// 领域实体
pub use domain::{CatalogItem, ImportRecord, ImportReport, ImportableItem, IssueCode, Version};

// 引擎
pub use engine::{CatalogQueryService, VersionLifecycleManager};

// API
pub use api::{ApiError, ApiResult, CatalogApi, ImportApi, VersionApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "检验标本采集目录";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
