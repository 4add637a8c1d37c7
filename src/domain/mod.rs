// ==========================================
// 检验标本采集目录 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、版本规则
// 红线: 不含数据访问逻辑
// ==========================================

pub mod import;
pub mod item;
pub mod types;
pub mod version;

// 重导出核心类型
pub use import::{
    CodeCount, ImportRecord, ImportReport, ImportSummary, IssueCode, ValidatedRow,
    ValidationIssue,
};
pub use item::{CanonicalRecord, CatalogItem, ImportableItem, ReportTime, ScenarioTags};
pub use types::{ConflictStrategy, SpecimenType, TubeAdditive, TubeColor, VersionStatus};
pub use version::{next_version_code, Changelog, Version, VersionCounts};
