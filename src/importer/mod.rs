// ==========================================
// 检验标本采集目录 - 导入层
// ==========================================
// 职责: CSV 文本 → 校验报告 + 草稿版本项目
// 流程: 解析 → 映射 → 行校验 → 冲突处理 → 报告 → 暂存
// ==========================================

// 模块声明
pub mod catalog_importer_impl;
pub mod catalog_importer_trait;
pub mod conflict_handler;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod import_report;
pub mod row_validator;

// 重导出核心类型
pub use catalog_importer_impl::CatalogImporterImpl;
pub use conflict_handler::ConflictHandler as ConflictHandlerImpl;
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper as FieldMapperImpl;
pub use file_parser::{CsvParser, RawRow, RawTable};
pub use import_report::{generate_failed_detail_csv, generate_import_id, ImportReportBuilder};
pub use row_validator::{RowValidator as RowValidatorImpl, ValidationRules};

// 重导出 Trait 接口
pub use catalog_importer_trait::{
    CatalogImporter, ConflictHandler, ConflictOutcome, FieldMapper, FileParser, ImportOutcome,
    ImportRequest, RowValidator,
};
