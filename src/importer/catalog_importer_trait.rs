// ==========================================
// 检验标本采集目录 - 目录导入 Trait
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// 管道: 解析 → 映射 → 行校验 → 冲突处理 → 报告 → 暂存到草稿
// ==========================================

use crate::domain::import::{ImportReport, ValidatedRow};
use crate::domain::item::{CanonicalRecord, ImportableItem};
use crate::domain::types::ConflictStrategy;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::{RawRow, RawTable};
use crate::importer::row_validator::ValidationRules;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ==========================================
// 导入请求 / 导入结果
// ==========================================

/// 一次批量导入请求
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    /// 原始文本内容（UTF-8，可带 BOM）
    pub content: String,
    /// 展示用文件名
    pub file_name: String,
    /// 冲突策略（None 时使用配置默认值）
    pub strategy: Option<ConflictStrategy>,
    /// 操作人
    pub operator_name: Option<String>,
}

/// 导入结果：报告 + 目标草稿
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub report: ImportReport,
    pub version_id: String,
    pub version_code: String,
}

/// 冲突处理输出
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictOutcome {
    /// 全部行（保持源顺序，已按策略重新判定）
    pub rows: Vec<ValidatedRow>,
    /// 最终成功数据（覆盖后的替换项追加在末尾）
    pub success_data: Vec<ImportableItem>,
    /// 被覆盖的行数
    pub superseded_rows: usize,
}

// ==========================================
// CatalogImporter Trait
// ==========================================
// 用途: 目录导入主接口
// 实现者: CatalogImporterImpl
#[async_trait]
pub trait CatalogImporter: Send + Sync {
    /// 导入一批文本内容并暂存到当前草稿
    ///
    /// # 返回
    /// - Ok(ImportOutcome): 导入报告 + 草稿 version_id/version_code
    /// - Err: 配置读取失败、存储失败（整批回滚）
    async fn import_text(&self, request: ImportRequest) -> ImportResult<ImportOutcome>;

    /// 从 CSV 文件导入（文件名取路径的最后一段）
    async fn import_file(
        &self,
        file_path: &Path,
        strategy: Option<ConflictStrategy>,
        operator_name: Option<String>,
    ) -> ImportResult<ImportOutcome>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文本解析接口（阶段 0）
// 实现者: CsvParser
pub trait FileParser: Send + Sync {
    /// 解析文本为表头 + 数据行
    ///
    /// # 返回
    /// - Ok(RawTable): 空内容返回空表，不视为错误
    /// - Err: 底层读取错误
    fn parse_text(&self, content: &str) -> ImportResult<RawTable>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 列名映射接口（阶段 1）
// 实现者: FieldMapperImpl
pub trait FieldMapper: Send + Sync {
    /// 将源列名映射为规范字段名（未识别的列名原样保留）
    fn map_header(&self, label: &str) -> String;

    /// 按映射后的表头构建规范化记录
    ///
    /// # 规则
    /// - 超出表头长度的单元格忽略
    /// - 缺失的单元格视为空串
    /// - 重复表头取最右侧的值
    fn map_row(&self, mapped_headers: &[String], row: &RawRow) -> CanonicalRecord {
        let mut record = CanonicalRecord::new();
        for (idx, header) in mapped_headers.iter().enumerate() {
            let value = row.cells.get(idx).map(String::as_str).unwrap_or("");
            record.insert(header.clone(), value);
        }
        record
    }
}

// ==========================================
// RowValidator Trait
// ==========================================
// 用途: 单行校验接口（阶段 2）
// 实现者: RowValidatorImpl
pub trait RowValidator: Send + Sync {
    /// 校验一行并在有效时构建 ImportableItem
    fn validate_row(
        &self,
        row_number: usize,
        record: &CanonicalRecord,
        rules: &ValidationRules,
    ) -> ValidatedRow;
}

// ==========================================
// ConflictHandler Trait
// ==========================================
// 用途: 同文件内 item_id 冲突处理（阶段 3）
// 实现者: ConflictHandlerImpl
pub trait ConflictHandler: Send + Sync {
    /// 按策略对已校验行做一次从前到后的冲突判定
    fn resolve(&self, rows: Vec<ValidatedRow>, strategy: ConflictStrategy) -> ConflictOutcome;
}
