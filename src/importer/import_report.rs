// ==========================================
// 检验标本采集目录 - 导入报告生成
// ==========================================
// 阶段 4: 汇总统计 + 导入ID + 失败明细 CSV
// ==========================================

use crate::domain::import::{
    CodeCount, ImportReport, ImportSummary, IssueCode, ValidatedRow, ValidationIssue,
};
use crate::domain::types::ConflictStrategy;
use crate::importer::catalog_importer_trait::ConflictOutcome;
use chrono::{DateTime, Local};

/// 导入目标版本（导入总是写入草稿）
pub const VERSION_TARGET_DRAFT: &str = "draft";

/// 失败明细 CSV 表头
pub const FAILED_DETAIL_CSV_HEADER: &str =
    "row_no,item_id,item_name,error_codes,error_fields,message";

/// 生成导入ID: IMP_YYYYMMDD_HHMMSS（本地时间）
pub fn generate_import_id(now: DateTime<Local>) -> String {
    format!("IMP_{}", now.format("%Y%m%d_%H%M%S"))
}

/// 按首次出现顺序统计问题码（每次出现计 1）
fn count_codes<'a>(issues: impl Iterator<Item = &'a ValidationIssue>) -> Vec<CodeCount> {
    let mut counts: Vec<CodeCount> = Vec::new();
    for issue in issues {
        match counts.iter_mut().find(|c| c.code == issue.code) {
            Some(entry) => entry.count += 1,
            None => counts.push(CodeCount {
                code: issue.code,
                count: 1,
            }),
        }
    }
    counts
}

// ==========================================
// ImportReportBuilder
// ==========================================
pub struct ImportReportBuilder;

impl ImportReportBuilder {
    /// 由冲突处理结果生成导入报告
    ///
    /// # 统计口径
    /// - success_rows = success_data 条数
    /// - failed_rows = 无效行数
    /// - total_rows = success_rows + failed_rows（被覆盖行单独计入 superseded_rows）
    /// - warning_rows = 最终存活且带提示的行数
    /// - error/warning_summary 统计全部行上的每一次出现
    pub fn build(
        file_name: &str,
        strategy: ConflictStrategy,
        outcome: ConflictOutcome,
        now: DateTime<Local>,
    ) -> ImportReport {
        let ConflictOutcome {
            rows,
            success_data,
            superseded_rows,
        } = outcome;

        let error_summary = count_codes(rows.iter().flat_map(|r| r.errors.iter()));
        let warning_summary = count_codes(rows.iter().flat_map(|r| r.warnings.iter()));
        let warning_rows = rows
            .iter()
            .filter(|r| r.is_surviving() && !r.warnings.is_empty())
            .count();

        let failed_details: Vec<ValidatedRow> = rows.into_iter().filter(|r| !r.is_valid).collect();
        let success_rows = success_data.len();
        let failed_rows = failed_details.len();

        ImportReport {
            summary: ImportSummary {
                import_id: generate_import_id(now),
                file_name: file_name.to_string(),
                version_target: VERSION_TARGET_DRAFT.to_string(),
                total_rows: success_rows + failed_rows,
                success_rows,
                failed_rows,
                warning_rows,
                superseded_rows,
                conflict_strategy: strategy,
                error_summary,
                warning_summary,
            },
            failed_details,
            success_data,
        }
    }

    /// 统计某问题码的出现次数
    pub fn code_count(summary: &[CodeCount], code: IssueCode) -> usize {
        summary
            .iter()
            .find(|c| c.code == code)
            .map(|c| c.count)
            .unwrap_or(0)
    }
}

/// 包裹双引号（内部双引号转义为 ""）
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// 生成失败明细 CSV
///
/// # 格式
/// - 表头: row_no,item_id,item_name,error_codes,error_fields,message
/// - 错误码/字段以 ";" 连接，消息以 "; " 连接
/// - 除 row_no 外各列一律加双引号，行间以 "\n" 连接
pub fn generate_failed_detail_csv(failed_details: &[ValidatedRow]) -> String {
    let mut lines = Vec::with_capacity(failed_details.len() + 1);
    lines.push(FAILED_DETAIL_CSV_HEADER.to_string());

    for detail in failed_details {
        let codes: Vec<&str> = detail.errors.iter().map(|e| e.code.as_str()).collect();
        let fields: Vec<&str> = detail.errors.iter().map(|e| e.field.as_str()).collect();
        let messages: Vec<&str> = detail.errors.iter().map(|e| e.message.as_str()).collect();

        lines.push(format!(
            "{},{},{},{},{},{}",
            detail.row_number,
            quoted(&detail.item_id),
            quoted(&detail.item_name),
            quoted(&codes.join(";")),
            quoted(&fields.join(";")),
            quoted(&messages.join("; ")),
        ));
    }

    lines.join("\n")
}
