// ==========================================
// 检验标本采集目录 - 导入领域模型
// ==========================================
// 职责: 校验问题码、行校验结果、导入报告、导入记录
// 说明: 问题码为对外契约，序列化值不可更改
// ==========================================

use crate::domain::item::ImportableItem;
use crate::domain::types::ConflictStrategy;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// IssueCode - 校验问题码
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueCode {
    #[serde(rename = "E_ID_EMPTY")]
    IdEmpty,
    #[serde(rename = "E_NAME_EMPTY")]
    NameEmpty,
    #[serde(rename = "E_NAME_INVALID")]
    NameInvalid,
    #[serde(rename = "E_SPECIMEN_EMPTY")]
    SpecimenEmpty,
    #[serde(rename = "E_ID_DUPLICATE")]
    IdDuplicate,
    #[serde(rename = "E_ID_SKIPPED")]
    IdSkipped,
    #[serde(rename = "W_ID_FORMAT")]
    IdFormat,
    #[serde(rename = "W_SPECIMEN_INVALID")]
    SpecimenInvalid,
    #[serde(rename = "W_TUBE_COLOR_REQUIRED")]
    TubeColorRequired,
    #[serde(rename = "W_CONTAINER_REQUIRED")]
    ContainerRequired,
    #[serde(rename = "W_TUBE_ADD_MISMATCH")]
    TubeAdditiveMismatch,
    #[serde(rename = "W_LIMIT_EMPTY")]
    TransportLimitEmpty,
    #[serde(rename = "W_TEMP_EMPTY")]
    StorageTempEmpty,
    #[serde(rename = "W_REJECT_EMPTY")]
    RejectionEmpty,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::IdEmpty => "E_ID_EMPTY",
            IssueCode::NameEmpty => "E_NAME_EMPTY",
            IssueCode::NameInvalid => "E_NAME_INVALID",
            IssueCode::SpecimenEmpty => "E_SPECIMEN_EMPTY",
            IssueCode::IdDuplicate => "E_ID_DUPLICATE",
            IssueCode::IdSkipped => "E_ID_SKIPPED",
            IssueCode::IdFormat => "W_ID_FORMAT",
            IssueCode::SpecimenInvalid => "W_SPECIMEN_INVALID",
            IssueCode::TubeColorRequired => "W_TUBE_COLOR_REQUIRED",
            IssueCode::ContainerRequired => "W_CONTAINER_REQUIRED",
            IssueCode::TubeAdditiveMismatch => "W_TUBE_ADD_MISMATCH",
            IssueCode::TransportLimitEmpty => "W_LIMIT_EMPTY",
            IssueCode::StorageTempEmpty => "W_TEMP_EMPTY",
            IssueCode::RejectionEmpty => "W_REJECT_EMPTY",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// ValidationIssue - 单条校验问题
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(code: IssueCode, field: &str, message: String) -> Self {
        Self {
            code,
            field: field.to_string(),
            message,
        }
    }
}

// ==========================================
// ValidatedRow - 行校验结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedRow {
    /// 源文件行号（表头为第 1 行）
    pub row_number: usize,
    pub item_id: String,
    pub item_name: String,
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    /// 仅当 is_valid 时存在
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<ImportableItem>,
    /// 被后续同 ID 行覆盖时，记录覆盖者的行号
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<usize>,
}

impl ValidatedRow {
    /// 追加阻断错误并使行失效（冲突处理阶段使用）
    pub fn reject(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
        self.is_valid = false;
        self.record = None;
    }

    /// 是否计入成功数据
    pub fn is_surviving(&self) -> bool {
        self.is_valid && self.superseded_by.is_none()
    }
}

// ==========================================
// 导入报告
// ==========================================

/// 问题码计数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeCount {
    pub code: IssueCode,
    pub count: usize,
}

/// 导入汇总（不含明细）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub import_id: String,
    pub file_name: String,
    pub version_target: String,
    /// total_rows = success_rows + failed_rows
    pub total_rows: usize,
    pub success_rows: usize,
    pub failed_rows: usize,
    pub warning_rows: usize,
    /// OVERWRITE_BY_ID 下被覆盖的行数（不计入 total_rows）
    pub superseded_rows: usize,
    pub conflict_strategy: ConflictStrategy,
    pub error_summary: Vec<CodeCount>,
    pub warning_summary: Vec<CodeCount>,
}

/// 完整导入报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    #[serde(flatten)]
    pub summary: ImportSummary,
    pub failed_details: Vec<ValidatedRow>,
    pub success_data: Vec<ImportableItem>,
}

// ==========================================
// ImportRecord - 导入审计记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    #[serde(flatten)]
    pub summary: ImportSummary,
    pub version_id: String,
    pub failed_details: Vec<ValidatedRow>,
    pub operator_name: Option<String>,
    pub created_at: NaiveDateTime,
}

impl ImportRecord {
    /// 由导入报告生成审计记录（不保存成功数据，成功数据落在版本项目中）
    pub fn from_report(
        report: &ImportReport,
        version_id: &str,
        operator_name: Option<String>,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            summary: report.summary.clone(),
            version_id: version_id.to_string(),
            failed_details: report.failed_details.clone(),
            operator_name,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_code_serializes_as_contract_string() {
        let json = serde_json::to_string(&IssueCode::TubeAdditiveMismatch).unwrap();
        assert_eq!(json, "\"W_TUBE_ADD_MISMATCH\"");
        let back: IssueCode = serde_json::from_str("\"E_ID_SKIPPED\"").unwrap();
        assert_eq!(back, IssueCode::IdSkipped);
    }

    #[test]
    fn test_reject_drops_record() {
        let mut row = ValidatedRow {
            row_number: 3,
            item_id: "LAB000001".to_string(),
            item_name: "血常规".to_string(),
            is_valid: true,
            errors: vec![],
            warnings: vec![],
            record: None,
            superseded_by: None,
        };
        row.reject(ValidationIssue::new(
            IssueCode::IdDuplicate,
            "itemId",
            "dup".to_string(),
        ));
        assert!(!row.is_valid);
        assert!(!row.is_surviving());
        assert_eq!(row.errors.len(), 1);
    }
}
