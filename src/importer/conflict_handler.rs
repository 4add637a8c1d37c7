// ==========================================
// 检验标本采集目录 - 冲突处理器实现
// ==========================================
// 阶段 3: 同一文件内重复 item_id 处理（单次从前到后扫描）
// - OVERWRITE_BY_ID: 后出现的有效行替换先出现的，被替换行标记 superseded_by
// - SKIP_BY_ID: 后出现的行一律判为失败 (E_ID_SKIPPED)
// - ERROR_BY_ID: 后出现的行一律判为失败 (E_ID_DUPLICATE)
// 说明: 空 item_id 不参与去重；首次出现的行即使无效也占用该 ID
// ==========================================

use crate::domain::import::{IssueCode, ValidatedRow, ValidationIssue};
use crate::domain::types::ConflictStrategy;
use crate::i18n::t_with_args;
use crate::importer::catalog_importer_trait::{
    ConflictHandler as ConflictHandlerTrait, ConflictOutcome,
};
use crate::importer::field_mapper::fields;
use std::collections::{HashMap, HashSet};

pub struct ConflictHandler;

impl ConflictHandler {
    /// 被跳过/报错的重复行
    fn duplicate_issue(code: IssueCode, item_id: &str) -> ValidationIssue {
        let key = match code {
            IssueCode::IdSkipped => "conflict.id_skipped",
            _ => "conflict.id_duplicate",
        };
        ValidationIssue::new(code, fields::ITEM_ID, t_with_args(key, &[("id", item_id)]))
    }
}

impl ConflictHandlerTrait for ConflictHandler {
    fn resolve(&self, mut rows: Vec<ValidatedRow>, strategy: ConflictStrategy) -> ConflictOutcome {
        let mut seen_ids: HashSet<String> = HashSet::new();
        // item_id → 当前存活的行下标
        let mut surviving: HashMap<String, usize> = HashMap::new();
        let mut superseded_rows = 0;

        for idx in 0..rows.len() {
            let item_id = rows[idx].item_id.clone();
            if item_id.is_empty() {
                continue;
            }

            if !seen_ids.insert(item_id.clone()) {
                match strategy {
                    ConflictStrategy::ErrorById => {
                        rows[idx].reject(Self::duplicate_issue(IssueCode::IdDuplicate, &item_id));
                    }
                    ConflictStrategy::SkipById => {
                        rows[idx].reject(Self::duplicate_issue(IssueCode::IdSkipped, &item_id));
                    }
                    ConflictStrategy::OverwriteById => {}
                }
            }

            if !rows[idx].is_valid {
                continue;
            }

            if let Some(previous) = surviving.insert(item_id, idx) {
                let row_number = rows[idx].row_number;
                rows[previous].superseded_by = Some(row_number);
                superseded_rows += 1;
            }
        }

        // 覆盖后的替换项按出现顺序排在后面
        let success_data = rows
            .iter()
            .filter(|r| r.is_surviving())
            .filter_map(|r| r.record.clone())
            .collect();

        ConflictOutcome {
            rows,
            success_data,
            superseded_rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::item::ImportableItem;

    fn item(item_id: &str, item_name: &str) -> ImportableItem {
        ImportableItem {
            item_id: item_id.to_string(),
            item_name: item_name.to_string(),
            item_group: None,
            specimen_type: "全血".to_string(),
            container_type: None,
            tube_color: Some("紫".to_string()),
            tube_additive: None,
            recommended_volume: None,
            collection_requirements: None,
            report_time: None,
            needs_confirmation: false,
            alias: None,
            en_abbr: None,
            pinyin_abbr: None,
            scenario_tags: None,
            storage_temp: None,
            transport_limit: None,
            handling_summary: None,
            rejection_summary: None,
            prep_summary: None,
            enabled: true,
        }
    }

    fn valid_row(row_number: usize, item_id: &str, item_name: &str) -> ValidatedRow {
        ValidatedRow {
            row_number,
            item_id: item_id.to_string(),
            item_name: item_name.to_string(),
            is_valid: true,
            errors: vec![],
            warnings: vec![],
            record: Some(item(item_id, item_name)),
            superseded_by: None,
        }
    }

    fn invalid_row(row_number: usize, item_id: &str) -> ValidatedRow {
        ValidatedRow {
            row_number,
            item_id: item_id.to_string(),
            item_name: String::new(),
            is_valid: false,
            errors: vec![ValidationIssue::new(
                IssueCode::NameEmpty,
                fields::ITEM_NAME,
                "项目名称为空".to_string(),
            )],
            warnings: vec![],
            record: None,
            superseded_by: None,
        }
    }

    #[test]
    fn test_overwrite_keeps_later_row() {
        let rows = vec![
            valid_row(2, "LAB000001", "旧名称"),
            valid_row(3, "LAB000002", "其他"),
            valid_row(4, "LAB000001", "新名称"),
        ];
        let outcome = ConflictHandler.resolve(rows, ConflictStrategy::OverwriteById);

        assert_eq!(outcome.superseded_rows, 1);
        assert_eq!(outcome.rows[0].superseded_by, Some(4));
        let names: Vec<&str> = outcome
            .success_data
            .iter()
            .map(|i| i.item_name.as_str())
            .collect();
        assert_eq!(names, vec!["其他", "新名称"]);
    }

    #[test]
    fn test_overwrite_invalid_later_row_does_not_replace() {
        let rows = vec![valid_row(2, "LAB000001", "保留"), invalid_row(3, "LAB000001")];
        let outcome = ConflictHandler.resolve(rows, ConflictStrategy::OverwriteById);
        assert_eq!(outcome.superseded_rows, 0);
        assert_eq!(outcome.success_data.len(), 1);
        assert_eq!(outcome.success_data[0].item_name, "保留");
        // 无效行保留自身的校验结果
        assert_eq!(outcome.rows[1].errors.len(), 1);
    }

    #[test]
    fn test_skip_rejects_every_later_occurrence() {
        let rows = vec![
            valid_row(2, "LAB000001", "第一"),
            valid_row(3, "LAB000001", "第二"),
            valid_row(4, "LAB000001", "第三"),
        ];
        let outcome = ConflictHandler.resolve(rows, ConflictStrategy::SkipById);
        assert_eq!(outcome.success_data.len(), 1);
        assert_eq!(outcome.success_data[0].item_name, "第一");
        for row in &outcome.rows[1..] {
            assert!(!row.is_valid);
            assert!(row.record.is_none());
            assert_eq!(row.errors[0].code, IssueCode::IdSkipped);
        }
    }

    #[test]
    fn test_error_strategy_first_row_keeps_own_outcome() {
        let rows = vec![invalid_row(2, "LAB000001"), valid_row(3, "LAB000001", "第二")];
        let outcome = ConflictHandler.resolve(rows, ConflictStrategy::ErrorById);
        assert!(outcome.success_data.is_empty());
        assert_eq!(outcome.rows[0].errors[0].code, IssueCode::NameEmpty);
        assert_eq!(outcome.rows[1].errors[0].code, IssueCode::IdDuplicate);
    }

    #[test]
    fn test_empty_ids_never_conflict() {
        let rows = vec![invalid_row(2, ""), invalid_row(3, "")];
        let outcome = ConflictHandler.resolve(rows, ConflictStrategy::ErrorById);
        for row in &outcome.rows {
            assert_eq!(row.errors.len(), 1);
        }
    }
}
