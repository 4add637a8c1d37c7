// ==========================================
// 检验标本采集目录 - 行校验器实现
// ==========================================
// 阶段 2: 单行校验 + 可入库项目构建
// 规则: 阻断错误(E_*) 使行无效；提示(W_*) 不影响有效性
// ==========================================

use crate::domain::import::{IssueCode, ValidatedRow, ValidationIssue};
use crate::domain::item::{CanonicalRecord, ImportableItem, ReportTime, ScenarioTags};
use crate::domain::types::{SpecimenType, TubeAdditive, TubeColor};
use crate::i18n::{t, t_with_args};
use crate::importer::catalog_importer_trait::RowValidator as RowValidatorTrait;
use crate::importer::field_mapper::fields;

/// 派生拼音首字母的最大长度
const PINYIN_ABBR_MAX_LEN: usize = 10;

/// 真值标记
const TRUTHY_TOKENS: &[&str] = &["是", "true", "1"];

// ==========================================
// ValidationRules - 可配置的校验参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRules {
    /// 项目名称最大字符数
    pub name_max_chars: usize,
    /// 项目ID建议前缀
    pub id_prefix: String,
    /// 项目ID前缀后的数字位数
    pub id_digits: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            name_max_chars: 200,
            id_prefix: "LAB".to_string(),
            id_digits: 6,
        }
    }
}

impl ValidationRules {
    /// 项目ID是否符合 前缀 + N 位数字
    pub fn matches_id_format(&self, item_id: &str) -> bool {
        match item_id.strip_prefix(self.id_prefix.as_str()) {
            Some(rest) => rest.len() == self.id_digits && rest.bytes().all(|b| b.is_ascii_digit()),
            None => false,
        }
    }
}

// ==========================================
// RowValidator 实现
// ==========================================
pub struct RowValidator;

impl RowValidator {
    fn is_truthy(value: &str) -> bool {
        TRUTHY_TOKENS.contains(&value)
    }

    /// 从项目名称派生拼音首字母：保留 ASCII 字母数字，转大写，截取前 10 位
    fn derive_pinyin_abbr(item_name: &str) -> Option<String> {
        let abbr: String = item_name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .take(PINYIN_ABBR_MAX_LEN)
            .collect();
        if abbr.is_empty() {
            None
        } else {
            Some(abbr)
        }
    }

    /// 构建可入库项目（调用方保证 item_id/item_name/specimen_type 非空）
    fn build_item(record: &CanonicalRecord) -> ImportableItem {
        let item_name = record.get(fields::ITEM_NAME).to_string();

        let enabled = match record.text(fields::ENABLED) {
            Some(value) => Self::is_truthy(&value),
            None => true,
        };

        let pinyin_abbr = record
            .text(fields::PINYIN_ABBR)
            .or_else(|| Self::derive_pinyin_abbr(&item_name));

        ImportableItem {
            item_id: record.get(fields::ITEM_ID).to_string(),
            item_name,
            item_group: record.text(fields::ITEM_GROUP),
            specimen_type: record.get(fields::SPECIMEN_TYPE).to_string(),
            container_type: record.text(fields::CONTAINER_TYPE),
            tube_color: record.text(fields::TUBE_COLOR),
            tube_additive: record.text(fields::TUBE_ADDITIVE),
            recommended_volume: record.text(fields::RECOMMENDED_VOLUME),
            collection_requirements: record.text(fields::COLLECTION_REQUIREMENTS),
            report_time: record.text(fields::REPORT_TIME).map(|v| ReportTime::parse(&v)),
            needs_confirmation: Self::is_truthy(record.get(fields::NEEDS_CONFIRMATION)),
            alias: record.text(fields::ALIAS),
            en_abbr: record.text(fields::EN_ABBR),
            pinyin_abbr,
            scenario_tags: record
                .text(fields::SCENARIO_TAGS)
                .map(|v| ScenarioTags::parse(&v)),
            storage_temp: record.text(fields::STORAGE_TEMP),
            transport_limit: record.text(fields::TRANSPORT_LIMIT),
            handling_summary: record.text(fields::HANDLING_SUMMARY),
            rejection_summary: record.text(fields::REJECTION_SUMMARY),
            prep_summary: record.text(fields::PREP_SUMMARY),
            enabled,
        }
    }

    /// 采集相关提示：管色/容器必填、管色与添加剂一致性
    fn check_collection(record: &CanonicalRecord, specimen: &SpecimenType, warnings: &mut Vec<ValidationIssue>) {
        let tube_color = record.get(fields::TUBE_COLOR);
        let container = record.get(fields::CONTAINER_TYPE);

        if specimen.is_blood() && tube_color.is_empty() {
            warnings.push(ValidationIssue::new(
                IssueCode::TubeColorRequired,
                fields::TUBE_COLOR,
                t("validation.tube_color_required"),
            ));
        } else if specimen.needs_container() && container.is_empty() {
            warnings.push(ValidationIssue::new(
                IssueCode::ContainerRequired,
                fields::CONTAINER_TYPE,
                t("validation.container_required"),
            ));
        }
    }

    /// 管色与添加剂一致性（两者均填写时检查，与样本类型无关）
    fn check_tube_additive(record: &CanonicalRecord, warnings: &mut Vec<ValidationIssue>) {
        let tube_color = record.get(fields::TUBE_COLOR);
        let additive = record.get(fields::TUBE_ADDITIVE);
        if tube_color.is_empty() || additive.is_empty() {
            return;
        }

        let color = TubeColor::from_label(tube_color);
        if color.accepts_additive(&TubeAdditive::from_label(additive)) {
            return;
        }
        let expected = color.expected_additives().unwrap_or(&[]).join("/");
        warnings.push(ValidationIssue::new(
            IssueCode::TubeAdditiveMismatch,
            fields::TUBE_ADDITIVE,
            t_with_args(
                "validation.tube_additive_mismatch",
                &[("color", tube_color), ("expected", expected.as_str()), ("additive", additive)],
            ),
        ));
    }
}

impl RowValidatorTrait for RowValidator {
    fn validate_row(
        &self,
        row_number: usize,
        record: &CanonicalRecord,
        rules: &ValidationRules,
    ) -> ValidatedRow {
        let item_id = record.get(fields::ITEM_ID).to_string();
        let item_name = record.get(fields::ITEM_NAME).to_string();
        let specimen = record.get(fields::SPECIMEN_TYPE);

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 项目ID
        if item_id.is_empty() {
            errors.push(ValidationIssue::new(
                IssueCode::IdEmpty,
                fields::ITEM_ID,
                t("validation.id_empty"),
            ));
        } else if !rules.matches_id_format(&item_id) {
            let digits = rules.id_digits.to_string();
            warnings.push(ValidationIssue::new(
                IssueCode::IdFormat,
                fields::ITEM_ID,
                t_with_args(
                    "validation.id_format",
                    &[("prefix", rules.id_prefix.as_str()), ("digits", digits.as_str())],
                ),
            ));
        }

        // 项目名称
        if item_name.is_empty() {
            errors.push(ValidationIssue::new(
                IssueCode::NameEmpty,
                fields::ITEM_NAME,
                t("validation.name_empty"),
            ));
        } else if item_name.chars().count() > rules.name_max_chars {
            let max = rules.name_max_chars.to_string();
            errors.push(ValidationIssue::new(
                IssueCode::NameInvalid,
                fields::ITEM_NAME,
                t_with_args("validation.name_too_long", &[("max", max.as_str())]),
            ));
        }

        // 样本类型
        if specimen.is_empty() {
            errors.push(ValidationIssue::new(
                IssueCode::SpecimenEmpty,
                fields::SPECIMEN_TYPE,
                t("validation.specimen_empty"),
            ));
        } else {
            let specimen_type = SpecimenType::from_label(specimen);
            if !specimen_type.is_recognized() {
                warnings.push(ValidationIssue::new(
                    IssueCode::SpecimenInvalid,
                    fields::SPECIMEN_TYPE,
                    t_with_args("validation.specimen_invalid", &[("value", specimen)]),
                ));
            }
            Self::check_collection(record, &specimen_type, &mut warnings);
        }
        Self::check_tube_additive(record, &mut warnings);

        // 保存与转运
        let optional_checks = [
            (fields::TRANSPORT_LIMIT, IssueCode::TransportLimitEmpty, "validation.transport_limit_empty"),
            (fields::STORAGE_TEMP, IssueCode::StorageTempEmpty, "validation.storage_temp_empty"),
            (fields::REJECTION_SUMMARY, IssueCode::RejectionEmpty, "validation.rejection_empty"),
        ];
        for (field, code, key) in optional_checks {
            if record.get(field).is_empty() {
                warnings.push(ValidationIssue::new(code, field, t(key)));
            }
        }

        let is_valid = errors.is_empty();
        let item = if is_valid {
            Some(Self::build_item(record))
        } else {
            None
        };

        ValidatedRow {
            row_number,
            item_id,
            item_name,
            is_valid,
            errors,
            warnings,
            record: item,
            superseded_by: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> CanonicalRecord {
        let mut record = CanonicalRecord::new();
        for (k, v) in pairs {
            record.insert(*k, *v);
        }
        record
    }

    fn complete(pairs: &[(&str, &str)]) -> CanonicalRecord {
        let mut base = vec![
            (fields::ITEM_ID, "LAB000001"),
            (fields::ITEM_NAME, "血细胞分析"),
            (fields::SPECIMEN_TYPE, "全血"),
            (fields::TUBE_COLOR, "紫"),
            (fields::TUBE_ADDITIVE, "EDTA-K2"),
            (fields::TRANSPORT_LIMIT, "2小时"),
            (fields::STORAGE_TEMP, "室温"),
            (fields::REJECTION_SUMMARY, "溶血拒收"),
        ];
        for (k, v) in pairs {
            base.retain(|(bk, _)| bk != k);
            base.push((*k, *v));
        }
        record(&base)
    }

    fn codes(issues: &[ValidationIssue]) -> Vec<IssueCode> {
        issues.iter().map(|i| i.code).collect()
    }

    fn validate(record: &CanonicalRecord) -> ValidatedRow {
        RowValidator.validate_row(2, record, &ValidationRules::default())
    }

    #[test]
    fn test_complete_row_has_no_issues() {
        let row = validate(&complete(&[]));
        assert!(row.is_valid);
        assert!(row.errors.is_empty());
        assert!(row.warnings.is_empty(), "{:?}", row.warnings);
        let item = row.record.unwrap();
        assert_eq!(item.item_id, "LAB000001");
        assert!(item.enabled);
        assert!(!item.needs_confirmation);
    }

    #[test]
    fn test_missing_id_and_name_both_reported() {
        let row = validate(&record(&[(fields::SPECIMEN_TYPE, "血清")]));
        assert!(!row.is_valid);
        assert!(row.record.is_none());
        assert_eq!(codes(&row.errors), vec![IssueCode::IdEmpty, IssueCode::NameEmpty]);
    }

    #[test]
    fn test_name_length_limit_counts_characters() {
        let name_ok = "检".repeat(200);
        let row = validate(&complete(&[(fields::ITEM_NAME, name_ok.as_str())]));
        assert!(row.is_valid);

        let name_long = "检".repeat(201);
        let row = validate(&complete(&[(fields::ITEM_NAME, name_long.as_str())]));
        assert_eq!(codes(&row.errors), vec![IssueCode::NameInvalid]);
    }

    #[test]
    fn test_id_format_warning_only_when_present() {
        let row = validate(&complete(&[(fields::ITEM_ID, "LAB12345")]));
        assert!(row.is_valid);
        assert_eq!(codes(&row.warnings), vec![IssueCode::IdFormat]);

        let row = validate(&complete(&[(fields::ITEM_ID, "")]));
        assert!(!codes(&row.warnings).contains(&IssueCode::IdFormat));
    }

    #[test]
    fn test_specimen_rules() {
        let row = validate(&complete(&[(fields::SPECIMEN_TYPE, "")]));
        assert_eq!(codes(&row.errors), vec![IssueCode::SpecimenEmpty]);

        let row = validate(&complete(&[(fields::SPECIMEN_TYPE, "关节液")]));
        assert!(row.is_valid);
        assert_eq!(codes(&row.warnings), vec![IssueCode::SpecimenInvalid]);
    }

    #[test]
    fn test_blood_specimen_requires_tube_color() {
        let row = validate(&complete(&[(fields::TUBE_COLOR, "")]));
        assert_eq!(codes(&row.warnings), vec![IssueCode::TubeColorRequired]);
    }

    #[test]
    fn test_non_blood_specimen_requires_container() {
        let row = validate(&complete(&[
            (fields::SPECIMEN_TYPE, "尿液"),
            (fields::TUBE_COLOR, ""),
            (fields::TUBE_ADDITIVE, ""),
        ]));
        assert_eq!(codes(&row.warnings), vec![IssueCode::ContainerRequired]);

        let row = validate(&complete(&[
            (fields::SPECIMEN_TYPE, "尿液"),
            (fields::TUBE_COLOR, ""),
            (fields::TUBE_ADDITIVE, ""),
            (fields::CONTAINER_TYPE, "无菌尿杯"),
        ]));
        assert!(row.warnings.is_empty());
    }

    #[test]
    fn test_tube_additive_mismatch() {
        let row = validate(&complete(&[(fields::TUBE_ADDITIVE, "枸橼酸钠")]));
        assert_eq!(codes(&row.warnings), vec![IssueCode::TubeAdditiveMismatch]);
        assert!(row.warnings[0].message.contains("EDTA-K2"));

        // 无约定的管色不做检查
        let row = validate(&complete(&[(fields::TUBE_COLOR, "橙"), (fields::TUBE_ADDITIVE, "任意")]));
        assert!(row.warnings.is_empty());
    }

    #[test]
    fn test_tube_additive_mismatch_without_specimen() {
        let row = validate(&complete(&[
            (fields::SPECIMEN_TYPE, ""),
            (fields::TUBE_COLOR, "紫"),
            (fields::TUBE_ADDITIVE, "枸橼酸钠"),
        ]));
        assert!(!row.is_valid);
        assert_eq!(codes(&row.errors), vec![IssueCode::SpecimenEmpty]);
        assert_eq!(codes(&row.warnings), vec![IssueCode::TubeAdditiveMismatch]);
    }

    #[test]
    fn test_optional_field_warnings() {
        let row = validate(&complete(&[
            (fields::TRANSPORT_LIMIT, ""),
            (fields::STORAGE_TEMP, ""),
            (fields::REJECTION_SUMMARY, ""),
        ]));
        assert!(row.is_valid);
        assert_eq!(
            codes(&row.warnings),
            vec![
                IssueCode::TransportLimitEmpty,
                IssueCode::StorageTempEmpty,
                IssueCode::RejectionEmpty
            ]
        );
    }

    #[test]
    fn test_build_item_flags_and_derived_fields() {
        let row = validate(&complete(&[
            (fields::ITEM_NAME, "hs-CRP 超敏C反应蛋白"),
            (fields::NEEDS_CONFIRMATION, "是"),
            (fields::ENABLED, "否"),
            (fields::SCENARIO_TAGS, "not json"),
            (fields::REPORT_TIME, r#"{"门诊":"30分钟"}"#),
        ]));
        let item = row.record.unwrap();
        assert!(item.needs_confirmation);
        assert!(!item.enabled);
        assert_eq!(item.pinyin_abbr.as_deref(), Some("HSCRPC"));
        assert_eq!(
            item.scenario_tags,
            Some(ScenarioTags::Raw {
                raw: "not json".to_string()
            })
        );
        assert!(matches!(item.report_time, Some(ReportTime::Windows(_))));
    }

    #[test]
    fn test_pinyin_abbr_absent_for_non_ascii_name() {
        let row = validate(&complete(&[]));
        assert_eq!(row.record.unwrap().pinyin_abbr, None);

        let row = validate(&complete(&[(fields::PINYIN_ABBR, "XXFX")]));
        assert_eq!(row.record.unwrap().pinyin_abbr.as_deref(), Some("XXFX"));
    }

    #[test]
    fn test_custom_rules() {
        let rules = ValidationRules {
            name_max_chars: 4,
            id_prefix: "HX".to_string(),
            id_digits: 3,
        };
        let row = RowValidator.validate_row(2, &complete(&[(fields::ITEM_ID, "HX001")]), &rules);
        assert_eq!(codes(&row.errors), vec![IssueCode::NameInvalid]);
        assert!(!codes(&row.warnings).contains(&IssueCode::IdFormat));
    }
}
