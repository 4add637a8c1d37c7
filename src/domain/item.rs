// ==========================================
// 检验标本采集目录 - 检验项目实体
// ==========================================
// 职责: 导入中间结构（规范化记录）、可入库项目、已入库目录项目
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ==========================================
// CanonicalRecord - 规范化行记录
// ==========================================
// 规范字段名 → 单元格文本；未识别的列名原样保留
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    fields: HashMap<String, String>,
}

impl CanonicalRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入字段（同名字段后写覆盖先写）
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    /// 读取字段，缺失时返回空串
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(|v| v.trim()).unwrap_or("")
    }

    /// 读取非空字段
    pub fn text(&self, field: &str) -> Option<String> {
        let value = self.get(field);
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ==========================================
// ReportTime - 报告时间
// ==========================================
// JSON 对象 → 时间窗映射；其他任何内容 → 原文
// 序列化带 kind 标签：时间窗的键可以是任意文本（包括 "raw"），不能靠形状区分
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ReportTime {
    Raw(String),
    Windows(BTreeMap<String, String>),
}

impl ReportTime {
    /// 解析报告时间单元格（不会失败）
    pub fn parse(cell: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(cell) {
            Ok(serde_json::Value::Object(map)) => ReportTime::Windows(
                map.into_iter()
                    .map(|(label, value)| (label, json_value_text(value)))
                    .collect(),
            ),
            _ => ReportTime::Raw(cell.to_string()),
        }
    }
}

// ==========================================
// ScenarioTags - 场景标签
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScenarioTags {
    Tags(Vec<String>),
    Raw { raw: String },
}

impl ScenarioTags {
    /// 解析场景标签单元格（JSON 数组 → 标签列表，否则保留原文）
    pub fn parse(cell: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(cell) {
            Ok(serde_json::Value::Array(values)) => {
                ScenarioTags::Tags(values.into_iter().map(json_value_text).collect())
            }
            _ => ScenarioTags::Raw {
                raw: cell.to_string(),
            },
        }
    }
}

fn json_value_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

// ==========================================
// ImportableItem - 校验通过、可入库的检验项目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportableItem {
    // 主键与名称
    pub item_id: String,
    pub item_name: String,
    pub item_group: Option<String>,

    // 采集信息
    pub specimen_type: String,
    pub container_type: Option<String>,
    pub tube_color: Option<String>,
    pub tube_additive: Option<String>,
    pub recommended_volume: Option<String>,
    pub collection_requirements: Option<String>,
    pub report_time: Option<ReportTime>,
    pub needs_confirmation: bool,

    // 检索辅助
    pub alias: Option<String>,
    pub en_abbr: Option<String>,
    pub pinyin_abbr: Option<String>,
    pub scenario_tags: Option<ScenarioTags>,

    // 保存与转运
    pub storage_temp: Option<String>,
    pub transport_limit: Option<String>,
    pub handling_summary: Option<String>,
    pub rejection_summary: Option<String>,
    pub prep_summary: Option<String>,

    pub enabled: bool,
}

// ==========================================
// CatalogItem - 已入库的目录项目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: i64,
    pub version_id: String,
    #[serde(flatten)]
    pub item: ImportableItem,
    pub frequency_score: i64,
    pub is_high_freq: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_record_missing_field_is_empty() {
        let mut record = CanonicalRecord::new();
        record.insert("itemId", " LAB000001 ");
        assert_eq!(record.get("itemId"), "LAB000001");
        assert_eq!(record.get("itemName"), "");
        assert_eq!(record.text("itemName"), None);
    }

    #[test]
    fn test_report_time_object_becomes_windows() {
        let parsed = ReportTime::parse(r#"{"门诊":"2小时","急诊":1}"#);
        match parsed {
            ReportTime::Windows(map) => {
                assert_eq!(map.get("门诊").map(String::as_str), Some("2小时"));
                assert_eq!(map.get("急诊").map(String::as_str), Some("1"));
            }
            other => panic!("期望 Windows，实际 {:?}", other),
        }
    }

    #[test]
    fn test_report_time_non_object_keeps_raw() {
        assert_eq!(
            ReportTime::parse("当天下午出报告"),
            ReportTime::Raw("当天下午出报告".to_string())
        );
        assert_eq!(ReportTime::parse("[1,2]"), ReportTime::Raw("[1,2]".to_string()));
    }

    #[test]
    fn test_scenario_tags_malformed_json_keeps_raw() {
        assert_eq!(
            ScenarioTags::parse(r#"["体检","急诊"]"#),
            ScenarioTags::Tags(vec!["体检".to_string(), "急诊".to_string()])
        );
        assert_eq!(
            ScenarioTags::parse("[体检"),
            ScenarioTags::Raw {
                raw: "[体检".to_string()
            }
        );
    }

    #[test]
    fn test_report_time_json_roundtrip_keeps_variant() {
        let windows = ReportTime::parse(r#"{"门诊":"2小时"}"#);
        let json = serde_json::to_string(&windows).unwrap();
        let back: ReportTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, windows);

        let raw = ReportTime::parse("次日");
        let json = serde_json::to_string(&raw).unwrap();
        assert_eq!(json, r#"{"kind":"raw","value":"次日"}"#);
        let back: ReportTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_report_time_window_named_raw_stays_windows() {
        let windows = ReportTime::parse(r#"{"raw":"x"}"#);
        let json = serde_json::to_string(&windows).unwrap();
        let back: ReportTime = serde_json::from_str(&json).unwrap();
        match back {
            ReportTime::Windows(map) => assert_eq!(map.get("raw").map(String::as_str), Some("x")),
            other => panic!("期望 Windows，实际 {:?}", other),
        }
    }
}
