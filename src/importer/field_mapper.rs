// ==========================================
// 检验标本采集目录 - 字段映射器实现
// ==========================================
// 阶段 1: 源列名（中文 / 英文下划线别名）→ 规范字段名
// 规则: 精确匹配（去首尾空白），不做大小写折叠和模糊匹配
// ==========================================

use crate::importer::catalog_importer_trait::FieldMapper as FieldMapperTrait;

/// 规范字段名
pub mod fields {
    pub const ITEM_ID: &str = "itemId";
    pub const ITEM_NAME: &str = "itemName";
    pub const ITEM_GROUP: &str = "itemGroup";
    pub const SPECIMEN_TYPE: &str = "specimenType";
    pub const CONTAINER_TYPE: &str = "containerType";
    pub const TUBE_COLOR: &str = "tubeColor";
    pub const TUBE_ADDITIVE: &str = "tubeAdditive";
    pub const RECOMMENDED_VOLUME: &str = "recommendedVolume";
    pub const COLLECTION_REQUIREMENTS: &str = "collectionRequirements";
    pub const REPORT_TIME: &str = "reportTime";
    pub const NEEDS_CONFIRMATION: &str = "needsConfirmation";
    pub const ALIAS: &str = "alias";
    pub const EN_ABBR: &str = "enAbbr";
    pub const PINYIN_ABBR: &str = "pinyinAbbr";
    pub const SCENARIO_TAGS: &str = "scenarioTags";
    pub const STORAGE_TEMP: &str = "storageTemp";
    pub const TRANSPORT_LIMIT: &str = "transportLimit";
    pub const HANDLING_SUMMARY: &str = "handlingSummary";
    pub const REJECTION_SUMMARY: &str = "rejectionSummary";
    pub const PREP_SUMMARY: &str = "prepSummary";
    pub const ENABLED: &str = "enabled";
}

/// 标准字段映射表: (中文列名, 英文别名, 规范字段名)
pub const COLUMN_MAPPING: &[(&str, &str, &str)] = &[
    ("项目ID", "item_id", fields::ITEM_ID),
    ("项目名称", "item_name", fields::ITEM_NAME),
    ("检验项目组套", "item_group", fields::ITEM_GROUP),
    ("样本类型", "specimen_type", fields::SPECIMEN_TYPE),
    ("标本容器", "container_type", fields::CONTAINER_TYPE),
    ("推荐管色", "tube_color", fields::TUBE_COLOR),
    ("添加剂", "tube_additive", fields::TUBE_ADDITIVE),
    ("采样量", "recommended_volume", fields::RECOMMENDED_VOLUME),
    ("采集要求原文", "collection_requirements", fields::COLLECTION_REQUIREMENTS),
    ("报告时间(结构化json)", "report_time", fields::REPORT_TIME),
    ("需人工确认", "needs_confirmation", fields::NEEDS_CONFIRMATION),
    ("别名", "alias", fields::ALIAS),
    ("英文缩写", "en_abbr", fields::EN_ABBR),
    ("拼音首字母", "pinyin_abbr", fields::PINYIN_ABBR),
    ("场景标签", "scenario_tags", fields::SCENARIO_TAGS),
    ("保存温度", "storage_temp", fields::STORAGE_TEMP),
    ("转运时限", "transport_limit", fields::TRANSPORT_LIMIT),
    ("特殊处理摘要", "handling_summary", fields::HANDLING_SUMMARY),
    ("拒收标准", "rejection_summary", fields::REJECTION_SUMMARY),
    ("患者准备摘要", "prep_summary", fields::PREP_SUMMARY),
    ("是否启用", "enabled", fields::ENABLED),
];

pub struct FieldMapper;

impl FieldMapperTrait for FieldMapper {
    fn map_header(&self, label: &str) -> String {
        let label = label.trim();
        COLUMN_MAPPING
            .iter()
            .find(|(zh, en, _)| *zh == label || *en == label)
            .map(|(_, _, canonical)| canonical.to_string())
            .unwrap_or_else(|| label.to_string())
    }
}
