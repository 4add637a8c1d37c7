// ==========================================
// 检验标本采集目录 - 领域类型定义
// ==========================================
// 职责: 版本状态、冲突策略、标本/管色/添加剂枚举
// 说明: 枚举为封闭集合，但保留 Unrecognized 分支承接未知取值
// ==========================================

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ==========================================
// 版本状态 (Version Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    Draft,         // 草稿
    PendingReview, // 待审核
    Published,     // 已发布
    Archived,      // 已归档
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl VersionStatus {
    /// 从字符串解析状态（未知值返回 None）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "draft" => Some(VersionStatus::Draft),
            "pending_review" => Some(VersionStatus::PendingReview),
            "published" => Some(VersionStatus::Published),
            "archived" => Some(VersionStatus::Archived),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            VersionStatus::Draft => "draft",
            VersionStatus::PendingReview => "pending_review",
            VersionStatus::Published => "published",
            VersionStatus::Archived => "archived",
        }
    }

    /// 是否允许转换到目标状态
    ///
    /// 允许的迁移:
    /// - draft → pending_review / published
    /// - pending_review → published / draft（退回）
    /// - published → archived
    pub fn can_transition_to(&self, next: VersionStatus) -> bool {
        matches!(
            (self, next),
            (VersionStatus::Draft, VersionStatus::PendingReview)
                | (VersionStatus::Draft, VersionStatus::Published)
                | (VersionStatus::PendingReview, VersionStatus::Published)
                | (VersionStatus::PendingReview, VersionStatus::Draft)
                | (VersionStatus::Published, VersionStatus::Archived)
        )
    }

    /// 是否可发布
    pub fn is_publishable(&self) -> bool {
        self.can_transition_to(VersionStatus::Published)
    }
}

// ==========================================
// 冲突策略 (Conflict Strategy)
// ==========================================
// 同一文件内 item_id 重复时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConflictStrategy {
    #[default]
    #[serde(rename = "OVERWRITE_BY_ID")]
    OverwriteById, // 后出现的覆盖先出现的
    #[serde(rename = "SKIP_BY_ID")]
    SkipById, // 后出现的跳过
    #[serde(rename = "ERROR_BY_ID")]
    ErrorById, // 后出现的报错
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ConflictStrategy {
    /// 解析策略标识（大小写敏感，未知值返回 None）
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "OVERWRITE_BY_ID" => Some(ConflictStrategy::OverwriteById),
            "SKIP_BY_ID" => Some(ConflictStrategy::SkipById),
            "ERROR_BY_ID" => Some(ConflictStrategy::ErrorById),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictStrategy::OverwriteById => "OVERWRITE_BY_ID",
            ConflictStrategy::SkipById => "SKIP_BY_ID",
            ConflictStrategy::ErrorById => "ERROR_BY_ID",
        }
    }
}

// ==========================================
// 封闭枚举宏
// ==========================================
// 生成 Known 变体 + Unrecognized(String)，序列化为原始标签
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            Unrecognized(String),
        }

        impl $name {
            /// 全部标准取值（不含 Unrecognized）
            pub const LABELS: &'static [&'static str] = &[$($label),+];

            /// 按标签解析（未知标签落入 Unrecognized）
            pub fn from_label(label: &str) -> Self {
                match label.trim() {
                    $($label => $name::$variant,)+
                    other => $name::Unrecognized(other.to_string()),
                }
            }

            pub fn label(&self) -> &str {
                match self {
                    $($name::$variant => $label,)+
                    $name::Unrecognized(raw) => raw.as_str(),
                }
            }

            pub fn is_recognized(&self) -> bool {
                !matches!(self, $name::Unrecognized(_))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Ok($name::from_label(&raw))
            }
        }
    };
}

labelled_enum! {
    /// 样本类型
    SpecimenType {
        WholeBlood => "全血",
        Serum => "血清",
        Plasma => "血浆",
        Urine => "尿液",
        Stool => "粪便",
        CerebrospinalFluid => "脑脊液",
        PleuralFluid => "胸水",
        Ascites => "腹水",
        Swab => "拭子",
        Sputum => "痰液",
        Secretion => "分泌物",
        BoneMarrow => "骨髓",
        SerousFluid => "胸腹水",
        Other => "其他",
    }
}

impl SpecimenType {
    /// 血液类样本（需填写管色）
    pub fn is_blood(&self) -> bool {
        matches!(
            self,
            SpecimenType::WholeBlood | SpecimenType::Serum | SpecimenType::Plasma
        )
    }

    /// 需要填写容器类型的非血液样本
    pub fn needs_container(&self) -> bool {
        matches!(
            self,
            SpecimenType::Urine
                | SpecimenType::Stool
                | SpecimenType::Swab
                | SpecimenType::Sputum
                | SpecimenType::Secretion
        )
    }
}

labelled_enum! {
    /// 推荐管色
    TubeColor {
        Purple => "紫",
        Blue => "蓝",
        Green => "绿",
        Grey => "灰",
        Red => "红",
        Yellow => "黄",
        Orange => "橙",
        Tangerine => "橘",
        Other => "其他",
    }
}

labelled_enum! {
    /// 添加剂
    TubeAdditive {
        EdtaK2 => "EDTA-K2",
        SodiumCitrate => "枸橼酸钠",
        LithiumHeparin => "肝素锂",
        SodiumHeparin => "肝素钠",
        SeparatorGel => "分离胶",
        ClotActivator => "促凝剂",
        SodiumFluoride => "氟化钠",
        NoAdditive => "无",
        Other => "其他",
    }
}

impl TubeColor {
    /// 管色对应的常规添加剂标签
    ///
    /// # 返回
    /// - Some(&[...]): 该管色存在约定的添加剂集合
    /// - None: 无约定（不做一致性检查）
    pub fn expected_additives(&self) -> Option<&'static [&'static str]> {
        match self {
            TubeColor::Purple => Some(&["EDTA-K2"]),
            TubeColor::Blue => Some(&["枸橼酸钠"]),
            TubeColor::Green => Some(&["肝素锂", "肝素钠"]),
            TubeColor::Grey => Some(&["氟化钠"]),
            TubeColor::Red => Some(&["促凝剂", "无", "分离胶"]),
            TubeColor::Yellow => Some(&["分离胶", "促凝剂"]),
            _ => None,
        }
    }

    /// 添加剂是否与管色相符（无约定的管色视为相符）
    pub fn accepts_additive(&self, additive: &TubeAdditive) -> bool {
        match self.expected_additives() {
            Some(expected) => expected.contains(&additive.label()),
            None => true,
        }
    }
}

/// 标本容器标准取值
pub const CONTAINER_TYPES: &[&str] = &[
    "真空采血管",
    "尿沉渣管",
    "无菌尿杯",
    "便盒",
    "15ml离心管",
    "玻璃管",
    "病毒核酸采样管",
    "一次性咽拭子",
    "需氧/厌氧微生物培养瓶",
    "EP管",
    "血气专用采血针",
    "无菌管",
    "无菌拭子",
    "游离核酸保存管",
    "其他",
];

/// 保存温度标准取值
pub const STORAGE_TEMPS: &[&str] = &["室温", "2-8℃", "-20℃", "-80℃", "18-28℃", "其他"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_status_roundtrip_db_str() {
        for status in [
            VersionStatus::Draft,
            VersionStatus::PendingReview,
            VersionStatus::Published,
            VersionStatus::Archived,
        ] {
            assert_eq!(VersionStatus::from_str(status.to_db_str()), Some(status));
        }
        assert_eq!(VersionStatus::from_str("ACTIVE"), None);
    }

    #[test]
    fn test_version_status_transitions() {
        assert!(VersionStatus::Draft.is_publishable());
        assert!(VersionStatus::PendingReview.is_publishable());
        assert!(!VersionStatus::Published.is_publishable());
        assert!(!VersionStatus::Archived.is_publishable());
        assert!(VersionStatus::Published.can_transition_to(VersionStatus::Archived));
        assert!(!VersionStatus::Archived.can_transition_to(VersionStatus::Draft));
    }

    #[test]
    fn test_conflict_strategy_parse_is_case_sensitive() {
        assert_eq!(
            ConflictStrategy::parse("SKIP_BY_ID"),
            Some(ConflictStrategy::SkipById)
        );
        assert_eq!(ConflictStrategy::parse("skip_by_id"), None);
        assert_eq!(ConflictStrategy::default(), ConflictStrategy::OverwriteById);
    }

    #[test]
    fn test_specimen_type_classification() {
        assert!(SpecimenType::from_label("血清").is_blood());
        assert!(SpecimenType::from_label("尿液").needs_container());
        assert!(!SpecimenType::from_label("脑脊液").needs_container());

        let unknown = SpecimenType::from_label("关节液");
        assert!(!unknown.is_recognized());
        assert_eq!(unknown.label(), "关节液");
    }

    #[test]
    fn test_tube_color_expected_additives() {
        let green = TubeColor::from_label("绿");
        assert!(green.accepts_additive(&TubeAdditive::from_label("肝素钠")));
        assert!(!green.accepts_additive(&TubeAdditive::from_label("EDTA-K2")));

        assert!(TubeColor::from_label("橙").expected_additives().is_none());
        assert!(TubeColor::from_label("粉").expected_additives().is_none());
    }

    #[test]
    fn test_labelled_enum_serde_uses_label() {
        let json = serde_json::to_string(&TubeAdditive::EdtaK2).unwrap();
        assert_eq!(json, "\"EDTA-K2\"");

        let parsed: SpecimenType = serde_json::from_str("\"骨髓\"").unwrap();
        assert_eq!(parsed, SpecimenType::BoneMarrow);
    }
}
