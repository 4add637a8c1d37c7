// ==========================================
// 检验标本采集目录 - 目录版本实体
// ==========================================
// 职责: 版本、版本计数、发布变更日志、版本号递增规则
// ==========================================

use crate::domain::types::VersionStatus;
use crate::i18n::t_with_args;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 尚无已发布版本时的首个版本号
pub const INITIAL_VERSION_CODE: &str = "1.0.0";

// ==========================================
// VersionCounts - 版本变更计数
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionCounts {
    pub added: i64,
    pub updated: i64,
    pub disabled: i64,
}

// ==========================================
// Version - 目录版本
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub version_id: String,
    pub version_code: String,
    pub status: VersionStatus,
    pub publisher_name: Option<String>,
    pub published_at: Option<NaiveDateTime>,
    pub counts: VersionCounts,
    /// 发布时写入的变更日志快照（JSON）
    pub changelog: Option<String>,
    pub summary: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Version {
    /// 构造新草稿
    pub fn new_draft(version_id: String, version_code: String, now: NaiveDateTime) -> Self {
        Self {
            version_id,
            version_code,
            status: VersionStatus::Draft,
            publisher_name: None,
            published_at: None,
            counts: VersionCounts::default(),
            changelog: None,
            summary: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn changelog_value(&self) -> Option<Changelog> {
        self.changelog
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}

// ==========================================
// Changelog - 发布变更日志
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changelog {
    pub version_code: String,
    pub publish_time: String,
    pub publisher: String,
    pub changes: VersionCounts,
    pub summary: String,
}

impl Changelog {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// 发布快照：变更日志 + 版本摘要
///
/// # 参数
/// - version_code: 发布的版本号
/// - publisher: 发布人
/// - published_at: 发布时间（UTC）
/// - item_count: 版本实际包含的项目数
pub fn publish_snapshot(
    version_code: &str,
    publisher: &str,
    published_at: &NaiveDateTime,
    item_count: i64,
) -> (Changelog, String) {
    let count = item_count.to_string();
    let changelog = Changelog {
        version_code: version_code.to_string(),
        publish_time: published_at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        publisher: publisher.to_string(),
        changes: VersionCounts {
            added: item_count,
            updated: 0,
            disabled: 0,
        },
        summary: t_with_args("version.changelog_summary", &[("count", count.as_str())]),
    };
    let summary = t_with_args(
        "version.publish_summary",
        &[("code", version_code), ("count", count.as_str())],
    );
    (changelog, summary)
}

/// 计算下一个草稿版本号
///
/// # 规则
/// - 无已发布版本 → "1.0.0"
/// - 否则取最新已发布版本号，补丁号 +1
/// - 无法解析的段按 0 处理，缺失的补丁号视为 0
pub fn next_version_code(latest_published: Option<&str>) -> String {
    let code = match latest_published {
        Some(code) if !code.trim().is_empty() => code.trim(),
        _ => return INITIAL_VERSION_CODE.to_string(),
    };

    let mut parts = code
        .split('.')
        .map(|p| p.trim().parse::<u64>().unwrap_or(0));
    let major = parts.next().unwrap_or(0);
    let minor = parts.next().unwrap_or(0);
    let patch = parts.next().unwrap_or(0);

    format!("{}.{}.{}", major, minor, patch.saturating_add(1))
}
