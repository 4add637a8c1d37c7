// ==========================================
// 检验标本采集目录 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::{ConfigResult, ImportConfigReader};
use crate::db::open_sqlite_connection;
use crate::domain::types::ConflictStrategy;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
#[derive(Clone)]
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) \
             VALUES ('global', ?1, ?2, datetime('now')) \
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取并解析配置，缺失或非法时回退默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr + Copy + PartialOrd + From<u8>,
    {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };
        match raw.trim().parse::<T>() {
            Ok(v) if v > T::from(0) => Ok(v),
            _ => {
                tracing::warn!(config_key = key, raw_value = %raw, "配置值非法，使用默认值");
                Ok(default)
            }
        }
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key",
        )?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    // ===== 导入配置 =====

    async fn get_default_conflict_strategy(&self) -> ConfigResult<ConflictStrategy> {
        let value = self.get_config_or_default(
            config_keys::DEFAULT_CONFLICT_STRATEGY,
            ConflictStrategy::default().as_str(),
        )?;
        match ConflictStrategy::parse(value.trim()) {
            Some(strategy) => Ok(strategy),
            None => {
                tracing::warn!(
                    config_key = config_keys::DEFAULT_CONFLICT_STRATEGY,
                    raw_value = %value,
                    "冲突策略配置非法，使用 OVERWRITE_BY_ID"
                );
                Ok(ConflictStrategy::default())
            }
        }
    }

    async fn get_item_name_max_chars(&self) -> ConfigResult<usize> {
        self.get_parsed_or_default(config_keys::ITEM_NAME_MAX_CHARS, 200usize)
    }

    async fn get_item_id_prefix(&self) -> ConfigResult<String> {
        let value = self.get_config_or_default(config_keys::ITEM_ID_PREFIX, "LAB")?;
        Ok(value.trim().to_string())
    }

    async fn get_item_id_digits(&self) -> ConfigResult<usize> {
        self.get_parsed_or_default(config_keys::ITEM_ID_DIGITS, 6usize)
    }

    // ===== 版本配置 =====

    async fn get_default_publisher(&self) -> ConfigResult<String> {
        let value = self.get_config_or_default(config_keys::DEFAULT_PUBLISHER, "系统")?;
        let value = value.trim();
        if value.is_empty() {
            Ok("系统".to_string())
        } else {
            Ok(value.to_string())
        }
    }

    // ===== 目录查询配置 =====

    async fn get_search_limit(&self) -> ConfigResult<usize> {
        self.get_parsed_or_default(config_keys::SEARCH_LIMIT, 50usize)
    }

    async fn get_high_freq_limit(&self) -> ConfigResult<usize> {
        self.get_parsed_or_default(config_keys::HIGH_FREQ_LIMIT, 10usize)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 导入
    pub const DEFAULT_CONFLICT_STRATEGY: &str = "import.default_conflict_strategy";
    pub const ITEM_NAME_MAX_CHARS: &str = "import.item_name_max_chars";
    pub const ITEM_ID_PREFIX: &str = "import.item_id_prefix";
    pub const ITEM_ID_DIGITS: &str = "import.item_id_digits";

    // 版本
    pub const DEFAULT_PUBLISHER: &str = "version.default_publisher";

    // 目录查询
    pub const SEARCH_LIMIT: &str = "catalog.search_limit";
    pub const HIGH_FREQ_LIMIT: &str = "catalog.high_freq_limit";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_missing() {
        let config = manager();
        assert_eq!(
            config.get_default_conflict_strategy().await.unwrap(),
            ConflictStrategy::OverwriteById
        );
        let rules = config.get_validation_rules().await.unwrap();
        assert_eq!(rules.name_max_chars, 200);
        assert_eq!(rules.id_prefix, "LAB");
        assert_eq!(rules.id_digits, 6);
        assert_eq!(config.get_default_publisher().await.unwrap(), "系统");
        assert_eq!(config.get_search_limit().await.unwrap(), 50);
        assert_eq!(config.get_high_freq_limit().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_override_and_invalid_fallback() {
        let config = manager();
        config
            .set_global_config_value(config_keys::DEFAULT_CONFLICT_STRATEGY, "SKIP_BY_ID")
            .unwrap();
        config.set_global_config_value(config_keys::ITEM_ID_DIGITS, "8").unwrap();
        config.set_global_config_value(config_keys::SEARCH_LIMIT, "abc").unwrap();

        assert_eq!(
            config.get_default_conflict_strategy().await.unwrap(),
            ConflictStrategy::SkipById
        );
        assert_eq!(config.get_item_id_digits().await.unwrap(), 8);
        assert_eq!(config.get_search_limit().await.unwrap(), 50);

        config
            .set_global_config_value(config_keys::DEFAULT_CONFLICT_STRATEGY, "skip_by_id")
            .unwrap();
        assert_eq!(
            config.get_default_conflict_strategy().await.unwrap(),
            ConflictStrategy::OverwriteById
        );
    }

    #[test]
    fn test_config_snapshot_contains_values() {
        let config = manager();
        config.set_global_config_value(config_keys::ITEM_ID_PREFIX, "LIS").unwrap();
        let snapshot = config.get_config_snapshot().unwrap();
        assert!(snapshot.contains("LIS"));
    }
}
