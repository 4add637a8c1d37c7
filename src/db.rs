// ==========================================
// 检验标本采集目录 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 幂等建表，记录 schema_version
// - 统一时间字段的文本格式
// ==========================================

use chrono::NaiveDateTime;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 时间字段存储格式（微秒精度，保证同一秒内的先后顺序）
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let mut conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    crate::perf::install_sqlite_tracing(&mut conn);
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 建表（幂等）
///
/// 表:
/// - catalog_version: 目录版本（部分唯一索引保证至多一个 draft）
/// - lab_item: 检验项目（归属某个版本，版本删除时级联）
/// - import_record: 导入审计记录（import_id 唯一）
/// - config_kv: 全局配置
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL DEFAULT 'global',
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS catalog_version (
            version_id TEXT PRIMARY KEY,
            version_code TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('draft', 'pending_review', 'published', 'archived')),
            publisher_name TEXT,
            published_at TEXT,
            added_count INTEGER NOT NULL DEFAULT 0,
            updated_count INTEGER NOT NULL DEFAULT 0,
            disabled_count INTEGER NOT NULL DEFAULT 0,
            changelog_json TEXT,
            summary TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_catalog_version_single_draft
            ON catalog_version(status) WHERE status = 'draft';
        CREATE INDEX IF NOT EXISTS idx_catalog_version_published_at
            ON catalog_version(status, published_at);

        CREATE TABLE IF NOT EXISTS lab_item (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version_id TEXT NOT NULL REFERENCES catalog_version(version_id) ON DELETE CASCADE,
            item_id TEXT NOT NULL,
            item_name TEXT NOT NULL,
            item_group TEXT,
            specimen_type TEXT NOT NULL,
            container_type TEXT,
            tube_color TEXT,
            tube_additive TEXT,
            recommended_volume TEXT,
            collection_requirements TEXT,
            report_time_json TEXT,
            needs_confirmation INTEGER NOT NULL DEFAULT 0,
            alias TEXT,
            en_abbr TEXT,
            pinyin_abbr TEXT,
            scenario_tags_json TEXT,
            storage_temp TEXT,
            transport_limit TEXT,
            handling_summary TEXT,
            rejection_summary TEXT,
            prep_summary TEXT,
            enabled INTEGER NOT NULL DEFAULT 1,
            frequency_score INTEGER NOT NULL DEFAULT 0,
            is_high_freq INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_lab_item_version ON lab_item(version_id);
        CREATE INDEX IF NOT EXISTS idx_lab_item_item_id ON lab_item(item_id);

        CREATE TABLE IF NOT EXISTS import_record (
            import_id TEXT PRIMARY KEY,
            file_name TEXT NOT NULL,
            version_target TEXT NOT NULL,
            version_id TEXT REFERENCES catalog_version(version_id) ON DELETE SET NULL,
            total_rows INTEGER NOT NULL,
            success_rows INTEGER NOT NULL,
            failed_rows INTEGER NOT NULL,
            warning_rows INTEGER NOT NULL,
            superseded_rows INTEGER NOT NULL DEFAULT 0,
            conflict_strategy TEXT NOT NULL,
            error_summary_json TEXT NOT NULL,
            warning_summary_json TEXT NOT NULL,
            failed_details_json TEXT NOT NULL,
            operator_name TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 打开连接并确保 schema 就绪
pub fn open_and_init(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = open_sqlite_connection(db_path)?;
    init_schema(&conn)?;

    if let Some(version) = read_schema_version(&conn)? {
        if version != CURRENT_SCHEMA_VERSION {
            tracing::warn!(
                expected = CURRENT_SCHEMA_VERSION,
                actual = version,
                "schema_version 与当前代码不一致"
            );
        }
    }
    Ok(conn)
}

/// 时间 → 存储文本
pub fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// 存储文本 → 时间（兼容无小数秒的旧数据）
pub fn parse_datetime(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
}
