// ==========================================
// 检验标本采集目录 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::Arc;

use crate::api::{CatalogApi, ImportApi, VersionApi};
use crate::config::ConfigManager;
use crate::repository::SqliteCatalogStore;

/// 应用状态
///
/// 包含所有API实例和共享资源，所有组件共用同一个数据库连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 目录存储
    pub store: Arc<SqliteCatalogStore>,

    /// 配置管理器
    pub config: ConfigManager,

    /// 批量导入API
    pub import_api: Arc<ImportApi>,

    /// 版本API
    pub version_api: Arc<VersionApi>,

    /// 目录查询API
    pub catalog_api: Arc<CatalogApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 打开数据库并执行建表（幂等），随后基于共享连接创建配置与各API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let store = Arc::new(
            SqliteCatalogStore::open(&db_path)
                .map_err(|e| format!("无法打开目录数据库: {}", e))?,
        );

        let config = ConfigManager::from_connection(store.connection())
            .map_err(|e| format!("无法创建ConfigManager: {}", e))?;

        // ==========================================
        // 初始化API层
        // ==========================================
        let import_api = Arc::new(ImportApi::new(store.clone(), config.clone()));
        let version_api = Arc::new(VersionApi::new(store.clone(), config.clone()));
        let catalog_api = Arc::new(CatalogApi::new(store.clone(), config.clone()));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            store,
            config,
            import_api,
            version_api,
            catalog_api,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 LAB_CATALOG_DB_PATH → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("LAB_CATALOG_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./lab_catalog.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("lab-specimen-catalog");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("lab_catalog.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_app_state_shares_single_store() {
        let temp = NamedTempFile::new().unwrap();
        let db_path = temp.path().to_str().unwrap().to_string();

        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.db_path, db_path);

        let draft = state.version_api.get_or_create_draft().await.unwrap();
        let again = state.version_api.get_or_create_draft().await.unwrap();
        assert_eq!(draft.version_id, again.version_id);
        assert!(state.catalog_api.active_items().await.unwrap().is_empty());
    }
}
