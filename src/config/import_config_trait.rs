// ==========================================
// 检验标本采集目录 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入、版本、目录查询所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::ConflictStrategy;
use crate::importer::row_validator::ValidationRules;
use async_trait::async_trait;
use std::error::Error;

pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    // ===== 导入配置 =====

    /// 未指定冲突策略时使用的默认策略
    ///
    /// # 默认值
    /// - OVERWRITE_BY_ID
    async fn get_default_conflict_strategy(&self) -> ConfigResult<ConflictStrategy>;

    /// 项目名称最大字符数
    ///
    /// # 默认值
    /// - 200
    async fn get_item_name_max_chars(&self) -> ConfigResult<usize>;

    /// 项目ID建议前缀
    ///
    /// # 默认值
    /// - LAB
    async fn get_item_id_prefix(&self) -> ConfigResult<String>;

    /// 项目ID前缀后的数字位数
    ///
    /// # 默认值
    /// - 6
    async fn get_item_id_digits(&self) -> ConfigResult<usize>;

    /// 组装行校验规则
    async fn get_validation_rules(&self) -> ConfigResult<ValidationRules> {
        Ok(ValidationRules {
            name_max_chars: self.get_item_name_max_chars().await?,
            id_prefix: self.get_item_id_prefix().await?,
            id_digits: self.get_item_id_digits().await?,
        })
    }

    // ===== 版本配置 =====

    /// 发布时未指定发布人使用的名称
    ///
    /// # 默认值
    /// - 系统
    async fn get_default_publisher(&self) -> ConfigResult<String>;

    // ===== 目录查询配置 =====

    /// 关键字检索默认返回条数
    ///
    /// # 默认值
    /// - 50
    async fn get_search_limit(&self) -> ConfigResult<usize>;

    /// 高频项目列表默认条数
    ///
    /// # 默认值
    /// - 10
    async fn get_high_freq_limit(&self) -> ConfigResult<usize>;
}
