// ==========================================
// 检验标本采集目录 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换 Repository / Import 错误为用户友好的错误消息
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 请求与业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    /// 导入批次号与已有记录重复（整批暂存已回滚）
    #[error("导入批次号冲突: {0}")]
    ImportIdCollision(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    /// 存储不可用（连接失败、锁获取失败、数据库忙），不做重试
    #[error("存储不可用: {0}")]
    StorageUnavailable(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::StorageUnavailable(msg),
            RepositoryError::LockError(msg) => {
                ApiError::StorageUnavailable(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                if msg.contains("import_record") {
                    ApiError::ImportIdCollision(msg)
                } else {
                    ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
                }
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::BusinessRuleViolation(msg) => ApiError::BusinessRuleViolation(msg),
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InternalError(format!("字段{}数据异常: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Storage(repo_err) => ApiError::from(repo_err),
            ImportError::UnknownConflictStrategy(token) => {
                ApiError::InvalidInput(ImportError::UnknownConflictStrategy(token).to_string())
            }
            ImportError::ConfigReadError { key, message } => {
                ApiError::InternalError(format!("配置读取失败 (key: {}): {}", key, message))
            }
            ImportError::InternalError(msg) => ApiError::InternalError(msg),
            ImportError::Other(err) => ApiError::Other(err),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_record_unique_maps_to_collision() {
        let err = RepositoryError::UniqueConstraintViolation(
            "UNIQUE constraint failed: import_record.import_id".to_string(),
        );
        assert!(matches!(ApiError::from(err), ApiError::ImportIdCollision(_)));
    }

    #[test]
    fn test_lock_error_maps_to_storage_unavailable() {
        let err = RepositoryError::LockError("poisoned".to_string());
        assert!(matches!(ApiError::from(err), ApiError::StorageUnavailable(_)));
    }

    #[test]
    fn test_unknown_strategy_is_invalid_input() {
        let err = ImportError::UnknownConflictStrategy("MERGE".to_string());
        match ApiError::from(err) {
            ApiError::InvalidInput(msg) => assert!(msg.contains("MERGE")),
            other => panic!("期望 InvalidInput，实际 {:?}", other),
        }
    }

    #[test]
    fn test_nested_storage_error_keeps_kind() {
        let err = ImportError::Storage(RepositoryError::InvalidStateTransition {
            from: "published".to_string(),
            to: "draft".to_string(),
        });
        assert!(matches!(
            ApiError::from(err),
            ApiError::InvalidStateTransition { .. }
        ));
    }
}
