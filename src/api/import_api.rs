// ==========================================
// 检验项目导入API
// ==========================================
// 职责: 封装批量导入、导入记录查询、失败明细导出
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::import::{ImportRecord, ImportSummary, ValidatedRow};
use crate::domain::item::ImportableItem;
use crate::domain::types::ConflictStrategy;
use crate::importer::{
    generate_failed_detail_csv, CatalogImporter, CatalogImporterImpl, ImportError, ImportOutcome,
    ImportRequest,
};
use crate::repository::{CatalogStore, SqliteCatalogStore};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// 导入记录列表默认条数
const DEFAULT_IMPORT_LIST_LIMIT: usize = 100;

/// 导入API响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportApiResponse {
    /// 报告汇总（importId、行数统计、问题码统计）
    #[serde(flatten)]
    pub summary: ImportSummary,
    /// 失败行明细
    pub failed_details: Vec<ValidatedRow>,
    /// 成功数据（仅在调用方要求时返回）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_data: Option<Vec<ImportableItem>>,
    /// 目标草稿
    pub version_id: String,
    pub version_code: String,
}

impl ImportApiResponse {
    fn from_outcome(outcome: ImportOutcome, include_success_data: bool) -> Self {
        let ImportOutcome {
            report,
            version_id,
            version_code,
        } = outcome;
        Self {
            summary: report.summary,
            failed_details: report.failed_details,
            success_data: include_success_data.then_some(report.success_data),
            version_id,
            version_code,
        }
    }
}

/// 解析冲突策略参数（缺省/空白 → None，交由配置决定）
pub fn parse_strategy_token(token: Option<&str>) -> Result<Option<ConflictStrategy>, ImportError> {
    match token.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => ConflictStrategy::parse(raw)
            .map(Some)
            .ok_or_else(|| ImportError::UnknownConflictStrategy(raw.to_string())),
    }
}

/// 导入API
pub struct ImportApi {
    store: Arc<SqliteCatalogStore>,
    importer: CatalogImporterImpl<SqliteCatalogStore, ConfigManager>,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    pub fn new(store: Arc<SqliteCatalogStore>, config: ConfigManager) -> Self {
        Self {
            importer: CatalogImporterImpl::with_default_components(store.clone(), config),
            store,
        }
    }

    /// 提交一批导入
    ///
    /// # 参数
    /// - content: 原始文本（UTF-8，可带 BOM）
    /// - file_name: 展示用文件名
    /// - strategy: 冲突策略标记（OVERWRITE_BY_ID / SKIP_BY_ID / ERROR_BY_ID），缺省取配置
    /// - operator_name: 操作人
    /// - include_success_data: 是否在响应中返回成功数据
    ///
    /// # 返回
    /// - Ok(ImportApiResponse): 报告 + 草稿 versionId/versionCode
    /// - Err(ApiError::InvalidInput): 策略标记非法或文件名为空
    /// - Err(ApiError::ImportIdCollision): 批次号重复，整批回滚
    /// - Err(ApiError::StorageUnavailable): 存储不可用
    pub async fn submit_import(
        &self,
        content: &str,
        file_name: &str,
        strategy: Option<&str>,
        operator_name: Option<String>,
        include_success_data: bool,
    ) -> ApiResult<ImportApiResponse> {
        let file_name = file_name.trim();
        if file_name.is_empty() {
            return Err(ApiError::InvalidInput("文件名不能为空".to_string()));
        }
        let strategy = parse_strategy_token(strategy)?;

        let outcome = self
            .importer
            .import_text(ImportRequest {
                content: content.to_string(),
                file_name: file_name.to_string(),
                strategy,
                operator_name,
            })
            .await?;

        Ok(ImportApiResponse::from_outcome(outcome, include_success_data))
    }

    /// 从本地 CSV 文件导入
    pub async fn import_file(
        &self,
        file_path: &Path,
        strategy: Option<&str>,
        operator_name: Option<String>,
        include_success_data: bool,
    ) -> ApiResult<ImportApiResponse> {
        let strategy = parse_strategy_token(strategy)?;
        let outcome = self
            .importer
            .import_file(file_path, strategy, operator_name)
            .await?;
        Ok(ImportApiResponse::from_outcome(outcome, include_success_data))
    }

    /// 最近的导入记录
    pub async fn list_imports(&self, limit: Option<usize>) -> ApiResult<Vec<ImportRecord>> {
        let limit = limit.unwrap_or(DEFAULT_IMPORT_LIST_LIMIT);
        Ok(self.store.list_import_records(limit).await?)
    }

    /// 查询单条导入记录
    pub async fn get_import(&self, import_id: &str) -> ApiResult<ImportRecord> {
        self.store
            .find_import_record(import_id.trim())
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("导入记录(import_id={})不存在", import_id)))
    }

    /// 导出某次导入的失败明细 CSV
    pub async fn failed_detail_csv(&self, import_id: &str) -> ApiResult<String> {
        let record = self.get_import(import_id).await?;
        Ok(generate_failed_detail_csv(&record.failed_details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strategy_token() {
        assert_eq!(parse_strategy_token(None).unwrap(), None);
        assert_eq!(parse_strategy_token(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_strategy_token(Some("SKIP_BY_ID")).unwrap(),
            Some(ConflictStrategy::SkipById)
        );
        assert!(matches!(
            parse_strategy_token(Some("skip_by_id")),
            Err(ImportError::UnknownConflictStrategy(_))
        ));
    }
}
