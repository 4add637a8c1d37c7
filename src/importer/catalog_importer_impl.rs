// ==========================================
// 检验标本采集目录 - 目录导入器实现
// ==========================================
// 职责: 整合导入流程，从文本到草稿版本
// 流程: 解析 → 映射 → 行校验 → 冲突处理 → 报告 → 暂存
// 红线: 整批在内存中完成校验与冲突判定后才触达存储；暂存为单事务
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::import::{ImportRecord, ImportReport};
use crate::domain::types::ConflictStrategy;
use crate::engine::version_lifecycle::VersionLifecycleManager;
use crate::importer::catalog_importer_trait::{
    CatalogImporter, ConflictHandler, FieldMapper, FileParser, ImportOutcome, ImportRequest,
    RowValidator,
};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::import_report::ImportReportBuilder;
use crate::importer::row_validator::ValidationRules;
use crate::perf::PerfGuard;
use crate::repository::CatalogStore;
use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ==========================================
// CatalogImporterImpl - 目录导入器实现
// ==========================================
pub struct CatalogImporterImpl<S, C>
where
    S: CatalogStore,
    C: ImportConfigReader,
{
    // 版本生命周期（草稿获取 + 暂存）
    lifecycle: VersionLifecycleManager<S>,

    // 配置读取器
    config: C,

    // 导入组件
    file_parser: Box<dyn FileParser>,
    field_mapper: Box<dyn FieldMapper>,
    row_validator: Box<dyn RowValidator>,
    conflict_handler: Box<dyn ConflictHandler>,
}

impl<S, C> CatalogImporterImpl<S, C>
where
    S: CatalogStore,
    C: ImportConfigReader,
{
    /// 创建新的 CatalogImporter 实例
    ///
    /// # 参数
    /// - store: 目录存储
    /// - config: 配置读取器
    /// - file_parser: 文本解析器
    /// - field_mapper: 字段映射器
    /// - row_validator: 行校验器
    /// - conflict_handler: 冲突处理器
    pub fn new(
        store: Arc<S>,
        config: C,
        file_parser: Box<dyn FileParser>,
        field_mapper: Box<dyn FieldMapper>,
        row_validator: Box<dyn RowValidator>,
        conflict_handler: Box<dyn ConflictHandler>,
    ) -> Self {
        Self {
            lifecycle: VersionLifecycleManager::new(store),
            config,
            file_parser,
            field_mapper,
            row_validator,
            conflict_handler,
        }
    }

    /// 使用默认组件创建
    pub fn with_default_components(store: Arc<S>, config: C) -> Self {
        use crate::importer::{ConflictHandlerImpl, CsvParser, FieldMapperImpl, RowValidatorImpl};
        Self::new(
            store,
            config,
            Box::new(CsvParser),
            Box::new(FieldMapperImpl),
            Box::new(RowValidatorImpl),
            Box::new(ConflictHandlerImpl),
        )
    }

    pub fn lifecycle(&self) -> &VersionLifecycleManager<S> {
        &self.lifecycle
    }

    /// 纯内存处理：解析 → 映射 → 校验 → 冲突处理 → 报告
    ///
    /// # 说明
    /// - 不读取配置、不触达存储
    /// - 空内容生成全零报告
    pub fn process_text(
        &self,
        content: &str,
        file_name: &str,
        strategy: ConflictStrategy,
        rules: &ValidationRules,
        now: DateTime<Local>,
    ) -> ImportResult<ImportReport> {
        // === 步骤 1: 解析文本 ===
        let table = self.file_parser.parse_text(content)?;
        debug!(rows = table.rows.len(), headers = table.headers.len(), "文本解析完成");

        // === 步骤 2: 表头映射 ===
        let mapped_headers: Vec<String> = table
            .headers
            .iter()
            .map(|h| self.field_mapper.map_header(h))
            .collect();

        // === 步骤 3: 行校验 ===
        let validated: Vec<_> = table
            .rows
            .iter()
            .map(|row| {
                let record = self.field_mapper.map_row(&mapped_headers, row);
                self.row_validator.validate_row(row.line_number, &record, rules)
            })
            .collect();
        debug!(
            valid = validated.iter().filter(|r| r.is_valid).count(),
            invalid = validated.iter().filter(|r| !r.is_valid).count(),
            "行校验完成"
        );

        // === 步骤 4: 冲突处理 ===
        let outcome = self.conflict_handler.resolve(validated, strategy);
        debug!(superseded = outcome.superseded_rows, "冲突处理完成");

        // === 步骤 5: 生成报告 ===
        Ok(ImportReportBuilder::build(file_name, strategy, outcome, now))
    }

    async fn resolve_strategy(&self, requested: Option<ConflictStrategy>) -> ImportResult<ConflictStrategy> {
        match requested {
            Some(strategy) => Ok(strategy),
            None => self
                .config
                .get_default_conflict_strategy()
                .await
                .map_err(|e| ImportError::ConfigReadError {
                    key: crate::config::config_keys::DEFAULT_CONFLICT_STRATEGY.to_string(),
                    message: e.to_string(),
                }),
        }
    }

    async fn load_rules(&self) -> ImportResult<ValidationRules> {
        self.config
            .get_validation_rules()
            .await
            .map_err(|e| ImportError::ConfigReadError {
                key: "import.*".to_string(),
                message: e.to_string(),
            })
    }

    /// 以指定时刻执行导入（批次号由该时刻生成）
    ///
    /// # 参数
    /// - request: 导入请求
    /// - now: 导入时刻（本地时区）
    ///
    /// # 返回
    /// - Ok(ImportOutcome): 报告 + 目标草稿
    /// - Err(ImportError::Storage): 暂存失败（含批次号重复），整批回滚
    #[instrument(skip(self, request, now), fields(file_name = %request.file_name))]
    pub async fn import_text_at(
        &self,
        request: ImportRequest,
        now: DateTime<Local>,
    ) -> ImportResult<ImportOutcome> {
        let _perf = PerfGuard::new("import_catalog");

        let strategy = self.resolve_strategy(request.strategy).await?;
        let rules = self.load_rules().await?;
        info!(strategy = %strategy, bytes = request.content.len(), "开始导入检验项目");

        let report = self.process_text(&request.content, &request.file_name, strategy, &rules, now)?;

        let draft = self.lifecycle.get_or_create_draft().await?;
        debug!(version_id = %draft.version_id, version_code = %draft.version_code, "导入目标草稿");

        let record = ImportRecord::from_report(
            &report,
            &draft.version_id,
            request.operator_name.clone(),
            Utc::now().naive_utc(),
        );
        let staged = self
            .lifecycle
            .stage_import(&draft.version_id, &report.success_data, &record)
            .await
            .map_err(|e| {
                warn!(import_id = %report.summary.import_id, error = %e, "导入暂存失败，整批回滚");
                ImportError::from(e)
            })?;

        info!(
            import_id = %report.summary.import_id,
            version_code = %draft.version_code,
            total = report.summary.total_rows,
            success = report.summary.success_rows,
            failed = report.summary.failed_rows,
            warning = report.summary.warning_rows,
            superseded = report.summary.superseded_rows,
            staged,
            "检验项目导入完成"
        );

        Ok(ImportOutcome {
            report,
            version_id: draft.version_id,
            version_code: draft.version_code,
        })
    }
}

#[async_trait]
impl<S, C> CatalogImporter for CatalogImporterImpl<S, C>
where
    S: CatalogStore,
    C: ImportConfigReader,
{
    async fn import_text(&self, request: ImportRequest) -> ImportResult<ImportOutcome> {
        self.import_text_at(request, Local::now()).await
    }

    async fn import_file(
        &self,
        file_path: &Path,
        strategy: Option<ConflictStrategy>,
        operator_name: Option<String>,
    ) -> ImportResult<ImportOutcome> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }
        let content = tokio::fs::read_to_string(file_path).await?;
        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.csv")
            .to_string();

        self.import_text(ImportRequest {
            content,
            file_name,
            strategy,
            operator_name,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use crate::domain::import::IssueCode;
    use crate::repository::SqliteCatalogStore;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn importer() -> CatalogImporterImpl<SqliteCatalogStore, ConfigManager> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        CatalogImporterImpl::with_default_components(
            Arc::new(SqliteCatalogStore::from_connection(conn.clone())),
            ConfigManager::from_connection(conn).unwrap(),
        )
    }

    #[test]
    fn test_process_text_counts() {
        let importer = importer();
        let content = "项目ID,项目名称,样本类型\nLAB000001,血细胞分析,全血\n,缺少ID,血清\nLAB000003,,血浆\n";
        let report = importer
            .process_text(
                content,
                "demo.csv",
                ConflictStrategy::OverwriteById,
                &ValidationRules::default(),
                Local::now(),
            )
            .unwrap();

        assert_eq!(report.summary.total_rows, 3);
        assert_eq!(report.summary.success_rows, 1);
        assert_eq!(report.summary.failed_rows, 2);
        assert_eq!(report.success_data.len(), report.summary.success_rows);
        assert_eq!(ImportReportBuilder::code_count(&report.summary.error_summary, IssueCode::IdEmpty), 1);
        assert_eq!(ImportReportBuilder::code_count(&report.summary.error_summary, IssueCode::NameEmpty), 1);
    }

    #[test]
    fn test_process_empty_text() {
        let importer = importer();
        let report = importer
            .process_text(
                "",
                "empty.csv",
                ConflictStrategy::OverwriteById,
                &ValidationRules::default(),
                Local::now(),
            )
            .unwrap();
        assert_eq!(report.summary.total_rows, 0);
        assert!(report.failed_details.is_empty());
    }

    #[tokio::test]
    async fn test_import_text_uses_configured_strategy() {
        let importer = importer();
        let content = "项目ID,项目名称,样本类型\nLAB000001,甲,全血\nLAB000001,乙,全血\n";
        let outcome = importer
            .import_text(ImportRequest {
                content: content.to_string(),
                file_name: "dup.csv".to_string(),
                strategy: None,
                operator_name: None,
            })
            .await
            .unwrap();

        assert_eq!(outcome.report.summary.conflict_strategy, ConflictStrategy::OverwriteById);
        assert_eq!(outcome.report.success_data.len(), 1);
        assert_eq!(outcome.report.success_data[0].item_name, "乙");
        assert_eq!(outcome.version_code, "1.0.0");
    }

    #[tokio::test]
    async fn test_import_file_missing() {
        let importer = importer();
        let err = importer
            .import_file(Path::new("/nonexistent/catalog.csv"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));
    }
}
