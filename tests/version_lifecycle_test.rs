// ==========================================
// 目录版本生命周期测试
// ==========================================
// 覆盖: 草稿唯一、审核流转、发布快照、归档、生效项目回退、检索范围

use lab_specimen_catalog::api::ApiError;
use lab_specimen_catalog::config::config_keys;
use lab_specimen_catalog::domain::types::VersionStatus;
use lab_specimen_catalog::importer::ImportRequest;
use lab_specimen_catalog::repository::CatalogStore;

use test_helpers::{csv_of, full_row, import_time, setup_env, TestEnv};

async fn import_rows(env: &TestEnv, rows: &[String], second: u32) -> String {
    let outcome = env
        .importer
        .import_text_at(
            ImportRequest {
                content: csv_of(rows),
                file_name: "catalog.csv".to_string(),
                strategy: None,
                operator_name: None,
            },
            import_time(second),
        )
        .await
        .expect("导入失败");
    outcome.version_id
}

#[tokio::test]
async fn test_single_draft_is_reused() {
    let env = setup_env();

    let draft = env.version_api.get_or_create_draft().await.unwrap();
    assert_eq!(draft.status, VersionStatus::Draft);
    assert_eq!(draft.version_code, "1.0.0");

    let again = env.version_api.get_or_create_draft().await.unwrap();
    assert_eq!(draft.version_id, again.version_id);

    let err = env.version_api.create_draft().await.unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
    assert_eq!(env.version_api.list_versions().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_publish_draft_writes_changelog() {
    let env = setup_env();
    let version_id = import_rows(
        &env,
        &[full_row("LAB000001", "甲", "J"), full_row("LAB000002", "乙", "Y")],
        1,
    )
    .await;

    let published = env.version_api.publish(None, Some("李四")).await.unwrap();
    assert!(published.success);
    assert_eq!(published.version_id, version_id);
    assert_eq!(published.version_code, "1.0.0");
    assert_eq!(published.added, 2);

    let version = env.version_api.get_version(&version_id).await.unwrap();
    assert_eq!(version.status, VersionStatus::Published);
    assert_eq!(version.publisher_name.as_deref(), Some("李四"));
    assert!(version.published_at.is_some());
    let changelog = version.changelog_value().expect("应写入变更日志");
    assert_eq!(changelog.publisher, "李四");
    assert_eq!(changelog.changes.added, 2);
    assert_eq!(changelog.version_code, "1.0.0");

    // 发布后没有草稿
    assert!(env.version_api.current_draft().await.unwrap().is_none());
}

#[tokio::test]
async fn test_publish_uses_configured_publisher() {
    let env = setup_env();
    env.config
        .set_global_config_value(config_keys::DEFAULT_PUBLISHER, "检验科")
        .unwrap();
    let version_id = import_rows(&env, &[full_row("LAB000001", "甲", "J")], 1).await;

    env.version_api.publish(Some(&version_id), None).await.unwrap();
    let version = env.version_api.get_version(&version_id).await.unwrap();
    assert_eq!(version.publisher_name.as_deref(), Some("检验科"));
}

#[tokio::test]
async fn test_publish_rejects_non_publishable_versions() {
    let env = setup_env();
    let version_id = import_rows(&env, &[full_row("LAB000001", "甲", "J")], 1).await;
    env.version_api.publish(Some(&version_id), Some("甲")).await.unwrap();
    let before = env.version_api.get_version(&version_id).await.unwrap();

    // 已发布的版本不能再次发布，且不被修改
    let err = env
        .version_api
        .publish(Some(&version_id), Some("乙"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
    let after = env.version_api.get_version(&version_id).await.unwrap();
    assert_eq!(before, after);

    // 归档后同样拒绝
    let archived = env.version_api.archive(&version_id).await.unwrap();
    assert_eq!(archived.status, VersionStatus::Archived);
    let err = env
        .version_api
        .publish(Some(&version_id), Some("乙"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidStateTransition { .. }));

    // 不存在的版本
    let err = env.version_api.publish(Some("missing"), None).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    // 没有草稿时不指定版本
    let err = env.version_api.publish(None, None).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_review_round_trip_then_publish() {
    let env = setup_env();
    let version_id = import_rows(&env, &[full_row("LAB000001", "甲", "J")], 1).await;

    let pending = env.version_api.submit_for_review(&version_id).await.unwrap();
    assert_eq!(pending.status, VersionStatus::PendingReview);

    // 待审核期间导入会新建草稿
    let next_draft = import_rows(&env, &[full_row("LAB000002", "乙", "Y")], 2).await;
    assert_ne!(next_draft, version_id);

    // 已有草稿时不能退回
    let err = env.version_api.return_to_draft(&version_id).await.unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));

    let published = env
        .version_api
        .publish(Some(&version_id), Some("审核人"))
        .await
        .unwrap();
    assert_eq!(published.added, 1);

    // 已发布版本不能提交审核
    let err = env.version_api.submit_for_review(&version_id).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
}

#[tokio::test]
async fn test_next_draft_code_follows_published_head() {
    let env = setup_env();
    import_rows(&env, &[full_row("LAB000001", "甲", "J")], 1).await;
    env.version_api.publish(None, None).await.unwrap();

    let draft = env.version_api.get_or_create_draft().await.unwrap();
    assert_eq!(draft.version_code, "1.0.1");
}

#[tokio::test]
async fn test_active_items_fall_back_to_all_enabled() {
    let env = setup_env();

    // 无发布版本：返回所有启用项目（包括草稿中的）
    let disabled = full_row("LAB000003", "停用项目", "TY");
    let content = format!(
        "{},是否启用\n{},是\n{},否\n",
        test_helpers::HEADER,
        full_row("LAB000001", "甲", "J"),
        disabled
    );
    env.importer
        .import_text_at(
            ImportRequest {
                content,
                file_name: "enabled.csv".to_string(),
                strategy: None,
                operator_name: None,
            },
            import_time(1),
        )
        .await
        .unwrap();

    let active = env.catalog_api.active_items().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].item.item_id, "LAB000001");

    // 发布后：仅返回版本头中的启用项目，新草稿不影响
    env.version_api.publish(None, None).await.unwrap();
    import_rows(&env, &[full_row("LAB000009", "草稿项目", "CG")], 2).await;
    let active = env.catalog_api.active_items().await.unwrap();
    let ids: Vec<&str> = active.iter().map(|i| i.item.item_id.as_str()).collect();
    assert_eq!(ids, vec!["LAB000001"]);
}

#[tokio::test]
async fn test_search_scoped_to_published_head() {
    let env = setup_env();
    import_rows(
        &env,
        &[full_row("LAB000001", "葡萄糖", "PTT"), full_row("LAB000002", "糖化血红蛋白", "THXHDB")],
        1,
    )
    .await;
    let published = env.version_api.publish(None, None).await.unwrap();
    import_rows(&env, &[full_row("LAB000003", "糖耐量", "TNL")], 2).await;

    let hits = env.catalog_api.search("糖", None).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|i| i.version_id == published.version_id));

    let hits = env.catalog_api.search("THX", None).await.unwrap();
    assert_eq!(hits.len(), 1);

    assert!(env.catalog_api.search("  ", None).await.unwrap().is_empty());
    // LIKE 通配符按字面匹配
    assert!(env.catalog_api.search("%", None).await.unwrap().is_empty());

    let item = env.catalog_api.item_by_item_id("LAB000002").await.unwrap();
    assert_eq!(item.item.item_name, "糖化血红蛋白");
    let err = env.catalog_api.item_by_item_id("LAB999999").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_high_freq_items_follow_frequency_flag() {
    let env = setup_env();
    let version_id = import_rows(
        &env,
        &[full_row("LAB000001", "甲", "J"), full_row("LAB000002", "乙", "Y")],
        1,
    )
    .await;

    let items = env.store.items_by_version(&version_id).await.unwrap();
    let target = items.iter().find(|i| i.item.item_id == "LAB000002").unwrap();
    env.catalog_api
        .set_item_frequency(target.id, 120, true)
        .await
        .unwrap();

    let high = env.catalog_api.high_freq(None).await.unwrap();
    assert_eq!(high.len(), 1);
    assert_eq!(high[0].item.item_id, "LAB000002");
    assert_eq!(high[0].frequency_score, 120);

    let err = env.catalog_api.set_item_frequency(target.id, -1, false).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    let by_color = env.catalog_api.by_tube_color("黄").await.unwrap();
    assert_eq!(by_color.len(), 2);
    let by_specimen = env.catalog_api.by_specimen_type("全血").await.unwrap();
    assert!(by_specimen.is_empty());
}
