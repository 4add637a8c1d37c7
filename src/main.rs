// ==========================================
// 检验标本采集目录 - 命令行入口
// ==========================================
// 用法:
//   lab-catalog [--db <path>] <command> [args...]
//
// 命令:
//   import <csv_path> [strategy] [operator]   导入CSV到当前草稿
//   submit <version_id>                       草稿提交审核
//   publish [version_id] [publisher]          发布版本（缺省发布当前草稿）
//   archive <version_id>                      归档已发布版本
//   versions                                  列出全部版本
//   imports [limit]                           最近导入记录
//   failed-csv <import_id>                    导出失败明细CSV
//   active                                    当前生效项目
//   search <keyword> [limit]                  检索生效项目
//   enums                                     标准枚举目录
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use lab_specimen_catalog::app::{get_default_db_path, AppState};
use lab_specimen_catalog::{i18n, logging};
use serde::Serialize;
use std::path::Path;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_limit(raw: Option<&String>) -> Result<Option<usize>> {
    raw.map(|v| {
        v.trim()
            .parse::<usize>()
            .with_context(|| format!("无效的条数参数: {}", v))
    })
    .transpose()
}

fn print_usage() {
    eprintln!("用法: lab-catalog [--db <path>] <command> [args...]");
    eprintln!("命令: import | submit | publish | archive | versions | imports | failed-csv | active | search | enums");
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    if let Ok(locale) = std::env::var("LAB_CATALOG_LOCALE") {
        i18n::set_locale(&locale);
    }

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let db_path = match args.iter().position(|a| a == "--db") {
        Some(idx) => {
            if idx + 1 >= args.len() {
                bail!("--db 需要指定数据库路径");
            }
            let path = args.remove(idx + 1);
            args.remove(idx);
            path
        }
        None => get_default_db_path(),
    };

    let Some(command) = args.first().cloned() else {
        print_usage();
        return Ok(());
    };
    let rest = &args[1..];

    tracing::info!(
        app = lab_specimen_catalog::APP_NAME,
        version = lab_specimen_catalog::VERSION,
        db_path = %db_path,
        command = %command,
        "启动"
    );

    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    match command.as_str() {
        "import" => {
            let path = rest.first().context("缺少CSV文件路径")?;
            let strategy = rest.get(1).map(String::as_str);
            let operator = rest.get(2).cloned();
            let response = state
                .import_api
                .import_file(Path::new(path), strategy, operator, false)
                .await?;
            tracing::info!(
                import_id = %response.summary.import_id,
                success_rows = response.summary.success_rows,
                failed_rows = response.summary.failed_rows,
                "导入完成"
            );
            print_json(&response)?;
        }
        "submit" => {
            let version_id = rest.first().context("缺少版本ID")?;
            print_json(&state.version_api.submit_for_review(version_id).await?)?;
        }
        "publish" => {
            let version_id = rest.first().map(String::as_str);
            let publisher = rest.get(1).map(String::as_str);
            print_json(&state.version_api.publish(version_id, publisher).await?)?;
        }
        "archive" => {
            let version_id = rest.first().context("缺少版本ID")?;
            print_json(&state.version_api.archive(version_id).await?)?;
        }
        "versions" => {
            print_json(&state.version_api.list_versions().await?)?;
        }
        "imports" => {
            let limit = parse_limit(rest.first())?;
            print_json(&state.import_api.list_imports(limit).await?)?;
        }
        "failed-csv" => {
            let import_id = rest.first().context("缺少导入批次号")?;
            print!("{}", state.import_api.failed_detail_csv(import_id).await?);
        }
        "active" => {
            print_json(&state.catalog_api.active_items().await?)?;
        }
        "search" => {
            let keyword = rest.first().context("缺少检索关键字")?;
            let limit = parse_limit(rest.get(1))?;
            print_json(&state.catalog_api.search(keyword, limit).await?)?;
        }
        "enums" => {
            print_json(&state.catalog_api.enum_catalog())?;
        }
        other => {
            print_usage();
            bail!("未知命令: {}", other);
        }
    }

    Ok(())
}
