// ==========================================
// 管道工厂订单管理系统 - 命令行入口
// ==========================================
// 用法: pipe-factory-oms [订单文件.xlsx|.csv ...]
// 无参数时仅初始化数据库并输出订单状态概览
// ==========================================

use std::path::PathBuf;
use std::process::ExitCode;

use pipe_factory_oms::app::{get_default_db_path, AppState};
use pipe_factory_oms::i18n;
use pipe_factory_oms::importer::OrderImporter;
use pipe_factory_oms::logging;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", pipe_factory_oms::APP_NAME, pipe_factory_oms::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let app_state = match AppState::new(db_path) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("AppState初始化失败: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let files: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    let mut had_failure = false;

    if !files.is_empty() {
        for result in app_state.order_importer.batch_import(files).await {
            match result {
                Ok(summary) => {
                    tracing::info!(
                        "{}",
                        i18n::t_with_args(
                            "import.summary",
                            &[
                                ("rows", &summary.total_rows.to_string()),
                                ("created", &summary.created_count().to_string()),
                                ("failed", &summary.failures.len().to_string()),
                            ],
                        )
                    );
                    for failure in &summary.failures {
                        had_failure = true;
                        tracing::warn!(
                            order_no = failure.order_no.as_deref().unwrap_or("-"),
                            rows = ?failure.rows,
                            "{}",
                            failure.message
                        );
                    }
                }
                Err(e) => {
                    had_failure = true;
                    tracing::error!("{}", e);
                }
            }
        }
    }

    match app_state.report_api.order_status_overview() {
        Ok(overview) => {
            for (status, count) in &overview {
                let label = pipe_factory_oms::OrderStatus::parse(status)
                    .map(i18n::order_status_label)
                    .unwrap_or_else(|| status.clone());
                tracing::info!("{}: {}", label, count);
            }
        }
        Err(e) => {
            tracing::error!("订单状态概览读取失败: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if had_failure {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
