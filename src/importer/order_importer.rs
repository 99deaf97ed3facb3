// ==========================================
// 管道工厂订单管理系统 - 订单导入器实现
// ==========================================
// 流程: 解析 → 行数上限检查 → 字段映射 → 按订单号分组 → 逐单创建
// 规则: 任一行映射失败,该订单号整单跳过; 订单之间互不影响
// ==========================================

use crate::api::OrderApi;
use crate::config::ImportConfigReader;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::order::NewOrder;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{order_no_of, ImportedOrderRow};
use crate::importer::order_importer_trait::{
    FieldMapper, FileParser, ImportFailure, OrderImportSummary, OrderImporter,
};
use crate::repository::ActionLogRepository;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// 同一订单号的行分组（保持文件中首次出现顺序）
struct OrderGroup {
    order_no: String,
    rows: Vec<ImportedOrderRow>,
}

// ==========================================
// OrderImporterImpl - 订单导入器实现
// ==========================================
pub struct OrderImporterImpl<C>
where
    C: ImportConfigReader,
{
    order_api: Arc<OrderApi>,
    action_log_repo: Arc<ActionLogRepository>,
    config: C,

    // 导入组件
    file_parser: Box<dyn FileParser>,
    field_mapper: Box<dyn FieldMapper>,
}

impl<C> OrderImporterImpl<C>
where
    C: ImportConfigReader,
{
    pub fn new(
        order_api: Arc<OrderApi>,
        action_log_repo: Arc<ActionLogRepository>,
        config: C,
        file_parser: Box<dyn FileParser>,
        field_mapper: Box<dyn FieldMapper>,
    ) -> Self {
        Self {
            order_api,
            action_log_repo,
            config,
            file_parser,
            field_mapper,
        }
    }

    /// 映射全部行; 失败行记入 failures,并返回映射失败的订单号
    fn map_rows(
        &self,
        records: &[HashMap<String, String>],
        failures: &mut Vec<ImportFailure>,
    ) -> (Vec<ImportedOrderRow>, HashSet<String>) {
        let mut mapped = Vec::with_capacity(records.len());
        let mut poisoned = HashSet::new();

        for (idx, record) in records.iter().enumerate() {
            let row_number = idx + 1;
            match self.field_mapper.map_to_order_row(record, row_number) {
                Ok(row) => mapped.push(row),
                Err(e) => {
                    let order_no = order_no_of(record);
                    if let Some(no) = &order_no {
                        poisoned.insert(no.clone());
                    }
                    failures.push(ImportFailure {
                        rows: vec![row_number],
                        order_no,
                        message: e.to_string(),
                    });
                }
            }
        }

        (mapped, poisoned)
    }

    /// 组装订单头 + 子订单
    fn build_new_order(
        group: &OrderGroup,
        default_workshop: Option<&str>,
        actor: &str,
    ) -> Option<NewOrder> {
        let head = group.rows.first()?;
        if group
            .rows
            .iter()
            .any(|r| r.customer_name != head.customer_name || r.delivery_date != head.delivery_date)
        {
            warn!(order_no = %group.order_no, "同一订单号的订单头字段不一致,以首行为准");
        }

        Some(NewOrder {
            order_no: group.order_no.clone(),
            customer_name: head.customer_name.clone(),
            delivery_date: head.delivery_date,
            workshop: head
                .workshop
                .clone()
                .or_else(|| default_workshop.map(str::to_string)),
            warehouse: head.warehouse.clone(),
            remarks: head.remarks.clone(),
            created_by: Some(actor.to_string()),
            sub_orders: group.rows.iter().map(|r| r.sub_order.clone()).collect(),
        })
    }
}

/// 按订单号分组,保持首次出现顺序
fn group_by_order_no(rows: Vec<ImportedOrderRow>) -> Vec<OrderGroup> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<OrderGroup> = Vec::new();

    for row in rows {
        match index.get(&row.order_no) {
            Some(&i) => groups[i].rows.push(row),
            None => {
                index.insert(row.order_no.clone(), groups.len());
                groups.push(OrderGroup {
                    order_no: row.order_no.clone(),
                    rows: vec![row],
                });
            }
        }
    }
    groups
}

fn config_read_err(key: &str, e: Box<dyn std::error::Error>) -> ImportError {
    ImportError::ConfigReadError {
        key: key.to_string(),
        message: e.to_string(),
    }
}

#[async_trait]
impl<C> OrderImporter for OrderImporterImpl<C>
where
    C: ImportConfigReader,
{
    #[instrument(skip(self))]
    async fn import_file(&self, file_path: &Path) -> ImportResult<OrderImportSummary> {
        let max_rows = self
            .config
            .get_max_rows()
            .await
            .map_err(|e| config_read_err(crate::config::config_keys::IMPORT_MAX_ROWS, e))?;
        let default_workshop = self
            .config
            .get_default_workshop()
            .await
            .map_err(|e| config_read_err(crate::config::config_keys::IMPORT_DEFAULT_WORKSHOP, e))?;
        let actor = self
            .config
            .get_import_actor()
            .await
            .map_err(|e| config_read_err(crate::config::config_keys::IMPORT_ACTOR, e))?;

        // === 阶段 1: 解析 ===
        let records = self.file_parser.parse_to_raw_records(file_path)?;
        if records.len() > max_rows {
            return Err(ImportError::TooManyRows {
                rows: records.len(),
                max: max_rows,
            });
        }

        let mut summary = OrderImportSummary {
            file: file_path.display().to_string(),
            total_rows: records.len(),
            ..Default::default()
        };

        // === 阶段 2: 映射 ===
        let (mapped, poisoned) = self.map_rows(&records, &mut summary.failures);

        // === 阶段 3: 分组 + 逐单创建 ===
        for group in group_by_order_no(mapped) {
            let rows: Vec<usize> = group.rows.iter().map(|r| r.row_number).collect();

            if poisoned.contains(&group.order_no) {
                summary.failures.push(ImportFailure {
                    rows,
                    order_no: Some(group.order_no.clone()),
                    message: "同一订单号存在映射失败的行,整单跳过".to_string(),
                });
                continue;
            }

            let Some(new_order) = Self::build_new_order(&group, default_workshop.as_deref(), &actor)
            else {
                continue;
            };

            match self.order_api.create_order(new_order, &actor) {
                Ok(order_id) => summary.created_order_ids.push(order_id),
                Err(e) => {
                    warn!(order_no = %group.order_no, error = %e, "订单导入失败");
                    summary.failures.push(ImportFailure {
                        rows,
                        order_no: Some(group.order_no.clone()),
                        message: e.to_string(),
                    });
                }
            }
        }

        // === 阶段 4: 审计 ===
        let log = ActionLog::now(
            ActionType::ImportOrders,
            &actor,
            None,
            Some(serde_json::json!({
                "file": summary.file,
                "total_rows": summary.total_rows,
                "created": summary.created_count(),
                "failed": summary.failures.len(),
            })),
            None,
        );
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(error = %e, "导入审计日志写入失败");
        }

        info!(
            total_rows = summary.total_rows,
            created = summary.created_count(),
            failed = summary.failures.len(),
            "订单文件导入完成"
        );
        Ok(summary)
    }

    async fn batch_import(&self, file_paths: Vec<PathBuf>) -> Vec<Result<OrderImportSummary, String>> {
        use futures::future::join_all;

        info!(count = file_paths.len(), "开始批量导入文件");

        let import_tasks = file_paths.iter().map(|path| async move {
            let path_str = path.display().to_string();
            match self.import_file(path).await {
                Ok(summary) => Ok(summary),
                Err(e) => {
                    error!(file = %path_str, error = %e, "文件导入失败");
                    Err(format!("文件 {} 导入失败: {}", path_str, e))
                }
            }
        });

        let results = join_all(import_tasks).await;

        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "批量导入完成"
        );
        results
    }
}
