// ==========================================
// 管道工厂订单管理系统 - 报表 API
// ==========================================
// 职责: 生产/发货汇总、订单进度视图、订单状态概览
// 说明: 日期范围为闭区间,按 UTC 自然日展开
// ==========================================

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::types::OrderStatus;
use crate::engine::progress::{ProgressCore, SubOrderProgress};
use crate::engine::rollup::OrderRollup;
use crate::repository::ledger_repo::{LedgerRepository, ProductionTotalRow, ShippingTotalRow};
use crate::repository::order_repo::OrderRepository;

/// 订单进度视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderProgressView {
    pub order_id: String,
    pub order_no: String,
    pub customer_name: String,
    pub delivery_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub total_planned: i64,
    pub total_produced: i64,
    pub total_shipped: i64,
    pub produced_percent: f64,
    pub shipped_percent: f64,
    pub sub_orders: Vec<SubOrderProgress>,
}

pub struct ReportApi {
    order_repo: Arc<OrderRepository>,
    ledger_repo: Arc<LedgerRepository>,
}

impl ReportApi {
    pub fn new(order_repo: Arc<OrderRepository>, ledger_repo: Arc<LedgerRepository>) -> Self {
        Self {
            order_repo,
            ledger_repo,
        }
    }

    /// 生产汇总（车间 + 工序）
    pub fn production_summary(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ApiResult<Vec<ProductionTotalRow>> {
        let (start, end) = day_range(from, to)?;
        Ok(self.ledger_repo.production_totals(start.as_ref(), end.as_ref())?)
    }

    /// 发货汇总（发货仓库）
    pub fn shipping_summary(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ApiResult<Vec<ShippingTotalRow>> {
        let (start, end) = day_range(from, to)?;
        Ok(self.ledger_repo.shipping_totals(start.as_ref(), end.as_ref())?)
    }

    /// 单个订单的进度视图
    pub fn order_progress(&self, order_id: &str) -> ApiResult<OrderProgressView> {
        let order = match self.order_repo.find_by_id(order_id)? {
            Some(order) if order.deleted_at.is_none() => order,
            _ => return Err(ApiError::NotFound(format!("Order(id={})不存在", order_id))),
        };
        let sub_orders = self.order_repo.list_sub_orders(order_id)?;

        let total_planned: i64 = sub_orders.iter().map(|s| s.planned_quantity).sum();
        let total_produced: i64 = sub_orders.iter().map(|s| s.produced_quantity).sum();
        let total_shipped: i64 = sub_orders.iter().map(|s| s.shipped_quantity).sum();

        Ok(OrderProgressView {
            order_id: order.id,
            order_no: order.order_no,
            customer_name: order.customer_name,
            delivery_date: order.delivery_date,
            status: OrderRollup::rollup_sub_orders(&sub_orders),
            total_planned,
            total_produced,
            total_shipped,
            produced_percent: ProgressCore::percent(total_produced, total_planned),
            shipped_percent: ProgressCore::percent(total_shipped, total_planned),
            sub_orders: sub_orders.iter().map(ProgressCore::progress).collect(),
        })
    }

    /// 未删除订单按（汇总后）状态计数
    pub fn order_status_overview(&self) -> ApiResult<BTreeMap<String, usize>> {
        let mut grouped = self.order_repo.list_active_sub_orders_grouped()?;
        let orders = self.order_repo.list_active(i64::MAX)?;

        let mut overview: BTreeMap<String, usize> = BTreeMap::new();
        for order in orders {
            let subs = grouped.remove(&order.id).unwrap_or_default();
            let status = OrderRollup::rollup_sub_orders(&subs);
            *overview.entry(status.as_str().to_string()).or_insert(0) += 1;
        }
        debug!(?overview, "订单状态概览");
        Ok(overview)
    }
}

/// 日期闭区间 → 时间戳闭区间
fn day_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> ApiResult<(Option<NaiveDateTime>, Option<NaiveDateTime>)> {
    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            return Err(ApiError::ValidationError(format!(
                "起始日期{}晚于结束日期{}",
                f, t
            )));
        }
    }
    let start = from.and_then(|d| d.and_hms_opt(0, 0, 0));
    let end = to.and_then(|d| d.and_hms_micro_opt(23, 59, 59, 999_999));
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::{ProductionMeta, ShippingMeta};
    use crate::domain::types::{ProcessTag, SubOrderStatus};
    use chrono::Utc;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn setup() -> (ReportApi, Arc<LedgerRepository>) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO orders (id, order_no, customer_name, created_at, updated_at)
            VALUES ('O1', 'ORD-1', 'C', '2026-01-01 00:00:00', '2026-01-01 00:00:00');
            INSERT INTO sub_orders (id, order_id, seq_no, spec, planned_quantity, created_at, updated_at)
            VALUES ('S1', 'O1', 0, 'DN100', 10, '2026-01-01 00:00:00', '2026-01-01 00:00:00');
            INSERT INTO sub_orders (id, order_id, seq_no, spec, planned_quantity, created_at, updated_at)
            VALUES ('S2', 'O1', 1, 'DN200', 30, '2026-01-01 00:00:00', '2026-01-01 00:00:00');
            "#,
        )
        .unwrap();
        let conn = Arc::new(Mutex::new(conn));
        let ledger = Arc::new(LedgerRepository::new(conn.clone()));
        let api = ReportApi::new(Arc::new(OrderRepository::new(conn)), ledger.clone());
        (api, ledger)
    }

    #[test]
    fn test_order_progress_totals() {
        let (api, ledger) = setup();
        ledger
            .append_production("S1", 10, ProcessTag::Packaging, &ProductionMeta::default(), false)
            .unwrap();
        ledger
            .append_production("S2", 10, ProcessTag::Packaging, &ProductionMeta::default(), false)
            .unwrap();

        let view = api.order_progress("O1").unwrap();
        assert_eq!(view.total_planned, 40);
        assert_eq!(view.total_produced, 20);
        assert_eq!(view.produced_percent, 50.0);
        assert_eq!(view.status, OrderStatus::InProduction);
        assert_eq!(view.sub_orders[0].status, SubOrderStatus::ProductionCompleted);
        assert_eq!(view.sub_orders[1].remaining_to_produce, 20);

        assert!(matches!(api.order_progress("missing"), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_summaries_respect_date_range() {
        let (api, ledger) = setup();
        ledger
            .append_production("S1", 4, ProcessTag::Packaging, &ProductionMeta::default(), false)
            .unwrap();
        ledger
            .append_shipping("S1", 2, &ShippingMeta::default(), false)
            .unwrap();

        let today = Utc::now().date_naive();
        let rows = api.production_summary(Some(today), Some(today)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_quantity, 4);

        let yesterday = today.pred_opt().unwrap();
        assert!(api.production_summary(None, Some(yesterday)).unwrap().is_empty());
        assert_eq!(api.shipping_summary(None, None).unwrap()[0].total_quantity, 2);
        assert!(api.shipping_summary(Some(today), Some(yesterday)).is_err());
    }

    #[test]
    fn test_status_overview() {
        let (api, _ledger) = setup();
        let overview = api.order_status_overview().unwrap();
        assert_eq!(overview.get("new"), Some(&1));
    }
}
