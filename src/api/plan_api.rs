// ==========================================
// 管道工厂订单管理系统 - 派工计划 API
// ==========================================
// 职责: 派工、待执行查询、完成标记
// 红线: 派工计划不是台账事件,完成计划不改变任何数量
// ==========================================

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{normalize_opt, InputValidator};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::plan::{NewProductionPlan, ProductionPlan};
use crate::domain::types::PlanStatus;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::order_repo::OrderRepository;
use crate::repository::plan_repo::ProductionPlanRepository;

pub struct PlanApi {
    plan_repo: Arc<ProductionPlanRepository>,
    order_repo: Arc<OrderRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl PlanApi {
    pub fn new(
        plan_repo: Arc<ProductionPlanRepository>,
        order_repo: Arc<OrderRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            plan_repo,
            order_repo,
            action_log_repo,
        }
    }

    /// 派工
    ///
    /// # 校验
    /// - 订单存在且未删除
    /// - 指定子订单时必须属于该订单
    pub fn dispatch_plan(&self, input: NewProductionPlan, actor: &str) -> ApiResult<ProductionPlan> {
        InputValidator::validate_plan(&input)?;

        let order_id = input.order_id.trim().to_string();
        match self.order_repo.find_by_id(&order_id)? {
            Some(order) if order.deleted_at.is_none() => {}
            _ => {
                return Err(ApiError::ValidationError(format!("订单不存在: {}", order_id)));
            }
        }

        let sub_order_id = normalize_opt(&input.sub_order_id);
        if let Some(sub_id) = &sub_order_id {
            let belongs = self
                .order_repo
                .find_sub_order(sub_id)?
                .map(|s| s.order_id == order_id)
                .unwrap_or(false);
            if !belongs {
                return Err(ApiError::ValidationError(format!(
                    "子订单{}不属于订单{}",
                    sub_id, order_id
                )));
            }
        }

        let plan = ProductionPlan {
            id: uuid::Uuid::new_v4().to_string(),
            order_id,
            sub_order_id,
            workshop: input.workshop.trim().to_string(),
            team: normalize_opt(&input.team),
            shift: normalize_opt(&input.shift),
            process: input.process.unwrap_or_default(),
            quantity: input.quantity,
            status: PlanStatus::Pending,
            assigned_by: normalize_opt(&input.assigned_by).or_else(|| Some(actor.to_string())),
            remarks: normalize_opt(&input.remarks),
            created_at: Utc::now().naive_utc(),
            completed_at: None,
        };
        self.plan_repo.insert(&plan)?;

        self.record_action(ActionLog::now(
            ActionType::DispatchPlan,
            actor,
            Some(&plan.id),
            Some(json!({
                "order_id": plan.order_id,
                "workshop": plan.workshop,
                "quantity": plan.quantity,
            })),
            None,
        ));
        info!(plan_id = %plan.id, workshop = %plan.workshop, "派工计划已创建");
        Ok(plan)
    }

    /// 待执行计划（可按车间过滤）
    pub fn list_pending_plans(&self, workshop: Option<&str>) -> ApiResult<Vec<ProductionPlan>> {
        let workshop = workshop.map(str::trim).filter(|w| !w.is_empty());
        Ok(self.plan_repo.list_pending(workshop)?)
    }

    /// 订单下全部计划
    pub fn list_plans_for_order(&self, order_id: &str) -> ApiResult<Vec<ProductionPlan>> {
        Ok(self.plan_repo.list_by_order(order_id)?)
    }

    /// 标记计划完成
    ///
    /// # 返回
    /// - Err(NotFound): 计划不存在
    /// - Err(ValidationError): 计划已完成
    pub fn complete_plan(&self, plan_id: &str, actor: &str) -> ApiResult<ProductionPlan> {
        let rows = self
            .plan_repo
            .mark_completed(plan_id, &Utc::now().naive_utc())?;

        if rows == 0 {
            return match self.plan_repo.find_by_id(plan_id)? {
                Some(_) => Err(ApiError::ValidationError(format!("派工计划已完成: {}", plan_id))),
                None => Err(ApiError::NotFound(format!("ProductionPlan(id={})不存在", plan_id))),
            };
        }

        self.record_action(ActionLog::now(
            ActionType::CompletePlan,
            actor,
            Some(plan_id),
            None,
            None,
        ));

        self.plan_repo
            .find_by_id(plan_id)?
            .ok_or_else(|| ApiError::NotFound(format!("ProductionPlan(id={})不存在", plan_id)))
    }

    fn record_action(&self, log: ActionLog) {
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(error = %e, action_type = %log.action_type, "记录操作日志失败");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn setup() -> (PlanApi, Arc<Mutex<Connection>>) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO orders (id, order_no, customer_name, created_at, updated_at)
            VALUES ('O1', 'ORD-1', 'C', '2026-01-01 00:00:00', '2026-01-01 00:00:00');
            INSERT INTO orders (id, order_no, customer_name, created_at, updated_at)
            VALUES ('O2', 'ORD-2', 'C', '2026-01-01 00:00:00', '2026-01-01 00:00:00');
            INSERT INTO sub_orders (id, order_id, seq_no, spec, planned_quantity, created_at, updated_at)
            VALUES ('S1', 'O1', 0, 'DN100', 10, '2026-01-01 00:00:00', '2026-01-01 00:00:00');
            "#,
        )
        .unwrap();
        let conn = Arc::new(Mutex::new(conn));
        let api = PlanApi::new(
            Arc::new(ProductionPlanRepository::new(conn.clone())),
            Arc::new(OrderRepository::new(conn.clone())),
            Arc::new(ActionLogRepository::new(conn.clone())),
        );
        (api, conn)
    }

    fn new_plan(order_id: &str, sub_order_id: Option<&str>) -> NewProductionPlan {
        NewProductionPlan {
            order_id: order_id.to_string(),
            sub_order_id: sub_order_id.map(str::to_string),
            workshop: "一车间".to_string(),
            team: None,
            shift: None,
            process: None,
            quantity: 10,
            assigned_by: None,
            remarks: None,
        }
    }

    #[test]
    fn test_dispatch_and_complete_does_not_touch_counters() {
        let (api, conn) = setup();
        let plan = api.dispatch_plan(new_plan("O1", Some("S1")), "boss").unwrap();
        assert_eq!(plan.status, PlanStatus::Pending);
        assert_eq!(api.list_pending_plans(Some("一车间")).unwrap().len(), 1);
        assert!(api.list_pending_plans(Some("二车间")).unwrap().is_empty());

        let done = api.complete_plan(&plan.id, "boss").unwrap();
        assert_eq!(done.status, PlanStatus::Completed);
        assert!(api.list_pending_plans(None).unwrap().is_empty());
        assert!(matches!(
            api.complete_plan(&plan.id, "boss"),
            Err(ApiError::ValidationError(_))
        ));
        assert!(matches!(
            api.complete_plan("missing", "boss"),
            Err(ApiError::NotFound(_))
        ));

        let produced: i64 = conn
            .lock()
            .unwrap()
            .query_row("SELECT produced_quantity FROM sub_orders WHERE id = 'S1'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(produced, 0);
    }

    #[test]
    fn test_dispatch_validates_order_and_sub_order() {
        let (api, _conn) = setup();
        assert!(matches!(
            api.dispatch_plan(new_plan("missing", None), "x"),
            Err(ApiError::ValidationError(_))
        ));
        assert!(matches!(
            api.dispatch_plan(new_plan("O2", Some("S1")), "x"),
            Err(ApiError::ValidationError(_))
        ));
        let mut zero = new_plan("O1", None);
        zero.quantity = 0;
        assert!(api.dispatch_plan(zero, "x").is_err());
        assert_eq!(api.list_plans_for_order("O1").unwrap().len(), 0);
    }
}
