// ==========================================
// 管道工厂订单管理系统 - 数量台账 API
// ==========================================
// 职责: 生产/发货记录追加、台账重放、台账查询
// 红线: 台账只追加; 超产/超发默认只提示不拦截
// 配置: ledger.enforce_quantity_cap = true 时超计划追加返回 CapacityExceeded
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::api::error::{config_err, ApiError, ApiResult};
use crate::api::validator::{normalize_opt, InputValidator};
use crate::config::ConfigManager;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::ledger::{ProductionMeta, ProductionRecord, ShippingMeta, ShippingRecord};
use crate::domain::order::SubOrder;
use crate::domain::types::{OrderStatus, ProcessTag};
use crate::engine::events::{OptionalEventPublisher, OrderEvent, OrderEventType};
use crate::engine::progress::{ProgressCore, SubOrderCounters};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::ledger_repo::{LedgerRepository, LedgerWriteOutcome};
use crate::repository::order_repo::OrderRepository;
use crate::repository::RepositoryError;

/// 台账追加结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerAppendResult {
    pub record_id: String,
    /// 追加后的子订单（计数器与状态已更新）
    pub sub_order: SubOrder,
    pub order_status: OrderStatus,
    /// 非阻断提示: 超产、超库存发货、超计划发货
    pub warnings: Vec<String>,
}

/// 台账重放结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecomputeResult {
    pub sub_order: SubOrder,
    pub order_status: OrderStatus,
    pub warnings: Vec<String>,
}

// ==========================================
// LedgerApi - 数量台账 API
// ==========================================
pub struct LedgerApi {
    ledger_repo: Arc<LedgerRepository>,
    order_repo: Arc<OrderRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    config_manager: Arc<ConfigManager>,
    event_publisher: OptionalEventPublisher,
}

impl LedgerApi {
    pub fn new(
        ledger_repo: Arc<LedgerRepository>,
        order_repo: Arc<OrderRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        config_manager: Arc<ConfigManager>,
        event_publisher: OptionalEventPublisher,
    ) -> Self {
        Self {
            ledger_repo,
            order_repo,
            action_log_repo,
            config_manager,
            event_publisher,
        }
    }

    /// 解析外部传入的工序标识
    ///
    /// None/空串 → None（由配置决定默认工序）; 无法识别 → ValidationError
    pub fn parse_process(raw: Option<&str>) -> ApiResult<Option<ProcessTag>> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(s) => ProcessTag::parse(s)
                .map(Some)
                .ok_or_else(|| ApiError::ValidationError(format!("无法识别的工序: {}", s))),
        }
    }

    // ==========================================
    // 写入接口
    // ==========================================

    /// 追加生产记录
    ///
    /// # 参数
    /// - sub_order_id: 子订单ID
    /// - quantity: 正整数
    /// - process: None 时使用 ledger.default_process（默认 packaging）
    /// - meta: 班组/班次/车间/仓库/操作员/备注
    /// - actor: 操作人
    ///
    /// # 返回
    /// - Ok(LedgerAppendResult)
    /// - Err(ValidationError): 数量非法或子订单不存在（无任何写入）
    /// - Err(CapacityExceeded): 仅在开启上限时
    /// - Err(PersistenceError): 存储失败（事务已回滚）
    pub fn append_production(
        &self,
        sub_order_id: &str,
        quantity: i64,
        process: Option<ProcessTag>,
        meta: ProductionMeta,
        actor: &str,
    ) -> ApiResult<LedgerAppendResult> {
        let sub_order_id = Self::require_sub_order_id(sub_order_id)?;
        InputValidator::validate_quantity(quantity)?;

        let process = match process {
            Some(p) => p,
            None => self.config_manager.get_default_process().map_err(config_err)?,
        };
        let enforce_cap = self.config_manager.get_enforce_quantity_cap().map_err(config_err)?;

        let meta = ProductionMeta {
            team: normalize_opt(&meta.team),
            shift: normalize_opt(&meta.shift),
            workshop: normalize_opt(&meta.workshop),
            warehouse: normalize_opt(&meta.warehouse),
            operator_id: normalize_opt(&meta.operator_id).or_else(|| Some(actor.to_string())),
            remarks: normalize_opt(&meta.remarks),
        };

        let outcome = self
            .ledger_repo
            .append_production(sub_order_id, quantity, process, &meta, enforce_cap)
            .map_err(map_append_error)?;

        self.finish_append(
            outcome,
            ActionType::AppendProduction,
            OrderEventType::ProductionAppended,
            json!({ "quantity": quantity, "process": process.as_str() }),
            actor,
        )
    }

    /// 追加发货记录
    ///
    /// 发货超出可用库存（已产 - 已发）时仍然接受,返回警告
    pub fn append_shipping(
        &self,
        sub_order_id: &str,
        quantity: i64,
        meta: ShippingMeta,
        actor: &str,
    ) -> ApiResult<LedgerAppendResult> {
        let sub_order_id = Self::require_sub_order_id(sub_order_id)?;
        InputValidator::validate_quantity(quantity)?;
        let enforce_cap = self.config_manager.get_enforce_quantity_cap().map_err(config_err)?;

        let meta = ShippingMeta {
            transport_type: normalize_opt(&meta.transport_type),
            shipping_type: normalize_opt(&meta.shipping_type),
            shipping_warehouse: normalize_opt(&meta.shipping_warehouse),
            vehicle_info: normalize_opt(&meta.vehicle_info),
            shipping_no: normalize_opt(&meta.shipping_no),
            destination: normalize_opt(&meta.destination),
            operator_id: normalize_opt(&meta.operator_id).or_else(|| Some(actor.to_string())),
            remarks: normalize_opt(&meta.remarks),
        };

        let outcome = self
            .ledger_repo
            .append_shipping(sub_order_id, quantity, &meta, enforce_cap)
            .map_err(map_append_error)?;

        self.finish_append(
            outcome,
            ActionType::AppendShipping,
            OrderEventType::ShippingAppended,
            json!({ "quantity": quantity, "shipping_no": meta.shipping_no }),
            actor,
        )
    }

    /// 从完整台账重建子订单计数器与状态（幂等）
    pub fn recompute_sub_order(&self, sub_order_id: &str, actor: &str) -> ApiResult<RecomputeResult> {
        let sub_order_id = Self::require_sub_order_id(sub_order_id)?;
        let outcome = self.ledger_repo.recompute_from_ledger(sub_order_id)?;

        let sub_order = outcome.sub_order;
        let warnings =
            ProgressCore::collect_warnings(sub_order.planned_quantity, &SubOrderCounters::of(&sub_order));

        self.record_action(ActionLog::now(
            ActionType::RecomputeSubOrder,
            actor,
            Some(&sub_order.id),
            Some(json!({ "status": sub_order.status.as_str() })),
            None,
        ));
        self.event_publisher.publish(OrderEvent::for_sub_order(
            &sub_order.order_id,
            &sub_order.id,
            OrderEventType::SubOrderRecomputed,
            Some("recompute_sub_order".to_string()),
        ));

        info!(sub_order_id = %sub_order.id, status = %sub_order.status, "子订单已按台账重算");
        Ok(RecomputeResult {
            sub_order,
            order_status: outcome.order_status,
            warnings,
        })
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 子订单生产记录（时间正序）
    pub fn list_production_records(&self, sub_order_id: &str) -> ApiResult<Vec<ProductionRecord>> {
        self.ensure_sub_order_exists(sub_order_id)?;
        Ok(self.ledger_repo.list_production_records(sub_order_id)?)
    }

    /// 子订单发货记录（时间正序）
    pub fn list_shipping_records(&self, sub_order_id: &str) -> ApiResult<Vec<ShippingRecord>> {
        self.ensure_sub_order_exists(sub_order_id)?;
        Ok(self.ledger_repo.list_shipping_records(sub_order_id)?)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn require_sub_order_id(sub_order_id: &str) -> ApiResult<&str> {
        let trimmed = sub_order_id.trim();
        if trimmed.is_empty() {
            return Err(ApiError::ValidationError("子订单ID不能为空".to_string()));
        }
        Ok(trimmed)
    }

    fn ensure_sub_order_exists(&self, sub_order_id: &str) -> ApiResult<()> {
        match self.order_repo.find_sub_order(sub_order_id)? {
            Some(_) => Ok(()),
            None => Err(ApiError::NotFound(format!("SubOrder(id={})不存在", sub_order_id))),
        }
    }

    fn finish_append(
        &self,
        outcome: LedgerWriteOutcome,
        action_type: ActionType,
        event_type: OrderEventType,
        payload: serde_json::Value,
        actor: &str,
    ) -> ApiResult<LedgerAppendResult> {
        let LedgerWriteOutcome {
            record_id,
            sub_order,
            order_status,
        } = outcome;
        let record_id = record_id
            .ok_or_else(|| ApiError::InternalError("台账追加未返回记录ID".to_string()))?;

        let warnings =
            ProgressCore::collect_warnings(sub_order.planned_quantity, &SubOrderCounters::of(&sub_order));
        for warning in &warnings {
            warn!(sub_order_id = %sub_order.id, record_id = %record_id, "{}", warning);
        }

        self.record_action(ActionLog::now(
            action_type,
            actor,
            Some(&sub_order.id),
            Some(payload),
            Some(format!("record_id={}", record_id)),
        ));
        self.event_publisher.publish(OrderEvent::for_sub_order(
            &sub_order.order_id,
            &sub_order.id,
            event_type,
            Some(action_type.to_string()),
        ));

        Ok(LedgerAppendResult {
            record_id,
            sub_order,
            order_status,
            warnings,
        })
    }

    fn record_action(&self, log: ActionLog) {
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(error = %e, action_type = %log.action_type, "记录操作日志失败");
        }
    }
}

/// 追加时子订单不存在属于入参错误
fn map_append_error(err: RepositoryError) -> ApiError {
    match err {
        RepositoryError::NotFound { entity, id } => {
            ApiError::ValidationError(format!("{}(id={})不存在", entity, id))
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config_keys;
    use crate::domain::order::{Order, SubOrder};
    use crate::domain::types::SubOrderStatus;
    use chrono::Utc;
    use rusqlite::Connection;
    use std::sync::Mutex;

    struct Fixture {
        api: LedgerApi,
        config: Arc<ConfigManager>,
        logs: Arc<ActionLogRepository>,
    }

    fn setup(planned: &[i64]) -> Fixture {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));

        let order_repo = Arc::new(OrderRepository::new(conn.clone()));
        let now = Utc::now().naive_utc();
        let order = Order {
            id: "O1".to_string(),
            order_no: "ORD-1".to_string(),
            customer_name: "C".to_string(),
            delivery_date: None,
            workshop: None,
            warehouse: None,
            remarks: None,
            created_by: None,
            status: OrderStatus::New,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let subs: Vec<SubOrder> = planned
            .iter()
            .enumerate()
            .map(|(i, p)| SubOrder {
                id: format!("S{}", i + 1),
                order_id: "O1".to_string(),
                spec: "DN100".to_string(),
                level: None,
                interface_type: None,
                lining: None,
                length: None,
                coating: None,
                unit_weight: None,
                total_weight: None,
                batch_no: None,
                planned_quantity: *p,
                produced_quantity: 0,
                shipped_quantity: 0,
                pulling_quantity: 0,
                hydrostatic_quantity: 0,
                lining_quantity: 0,
                status: SubOrderStatus::New,
                created_at: now,
                updated_at: now,
            })
            .collect();
        order_repo.insert_with_sub_orders(&order, &subs).unwrap();

        let config = Arc::new(ConfigManager::from_connection(conn.clone()).unwrap());
        let logs = Arc::new(ActionLogRepository::new(conn.clone()));
        let api = LedgerApi::new(
            Arc::new(LedgerRepository::new(conn)),
            order_repo,
            logs.clone(),
            config.clone(),
            OptionalEventPublisher::none(),
        );
        Fixture { api, config, logs }
    }

    fn produce(f: &Fixture, sub: &str, q: i64) -> ApiResult<LedgerAppendResult> {
        f.api
            .append_production(sub, q, None, ProductionMeta::default(), "tester")
    }

    #[test]
    fn test_produce_five_twice_then_ship_ten() {
        let f = setup(&[10]);

        let r = produce(&f, "S1", 5).unwrap();
        assert_eq!(r.sub_order.status, SubOrderStatus::ProductionPartial);
        assert_eq!(r.order_status, OrderStatus::InProduction);

        let r = produce(&f, "S1", 5).unwrap();
        assert_eq!(r.sub_order.status, SubOrderStatus::ProductionCompleted);
        assert_eq!(r.order_status, OrderStatus::ProductionCompleted);
        assert!(r.warnings.is_empty());

        let r = f
            .api
            .append_shipping("S1", 10, ShippingMeta::default(), "tester")
            .unwrap();
        assert_eq!(r.sub_order.status, SubOrderStatus::Completed);
        assert_eq!(r.order_status, OrderStatus::Completed);
    }

    #[test]
    fn test_invalid_quantity_and_unknown_sub_order_are_validation_errors() {
        let f = setup(&[10]);
        assert!(matches!(produce(&f, "S1", 0), Err(ApiError::ValidationError(_))));
        assert!(matches!(
            f.api.append_shipping("S1", -1, ShippingMeta::default(), "t"),
            Err(ApiError::ValidationError(_))
        ));
        assert!(matches!(produce(&f, "nope", 1), Err(ApiError::ValidationError(_))));
        assert!(matches!(produce(&f, "  ", 1), Err(ApiError::ValidationError(_))));
        assert!(f.api.list_production_records("S1").unwrap().is_empty());
    }

    #[test]
    fn test_over_shipment_is_accepted_with_warnings() {
        let f = setup(&[10]);
        produce(&f, "S1", 3).unwrap();

        let r = f
            .api
            .append_shipping("S1", 12, ShippingMeta::default(), "t")
            .unwrap();
        assert_eq!(r.sub_order.status, SubOrderStatus::Completed);
        assert!(r.warnings.iter().any(|w| w.starts_with("SHIPPED_EXCEEDS_STOCK")));
        assert!(r.warnings.iter().any(|w| w.starts_with("OVER_SHIPMENT")));
    }

    #[test]
    fn test_cap_only_when_enabled() {
        let f = setup(&[10]);
        let r = produce(&f, "S1", 11).unwrap();
        assert!(r.warnings.iter().any(|w| w.starts_with("OVER_PRODUCTION")));

        f.config
            .set_global_config_value(config_keys::LEDGER_ENFORCE_QUANTITY_CAP, "true")
            .unwrap();
        let err = produce(&f, "S1", 1).unwrap_err();
        assert!(matches!(err, ApiError::CapacityExceeded { planned: 10, resulting: 12, .. }));
        assert_eq!(f.api.list_production_records("S1").unwrap().len(), 1);
    }

    #[test]
    fn test_default_process_comes_from_config() {
        let f = setup(&[10]);
        f.config
            .set_global_config_value(config_keys::LEDGER_DEFAULT_PROCESS, "pulling")
            .unwrap();

        let r = produce(&f, "S1", 4).unwrap();
        assert_eq!(r.sub_order.pulling_quantity, 4);
        assert_eq!(r.sub_order.produced_quantity, 0);

        let records = f.api.list_production_records("S1").unwrap();
        assert_eq!(records[0].process, ProcessTag::Pulling);
        assert_eq!(records[0].operator_id.as_deref(), Some("tester"));
    }

    #[test]
    fn test_parse_process() {
        assert_eq!(LedgerApi::parse_process(None).unwrap(), None);
        assert_eq!(LedgerApi::parse_process(Some(" ")).unwrap(), None);
        assert_eq!(
            LedgerApi::parse_process(Some("Hydrostatic")).unwrap(),
            Some(ProcessTag::Hydrostatic)
        );
        assert!(LedgerApi::parse_process(Some("welding")).is_err());
    }

    #[test]
    fn test_recompute_is_idempotent_and_logged() {
        let f = setup(&[10, 5]);
        produce(&f, "S1", 6).unwrap();
        f.api
            .append_shipping("S1", 2, ShippingMeta::default(), "t")
            .unwrap();

        let first = f.api.recompute_sub_order("S1", "t").unwrap();
        let second = f.api.recompute_sub_order("S1", "t").unwrap();
        assert_eq!(first.sub_order.status, SubOrderStatus::ShippingDuringProduction);
        assert_eq!(first.sub_order.status, second.sub_order.status);
        assert_eq!(first.sub_order.produced_quantity, second.sub_order.produced_quantity);
        assert_eq!(first.order_status, OrderStatus::InProduction);

        // 2 次追加 + 2 次重算
        assert_eq!(f.logs.list_by_target("S1").unwrap().len(), 4);
        assert!(matches!(
            f.api.list_shipping_records("missing"),
            Err(ApiError::NotFound(_))
        ));
    }
}
