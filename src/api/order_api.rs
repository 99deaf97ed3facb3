// ==========================================
// 管道工厂订单管理系统 - 订单 API
// ==========================================
// 职责: 订单创建、查询、订单头修改、软删除
// 约束: 订单状态在读取时由子订单重新汇总
// 约束: 每次写入记录 ActionLog 并发布缓存失效事件
// ==========================================

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::error::{config_err, ApiError, ApiResult};
use crate::api::order_cache::OrderReadCache;
use crate::api::validator::{normalize_opt, InputValidator};
use crate::config::ConfigManager;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::order::{NewOrder, Order, OrderHeaderPatch, OrderWithSubOrders, SubOrder};
use crate::domain::types::{MasterDataCategory, OrderStatus, SubOrderStatus};
use crate::engine::events::{OptionalEventPublisher, OrderEvent, OrderEventType};
use crate::engine::rollup::OrderRollup;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::master_data_repo::MasterDataRepository;
use crate::repository::order_repo::OrderRepository;
use crate::repository::RepositoryError;

// ==========================================
// OrderApi - 订单 API
// ==========================================
pub struct OrderApi {
    order_repo: Arc<OrderRepository>,
    master_data_repo: Arc<MasterDataRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    config_manager: Arc<ConfigManager>,
    cache: Arc<OrderReadCache>,
    event_publisher: OptionalEventPublisher,
}

impl OrderApi {
    pub fn new(
        order_repo: Arc<OrderRepository>,
        master_data_repo: Arc<MasterDataRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        config_manager: Arc<ConfigManager>,
        cache: Arc<OrderReadCache>,
        event_publisher: OptionalEventPublisher,
    ) -> Self {
        Self {
            order_repo,
            master_data_repo,
            action_log_repo,
            config_manager,
            cache,
            event_publisher,
        }
    }

    // ==========================================
    // 写入接口
    // ==========================================

    /// 创建订单（订单头 + 有序子订单）
    ///
    /// # 返回
    /// - Ok(order_id): 子订单全部为 new,计数器为 0
    /// - Err(ValidationError): 入参非法或订单号重复
    pub fn create_order(&self, input: NewOrder, actor: &str) -> ApiResult<String> {
        InputValidator::validate_new_order(&input)?;

        let order_no = input.order_no.trim().to_string();
        if self.order_repo.find_by_order_no(&order_no)?.is_some() {
            return Err(ApiError::ValidationError(format!("订单号已存在: {}", order_no)));
        }

        let now = Utc::now().naive_utc();
        let order_id = uuid::Uuid::new_v4().to_string();
        let order = Order {
            id: order_id.clone(),
            order_no: order_no.clone(),
            customer_name: input.customer_name.trim().to_string(),
            delivery_date: input.delivery_date,
            workshop: normalize_opt(&input.workshop),
            warehouse: normalize_opt(&input.warehouse),
            remarks: normalize_opt(&input.remarks),
            created_by: normalize_opt(&input.created_by).or_else(|| Some(actor.to_string())),
            status: OrderStatus::New,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let sub_orders: Vec<SubOrder> = input
            .sub_orders
            .iter()
            .map(|sub| SubOrder {
                id: uuid::Uuid::new_v4().to_string(),
                order_id: order_id.clone(),
                spec: sub.spec.trim().to_string(),
                level: normalize_opt(&sub.level),
                interface_type: normalize_opt(&sub.interface_type),
                lining: normalize_opt(&sub.lining),
                length: normalize_opt(&sub.length),
                coating: normalize_opt(&sub.coating),
                unit_weight: sub.unit_weight,
                total_weight: sub.total_weight,
                batch_no: normalize_opt(&sub.batch_no),
                planned_quantity: sub.planned_quantity,
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

        match self.order_repo.insert_with_sub_orders(&order, &sub_orders) {
            Ok(_) => {}
            // 并发创建同号订单时由唯一约束兜底
            Err(RepositoryError::UniqueConstraintViolation(_)) => {
                return Err(ApiError::ValidationError(format!("订单号已存在: {}", order_no)));
            }
            Err(e) => return Err(e.into()),
        }

        self.register_master_data(&order, &sub_orders);

        self.record_action(ActionLog::now(
            ActionType::CreateOrder,
            actor,
            Some(&order_id),
            Some(json!({
                "order_no": order_no,
                "sub_order_count": sub_orders.len(),
            })),
            None,
        ));
        self.event_publisher.publish(OrderEvent::for_order(
            &order_id,
            OrderEventType::OrderCreated,
            Some("create_order".to_string()),
        ));

        info!(order_id = %order_id, order_no = %order.order_no, sub_orders = sub_orders.len(), "订单已创建");
        Ok(order_id)
    }

    /// 修改订单头（仅 OrderHeaderPatch 列出的字段）
    pub fn update_order_header(
        &self,
        order_id: &str,
        patch: OrderHeaderPatch,
        actor: &str,
    ) -> ApiResult<OrderWithSubOrders> {
        InputValidator::validate_header_patch(&patch)?;

        let patch = OrderHeaderPatch {
            customer_name: patch.customer_name.map(|s| s.trim().to_string()),
            delivery_date: patch.delivery_date,
            workshop: normalize_opt(&patch.workshop),
            warehouse: normalize_opt(&patch.warehouse),
            remarks: patch.remarks,
        };

        let rows = self
            .order_repo
            .update_header(order_id, &patch, &Utc::now().naive_utc())?;
        if rows == 0 {
            return Err(ApiError::NotFound(format!("Order(id={})不存在", order_id)));
        }

        self.record_action(ActionLog::now(
            ActionType::UpdateOrderHeader,
            actor,
            Some(order_id),
            serde_json::to_value(&patch).ok(),
            None,
        ));
        self.event_publisher.publish(OrderEvent::for_order(
            order_id,
            OrderEventType::OrderHeaderUpdated,
            Some("update_order_header".to_string()),
        ));

        info!(order_id = %order_id, "订单头已修改");
        self.get_order(order_id)
    }

    /// 软删除订单
    ///
    /// 不级联子订单与台账; 重复删除返回 NotFound
    pub fn soft_delete_order(&self, order_id: &str, actor: &str) -> ApiResult<()> {
        let rows = self
            .order_repo
            .soft_delete(order_id, &Utc::now().naive_utc())?;
        if rows == 0 {
            return Err(ApiError::NotFound(format!("Order(id={})不存在或已删除", order_id)));
        }

        self.record_action(ActionLog::now(
            ActionType::DeleteOrder,
            actor,
            Some(order_id),
            None,
            None,
        ));
        self.event_publisher.publish(OrderEvent::for_order(
            order_id,
            OrderEventType::OrderDeleted,
            Some("soft_delete_order".to_string()),
        ));

        info!(order_id = %order_id, "订单已软删除");
        Ok(())
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 查询未删除订单（含子订单,最新在前）
    pub fn list_orders(&self) -> ApiResult<Vec<OrderWithSubOrders>> {
        let limit = self.config_manager.get_order_list_limit().map_err(config_err)?;

        self.cache.get_list_or_load(limit, || -> ApiResult<Vec<OrderWithSubOrders>> {
            let orders = self.order_repo.list_active(limit)?;
            let mut grouped = self.order_repo.list_active_sub_orders_grouped()?;
            debug!(count = orders.len(), "订单列表从数据库加载");

            Ok(orders
                .into_iter()
                .map(|order| {
                    let sub_orders = grouped.remove(&order.id).unwrap_or_default();
                    with_rolled_up_status(order, sub_orders)
                })
                .collect())
        })
    }

    /// 按ID查询未删除订单
    pub fn get_order(&self, order_id: &str) -> ApiResult<OrderWithSubOrders> {
        let loaded = self.cache.get_order_or_load(order_id, || -> ApiResult<_> {
            let order = match self.order_repo.find_by_id(order_id)? {
                Some(order) if order.deleted_at.is_none() => order,
                _ => return Ok(None),
            };
            let sub_orders = self.order_repo.list_sub_orders(order_id)?;
            Ok(Some(with_rolled_up_status(order, sub_orders)))
        })?;

        loaded.ok_or_else(|| ApiError::NotFound(format!("Order(id={})不存在", order_id)))
    }

    /// 按订单号查询未删除订单
    pub fn get_order_by_no(&self, order_no: &str) -> ApiResult<OrderWithSubOrders> {
        match self.order_repo.find_by_order_no(order_no.trim())? {
            Some(order) if order.deleted_at.is_none() => self.get_order(&order.id),
            _ => Err(ApiError::NotFound(format!("Order(order_no={})不存在", order_no))),
        }
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 把订单中出现的描述值登记到基础资料
    ///
    /// 失败不回滚订单,只记录告警
    fn register_master_data(&self, order: &Order, sub_orders: &[SubOrder]) {
        let mut entries: Vec<(MasterDataCategory, String)> = Vec::new();
        entries.push((MasterDataCategory::Customer, order.customer_name.clone()));
        if let Some(v) = &order.workshop {
            entries.push((MasterDataCategory::Workshop, v.clone()));
        }
        if let Some(v) = &order.warehouse {
            entries.push((MasterDataCategory::Warehouse, v.clone()));
        }

        for sub in sub_orders {
            entries.push((MasterDataCategory::Spec, sub.spec.clone()));
            let optional = [
                (MasterDataCategory::Level, &sub.level),
                (MasterDataCategory::InterfaceType, &sub.interface_type),
                (MasterDataCategory::Lining, &sub.lining),
                (MasterDataCategory::Length, &sub.length),
                (MasterDataCategory::Coating, &sub.coating),
            ];
            for (category, value) in optional {
                if let Some(v) = value {
                    entries.push((category, v.clone()));
                }
            }
        }

        match self.master_data_repo.add_many_if_absent(&entries) {
            Ok(added) if added > 0 => debug!(added, "基础资料已自动登记"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, order_id = %order.id, "基础资料登记失败"),
        }
    }

    fn record_action(&self, log: ActionLog) {
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(error = %e, action_type = %log.action_type, "记录操作日志失败");
        }
    }
}

/// 读取时由子订单重新汇总订单状态
fn with_rolled_up_status(mut order: Order, sub_orders: Vec<SubOrder>) -> OrderWithSubOrders {
    let derived = OrderRollup::rollup_sub_orders(&sub_orders);
    if derived != order.status {
        debug!(
            order_id = %order.id,
            stored = %order.status,
            derived = %derived,
            "订单存储状态与汇总结果不一致,以汇总为准"
        );
        order.status = derived;
    }
    OrderWithSubOrders { order, sub_orders }
}
