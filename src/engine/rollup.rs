// ==========================================
// 管道工厂订单管理系统 - 订单状态汇总
// ==========================================
// 职责: 由子订单状态派生订单状态
// 规则: 订单进度 = 最落后的子订单进度
// ==========================================

use crate::domain::order::SubOrder;
use crate::domain::types::{OrderStatus, SubOrderStatus};

pub struct OrderRollup;

impl OrderRollup {
    /// 汇总订单状态
    ///
    /// # 规则
    /// - 无子订单 → new
    /// - 取 rank 最小的子订单状态 min:
    ///   - min = new: 全部为 new → new; 否则 → in_production
    ///   - min ∈ {production_partial, shipping_during_production} → in_production
    ///   - min = production_completed → production_completed
    ///   - min = shipping_completed_production → shipping
    ///   - min = completed（全部完成）→ completed
    pub fn rollup<I>(statuses: I) -> OrderStatus
    where
        I: IntoIterator<Item = SubOrderStatus>,
    {
        let mut min: Option<SubOrderStatus> = None;
        let mut any_started = false;

        for status in statuses {
            if status != SubOrderStatus::New {
                any_started = true;
            }
            min = match min {
                Some(current) if current.rank() <= status.rank() => Some(current),
                _ => Some(status),
            };
        }

        match min {
            None => OrderStatus::New,
            Some(SubOrderStatus::New) => {
                if any_started {
                    OrderStatus::InProduction
                } else {
                    OrderStatus::New
                }
            }
            Some(SubOrderStatus::ProductionPartial)
            | Some(SubOrderStatus::ShippingDuringProduction) => OrderStatus::InProduction,
            Some(SubOrderStatus::ProductionCompleted) => OrderStatus::ProductionCompleted,
            Some(SubOrderStatus::ShippingCompletedProduction) => OrderStatus::Shipping,
            Some(SubOrderStatus::Completed) => OrderStatus::Completed,
        }
    }

    /// 按子订单列表汇总
    pub fn rollup_sub_orders(sub_orders: &[SubOrder]) -> OrderStatus {
        Self::rollup(sub_orders.iter().map(|s| s.status))
    }
}
