// ==========================================
// 管道工厂订单管理系统 - 子订单进度状态机
// ==========================================
// 职责: 台账累计规则 + 子订单状态派生
// 红线: 无状态、无副作用、无 I/O 操作
// 红线: 所有写入路径必须调用同一个 derive_status
// ==========================================

use crate::domain::ledger::{ProductionRecord, ShippingRecord};
use crate::domain::order::SubOrder;
use crate::domain::types::{ProcessTag, SubOrderStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 计数器累计超出 i64 范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("累计数量溢出: 当前={current}, 追加={quantity}")]
pub struct CounterOverflow {
    pub current: i64,
    pub quantity: i64,
}

// ==========================================
// SubOrderCounters - 子订单累计计数器
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubOrderCounters {
    pub produced_quantity: i64,
    pub shipped_quantity: i64,
    pub pulling_quantity: i64,
    pub hydrostatic_quantity: i64,
    pub lining_quantity: i64,
}

impl SubOrderCounters {
    /// 从子订单当前值读取计数器
    pub fn of(sub_order: &SubOrder) -> Self {
        Self {
            produced_quantity: sub_order.produced_quantity,
            shipped_quantity: sub_order.shipped_quantity,
            pulling_quantity: sub_order.pulling_quantity,
            hydrostatic_quantity: sub_order.hydrostatic_quantity,
            lining_quantity: sub_order.lining_quantity,
        }
    }

    /// 累计一条生产记录
    ///
    /// 打包（或未指定工序）计入 produced_quantity,其余工序计入各自计数器
    pub fn apply_production(
        &mut self,
        process: ProcessTag,
        quantity: i64,
    ) -> Result<(), CounterOverflow> {
        let counter = match process {
            ProcessTag::Packaging => &mut self.produced_quantity,
            ProcessTag::Pulling => &mut self.pulling_quantity,
            ProcessTag::Hydrostatic => &mut self.hydrostatic_quantity,
            ProcessTag::Lining => &mut self.lining_quantity,
        };
        *counter = checked_sum(*counter, quantity)?;
        Ok(())
    }

    /// 累计一条发货记录
    pub fn apply_shipping(&mut self, quantity: i64) -> Result<(), CounterOverflow> {
        self.shipped_quantity = checked_sum(self.shipped_quantity, quantity)?;
        Ok(())
    }
}

fn checked_sum(current: i64, quantity: i64) -> Result<i64, CounterOverflow> {
    current
        .checked_add(quantity)
        .ok_or(CounterOverflow { current, quantity })
}

// ==========================================
// ProgressCore - 纯函数工具类
// ==========================================
pub struct ProgressCore;

impl ProgressCore {
    /// 派生子订单状态
    ///
    /// # 规则（按顺序,首个命中即返回）
    /// 1. shipped >= planned → completed（即使生产未完成）
    /// 2. shipped > 0 → produced >= planned ? shipping_completed_production : shipping_during_production
    /// 3. produced >= planned → production_completed
    /// 4. produced > 0 → production_partial
    /// 5. → new
    pub fn derive_status(planned_quantity: i64, counters: &SubOrderCounters) -> SubOrderStatus {
        let produced = counters.produced_quantity;
        let shipped = counters.shipped_quantity;

        if shipped >= planned_quantity {
            SubOrderStatus::Completed
        } else if shipped > 0 {
            if produced >= planned_quantity {
                SubOrderStatus::ShippingCompletedProduction
            } else {
                SubOrderStatus::ShippingDuringProduction
            }
        } else if produced >= planned_quantity {
            SubOrderStatus::ProductionCompleted
        } else if produced > 0 {
            SubOrderStatus::ProductionPartial
        } else {
            SubOrderStatus::New
        }
    }

    /// 从完整台账重放计数器
    ///
    /// 求和满足交换律: 任意记录顺序结果一致
    pub fn replay(
        production_records: &[ProductionRecord],
        shipping_records: &[ShippingRecord],
    ) -> Result<SubOrderCounters, CounterOverflow> {
        let mut counters = SubOrderCounters::default();
        for record in production_records {
            counters.apply_production(record.process, record.quantity)?;
        }
        for record in shipping_records {
            counters.apply_shipping(record.quantity)?;
        }
        Ok(counters)
    }

    /// 计算进度视图
    pub fn progress(sub_order: &SubOrder) -> SubOrderProgress {
        let planned = sub_order.planned_quantity;
        let counters = SubOrderCounters::of(sub_order);

        SubOrderProgress {
            sub_order_id: sub_order.id.clone(),
            planned_quantity: planned,
            produced_quantity: counters.produced_quantity,
            shipped_quantity: counters.shipped_quantity,
            produced_percent: Self::percent(counters.produced_quantity, planned),
            shipped_percent: Self::percent(counters.shipped_quantity, planned),
            remaining_to_produce: (planned - counters.produced_quantity).max(0),
            remaining_to_ship: (planned - counters.shipped_quantity).max(0),
            available_stock: counters.produced_quantity - counters.shipped_quantity,
            status: Self::derive_status(planned, &counters),
        }
    }

    /// 百分比（允许超过 100）
    pub fn percent(value: i64, planned_quantity: i64) -> f64 {
        if planned_quantity <= 0 {
            return 0.0;
        }
        let raw = value as f64 * 100.0 / planned_quantity as f64;
        (raw * 100.0).round() / 100.0
    }

    /// 台账追加后的非阻断提示
    ///
    /// 超产/超发不报错,仅提示
    pub fn collect_warnings(planned_quantity: i64, counters: &SubOrderCounters) -> Vec<String> {
        let mut warnings = Vec::new();
        if counters.produced_quantity > planned_quantity {
            warnings.push(format!(
                "OVER_PRODUCTION: produced={} planned={}",
                counters.produced_quantity, planned_quantity
            ));
        }
        if counters.shipped_quantity > counters.produced_quantity {
            warnings.push(format!(
                "SHIPPED_EXCEEDS_STOCK: shipped={} produced={}",
                counters.shipped_quantity, counters.produced_quantity
            ));
        }
        if counters.shipped_quantity > planned_quantity {
            warnings.push(format!(
                "OVER_SHIPMENT: shipped={} planned={}",
                counters.shipped_quantity, planned_quantity
            ));
        }
        warnings
    }
}

// ==========================================
// SubOrderProgress - 子订单进度视图
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubOrderProgress {
    pub sub_order_id: String,
    pub planned_quantity: i64,
    pub produced_quantity: i64,
    pub shipped_quantity: i64,
    pub produced_percent: f64,
    pub shipped_percent: f64,
    pub remaining_to_produce: i64,
    pub remaining_to_ship: i64,
    pub available_stock: i64, // 可能为负: 超库存发货
    pub status: SubOrderStatus,
}
