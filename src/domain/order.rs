// ==========================================
// 管道工厂订单管理系统 - 订单领域模型
// ==========================================
// 职责: 订单头、子订单（行项目）及其创建/修改入参
// 红线: 子订单计数器只能由台账累计派生
// ==========================================

use crate::domain::types::{OrderStatus, SubOrderStatus};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Order - 订单头
// ==========================================
// 对齐: orders 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,                        // 订单ID（UUID）
    pub order_no: String,                  // 订单号（唯一,不可修改）
    pub customer_name: String,             // 客户名称
    pub delivery_date: Option<NaiveDate>,  // 交货日期
    pub workshop: Option<String>,          // 生产车间
    pub warehouse: Option<String>,         // 入库仓库
    pub remarks: Option<String>,           // 备注
    pub created_by: Option<String>,        // 创建人
    pub status: OrderStatus,               // 订单状态（由子订单汇总）
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>, // 软删除时间
}

// ==========================================
// SubOrder - 子订单
// ==========================================
// 对齐: sub_orders 表
// 描述字段创建后不可修改; 计数器单调不减
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubOrder {
    pub id: String,
    pub order_id: String,

    // ===== 规格描述（不可变）=====
    pub spec: String,
    pub level: Option<String>,
    pub interface_type: Option<String>,
    pub lining: Option<String>,
    pub length: Option<String>,
    pub coating: Option<String>,
    pub unit_weight: Option<f64>,
    pub total_weight: Option<f64>,
    pub batch_no: Option<String>,

    // ===== 数量 =====
    pub planned_quantity: i64,
    pub produced_quantity: i64,
    pub shipped_quantity: i64,
    pub pulling_quantity: i64,
    pub hydrostatic_quantity: i64,
    pub lining_quantity: i64,

    pub status: SubOrderStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// OrderWithSubOrders - 订单 + 子订单
// ==========================================
/// 订单读取结果（子订单按创建顺序）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithSubOrders {
    pub order: Order,
    pub sub_orders: Vec<SubOrder>,
}

// ==========================================
// 创建入参
// ==========================================

/// 新建子订单规格
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSubOrder {
    pub spec: String,
    pub level: Option<String>,
    pub interface_type: Option<String>,
    pub lining: Option<String>,
    pub length: Option<String>,
    pub coating: Option<String>,
    pub planned_quantity: i64,
    pub unit_weight: Option<f64>,
    pub total_weight: Option<f64>,
    pub batch_no: Option<String>,
}

/// 新建订单（订单头 + 有序子订单列表）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_no: String,
    pub customer_name: String,
    pub delivery_date: Option<NaiveDate>,
    pub workshop: Option<String>,
    pub warehouse: Option<String>,
    pub remarks: Option<String>,
    pub created_by: Option<String>,
    pub sub_orders: Vec<NewSubOrder>,
}

// ==========================================
// OrderHeaderPatch - 订单头可修改字段
// ==========================================
// 显式枚举可修改字段,None 表示不修改
// order_no / status / 子订单 均不在此列
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderHeaderPatch {
    pub customer_name: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub workshop: Option<String>,
    pub warehouse: Option<String>,
    pub remarks: Option<String>,
}

impl OrderHeaderPatch {
    pub fn is_empty(&self) -> bool {
        self.customer_name.is_none()
            && self.delivery_date.is_none()
            && self.workshop.is_none()
            && self.warehouse.is_none()
            && self.remarks.is_none()
    }
}
