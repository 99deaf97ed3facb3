// ==========================================
// 管道工厂订单管理系统 - 数量台账领域模型
// ==========================================
// 职责: 生产记录、发货记录（只追加,不修改,不删除）
// ==========================================

use crate::domain::types::ProcessTag;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// ProductionRecord - 生产记录
// ==========================================
// 对齐: production_records 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionRecord {
    pub id: String,
    pub order_id: String,
    pub sub_order_id: String,
    pub team: Option<String>,        // 班组
    pub shift: Option<String>,       // 班次
    pub quantity: i64,               // 数量（正整数）
    pub workshop: Option<String>,    // 车间
    pub warehouse: Option<String>,   // 入库仓库
    pub operator_id: Option<String>, // 操作员
    pub process: ProcessTag,         // 工序
    pub remarks: Option<String>,
    pub created_at: NaiveDateTime,
}

// ==========================================
// ShippingRecord - 发货记录
// ==========================================
// 对齐: shipping_records 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingRecord {
    pub id: String,
    pub order_id: String,
    pub sub_order_id: String,
    pub quantity: i64,
    pub transport_type: Option<String>,     // 运输方式
    pub shipping_type: Option<String>,      // 发货类型
    pub shipping_warehouse: Option<String>, // 发货仓库
    pub vehicle_info: Option<String>,       // 车辆信息
    pub shipping_no: Option<String>,        // 发货单号
    pub destination: Option<String>,        // 目的地
    pub operator_id: Option<String>,
    pub remarks: Option<String>,
    pub created_at: NaiveDateTime,
}

// ==========================================
// 追加入参
// ==========================================

/// 生产记录附加信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductionMeta {
    pub team: Option<String>,
    pub shift: Option<String>,
    pub workshop: Option<String>,
    pub warehouse: Option<String>,
    pub operator_id: Option<String>,
    pub remarks: Option<String>,
}

/// 发货记录附加信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShippingMeta {
    pub transport_type: Option<String>,
    pub shipping_type: Option<String>,
    pub shipping_warehouse: Option<String>,
    pub vehicle_info: Option<String>,
    pub shipping_no: Option<String>,
    pub destination: Option<String>,
    pub operator_id: Option<String>,
    pub remarks: Option<String>,
}
