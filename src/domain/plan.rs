// ==========================================
// 管道工厂订单管理系统 - 派工计划领域模型
// ==========================================
// 说明: 派工计划是待办队列,与数量台账相互独立
// 完成计划不是台账事件,不影响子订单计数器
// ==========================================

use crate::domain::types::{PlanStatus, ProcessTag};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// ProductionPlan - 派工计划
// ==========================================
// 对齐: production_plans 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionPlan {
    pub id: String,
    pub order_id: String,
    pub sub_order_id: Option<String>,
    pub workshop: String,
    pub team: Option<String>,
    pub shift: Option<String>,
    pub process: ProcessTag,
    pub quantity: i64,
    pub status: PlanStatus,
    pub assigned_by: Option<String>,
    pub remarks: Option<String>,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

/// 新建派工计划入参
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProductionPlan {
    pub order_id: String,
    pub sub_order_id: Option<String>,
    pub workshop: String,
    pub team: Option<String>,
    pub shift: Option<String>,
    pub process: Option<ProcessTag>,
    pub quantity: i64,
    pub assigned_by: Option<String>,
    pub remarks: Option<String>,
}
