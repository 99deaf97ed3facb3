// ==========================================
// 管道工厂订单管理系统 - 操作日志领域模型
// ==========================================
// 红线: 所有写入必须记录
// 用途: 审计追踪
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
// 对齐: action_log 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub action_type: String,       // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime,
    pub actor: String,
    pub target_id: Option<String>, // 订单/子订单/计划 ID

    pub payload_json: Option<JsonValue>, // 操作参数 (JSON)
    pub detail: Option<String>,
}

impl ActionLog {
    /// 以当前时间构造日志
    pub fn now(
        action_type: ActionType,
        actor: &str,
        target_id: Option<&str>,
        payload_json: Option<JsonValue>,
        detail: Option<String>,
    ) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.to_string(),
            action_ts: chrono::Utc::now().naive_utc(),
            actor: actor.to_string(),
            target_id: target_id.map(|s| s.to_string()),
            payload_json,
            detail,
        }
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    CreateOrder,       // 创建订单
    UpdateOrderHeader, // 修改订单头
    DeleteOrder,       // 软删除订单
    AppendProduction,  // 追加生产记录
    AppendShipping,    // 追加发货记录
    RecomputeSubOrder, // 台账重放
    DispatchPlan,      // 派工
    CompletePlan,      // 完成派工
    ImportOrders,      // 批量导入订单
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionType::CreateOrder => "CreateOrder",
            ActionType::UpdateOrderHeader => "UpdateOrderHeader",
            ActionType::DeleteOrder => "DeleteOrder",
            ActionType::AppendProduction => "AppendProduction",
            ActionType::AppendShipping => "AppendShipping",
            ActionType::RecomputeSubOrder => "RecomputeSubOrder",
            ActionType::DispatchPlan => "DispatchPlan",
            ActionType::CompletePlan => "CompletePlan",
            ActionType::ImportOrders => "ImportOrders",
        };
        write!(f, "{}", s)
    }
}
