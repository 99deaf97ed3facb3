// ==========================================
// 管道工厂订单管理系统 - 主数据领域模型
// ==========================================
// 用途: 录入界面自动补全,非业务关键数据
// ==========================================

use crate::domain::types::MasterDataCategory;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 主数据条目（按类别 + 插入顺序）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterDataEntry {
    pub category: MasterDataCategory,
    pub value: String,
    pub seq: i64, // 类别内插入顺序
    pub created_at: NaiveDateTime,
}
