// ==========================================
// 管道工厂订单管理系统 - 领域类型定义
// ==========================================
// 职责: 状态枚举、工序标签、主数据类别
// 约定: 数据库存储为 snake_case 字符串
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 子订单状态 (SubOrder Status)
// ==========================================
// 由累计计数器派生,不允许直接写入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubOrderStatus {
    New,                         // 新建
    ProductionPartial,           // 部分生产
    ProductionCompleted,         // 生产完成
    ShippingDuringProduction,    // 生产中发货
    ShippingCompletedProduction, // 生产完成发货中
    Completed,                   // 已完成
}

impl SubOrderStatus {
    pub const ALL: [SubOrderStatus; 6] = [
        SubOrderStatus::New,
        SubOrderStatus::ProductionPartial,
        SubOrderStatus::ShippingDuringProduction,
        SubOrderStatus::ProductionCompleted,
        SubOrderStatus::ShippingCompletedProduction,
        SubOrderStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubOrderStatus::New => "new",
            SubOrderStatus::ProductionPartial => "production_partial",
            SubOrderStatus::ProductionCompleted => "production_completed",
            SubOrderStatus::ShippingDuringProduction => "shipping_during_production",
            SubOrderStatus::ShippingCompletedProduction => "shipping_completed_production",
            SubOrderStatus::Completed => "completed",
        }
    }

    /// 从字符串解析状态（未知值返回 None）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "new" => Some(SubOrderStatus::New),
            "production_partial" => Some(SubOrderStatus::ProductionPartial),
            "production_completed" => Some(SubOrderStatus::ProductionCompleted),
            "shipping_during_production" => Some(SubOrderStatus::ShippingDuringProduction),
            "shipping_completed_production" => Some(SubOrderStatus::ShippingCompletedProduction),
            "completed" => Some(SubOrderStatus::Completed),
            _ => None,
        }
    }

    /// 推进程度（用于订单汇总取最小值）
    ///
    /// 生产中发货排在生产完成之前: 生产尚未完成
    pub fn rank(&self) -> u8 {
        match self {
            SubOrderStatus::New => 0,
            SubOrderStatus::ProductionPartial => 1,
            SubOrderStatus::ShippingDuringProduction => 2,
            SubOrderStatus::ProductionCompleted => 3,
            SubOrderStatus::ShippingCompletedProduction => 4,
            SubOrderStatus::Completed => 5,
        }
    }
}

impl fmt::Display for SubOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 订单状态 (Order Status)
// ==========================================
// 由子订单状态汇总得出,见 engine::rollup
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,                 // 新建
    InProduction,        // 生产中
    ProductionCompleted, // 生产完成
    Shipping,            // 发货中
    Completed,           // 已完成
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::InProduction => "in_production",
            OrderStatus::ProductionCompleted => "production_completed",
            OrderStatus::Shipping => "shipping",
            OrderStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "new" => Some(OrderStatus::New),
            "in_production" => Some(OrderStatus::InProduction),
            "production_completed" => Some(OrderStatus::ProductionCompleted),
            "shipping" => Some(OrderStatus::Shipping),
            "completed" => Some(OrderStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 工序标签 (Process Tag)
// ==========================================
// 打包 = 成品入库,计入 produced_quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessTag {
    Pulling,     // 拉拔
    Hydrostatic, // 水压
    Lining,      // 衬里
    Packaging,   // 打包
}

impl ProcessTag {
    pub const ALL: [ProcessTag; 4] = [
        ProcessTag::Pulling,
        ProcessTag::Hydrostatic,
        ProcessTag::Lining,
        ProcessTag::Packaging,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessTag::Pulling => "pulling",
            ProcessTag::Hydrostatic => "hydrostatic",
            ProcessTag::Lining => "lining",
            ProcessTag::Packaging => "packaging",
        }
    }

    /// 解析工序标签（大小写不敏感,空串视为未指定）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pulling" => Some(ProcessTag::Pulling),
            "hydrostatic" => Some(ProcessTag::Hydrostatic),
            "lining" => Some(ProcessTag::Lining),
            "packaging" => Some(ProcessTag::Packaging),
            _ => None,
        }
    }
}

impl Default for ProcessTag {
    fn default() -> Self {
        ProcessTag::Packaging
    }
}

impl fmt::Display for ProcessTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 主数据类别 (Master Data Category)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasterDataCategory {
    Spec,          // 规格
    Level,         // 压力等级
    InterfaceType, // 接口形式
    Lining,        // 内衬
    Length,        // 长度
    Coating,       // 外防腐
    Workshop,      // 车间
    Team,          // 班组
    Warehouse,     // 仓库
    Customer,      // 客户
    Destination,   // 目的地
    TransportType, // 运输方式
}

impl MasterDataCategory {
    pub const ALL: [MasterDataCategory; 12] = [
        MasterDataCategory::Spec,
        MasterDataCategory::Level,
        MasterDataCategory::InterfaceType,
        MasterDataCategory::Lining,
        MasterDataCategory::Length,
        MasterDataCategory::Coating,
        MasterDataCategory::Workshop,
        MasterDataCategory::Team,
        MasterDataCategory::Warehouse,
        MasterDataCategory::Customer,
        MasterDataCategory::Destination,
        MasterDataCategory::TransportType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MasterDataCategory::Spec => "spec",
            MasterDataCategory::Level => "level",
            MasterDataCategory::InterfaceType => "interface_type",
            MasterDataCategory::Lining => "lining",
            MasterDataCategory::Length => "length",
            MasterDataCategory::Coating => "coating",
            MasterDataCategory::Workshop => "workshop",
            MasterDataCategory::Team => "team",
            MasterDataCategory::Warehouse => "warehouse",
            MasterDataCategory::Customer => "customer",
            MasterDataCategory::Destination => "destination",
            MasterDataCategory::TransportType => "transport_type",
        }
    }

    /// 解析类别（精确匹配,前端传入的复数形式也接受）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "spec" | "specs" => Some(MasterDataCategory::Spec),
            "level" | "levels" => Some(MasterDataCategory::Level),
            "interface_type" | "interfaceTypes" => Some(MasterDataCategory::InterfaceType),
            "lining" | "linings" => Some(MasterDataCategory::Lining),
            "length" | "lengths" => Some(MasterDataCategory::Length),
            "coating" | "coatings" => Some(MasterDataCategory::Coating),
            "workshop" | "workshops" => Some(MasterDataCategory::Workshop),
            "team" | "teams" => Some(MasterDataCategory::Team),
            "warehouse" | "warehouses" => Some(MasterDataCategory::Warehouse),
            "customer" | "customers" => Some(MasterDataCategory::Customer),
            "destination" | "destinations" => Some(MasterDataCategory::Destination),
            "transport_type" | "transportTypes" => Some(MasterDataCategory::TransportType),
            _ => None,
        }
    }
}

impl fmt::Display for MasterDataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 派工计划状态 (Production Plan Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Pending,   // 待执行
    Completed, // 已完成（仅界面标记,不产生台账）
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Pending => "pending",
            PlanStatus::Completed => "completed",
        }
    }

    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.trim() {
            "completed" => PlanStatus::Completed,
            _ => PlanStatus::Pending, // 默认值
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
