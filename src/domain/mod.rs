// ==========================================
// 管道工厂订单管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod ledger;
pub mod master_data;
pub mod order;
pub mod plan;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use ledger::{ProductionMeta, ProductionRecord, ShippingMeta, ShippingRecord};
pub use master_data::MasterDataEntry;
pub use order::{NewOrder, NewSubOrder, Order, OrderHeaderPatch, OrderWithSubOrders, SubOrder};
pub use plan::{NewProductionPlan, ProductionPlan};
pub use types::{MasterDataCategory, OrderStatus, PlanStatus, ProcessTag, SubOrderStatus};
