// ==========================================
// 管道工厂订单管理系统 - 引擎层
// ==========================================
// 职责: 进度状态机、订单汇总、写入事件
// 红线: Engine 不拼 SQL
// ==========================================

pub mod events;
pub mod progress;
pub mod rollup;

// 重导出核心引擎
pub use events::{
    NoOpEventPublisher, OptionalEventPublisher, OrderEvent, OrderEventPublisher, OrderEventType,
};
pub use progress::{ProgressCore, SubOrderCounters, SubOrderProgress};
pub use rollup::OrderRollup;
