// ==========================================
// 管道工厂订单管理系统 - API 层
// ==========================================
// 职责: 业务操作入口（校验、事务调用、日志、缓存失效）
// 红线: API 不拼 SQL,状态派生只调用 engine
// ==========================================

pub mod error;
pub mod ledger_api;
pub mod master_data_api;
pub mod order_api;
pub mod order_cache;
pub mod plan_api;
pub mod report_api;
pub mod validator;

// 重导出
pub use error::{ApiError, ApiResult};
pub use ledger_api::{LedgerApi, LedgerAppendResult, RecomputeResult};
pub use master_data_api::MasterDataApi;
pub use order_api::OrderApi;
pub use order_cache::{CacheStats, OrderReadCache};
pub use plan_api::PlanApi;
pub use report_api::{OrderProgressView, ReportApi};
pub use validator::InputValidator;
