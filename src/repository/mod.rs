// ==========================================
// 管道工厂订单管理系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑,状态派生交给 engine
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod action_log_repo;
pub mod error;
pub mod ledger_repo;
pub mod master_data_repo;
pub mod order_repo;
pub mod plan_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use ledger_repo::{LedgerRepository, LedgerWriteOutcome, ProductionTotalRow, ShippingTotalRow};
pub use master_data_repo::MasterDataRepository;
pub use order_repo::OrderRepository;
pub use plan_repo::ProductionPlanRepository;
