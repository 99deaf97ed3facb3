// ==========================================
// 管道工厂订单管理系统 - 应用层
// ==========================================
// 职责: 装配仓储/API,提供默认数据库路径
// ==========================================

pub mod state;

pub use state::{get_default_db_path, AppState};
