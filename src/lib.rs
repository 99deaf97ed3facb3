// ==========================================
// 管道工厂订单管理系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 核心: 子订单进度状态机 + 数量台账 + 主数据登记
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 状态机与汇总
pub mod engine;

// 导入层 - Excel/CSV 订单表
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{MasterDataCategory, OrderStatus, PlanStatus, ProcessTag, SubOrderStatus};

// 领域实体
pub use domain::{
    ActionLog, ActionType, NewOrder, NewProductionPlan, NewSubOrder, Order, OrderHeaderPatch,
    OrderWithSubOrders, ProductionMeta, ProductionPlan, ProductionRecord, ShippingMeta,
    ShippingRecord, SubOrder,
};

// 引擎
pub use engine::{OrderRollup, ProgressCore, SubOrderProgress};

// API
pub use api::{ApiError, ApiResult, LedgerApi, MasterDataApi, OrderApi, PlanApi, ReportApi};

// 应用
pub use app::{get_default_db_path, AppState};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "管道工厂订单管理系统";
