// ==========================================
// 管道工厂订单管理系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 约定: 所有仓储共享同一个连接; 读缓存同时作为事件订阅者
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{LedgerApi, MasterDataApi, OrderApi, OrderReadCache, PlanApi, ReportApi};
use crate::config::config_manager::ConfigManager;
use crate::engine::events::{OptionalEventPublisher, OrderEventPublisher};
use crate::importer::{OrderImporterImpl, OrderRowMapper, UniversalFileParser};
use crate::repository::{
    ActionLogRepository, LedgerRepository, MasterDataRepository, OrderRepository,
    ProductionPlanRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 订单API
    pub order_api: Arc<OrderApi>,

    /// 生产/发货台账API
    pub ledger_api: Arc<LedgerApi>,

    /// 主数据API
    pub master_data_api: Arc<MasterDataApi>,

    /// 派工API
    pub plan_api: Arc<PlanApi>,

    /// 报表API
    pub report_api: Arc<ReportApi>,

    /// 订单导入器
    pub order_importer: Arc<OrderImporterImpl<ConfigManager>>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 订单读缓存
    pub order_cache: Arc<OrderReadCache>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 1. 打开数据库并建表（幂等）
    /// 2. 初始化所有Repository
    /// 3. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState,数据库路径: {}", db_path);

        let conn = crate::db::open_and_migrate(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;

        Self::from_connection(db_path, Arc::new(Mutex::new(conn)))
    }

    /// 基于已初始化的连接装配（连接需已建表）
    pub fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> Result<Self, String> {
        // ==========================================
        // Repository层
        // ==========================================
        let order_repo = Arc::new(OrderRepository::new(conn.clone()));
        let ledger_repo = Arc::new(LedgerRepository::new(conn.clone()));
        let master_data_repo = Arc::new(MasterDataRepository::new(conn.clone()));
        let plan_repo = Arc::new(ProductionPlanRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        // 导入器持有独立的配置读取器实例（共享同一连接）
        let import_config = ConfigManager::from_connection(conn.clone())
            .map_err(|e| format!("无法创建导入配置读取器: {}", e))?;

        // ==========================================
        // 读缓存 + 事件
        // ==========================================
        let order_cache = Arc::new(OrderReadCache::new());
        let cache_publisher: Arc<dyn OrderEventPublisher> = order_cache.clone();
        let event_publisher = OptionalEventPublisher::with_publisher(cache_publisher);

        // ==========================================
        // API层
        // ==========================================
        let order_api = Arc::new(OrderApi::new(
            order_repo.clone(),
            master_data_repo.clone(),
            action_log_repo.clone(),
            config_manager.clone(),
            order_cache.clone(),
            event_publisher.clone(),
        ));

        let ledger_api = Arc::new(LedgerApi::new(
            ledger_repo.clone(),
            order_repo.clone(),
            action_log_repo.clone(),
            config_manager.clone(),
            event_publisher,
        ));

        let master_data_api = Arc::new(MasterDataApi::new(master_data_repo));

        let plan_api = Arc::new(PlanApi::new(
            plan_repo,
            order_repo.clone(),
            action_log_repo.clone(),
        ));

        let report_api = Arc::new(ReportApi::new(order_repo, ledger_repo));

        let order_importer = Arc::new(OrderImporterImpl::new(
            order_api.clone(),
            action_log_repo.clone(),
            import_config,
            Box::new(UniversalFileParser),
            Box::new(OrderRowMapper),
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            order_api,
            ledger_api,
            master_data_api,
            plan_api,
            report_api,
            order_importer,
            config_manager,
            order_cache,
            action_log_repo,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 PIPE_FACTORY_OMS_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("PIPE_FACTORY_OMS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./pipe_factory_oms.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("pipe-factory-oms");
        match std::fs::create_dir_all(&dir) {
            Ok(()) => path = dir.join("oms.db"),
            Err(e) => tracing::warn!("无法创建数据目录 {}: {}", dir.display(), e),
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{NewOrder, NewSubOrder};
    use crate::domain::ledger::ProductionMeta;
    use tempfile::NamedTempFile;

    #[test]
    fn test_app_state_wires_cache_invalidation() {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap().to_string();
        let state = AppState::new(db_path).unwrap();

        let order_id = state
            .order_api
            .create_order(
                NewOrder {
                    order_no: "ORD-1".to_string(),
                    customer_name: "甲公司".to_string(),
                    sub_orders: vec![NewSubOrder {
                        spec: "DN100".to_string(),
                        planned_quantity: 10,
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                "tester",
            )
            .unwrap();

        // 首次读取写入缓存
        let before = state.order_api.get_order(&order_id).unwrap();
        assert_eq!(before.sub_orders[0].produced_quantity, 0);

        let sub_id = before.sub_orders[0].id.clone();
        state
            .ledger_api
            .append_production(&sub_id, 4, None, ProductionMeta::default(), "tester")
            .unwrap();

        // 台账写入后缓存应失效
        let after = state.order_api.get_order(&order_id).unwrap();
        assert_eq!(after.sub_orders[0].produced_quantity, 4);
        assert!(state.order_cache.stats().invalidations >= 1);
    }

    #[test]
    fn test_default_db_path_env_override() {
        std::env::set_var("PIPE_FACTORY_OMS_DB_PATH", " /tmp/oms-test.db ");
        assert_eq!(get_default_db_path(), "/tmp/oms-test.db");
        std::env::remove_var("PIPE_FACTORY_OMS_DB_PATH");
    }
}
