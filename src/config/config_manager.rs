// ==========================================
// 管道工厂订单管理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::types::ProcessTag;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

/// 订单列表默认上限
pub const DEFAULT_ORDER_LIST_LIMIT: i64 = 500;

/// 单文件导入默认最大行数
pub const DEFAULT_IMPORT_MAX_ROWS: usize = 5000;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 打开独立连接创建 ConfigManager
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 对传入连接再次应用统一 PRAGMA（幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let key = key.trim();
        if key.is_empty() {
            return Err("配置键不能为空".into());
        }

        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;

        tracing::info!(config_key = %key, value = %value, "配置已更新");
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON,按键排序）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== 台账配置 =====

    /// 是否拒绝累计超出计划数量的追加
    ///
    /// 默认 false: 超量只产生警告
    pub fn get_enforce_quantity_cap(&self) -> Result<bool, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::LEDGER_ENFORCE_QUANTITY_CAP, "false")?;
        Ok(matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        ))
    }

    /// 未指定工序时使用的工序
    pub fn get_default_process(&self) -> Result<ProcessTag, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::LEDGER_DEFAULT_PROCESS, "packaging")?;
        Ok(ProcessTag::parse(&value).unwrap_or_else(|| {
            tracing::warn!(
                config_key = config_keys::LEDGER_DEFAULT_PROCESS,
                raw_value = %value,
                "默认工序配置无效,使用 packaging"
            );
            ProcessTag::Packaging
        }))
    }

    // ===== 订单配置 =====

    /// 订单列表返回上限
    pub fn get_order_list_limit(&self) -> Result<i64, Box<dyn Error>> {
        let value = self.get_config_or_default(
            config_keys::ORDER_LIST_LIMIT,
            &DEFAULT_ORDER_LIST_LIMIT.to_string(),
        )?;
        Ok(value
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_ORDER_LIST_LIMIT))
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_max_rows(&self) -> Result<usize, Box<dyn Error>> {
        let value = self.get_config_or_default(
            config_keys::IMPORT_MAX_ROWS,
            &DEFAULT_IMPORT_MAX_ROWS.to_string(),
        )?;
        Ok(value
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_IMPORT_MAX_ROWS))
    }

    async fn get_default_workshop(&self) -> Result<Option<String>, Box<dyn Error>> {
        let value = self.get_config_value(config_keys::IMPORT_DEFAULT_WORKSHOP)?;
        Ok(value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
    }

    async fn get_import_actor(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(config_keys::IMPORT_ACTOR, "importer")
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 台账
    pub const LEDGER_ENFORCE_QUANTITY_CAP: &str = "ledger.enforce_quantity_cap";
    pub const LEDGER_DEFAULT_PROCESS: &str = "ledger.default_process";

    // 订单
    pub const ORDER_LIST_LIMIT: &str = "order.list_limit";

    // 导入
    pub const IMPORT_MAX_ROWS: &str = "import.max_rows";
    pub const IMPORT_DEFAULT_WORKSHOP: &str = "import.default_workshop";
    pub const IMPORT_ACTOR: &str = "import.actor";
}
