// ==========================================
// 管道工厂订单管理系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout,并发写入时排队等待写锁而不是直接失败
// - 建表幂等（CREATE TABLE IF NOT EXISTS）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）
///
/// 说明：
/// - 子订单计数器只允许由台账追加事务内的 `col = col + ?` 更新
/// - 台账表无 UPDATE/DELETE 接口
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            order_no TEXT NOT NULL UNIQUE,
            customer_name TEXT NOT NULL,
            delivery_date TEXT,
            workshop TEXT,
            warehouse TEXT,
            remarks TEXT,
            created_by TEXT,
            status TEXT NOT NULL DEFAULT 'new',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );

        CREATE TABLE IF NOT EXISTS sub_orders (
            id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL REFERENCES orders(id),
            seq_no INTEGER NOT NULL,
            spec TEXT NOT NULL,
            level TEXT,
            interface_type TEXT,
            lining TEXT,
            length TEXT,
            coating TEXT,
            unit_weight REAL,
            total_weight REAL,
            batch_no TEXT,
            planned_quantity INTEGER NOT NULL CHECK (planned_quantity > 0),
            produced_quantity INTEGER NOT NULL DEFAULT 0 CHECK (produced_quantity >= 0),
            shipped_quantity INTEGER NOT NULL DEFAULT 0 CHECK (shipped_quantity >= 0),
            pulling_quantity INTEGER NOT NULL DEFAULT 0 CHECK (pulling_quantity >= 0),
            hydrostatic_quantity INTEGER NOT NULL DEFAULT 0 CHECK (hydrostatic_quantity >= 0),
            lining_quantity INTEGER NOT NULL DEFAULT 0 CHECK (lining_quantity >= 0),
            status TEXT NOT NULL DEFAULT 'new',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sub_orders_order ON sub_orders(order_id, seq_no);

        CREATE TABLE IF NOT EXISTS production_records (
            id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL REFERENCES orders(id),
            sub_order_id TEXT NOT NULL REFERENCES sub_orders(id),
            team TEXT,
            shift TEXT,
            quantity INTEGER NOT NULL CHECK (quantity > 0),
            workshop TEXT,
            warehouse TEXT,
            operator_id TEXT,
            process TEXT NOT NULL DEFAULT 'packaging',
            remarks TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_production_sub_order ON production_records(sub_order_id);
        CREATE INDEX IF NOT EXISTS idx_production_created ON production_records(created_at);

        CREATE TABLE IF NOT EXISTS shipping_records (
            id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL REFERENCES orders(id),
            sub_order_id TEXT NOT NULL REFERENCES sub_orders(id),
            quantity INTEGER NOT NULL CHECK (quantity > 0),
            transport_type TEXT,
            shipping_type TEXT,
            shipping_warehouse TEXT,
            vehicle_info TEXT,
            shipping_no TEXT,
            destination TEXT,
            operator_id TEXT,
            remarks TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_shipping_sub_order ON shipping_records(sub_order_id);
        CREATE INDEX IF NOT EXISTS idx_shipping_created ON shipping_records(created_at);

        CREATE TABLE IF NOT EXISTS master_data (
            category TEXT NOT NULL,
            value TEXT NOT NULL,
            seq INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (category, value)
        );

        CREATE TABLE IF NOT EXISTS production_plans (
            id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL REFERENCES orders(id),
            sub_order_id TEXT REFERENCES sub_orders(id),
            workshop TEXT NOT NULL,
            team TEXT,
            shift TEXT,
            process TEXT NOT NULL DEFAULT 'packaging',
            quantity INTEGER NOT NULL CHECK (quantity > 0),
            status TEXT NOT NULL DEFAULT 'pending',
            assigned_by TEXT,
            remarks TEXT,
            created_at TEXT NOT NULL,
            completed_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_plans_status ON production_plans(status, workshop);

        CREATE TABLE IF NOT EXISTS action_log (
            action_id TEXT PRIMARY KEY,
            action_type TEXT NOT NULL,
            action_ts TEXT NOT NULL,
            actor TEXT NOT NULL,
            target_id TEXT,
            payload_json TEXT,
            detail TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_action_ts ON action_log(action_ts);
        CREATE INDEX IF NOT EXISTS idx_action_target_ts ON action_log(target_id, action_ts);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 打开连接并确保 schema 存在
pub fn open_and_migrate(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = open_sqlite_connection(db_path)?;
    ensure_schema(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), None);
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_sub_order_rejects_negative_counters() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO orders (id, order_no, customer_name, created_at, updated_at)
             VALUES ('O1', 'ORD-1', 'C', '2026-01-01 00:00:00', '2026-01-01 00:00:00')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO sub_orders (id, order_id, seq_no, spec, planned_quantity, produced_quantity, created_at, updated_at)
             VALUES ('S1', 'O1', 0, 'DN100', 10, -1, '2026-01-01 00:00:00', '2026-01-01 00:00:00')",
            [],
        );
        assert!(result.is_err());
    }
}
