// ==========================================
// 管道工厂订单管理系统 - 订单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: orders / sub_orders 表的读写
// 约束: 订单头只允许修改显式枚举的字段
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::order::{Order, OrderHeaderPatch, SubOrder};
use crate::domain::types::{OrderStatus, SubOrderStatus};
use crate::repository::error::{format_ts, parse_date, ts_column, RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub(crate) const ORDER_COLUMNS: &str = "id, order_no, customer_name, delivery_date, workshop, warehouse, \
     remarks, created_by, status, created_at, updated_at, deleted_at";

pub(crate) const SUB_ORDER_COLUMNS: &str = "id, order_id, spec, level, interface_type, lining, length, \
     coating, unit_weight, total_weight, batch_no, planned_quantity, produced_quantity, \
     shipped_quantity, pulling_quantity, hydrostatic_quantity, lining_quantity, status, \
     created_at, updated_at";

// ==========================================
// 行映射
// ==========================================

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, message.into())
}

pub(crate) fn map_order_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    let status_raw: String = row.get(8)?;
    let status = OrderStatus::parse(&status_raw)
        .ok_or_else(|| conversion_error(8, format!("未知订单状态: {}", status_raw)))?;
    let delivery_date: Option<String> = row.get(3)?;
    let deleted_at: Option<String> = row.get(11)?;

    Ok(Order {
        id: row.get(0)?,
        order_no: row.get(1)?,
        customer_name: row.get(2)?,
        delivery_date: delivery_date.as_deref().and_then(parse_date),
        workshop: row.get(4)?,
        warehouse: row.get(5)?,
        remarks: row.get(6)?,
        created_by: row.get(7)?,
        status,
        created_at: ts_column(row.get(9)?, 9)?,
        updated_at: ts_column(row.get(10)?, 10)?,
        deleted_at: match deleted_at {
            Some(raw) => Some(ts_column(raw, 11)?),
            None => None,
        },
    })
}

pub(crate) fn map_sub_order_row(row: &Row<'_>) -> rusqlite::Result<SubOrder> {
    let status_raw: String = row.get(17)?;
    let status = SubOrderStatus::parse(&status_raw)
        .ok_or_else(|| conversion_error(17, format!("未知子订单状态: {}", status_raw)))?;

    Ok(SubOrder {
        id: row.get(0)?,
        order_id: row.get(1)?,
        spec: row.get(2)?,
        level: row.get(3)?,
        interface_type: row.get(4)?,
        lining: row.get(5)?,
        length: row.get(6)?,
        coating: row.get(7)?,
        unit_weight: row.get(8)?,
        total_weight: row.get(9)?,
        batch_no: row.get(10)?,
        planned_quantity: row.get(11)?,
        produced_quantity: row.get(12)?,
        shipped_quantity: row.get(13)?,
        pulling_quantity: row.get(14)?,
        hydrostatic_quantity: row.get(15)?,
        lining_quantity: row.get(16)?,
        status,
        created_at: ts_column(row.get(18)?, 18)?,
        updated_at: ts_column(row.get(19)?, 19)?,
    })
}

/// 在给定连接上读取子订单（供台账事务内复用）
pub(crate) fn load_sub_order(conn: &Connection, sub_order_id: &str) -> RepositoryResult<Option<SubOrder>> {
    let sql = format!("SELECT {} FROM sub_orders WHERE id = ?1", SUB_ORDER_COLUMNS);
    let sub_order = conn
        .query_row(&sql, params![sub_order_id], map_sub_order_row)
        .optional()?;
    Ok(sub_order)
}

/// 在给定连接上读取订单下全部子订单状态
pub(crate) fn load_sub_order_statuses(
    conn: &Connection,
    order_id: &str,
) -> RepositoryResult<Vec<SubOrderStatus>> {
    let mut stmt = conn.prepare("SELECT status FROM sub_orders WHERE order_id = ?1 ORDER BY seq_no")?;
    let rows = stmt.query_map(params![order_id], |row| row.get::<_, String>(0))?;

    let mut statuses = Vec::new();
    for row in rows {
        let raw = row?;
        let status = SubOrderStatus::parse(&raw).ok_or_else(|| {
            RepositoryError::FieldValueError {
                field: "sub_orders.status".to_string(),
                message: raw.clone(),
            }
        })?;
        statuses.push(status);
    }
    Ok(statuses)
}

// ==========================================
// OrderRepository - 订单仓储
// ==========================================
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 打开独立连接
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入订单及其全部子订单（单事务）
    ///
    /// # 返回
    /// - Ok(order_id)
    /// - Err(UniqueConstraintViolation): 订单号重复
    pub fn insert_with_sub_orders(
        &self,
        order: &Order,
        sub_orders: &[SubOrder],
    ) -> RepositoryResult<String> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO orders (
                id, order_no, customer_name, delivery_date, workshop, warehouse,
                remarks, created_by, status, created_at, updated_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, NULL)
            "#,
            params![
                order.id,
                order.order_no,
                order.customer_name,
                order.delivery_date.map(|d| d.format("%Y-%m-%d").to_string()),
                order.workshop,
                order.warehouse,
                order.remarks,
                order.created_by,
                order.status.as_str(),
                format_ts(&order.created_at),
                format_ts(&order.updated_at),
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO sub_orders (
                    id, order_id, seq_no, spec, level, interface_type, lining, length,
                    coating, unit_weight, total_weight, batch_no, planned_quantity,
                    produced_quantity, shipped_quantity, pulling_quantity,
                    hydrostatic_quantity, lining_quantity, status, created_at, updated_at
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                    ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21
                )
                "#,
            )?;

            for (seq_no, sub) in sub_orders.iter().enumerate() {
                stmt.execute(params![
                    sub.id,
                    order.id,
                    seq_no as i64,
                    sub.spec,
                    sub.level,
                    sub.interface_type,
                    sub.lining,
                    sub.length,
                    sub.coating,
                    sub.unit_weight,
                    sub.total_weight,
                    sub.batch_no,
                    sub.planned_quantity,
                    sub.produced_quantity,
                    sub.shipped_quantity,
                    sub.pulling_quantity,
                    sub.hydrostatic_quantity,
                    sub.lining_quantity,
                    sub.status.as_str(),
                    format_ts(&sub.created_at),
                    format_ts(&sub.updated_at),
                ])?;
            }
        }

        tx.commit()?;
        Ok(order.id.clone())
    }

    /// 软删除订单（不级联子订单与台账）
    ///
    /// # 返回
    /// - Ok(rows): 0 表示订单不存在或已删除
    pub fn soft_delete(&self, order_id: &str, deleted_at: &NaiveDateTime) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE orders SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![format_ts(deleted_at), order_id],
        )?;
        Ok(rows)
    }

    /// 修改订单头（仅限 OrderHeaderPatch 中的字段）
    ///
    /// # 返回
    /// - Ok(rows): 0 表示订单不存在或已删除
    pub fn update_header(
        &self,
        order_id: &str,
        patch: &OrderHeaderPatch,
        updated_at: &NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE orders SET
                customer_name = COALESCE(?1, customer_name),
                delivery_date = COALESCE(?2, delivery_date),
                workshop = COALESCE(?3, workshop),
                warehouse = COALESCE(?4, warehouse),
                remarks = COALESCE(?5, remarks),
                updated_at = ?6
            WHERE id = ?7 AND deleted_at IS NULL
            "#,
            params![
                patch.customer_name,
                patch.delivery_date.map(|d| d.format("%Y-%m-%d").to_string()),
                patch.workshop,
                patch.warehouse,
                patch.remarks,
                format_ts(updated_at),
                order_id,
            ],
        )?;
        Ok(rows)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按ID查询订单（含已软删除）
    pub fn find_by_id(&self, order_id: &str) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLUMNS);
        let order = conn.query_row(&sql, params![order_id], map_order_row).optional()?;
        Ok(order)
    }

    /// 按订单号查询订单（含已软删除）
    pub fn find_by_order_no(&self, order_no: &str) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM orders WHERE order_no = ?1", ORDER_COLUMNS);
        let order = conn.query_row(&sql, params![order_no], map_order_row).optional()?;
        Ok(order)
    }

    /// 查询未删除订单（按创建时间倒序）
    pub fn list_active(&self, limit: i64) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM orders WHERE deleted_at IS NULL \
             ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            ORDER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let orders = stmt
            .query_map(params![limit], map_order_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(orders)
    }

    /// 查询订单下子订单（按创建顺序）
    pub fn list_sub_orders(&self, order_id: &str) -> RepositoryResult<Vec<SubOrder>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM sub_orders WHERE order_id = ?1 ORDER BY seq_no",
            SUB_ORDER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let subs = stmt
            .query_map(params![order_id], map_sub_order_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(subs)
    }

    /// 批量查询未删除订单的子订单（按订单分组）
    pub fn list_active_sub_orders_grouped(&self) -> RepositoryResult<HashMap<String, Vec<SubOrder>>> {
        let conn = self.get_conn()?;
        let columns = SUB_ORDER_COLUMNS
            .split(',')
            .map(|c| format!("s.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM sub_orders s JOIN orders o ON o.id = s.order_id \
             WHERE o.deleted_at IS NULL ORDER BY s.order_id, s.seq_no",
            columns
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], map_sub_order_row)?;

        let mut grouped: HashMap<String, Vec<SubOrder>> = HashMap::new();
        for row in rows {
            let sub = row?;
            grouped.entry(sub.order_id.clone()).or_default().push(sub);
        }
        Ok(grouped)
    }

    /// 按ID查询子订单
    pub fn find_sub_order(&self, sub_order_id: &str) -> RepositoryResult<Option<SubOrder>> {
        let conn = self.get_conn()?;
        load_sub_order(&conn, sub_order_id)
    }

    /// 统计未删除订单数量
    pub fn count_active(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM orders WHERE deleted_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn setup_repo() -> OrderRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        OrderRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn make_order(id: &str, order_no: &str) -> Order {
        let now = Utc::now().naive_utc();
        Order {
            id: id.to_string(),
            order_no: order_no.to_string(),
            customer_name: "华北水务".to_string(),
            delivery_date: NaiveDate::from_ymd_opt(2026, 12, 1),
            workshop: Some("一车间".to_string()),
            warehouse: None,
            remarks: None,
            created_by: Some("tester".to_string()),
            status: OrderStatus::New,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn make_sub(id: &str, order_id: &str, spec: &str, planned: i64) -> SubOrder {
        let now = Utc::now().naive_utc();
        SubOrder {
            id: id.to_string(),
            order_id: order_id.to_string(),
            spec: spec.to_string(),
            level: Some("K9".to_string()),
            interface_type: None,
            lining: None,
            length: Some("6m".to_string()),
            coating: None,
            unit_weight: None,
            total_weight: None,
            batch_no: None,
            planned_quantity: planned,
            produced_quantity: 0,
            shipped_quantity: 0,
            pulling_quantity: 0,
            hydrostatic_quantity: 0,
            lining_quantity: 0,
            status: SubOrderStatus::New,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_insert_and_read_back_preserves_sub_order_order() {
        let repo = setup_repo();
        let order = make_order("O1", "ORD-1");
        let subs = vec![
            make_sub("S2", "O1", "DN300", 5),
            make_sub("S1", "O1", "DN100", 10),
        ];
        repo.insert_with_sub_orders(&order, &subs).unwrap();

        let found = repo.find_by_id("O1").unwrap().unwrap();
        assert_eq!(found.order_no, "ORD-1");
        assert_eq!(found.delivery_date, NaiveDate::from_ymd_opt(2026, 12, 1));

        let loaded = repo.list_sub_orders("O1").unwrap();
        let specs: Vec<&str> = loaded.iter().map(|s| s.spec.as_str()).collect();
        assert_eq!(specs, vec!["DN300", "DN100"]);
    }

    #[test]
    fn test_duplicate_order_no_is_unique_violation() {
        let repo = setup_repo();
        repo.insert_with_sub_orders(&make_order("O1", "ORD-1"), &[make_sub("S1", "O1", "DN100", 1)])
            .unwrap();
        let err = repo
            .insert_with_sub_orders(&make_order("O2", "ORD-1"), &[make_sub("S2", "O2", "DN100", 1)])
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
        // 失败事务不残留子订单
        assert!(repo.find_sub_order("S2").unwrap().is_none());
    }

    #[test]
    fn test_soft_delete_hides_order_but_keeps_sub_orders() {
        let repo = setup_repo();
        repo.insert_with_sub_orders(&make_order("O1", "ORD-1"), &[make_sub("S1", "O1", "DN100", 1)])
            .unwrap();

        let now = Utc::now().naive_utc();
        assert_eq!(repo.soft_delete("O1", &now).unwrap(), 1);
        assert_eq!(repo.soft_delete("O1", &now).unwrap(), 0);

        assert!(repo.list_active(100).unwrap().is_empty());
        assert!(repo.find_by_id("O1").unwrap().unwrap().deleted_at.is_some());
        assert!(repo.find_sub_order("S1").unwrap().is_some());
        assert!(repo.list_active_sub_orders_grouped().unwrap().is_empty());
    }

    #[test]
    fn test_update_header_only_touches_given_fields() {
        let repo = setup_repo();
        repo.insert_with_sub_orders(&make_order("O1", "ORD-1"), &[make_sub("S1", "O1", "DN100", 1)])
            .unwrap();

        let patch = OrderHeaderPatch {
            remarks: Some("加急".to_string()),
            ..Default::default()
        };
        let rows = repo.update_header("O1", &patch, &Utc::now().naive_utc()).unwrap();
        assert_eq!(rows, 1);

        let order = repo.find_by_id("O1").unwrap().unwrap();
        assert_eq!(order.remarks.as_deref(), Some("加急"));
        assert_eq!(order.customer_name, "华北水务");
        assert_eq!(order.workshop.as_deref(), Some("一车间"));
    }
}
