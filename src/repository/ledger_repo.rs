// ==========================================
// 管道工厂订单管理系统 - 数量台账仓储
// ==========================================
// 红线: 台账只追加,不修改,不删除
// 红线: 台账写入 + 子订单计数器 + 子订单状态 + 订单状态 同一事务提交
// 并发: BEGIN IMMEDIATE 获取写锁; 计数器用 `col = col + ?` 原子累加
// 说明: 状态派生统一调用 engine::progress / engine::rollup,仓储不自行判定
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::ledger::{ProductionMeta, ProductionRecord, ShippingMeta, ShippingRecord};
use crate::domain::order::SubOrder;
use crate::domain::types::{OrderStatus, ProcessTag};
use crate::engine::progress::{ProgressCore, SubOrderCounters};
use crate::engine::rollup::OrderRollup;
use crate::repository::error::{format_ts, ts_column, RepositoryError, RepositoryResult};
use crate::repository::order_repo::{load_sub_order, load_sub_order_statuses};
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// 台账追加/重放后的聚合结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerWriteOutcome {
    pub record_id: Option<String>,
    pub sub_order: SubOrder,
    pub order_status: OrderStatus,
}

/// 按车间 + 工序汇总的生产数量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionTotalRow {
    pub workshop: Option<String>,
    pub process: ProcessTag,
    pub total_quantity: i64,
    pub record_count: i64,
}

/// 按发货仓库汇总的发货数量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingTotalRow {
    pub shipping_warehouse: Option<String>,
    pub total_quantity: i64,
    pub record_count: i64,
}

// ==========================================
// 行映射
// ==========================================

fn map_production_row(row: &Row<'_>) -> rusqlite::Result<ProductionRecord> {
    let process_raw: String = row.get(9)?;
    let process = ProcessTag::parse(&process_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            9,
            rusqlite::types::Type::Text,
            format!("未知工序: {}", process_raw).into(),
        )
    })?;

    Ok(ProductionRecord {
        id: row.get(0)?,
        order_id: row.get(1)?,
        sub_order_id: row.get(2)?,
        team: row.get(3)?,
        shift: row.get(4)?,
        quantity: row.get(5)?,
        workshop: row.get(6)?,
        warehouse: row.get(7)?,
        operator_id: row.get(8)?,
        process,
        remarks: row.get(10)?,
        created_at: ts_column(row.get(11)?, 11)?,
    })
}

fn map_shipping_row(row: &Row<'_>) -> rusqlite::Result<ShippingRecord> {
    Ok(ShippingRecord {
        id: row.get(0)?,
        order_id: row.get(1)?,
        sub_order_id: row.get(2)?,
        quantity: row.get(3)?,
        transport_type: row.get(4)?,
        shipping_type: row.get(5)?,
        shipping_warehouse: row.get(6)?,
        vehicle_info: row.get(7)?,
        shipping_no: row.get(8)?,
        destination: row.get(9)?,
        operator_id: row.get(10)?,
        remarks: row.get(11)?,
        created_at: ts_column(row.get(12)?, 12)?,
    })
}

const PRODUCTION_COLUMNS: &str = "id, order_id, sub_order_id, team, shift, quantity, workshop, \
     warehouse, operator_id, process, remarks, created_at";

const SHIPPING_COLUMNS: &str = "id, order_id, sub_order_id, quantity, transport_type, shipping_type, \
     shipping_warehouse, vehicle_info, shipping_no, destination, operator_id, remarks, created_at";

fn counter_column(process: ProcessTag) -> &'static str {
    match process {
        ProcessTag::Packaging => "produced_quantity",
        ProcessTag::Pulling => "pulling_quantity",
        ProcessTag::Hydrostatic => "hydrostatic_quantity",
        ProcessTag::Lining => "lining_quantity",
    }
}

fn counter_value(counters: &SubOrderCounters, process: ProcessTag) -> i64 {
    match process {
        ProcessTag::Packaging => counters.produced_quantity,
        ProcessTag::Pulling => counters.pulling_quantity,
        ProcessTag::Hydrostatic => counters.hydrostatic_quantity,
        ProcessTag::Lining => counters.lining_quantity,
    }
}

fn list_production_on(conn: &Connection, sub_order_id: &str) -> RepositoryResult<Vec<ProductionRecord>> {
    let sql = format!(
        "SELECT {} FROM production_records WHERE sub_order_id = ?1 ORDER BY created_at, rowid",
        PRODUCTION_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map(params![sub_order_id], map_production_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

fn list_shipping_on(conn: &Connection, sub_order_id: &str) -> RepositoryResult<Vec<ShippingRecord>> {
    let sql = format!(
        "SELECT {} FROM shipping_records WHERE sub_order_id = ?1 ORDER BY created_at, rowid",
        SHIPPING_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map(params![sub_order_id], map_shipping_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

// ==========================================
// LedgerRepository - 数量台账仓储
// ==========================================
pub struct LedgerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LedgerRepository {
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

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 事务内步骤
    // ==========================================

    fn require_sub_order(tx: &Transaction<'_>, sub_order_id: &str) -> RepositoryResult<SubOrder> {
        load_sub_order(tx, sub_order_id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "SubOrder".to_string(),
            id: sub_order_id.to_string(),
        })
    }

    /// 写入派生状态并刷新订单状态
    fn write_derived_statuses(
        tx: &Transaction<'_>,
        sub_order: &mut SubOrder,
        now: &NaiveDateTime,
    ) -> RepositoryResult<OrderStatus> {
        let counters = SubOrderCounters::of(sub_order);
        let status = ProgressCore::derive_status(sub_order.planned_quantity, &counters);

        tx.execute(
            "UPDATE sub_orders SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), format_ts(now), sub_order.id],
        )?;
        sub_order.status = status;
        sub_order.updated_at = *now;

        let statuses = load_sub_order_statuses(tx, &sub_order.order_id)?;
        let order_status = OrderRollup::rollup(statuses);
        tx.execute(
            "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![order_status.as_str(), format_ts(now), sub_order.order_id],
        )?;

        Ok(order_status)
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 追加生产记录
    ///
    /// # 参数
    /// - sub_order_id: 子订单ID
    /// - quantity: 数量（调用方已校验 > 0）
    /// - process: 工序
    /// - meta: 班组/班次/车间等附加信息
    /// - enforce_cap: 是否拒绝超出计划数量的累计
    ///
    /// # 返回
    /// - Ok(LedgerWriteOutcome): 新记录ID + 更新后的子订单 + 订单状态
    /// - Err(NotFound): 子订单不存在（无任何写入）
    /// - Err(QuantityCapExceeded): 开启上限时超出计划（整体回滚）
    /// - Err(ValidationError): 累计超出 i64 范围（无任何写入）
    pub fn append_production(
        &self,
        sub_order_id: &str,
        quantity: i64,
        process: ProcessTag,
        meta: &ProductionMeta,
        enforce_cap: bool,
    ) -> RepositoryResult<LedgerWriteOutcome> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = Utc::now().naive_utc();

        let existing = Self::require_sub_order(&tx, sub_order_id)?;
        // 溢出在写入前拒绝,保证增量累计与台账重放一致
        SubOrderCounters::of(&existing).apply_production(process, quantity)?;
        let record_id = uuid::Uuid::new_v4().to_string();

        tx.execute(
            r#"
            INSERT INTO production_records (
                id, order_id, sub_order_id, team, shift, quantity, workshop,
                warehouse, operator_id, process, remarks, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                record_id,
                existing.order_id,
                sub_order_id,
                meta.team,
                meta.shift,
                quantity,
                meta.workshop,
                meta.warehouse,
                meta.operator_id,
                process.as_str(),
                meta.remarks,
                format_ts(&now),
            ],
        )?;

        let column = counter_column(process);
        let sql = format!(
            "UPDATE sub_orders SET {col} = {col} + ?1, updated_at = ?2 WHERE id = ?3",
            col = column
        );
        tx.execute(&sql, params![quantity, format_ts(&now), sub_order_id])?;

        let mut sub_order = Self::require_sub_order(&tx, sub_order_id)?;
        let resulting = counter_value(&SubOrderCounters::of(&sub_order), process);
        if enforce_cap && resulting > sub_order.planned_quantity {
            // tx 未提交,drop 时自动回滚
            return Err(RepositoryError::QuantityCapExceeded {
                sub_order_id: sub_order_id.to_string(),
                planned: sub_order.planned_quantity,
                resulting,
            });
        }

        let order_status = Self::write_derived_statuses(&tx, &mut sub_order, &now)?;
        tx.commit()?;

        info!(
            record_id = %record_id,
            sub_order_id = %sub_order_id,
            process = %process,
            quantity,
            status = %sub_order.status,
            "生产记录已追加"
        );

        Ok(LedgerWriteOutcome {
            record_id: Some(record_id),
            sub_order,
            order_status,
        })
    }

    /// 追加发货记录
    ///
    /// 事务语义同 append_production
    pub fn append_shipping(
        &self,
        sub_order_id: &str,
        quantity: i64,
        meta: &ShippingMeta,
        enforce_cap: bool,
    ) -> RepositoryResult<LedgerWriteOutcome> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = Utc::now().naive_utc();

        let existing = Self::require_sub_order(&tx, sub_order_id)?;
        SubOrderCounters::of(&existing).apply_shipping(quantity)?;
        let record_id = uuid::Uuid::new_v4().to_string();

        tx.execute(
            r#"
            INSERT INTO shipping_records (
                id, order_id, sub_order_id, quantity, transport_type, shipping_type,
                shipping_warehouse, vehicle_info, shipping_no, destination,
                operator_id, remarks, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                record_id,
                existing.order_id,
                sub_order_id,
                quantity,
                meta.transport_type,
                meta.shipping_type,
                meta.shipping_warehouse,
                meta.vehicle_info,
                meta.shipping_no,
                meta.destination,
                meta.operator_id,
                meta.remarks,
                format_ts(&now),
            ],
        )?;

        tx.execute(
            "UPDATE sub_orders SET shipped_quantity = shipped_quantity + ?1, updated_at = ?2 WHERE id = ?3",
            params![quantity, format_ts(&now), sub_order_id],
        )?;

        let mut sub_order = Self::require_sub_order(&tx, sub_order_id)?;
        if enforce_cap && sub_order.shipped_quantity > sub_order.planned_quantity {
            return Err(RepositoryError::QuantityCapExceeded {
                sub_order_id: sub_order_id.to_string(),
                planned: sub_order.planned_quantity,
                resulting: sub_order.shipped_quantity,
            });
        }

        let order_status = Self::write_derived_statuses(&tx, &mut sub_order, &now)?;
        tx.commit()?;

        info!(
            record_id = %record_id,
            sub_order_id = %sub_order_id,
            quantity,
            status = %sub_order.status,
            "发货记录已追加"
        );

        Ok(LedgerWriteOutcome {
            record_id: Some(record_id),
            sub_order,
            order_status,
        })
    }

    /// 从完整台账重放子订单计数器与状态
    ///
    /// 无新事件时重复调用结果一致
    pub fn recompute_from_ledger(&self, sub_order_id: &str) -> RepositoryResult<LedgerWriteOutcome> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = Utc::now().naive_utc();

        let mut sub_order = Self::require_sub_order(&tx, sub_order_id)?;
        let production = list_production_on(&tx, sub_order_id)?;
        let shipping = list_shipping_on(&tx, sub_order_id)?;
        let counters = ProgressCore::replay(&production, &shipping)?;

        if counters != SubOrderCounters::of(&sub_order) {
            tracing::warn!(
                sub_order_id = %sub_order_id,
                stored = ?SubOrderCounters::of(&sub_order),
                replayed = ?counters,
                "子订单计数器与台账不一致,以台账为准"
            );
        }

        tx.execute(
            r#"
            UPDATE sub_orders SET
                produced_quantity = ?1,
                shipped_quantity = ?2,
                pulling_quantity = ?3,
                hydrostatic_quantity = ?4,
                lining_quantity = ?5
            WHERE id = ?6
            "#,
            params![
                counters.produced_quantity,
                counters.shipped_quantity,
                counters.pulling_quantity,
                counters.hydrostatic_quantity,
                counters.lining_quantity,
                sub_order_id,
            ],
        )?;
        sub_order.produced_quantity = counters.produced_quantity;
        sub_order.shipped_quantity = counters.shipped_quantity;
        sub_order.pulling_quantity = counters.pulling_quantity;
        sub_order.hydrostatic_quantity = counters.hydrostatic_quantity;
        sub_order.lining_quantity = counters.lining_quantity;

        let order_status = Self::write_derived_statuses(&tx, &mut sub_order, &now)?;
        tx.commit()?;

        debug!(sub_order_id = %sub_order_id, status = %sub_order.status, "台账重放完成");

        Ok(LedgerWriteOutcome {
            record_id: None,
            sub_order,
            order_status,
        })
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 查询子订单的生产记录（按时间正序）
    pub fn list_production_records(&self, sub_order_id: &str) -> RepositoryResult<Vec<ProductionRecord>> {
        let conn = self.get_conn()?;
        list_production_on(&conn, sub_order_id)
    }

    /// 查询子订单的发货记录（按时间正序）
    pub fn list_shipping_records(&self, sub_order_id: &str) -> RepositoryResult<Vec<ShippingRecord>> {
        let conn = self.get_conn()?;
        list_shipping_on(&conn, sub_order_id)
    }

    /// 按车间 + 工序汇总生产数量
    ///
    /// 时间范围为闭区间的 created_at 文本比较,None 表示不限
    pub fn production_totals(
        &self,
        from: Option<&NaiveDateTime>,
        to: Option<&NaiveDateTime>,
    ) -> RepositoryResult<Vec<ProductionTotalRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT workshop, process, SUM(quantity), COUNT(*)
            FROM production_records
            WHERE (?1 IS NULL OR created_at >= ?1)
              AND (?2 IS NULL OR created_at <= ?2)
            GROUP BY workshop, process
            ORDER BY workshop, process
            "#,
        )?;

        let rows = stmt.query_map(
            params![from.map(format_ts), to.map(format_ts)],
            |row| {
                let process_raw: String = row.get(1)?;
                Ok((row.get::<_, Option<String>>(0)?, process_raw, row.get(2)?, row.get(3)?))
            },
        )?;

        let mut totals = Vec::new();
        for row in rows {
            let (workshop, process_raw, total_quantity, record_count) = row?;
            let process = ProcessTag::parse(&process_raw).ok_or_else(|| RepositoryError::FieldValueError {
                field: "production_records.process".to_string(),
                message: process_raw.clone(),
            })?;
            totals.push(ProductionTotalRow {
                workshop,
                process,
                total_quantity,
                record_count,
            });
        }
        Ok(totals)
    }

    /// 按发货仓库汇总发货数量
    pub fn shipping_totals(
        &self,
        from: Option<&NaiveDateTime>,
        to: Option<&NaiveDateTime>,
    ) -> RepositoryResult<Vec<ShippingTotalRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT shipping_warehouse, SUM(quantity), COUNT(*)
            FROM shipping_records
            WHERE (?1 IS NULL OR created_at >= ?1)
              AND (?2 IS NULL OR created_at <= ?2)
            GROUP BY shipping_warehouse
            ORDER BY shipping_warehouse
            "#,
        )?;

        let totals = stmt
            .query_map(params![from.map(format_ts), to.map(format_ts)], |row| {
                Ok(ShippingTotalRow {
                    shipping_warehouse: row.get(0)?,
                    total_quantity: row.get(1)?,
                    record_count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(totals)
    }
}
