// ==========================================
// 管道工厂订单管理系统 - 派工计划仓储
// ==========================================
// 说明: 派工计划完成只是标记,不写台账,不影响子订单进度
// ==========================================

use crate::domain::plan::ProductionPlan;
use crate::domain::types::{PlanStatus, ProcessTag};
use crate::repository::error::{format_ts, parse_ts, ts_column, RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const PLAN_COLUMNS: &str = "id, order_id, sub_order_id, workshop, team, shift, process, quantity, \
     status, assigned_by, remarks, created_at, completed_at";

fn map_plan_row(row: &Row<'_>) -> rusqlite::Result<ProductionPlan> {
    let process_raw: String = row.get(6)?;
    let status_raw: String = row.get(8)?;
    let completed_raw: Option<String> = row.get(12)?;

    Ok(ProductionPlan {
        id: row.get(0)?,
        order_id: row.get(1)?,
        sub_order_id: row.get(2)?,
        workshop: row.get(3)?,
        team: row.get(4)?,
        shift: row.get(5)?,
        process: ProcessTag::parse(&process_raw).unwrap_or_default(),
        quantity: row.get(7)?,
        status: PlanStatus::from_str(&status_raw),
        assigned_by: row.get(9)?,
        remarks: row.get(10)?,
        created_at: ts_column(row.get(11)?, 11)?,
        completed_at: completed_raw.as_deref().and_then(parse_ts),
    })
}

pub struct ProductionPlanRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductionPlanRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入派工计划
    pub fn insert(&self, plan: &ProductionPlan) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO production_plans (
                id, order_id, sub_order_id, workshop, team, shift, process, quantity,
                status, assigned_by, remarks, created_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                plan.id,
                plan.order_id,
                plan.sub_order_id,
                plan.workshop,
                plan.team,
                plan.shift,
                plan.process.as_str(),
                plan.quantity,
                plan.status.as_str(),
                plan.assigned_by,
                plan.remarks,
                format_ts(&plan.created_at),
                plan.completed_at.as_ref().map(format_ts),
            ],
        )?;
        Ok(plan.id.clone())
    }

    pub fn find_by_id(&self, plan_id: &str) -> RepositoryResult<Option<ProductionPlan>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM production_plans WHERE id = ?1", PLAN_COLUMNS);
        let plan = conn.query_row(&sql, params![plan_id], map_plan_row).optional()?;
        Ok(plan)
    }

    /// 待执行计划,可按车间过滤
    pub fn list_pending(&self, workshop: Option<&str>) -> RepositoryResult<Vec<ProductionPlan>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_plans \
             WHERE status = 'pending' AND (?1 IS NULL OR workshop = ?1) \
             ORDER BY created_at, rowid",
            PLAN_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let plans = stmt
            .query_map(params![workshop], map_plan_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plans)
    }

    pub fn list_by_order(&self, order_id: &str) -> RepositoryResult<Vec<ProductionPlan>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_plans WHERE order_id = ?1 ORDER BY created_at, rowid",
            PLAN_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let plans = stmt
            .query_map(params![order_id], map_plan_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plans)
    }

    /// 标记完成
    ///
    /// 仅 pending 状态可转换; 返回受影响行数（0 表示不存在或已完成）
    pub fn mark_completed(&self, plan_id: &str, completed_at: &NaiveDateTime) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE production_plans SET status = 'completed', completed_at = ?1 \
             WHERE id = ?2 AND status = 'pending'",
            params![format_ts(completed_at), plan_id],
        )?;
        Ok(rows)
    }
}
