// ==========================================
// 管道工厂订单管理系统 - 基础资料仓储
// ==========================================
// 语义: 每个类别内值唯一,按首次插入顺序返回
// 写入: INSERT OR IGNORE,重复写入是无操作
// ==========================================

use crate::domain::master_data::MasterDataEntry;
use crate::domain::types::MasterDataCategory;
use crate::repository::error::{format_ts, ts_column, RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::sync::{Arc, Mutex};

pub struct MasterDataRepository {
    conn: Arc<Mutex<Connection>>,
}

fn map_entry_row(row: &Row<'_>) -> rusqlite::Result<MasterDataEntry> {
    let category_raw: String = row.get(0)?;
    let category = MasterDataCategory::parse(&category_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("未知基础资料类别: {}", category_raw).into(),
        )
    })?;
    Ok(MasterDataEntry {
        category,
        value: row.get(1)?,
        seq: row.get(2)?,
        created_at: ts_column(row.get(3)?, 3)?,
    })
}

/// 单条插入（事务内调用）
///
/// 返回是否真正新增
fn insert_if_absent(
    tx: &Transaction<'_>,
    category: MasterDataCategory,
    value: &str,
    created_at: &str,
) -> RepositoryResult<bool> {
    let rows = tx.execute(
        r#"
        INSERT OR IGNORE INTO master_data (category, value, seq, created_at)
        VALUES (
            ?1, ?2,
            (SELECT COALESCE(MAX(seq), 0) + 1 FROM master_data WHERE category = ?1),
            ?3
        )
        "#,
        params![category.as_str(), value, created_at],
    )?;
    Ok(rows > 0)
}

impl MasterDataRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 若不存在则追加
    ///
    /// # 返回
    /// - Ok(true): 新增
    /// - Ok(false): 已存在（无操作）
    pub fn add_if_absent(&self, category: MasterDataCategory, value: &str) -> RepositoryResult<bool> {
        self.add_many_if_absent(&[(category, value.to_string())])
            .map(|added| added > 0)
    }

    /// 批量追加（单事务）
    ///
    /// 返回新增条数
    pub fn add_many_if_absent(&self, entries: &[(MasterDataCategory, String)]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = format_ts(&Utc::now().naive_utc());

        let mut added = 0;
        for (category, value) in entries {
            if insert_if_absent(&tx, *category, value, &now)? {
                added += 1;
            }
        }
        tx.commit()?;
        Ok(added)
    }

    /// 按类别列出,保持插入顺序
    pub fn list_by_category(&self, category: MasterDataCategory) -> RepositoryResult<Vec<MasterDataEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT category, value, seq, created_at FROM master_data WHERE category = ?1 ORDER BY seq",
        )?;
        let entries = stmt
            .query_map(params![category.as_str()], map_entry_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// 列出全部类别
    pub fn list_all(&self) -> RepositoryResult<Vec<MasterDataEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT category, value, seq, created_at FROM master_data ORDER BY category, seq",
        )?;
        let entries = stmt
            .query_map([], map_entry_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> MasterDataRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        MasterDataRepository::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_add_is_idempotent_and_keeps_insertion_order() {
        let repo = setup();
        assert!(repo.add_if_absent(MasterDataCategory::Spec, "DN200").unwrap());
        assert!(repo.add_if_absent(MasterDataCategory::Spec, "DN100").unwrap());
        assert!(!repo.add_if_absent(MasterDataCategory::Spec, "DN200").unwrap());

        let values: Vec<String> = repo
            .list_by_category(MasterDataCategory::Spec)
            .unwrap()
            .into_iter()
            .map(|e| e.value)
            .collect();
        assert_eq!(values, vec!["DN200".to_string(), "DN100".to_string()]);
    }

    #[test]
    fn test_categories_are_independent() {
        let repo = setup();
        let added = repo
            .add_many_if_absent(&[
                (MasterDataCategory::Spec, "X".to_string()),
                (MasterDataCategory::Level, "X".to_string()),
                (MasterDataCategory::Level, "X".to_string()),
            ])
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(repo.list_by_category(MasterDataCategory::Level).unwrap().len(), 1);
        assert!(repo.list_by_category(MasterDataCategory::Team).unwrap().is_empty());
        assert_eq!(repo.list_all().unwrap().len(), 2);
    }
}
