// ==========================================
// 管道工厂订单管理系统 - 订单行字段映射器
// ==========================================
// 职责: 源列名（中/英别名）→ 订单导入行 + 类型转换
// 约定: 一行 = 一个子订单; 订单头字段取同一订单号的首行
// ==========================================

use crate::domain::order::NewSubOrder;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::order_importer_trait::FieldMapper;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 订单导入行（订单头字段 + 一个子订单）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportedOrderRow {
    pub row_number: usize,
    pub order_no: String,
    pub customer_name: String,
    pub delivery_date: Option<NaiveDate>,
    pub workshop: Option<String>,
    pub warehouse: Option<String>,
    pub remarks: Option<String>,
    pub sub_order: NewSubOrder,
}

// 标准字段 → 可接受的列名
const ORDER_NO: &[&str] = &["订单号", "订单编号", "order_no", "orderNo"];
const CUSTOMER: &[&str] = &["客户", "客户名称", "customer", "customer_name"];
const DELIVERY_DATE: &[&str] = &["交货日期", "交货期", "交期", "delivery_date"];
const WORKSHOP: &[&str] = &["车间", "生产车间", "workshop"];
const WAREHOUSE: &[&str] = &["仓库", "入库仓库", "warehouse"];
const REMARKS: &[&str] = &["备注", "remarks"];
const SPEC: &[&str] = &["规格", "spec"];
const LEVEL: &[&str] = &["压力等级", "等级", "级别", "level"];
const INTERFACE_TYPE: &[&str] = &["接口形式", "接口类型", "interface_type"];
const LINING: &[&str] = &["内衬", "lining"];
const LENGTH: &[&str] = &["长度", "length"];
const COATING: &[&str] = &["外防腐", "涂层", "coating"];
const PLANNED_QUANTITY: &[&str] = &["数量", "计划数量", "planned_quantity", "quantity"];
const UNIT_WEIGHT: &[&str] = &["单重", "unit_weight"];
const TOTAL_WEIGHT: &[&str] = &["总重", "total_weight"];
const BATCH_NO: &[&str] = &["批号", "批次号", "batch_no"];

pub struct OrderRowMapper;

impl FieldMapper for OrderRowMapper {
    fn map_to_order_row(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> ImportResult<ImportedOrderRow> {
        let order_no = required(row, ORDER_NO, row_number)?;
        let customer_name = required(row, CUSTOMER, row_number)?;
        let spec = required(row, SPEC, row_number)?;

        let planned_quantity = parse_quantity(row, PLANNED_QUANTITY, row_number)?.ok_or_else(|| {
            ImportError::FieldMappingError {
                row: row_number,
                message: format!("缺少必填字段: {}", PLANNED_QUANTITY[0]),
            }
        })?;

        Ok(ImportedOrderRow {
            row_number,
            order_no,
            customer_name,
            delivery_date: parse_date(row, DELIVERY_DATE, row_number)?,
            workshop: get_string(row, WORKSHOP),
            warehouse: get_string(row, WAREHOUSE),
            remarks: get_string(row, REMARKS),
            sub_order: NewSubOrder {
                spec,
                level: get_string(row, LEVEL),
                interface_type: get_string(row, INTERFACE_TYPE),
                lining: get_string(row, LINING),
                length: get_string(row, LENGTH),
                coating: get_string(row, COATING),
                planned_quantity,
                unit_weight: parse_f64(row, UNIT_WEIGHT, row_number)?,
                total_weight: parse_f64(row, TOTAL_WEIGHT, row_number)?,
                batch_no: get_string(row, BATCH_NO),
            },
        })
    }
}

/// 行记录中的订单号（映射失败时用于归组）
pub fn order_no_of(row: &HashMap<String, String>) -> Option<String> {
    get_string(row, ORDER_NO)
}

/// 按别名顺序取第一个非空值
fn get_string(row: &HashMap<String, String>, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| {
        row.get(*alias)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}

fn required(row: &HashMap<String, String>, aliases: &[&str], row_number: usize) -> ImportResult<String> {
    get_string(row, aliases).ok_or_else(|| ImportError::FieldMappingError {
        row: row_number,
        message: format!("缺少必填字段: {}", aliases[0]),
    })
}

fn parse_f64(
    row: &HashMap<String, String>,
    aliases: &[&str],
    row_number: usize,
) -> ImportResult<Option<f64>> {
    match get_string(row, aliases) {
        None => Ok(None),
        Some(value) => value
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ImportError::TypeConversionError {
                row: row_number,
                field: aliases[0].to_string(),
                message: format!("无法解析为数字: {}", value),
            }),
    }
}

/// 数量: 接受整数及小数部分为 0 的数字（Excel 数值单元格可能带 ".0"）
fn parse_quantity(
    row: &HashMap<String, String>,
    aliases: &[&str],
    row_number: usize,
) -> ImportResult<Option<i64>> {
    let Some(value) = get_string(row, aliases) else {
        return Ok(None);
    };
    if let Ok(n) = value.parse::<i64>() {
        return Ok(Some(n));
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Ok(Some(f as i64)),
        _ => Err(ImportError::TypeConversionError {
            row: row_number,
            field: aliases[0].to_string(),
            message: format!("无法解析为整数: {}", value),
        }),
    }
}

/// 日期: YYYY-MM-DD / YYYY/MM/DD / YYYYMMDD / Excel 日期序列号
fn parse_date(
    row: &HashMap<String, String>,
    aliases: &[&str],
    row_number: usize,
) -> ImportResult<Option<NaiveDate>> {
    let Some(value) = get_string(row, aliases) else {
        return Ok(None);
    };
    // 只取日期部分（"2026-03-01 00:00:00"）
    let date_part = value.split_whitespace().next().unwrap_or(&value);

    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, fmt) {
            return Ok(Some(date));
        }
    }
    if let Some(date) = excel_serial_date(date_part) {
        return Ok(Some(date));
    }

    Err(ImportError::DateFormatError {
        row: row_number,
        field: aliases[0].to_string(),
        value,
    })
}

fn excel_serial_date(raw: &str) -> Option<NaiveDate> {
    let serial = raw.parse::<f64>().ok()?;
    // 1955-01-01 ~ 2173-10-14
    if !(20_000.0..=100_000.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}
