// ==========================================
// 管道工厂订单管理系统 - 订单导入 Trait
// ==========================================
// 职责: 定义订单导入各阶段接口（不包含实现）
// 流程: 文件解析 → 字段映射 → 按订单号分组 → 逐单创建
// ==========================================

use crate::importer::error::ImportResult;
use crate::importer::field_mapper::ImportedOrderRow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 单行/单订单失败明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportFailure {
    /// 行号（从 1 开始,不含表头）
    pub rows: Vec<usize>,
    pub order_no: Option<String>,
    pub message: String,
}

/// 单个文件的导入汇总
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderImportSummary {
    pub file: String,
    pub total_rows: usize,
    /// 创建成功的订单ID（按文件中首次出现顺序）
    pub created_order_ids: Vec<String>,
    pub failures: Vec<ImportFailure>,
}

impl OrderImportSummary {
    pub fn created_count(&self) -> usize {
        self.created_order_ids.len()
    }
}

// ==========================================
// OrderImporter Trait
// ==========================================
// 实现者: OrderImporterImpl
#[async_trait]
pub trait OrderImporter: Send + Sync {
    /// 导入单个文件（.csv/.xlsx/.xls）
    ///
    /// # 返回
    /// - Ok(summary): 文件可读; 行级/订单级失败记录在 summary.failures
    /// - Err: 文件不存在、格式不支持、超出行数上限
    async fn import_file(&self, file_path: &Path) -> ImportResult<OrderImportSummary>;

    /// 批量导入多个文件（并发执行）
    ///
    /// 某个文件失败不影响其他文件
    async fn batch_import(&self, file_paths: Vec<PathBuf>) -> Vec<Result<OrderImportSummary, String>>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行记录（HashMap<列名, 值>）,跳过全空行
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<HashMap<String, String>>>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 实现者: OrderRowMapper
pub trait FieldMapper: Send + Sync {
    /// 将原始行记录映射为订单导入行
    fn map_to_order_row(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> ImportResult<ImportedOrderRow>;
}
