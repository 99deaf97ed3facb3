// ==========================================
// 管道工厂订单管理系统 - 导入层
// ==========================================
// 职责: 从 Excel/CSV 订单表批量创建订单
// 约定: 一行一个子订单,按订单号归组为订单
// ==========================================

pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod order_importer;
pub mod order_importer_trait;

pub use error::{ImportError, ImportResult};
pub use field_mapper::{ImportedOrderRow, OrderRowMapper};
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use order_importer::OrderImporterImpl;
pub use order_importer_trait::{
    FieldMapper, FileParser, ImportFailure, OrderImportSummary, OrderImporter,
};
