// ==========================================
// 刀具数据库目录 - 导出模块
// ==========================================
// 职责: 将目录视图 / 原始表导出为 CSV
// ==========================================

pub mod csv_exporter;
pub mod error;

pub use csv_exporter::{export_view, write_view};
pub use error::{ExportError, ExportResult};
