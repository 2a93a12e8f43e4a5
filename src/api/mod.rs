// ==========================================
// 刀具数据库目录 - API 层
// ==========================================
// 职责: 提供目录 API 接口,供 CLI / UI 调用
// ==========================================

pub mod catalog_api;
pub mod error;

// 重导出核心类型
pub use catalog_api::{CatalogApi, CatalogSource, BROWSABLE_TOOL_TABLES};
pub use error::{ApiError, ApiResult};
