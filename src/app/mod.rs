// ==========================================
// 刀具数据库目录 - 应用层
// ==========================================
// 职责: 会话装配,连接 CLI 与 API
// ==========================================

pub mod state;

// 重导出
pub use state::CatalogSession;
