// ==========================================
// 刀具数据库目录 - 配置层
// ==========================================
// 职责: 库文件路径与会话选项,支持多级覆写
// 存储: 可选 JSON 配置文件 + 环境变量
// ==========================================

pub mod catalog_config;

// 重导出核心配置
pub use catalog_config::{default_db_path, CatalogConfig, ConfigError, ConfigResult};
