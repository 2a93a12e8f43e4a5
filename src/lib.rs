// ==========================================
// 刀具数据库目录 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 刀具/材料目录浏览与材料提升
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 视图重建、选择、提升
pub mod engine;

// 导出层 - CSV
pub mod exporter;

// 配置层 - 运行配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 会话装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    CatalogRow, ColumnRef, Decoded, FlattenedView, MaterialType, PromotionCandidate,
    PromotionOutcome, Table, TableSet, Value,
};

// 引擎
pub use engine::{
    HierarchicalSelector, JoinPlan, JoinStep, MaterialPromotionEngine, Selection, SelectionStage,
};

// API
pub use api::{ApiError, ApiResult, CatalogApi, CatalogSource};

// 应用
pub use app::CatalogSession;
pub use config::CatalogConfig;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "刀具数据库目录";
