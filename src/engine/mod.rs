// ==========================================
// 刀具数据库目录 - 引擎层
// ==========================================
// 职责: 目录视图重建、层级选择、材料提升
// 红线: Engine 不拼 SQL; 视图只读,每次请求重建
// ==========================================

pub mod catalog_views;
pub mod coercion;
pub mod error;
pub mod join;
pub mod promotion;
pub mod selector;

// 重导出核心引擎
pub use catalog_views::{
    build_material_catalog, build_tool_catalog, material_catalog_plan, project,
    tool_catalog_plan, tool_summary_columns, KeyMapping, TOOL_TECHNOLOGY_LINK,
};
pub use coercion::coerce_columns;
pub use error::{EngineError, EngineResult};
pub use join::{left_outer_join, JoinPlan, JoinStep};
pub use promotion::{candidate_from_row, MaterialPromotionEngine, PromotionPath};
pub use selector::{HierarchicalSelector, MaterialOption, Selection, SelectionStage};
