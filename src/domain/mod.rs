// ==========================================
// 刀具数据库目录 - 领域模型层
// ==========================================
// 职责: 定义表快照、扁平视图、材料实体与类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod decode;
pub mod material;
pub mod table;
pub mod types;

// 重导出核心类型
pub use decode::decode_integer;
pub use material::{
    MachiningFactors, NewMaterial, PromotionCandidate, PromotionOutcome, ToolMaterial,
    NEUTRAL_FACTOR, PARENT_CLASS_COMMENT, PLACEHOLDER_GUID,
};
pub use table::{CatalogRow, Column, ColumnRef, FlattenedView, Schema, Table, TableSet};
pub use types::{Decoded, JoinKey, MaterialType, Value};
