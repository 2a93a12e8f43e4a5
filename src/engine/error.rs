// ==========================================
// 刀具数据库目录 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("缺少关系表: {table}")]
    MissingRelation { table: String },

    #[error("表结构不匹配 (table={table}): {detail}")]
    SchemaMismatch { table: String, detail: String },

    #[error("没有候选行: stage={stage}, value={value}")]
    NoCandidates { stage: String, value: String },

    #[error("选择不唯一: label={label}, material_ids={material_ids:?}")]
    AmbiguousSelection {
        label: String,
        material_ids: Vec<Option<i64>>,
    },

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl EngineError {
    pub fn schema_mismatch(table: &str, detail: impl Into<String>) -> Self {
        EngineError::SchemaMismatch {
            table: table.to_string(),
            detail: detail.into(),
        }
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
