// ==========================================
// 刀具数据库目录 - API层错误类型
// ==========================================
// 职责: 汇总仓储层/引擎层错误,转换为调用方可诊断的错误消息
// 约束: 每个错误携带表名或操作名
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 存储错误
    // ==========================================
    #[error("存储不可用: {path}: {reason}")]
    StorageUnavailable { path: String, reason: String },

    // ==========================================
    // 结构错误
    // ==========================================
    #[error("表结构不匹配 (table={table}): {detail}")]
    SchemaMismatch { table: String, detail: String },

    #[error("缺少关系表: {0}")]
    MissingRelation(String),

    // ==========================================
    // 选择错误（可恢复,调用方应重新选择）
    // ==========================================
    #[error("没有候选行: stage={stage}, value={value}")]
    NoCandidates { stage: String, value: String },

    #[error("选择不唯一: label={label}, material_ids={material_ids:?}")]
    AmbiguousSelection {
        label: String,
        material_ids: Vec<Option<i64>>,
    },

    #[error("无效输入: {0}")]
    InvalidInput(String),

    // ==========================================
    // 写入错误
    // ==========================================
    #[error("写入失败 (operation={operation}), 事务已回滚: {reason}")]
    PersistenceError { operation: String, reason: String },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::StorageUnavailable { path, reason } => {
                ApiError::StorageUnavailable { path, reason }
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::SchemaMismatch { table, detail } => {
                ApiError::SchemaMismatch { table, detail }
            }
            RepositoryError::PersistenceError { operation, reason } => {
                ApiError::PersistenceError { operation, reason }
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::DatabaseError(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::ValidationError(format!("字段{}错误: {}", field, message))
            }
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::MissingRelation { table } => ApiError::MissingRelation(table),
            EngineError::SchemaMismatch { table, detail } => {
                ApiError::SchemaMismatch { table, detail }
            }
            EngineError::NoCandidates { stage, value } => ApiError::NoCandidates { stage, value },
            EngineError::AmbiguousSelection {
                label,
                material_ids,
            } => ApiError::AmbiguousSelection {
                label,
                material_ids,
            },
            EngineError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            EngineError::Repository(err) => ApiError::from(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::StorageUnavailable {
            path: "/tmp/missing.db".to_string(),
            reason: "unable to open database file".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::StorageUnavailable { path, .. } => assert_eq!(path, "/tmp/missing.db"),
            _ => panic!("Expected StorageUnavailable"),
        }

        let api_err: ApiError = RepositoryError::persistence("promote_material", "boom").into();
        match api_err {
            ApiError::PersistenceError { operation, reason } => {
                assert_eq!(operation, "promote_material");
                assert_eq!(reason, "boom");
            }
            _ => panic!("Expected PersistenceError"),
        }
    }

    #[test]
    fn test_engine_error_conversion() {
        let api_err: ApiError = EngineError::MissingRelation {
            table: "Holders".to_string(),
        }
        .into();
        assert!(api_err.to_string().contains("Holders"));

        // 引擎包装的仓储错误展开为原始类别
        let api_err: ApiError =
            EngineError::Repository(RepositoryError::schema_mismatch("Materials", "表不存在"))
                .into();
        match api_err {
            ApiError::SchemaMismatch { table, .. } => assert_eq!(table, "Materials"),
            _ => panic!("Expected SchemaMismatch"),
        }
    }
}
