// ==========================================
// 刀具数据库目录 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 存储错误 =====
    #[error("存储不可用: path={path}: {reason}")]
    StorageUnavailable { path: String, reason: String },

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    // ===== 结构错误 =====
    #[error("表结构不匹配 (table={table}): {detail}")]
    SchemaMismatch { table: String, detail: String },

    // ===== 写入错误 =====
    #[error("写入失败 (operation={operation}), 事务已回滚: {reason}")]
    PersistenceError { operation: String, reason: String },

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    // ===== 数据质量错误 =====
    #[error("字段值错误 (field={field}): {message}")]
    FieldValueError { field: String, message: String },
}

impl RepositoryError {
    pub fn schema_mismatch(table: &str, detail: impl Into<String>) -> Self {
        RepositoryError::SchemaMismatch {
            table: table.to_string(),
            detail: detail.into(),
        }
    }

    /// 将任意错误包装为写入失败（保留底层原因）
    pub fn persistence(operation: &str, cause: impl std::fmt::Display) -> Self {
        RepositoryError::PersistenceError {
            operation: operation.to_string(),
            reason: cause.to_string(),
        }
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_conversion() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err: RepositoryError = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }

    #[test]
    fn test_persistence_error_keeps_cause() {
        let err = RepositoryError::persistence("insert_materials", "disk I/O error");
        let msg = err.to_string();
        assert!(msg.contains("insert_materials"));
        assert!(msg.contains("disk I/O error"));
    }
}
