// ==========================================
// 刀具数据库目录 - 存储句柄
// ==========================================
// 职责: 统一“每次操作打开/关闭”与“会话级缓存连接”两种连接方式
// 约束: 缓存连接由会话显式持有,不使用进程级全局状态
// 约束: 核心逻辑不做任何写者互斥,单写者纪律由缓存持有者保证
// ==========================================

use crate::db::open_sqlite_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// 存储句柄
#[derive(Debug, Clone)]
pub enum StoreHandle {
    /// 每次逻辑操作打开文件,操作结束立即关闭
    PerOperation(PathBuf),
    /// 会话级缓存连接（会话结束时随最后一个引用释放而关闭）
    Cached {
        path: PathBuf,
        conn: Arc<Mutex<Connection>>,
    },
}

impl StoreHandle {
    pub fn per_operation<P: AsRef<Path>>(path: P) -> Self {
        StoreHandle::PerOperation(path.as_ref().to_path_buf())
    }

    /// 打开并缓存连接
    pub fn open_cached<P: AsRef<Path>>(path: P) -> RepositoryResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = open_store(&path)?;
        Ok(StoreHandle::Cached {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建缓存句柄（测试/内存库）
    pub fn from_connection(label: &str, conn: Connection) -> Self {
        StoreHandle::Cached {
            path: PathBuf::from(label),
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            StoreHandle::PerOperation(path) => path,
            StoreHandle::Cached { path, .. } => path,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, StoreHandle::Cached { .. })
    }

    /// 在一个连接上执行一次逻辑操作
    pub fn with_connection<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        F: FnOnce(&Connection) -> RepositoryResult<T>,
    {
        match self {
            StoreHandle::PerOperation(path) => {
                let conn = open_store(path)?;
                let result = f(&conn);
                drop(conn);
                debug!(path = %path.display(), "连接已关闭");
                result
            }
            StoreHandle::Cached { conn, .. } => {
                let guard = conn
                    .lock()
                    .map_err(|e| RepositoryError::LockError(e.to_string()))?;
                f(&guard)
            }
        }
    }
}

/// 打开存储文件（失败统一映射为 StorageUnavailable）
fn open_store(path: &Path) -> RepositoryResult<Connection> {
    let unavailable = |e: rusqlite::Error| RepositoryError::StorageUnavailable {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    let conn = open_sqlite_connection(path).map_err(unavailable)?;
    // 非 SQLite 文件在首次读取时才报错,这里提前探测
    conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))
        .map_err(unavailable)?;
    debug!(path = %path.display(), "连接已打开");
    Ok(conn)
}
