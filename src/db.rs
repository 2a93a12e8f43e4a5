// ==========================================
// 刀具数据库目录 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有连接的 PRAGMA 行为
// - 只打开已存在的库文件,绝不隐式新建空库
// ==========================================

use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::path::Path;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开已存在的 SQLite 文件并应用统一配置
///
/// 文件不存在时返回错误（不创建）
pub fn open_sqlite_connection<P: AsRef<Path>>(db_path: P) -> rusqlite::Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(db_path, flags)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 表是否存在
pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 LIMIT 1",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// 声明列信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredColumn {
    pub name: String,
    pub decl_type: String,
}

impl DeclaredColumn {
    /// SQLite 类型亲和性规则: 声明类型含 "INT" 即为整数亲和
    pub fn has_integer_affinity(&self) -> bool {
        self.decl_type.to_ascii_uppercase().contains("INT")
    }
}

/// 读取表的声明列（按 schema 声明顺序）
pub fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<DeclaredColumn>> {
    let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
    let columns = stmt
        .query_map([table], |row| {
            Ok(DeclaredColumn {
                name: row.get(0)?,
                decl_type: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

/// 双引号转义标识符
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        assert!(open_sqlite_connection(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_table_introspection() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE Holders (id INTEGER PRIMARY KEY, name TEXT, weight)")
            .unwrap();

        assert!(table_exists(&conn, "Holders").unwrap());
        assert!(!table_exists(&conn, "Tools").unwrap());

        let columns = table_columns(&conn, "Holders").unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "weight"]);
        assert!(columns[0].has_integer_affinity());
        assert!(!columns[1].has_integer_affinity());
        assert_eq!(columns[2].decl_type, "");
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("Tools"), "\"Tools\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
