// ==========================================
// 刀具数据库目录 - 表快照仓储
// ==========================================
// 职责: 整表读取为带类型的快照（列顺序 = schema 声明顺序）
// 红线: 纯读取,无副作用
// 约束: 整数亲和列中以 TEXT/BLOB 存储的值经解码步骤转换,解码永不越过本层报错
// ==========================================

use crate::db::{quote_identifier, table_columns, table_exists, DeclaredColumn};
use crate::domain::decode::decode_integer;
use crate::domain::table::{Table, TableSet};
use crate::domain::types::{Decoded, Value};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::store::StoreHandle;
use rusqlite::Connection;
use tracing::{debug, warn};

// ==========================================
// SnapshotRepository - 表快照仓储
// ==========================================
pub struct SnapshotRepository {
    store: StoreHandle,
}

impl SnapshotRepository {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// 读取整表
    ///
    /// # 返回
    /// - Err(StorageUnavailable): 库文件无法打开
    /// - Err(SchemaMismatch): 表不存在
    pub fn read_table(&self, table: &str) -> RepositoryResult<Table> {
        self.store.with_connection(|conn| load_table(conn, table))
    }

    /// 读取指定列（任一列缺失即 SchemaMismatch）
    pub fn read_columns(&self, table: &str, columns: &[&str]) -> RepositoryResult<Table> {
        self.store.with_connection(|conn| {
            let declared = declared_columns(conn, table)?;
            let mut selected = Vec::with_capacity(columns.len());
            for name in columns {
                match declared.iter().find(|c| c.name == *name) {
                    Some(column) => selected.push(column.clone()),
                    None => {
                        return Err(RepositoryError::schema_mismatch(
                            table,
                            format!("缺少列 {}", name),
                        ))
                    }
                }
            }
            load_rows(conn, table, &selected)
        })
    }

    /// 在同一连接内读取多张表
    pub fn read_tables(&self, tables: &[&str]) -> RepositoryResult<TableSet> {
        self.store.with_connection(|conn| {
            let mut set = TableSet::new();
            for table in tables {
                set.insert(load_table(conn, table)?);
            }
            Ok(set)
        })
    }

    /// 在同一连接内读取多张表,跳过不存在的表
    ///
    /// 缺表由调用方（连接计划）报告为 MissingRelation
    pub fn read_available(&self, tables: &[&str]) -> RepositoryResult<TableSet> {
        self.store.with_connection(|conn| {
            let mut set = TableSet::new();
            for table in tables {
                if table_exists(conn, table)? {
                    set.insert(load_table(conn, table)?);
                } else {
                    debug!(table, "表不存在,跳过");
                }
            }
            Ok(set)
        })
    }

    /// 列出库中的全部用户表
    pub fn list_tables(&self) -> RepositoryResult<Vec<String>> {
        self.store.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(names)
        })
    }
}

fn declared_columns(conn: &Connection, table: &str) -> RepositoryResult<Vec<DeclaredColumn>> {
    if !table_exists(conn, table)? {
        return Err(RepositoryError::schema_mismatch(table, "表不存在"));
    }
    Ok(table_columns(conn, table)?)
}

/// 读取整表快照
pub(crate) fn load_table(conn: &Connection, table: &str) -> RepositoryResult<Table> {
    let declared = declared_columns(conn, table)?;
    load_rows(conn, table, &declared)
}

fn load_rows(
    conn: &Connection,
    table: &str,
    columns: &[DeclaredColumn],
) -> RepositoryResult<Table> {
    let column_list = columns
        .iter()
        .map(|c| quote_identifier(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("SELECT {} FROM {}", column_list, quote_identifier(table));

    let integer_like: Vec<bool> = columns.iter().map(is_integer_like).collect();

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    let mut data = Vec::new();
    let mut fallback_count = 0usize;

    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for (idx, integer_column) in integer_like.iter().enumerate() {
            let raw = Value::from(row.get_ref(idx)?);
            let value = if *integer_column {
                coerce_ambiguous(raw, &mut fallback_count)
            } else {
                raw
            };
            values.push(value);
        }
        data.push(values);
    }

    if fallback_count > 0 {
        warn!(table, fallback_count, "整数列存在无法解码的值,已保留为文本");
    }
    debug!(table, rows = data.len(), columns = columns.len(), "表快照已读取");

    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    Ok(Table::new(table, &names, data))
}

/// 逻辑为整数的列: 整数亲和,或未声明类型的 id / *_id 列
fn is_integer_like(column: &DeclaredColumn) -> bool {
    if column.has_integer_affinity() {
        return true;
    }
    column.decl_type.trim().is_empty() && (column.name == "id" || column.name.ends_with("_id"))
}

/// 仅处理物理类型不明确的单元格（TEXT/BLOB）,NULL 保持为 NULL
fn coerce_ambiguous(raw: Value, fallback_count: &mut usize) -> Value {
    match raw {
        Value::Text(_) | Value::Blob(_) => {
            let decoded = decode_integer(&raw);
            if let Decoded::Fallback(_) = decoded {
                *fallback_count += 1;
            }
            decoded.into_value()
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_repo() -> SnapshotRepository {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE Holders (id INTEGER PRIMARY KEY, name TEXT, tool_id INTEGER, note);
            INSERT INTO Holders (id, name, tool_id, note) VALUES (1, 'HSK63', 10, 'a');
            INSERT INTO Holders (id, name, tool_id, note) VALUES (2, 'SK40', NULL, NULL);
            "#,
        )
        .unwrap();
        // tool_id 以 8 字节小端 BLOB 存储
        conn.execute(
            "INSERT INTO Holders (id, name, tool_id, note) VALUES (3, 'BT30', ?1, 'b')",
            [42i64.to_le_bytes().to_vec()],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO Holders (id, name, tool_id, note) VALUES (4, 'ER32', 'n/a', 'c')",
            [],
        )
        .unwrap();
        SnapshotRepository::new(StoreHandle::from_connection(":memory:", conn))
    }

    #[test]
    fn test_read_table_keeps_declared_order() {
        let repo = setup_repo();
        let table = repo.read_table("Holders").unwrap();
        assert_eq!(table.schema.names(), vec!["id", "name", "tool_id", "note"]);
        assert_eq!(table.row_count(), 4);
    }

    #[test]
    fn test_ambiguous_integer_cells_are_decoded() {
        let repo = setup_repo();
        let table = repo.read_table("Holders").unwrap();
        let idx = table.column_position("tool_id").unwrap();
        assert_eq!(table.rows[0][idx], Value::Integer(10));
        assert_eq!(table.rows[1][idx], Value::Null);
        assert_eq!(table.rows[2][idx], Value::Integer(42));
        assert_eq!(table.rows[3][idx], Value::Text("n/a".to_string()));
    }

    #[test]
    fn test_missing_table_is_schema_mismatch() {
        let repo = setup_repo();
        let err = repo.read_table("Tools").unwrap_err();
        match err {
            RepositoryError::SchemaMismatch { table, .. } => assert_eq!(table, "Tools"),
            other => panic!("Expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_column_is_schema_mismatch() {
        let repo = setup_repo();
        assert!(repo.read_columns("Holders", &["id", "name"]).is_ok());
        let err = repo.read_columns("Holders", &["id", "diameter"]).unwrap_err();
        assert!(matches!(err, RepositoryError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_read_tables_fails_whole_batch() {
        let repo = setup_repo();
        assert!(repo.read_tables(&["Holders", "Tools"]).is_err());
        let set = repo.read_tables(&["Holders"]).unwrap();
        assert!(set.contains("Holders"));
    }

    #[test]
    fn test_read_available_skips_missing_tables() {
        let repo = setup_repo();
        let set = repo.read_available(&["Holders", "Tools"]).unwrap();
        assert_eq!(set.names(), vec!["Holders"]);
    }
}
