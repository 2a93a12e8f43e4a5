// ==========================================
// 刀具数据库目录 - 刀具库材料仓储
// ==========================================
// 职责: 刀具库 Materials 表的按名查询、取号、批量插入
// 红线: Repository 不含业务逻辑（父/子判定在提升引擎中）
// 约束: 所有查询使用参数化
// ==========================================

use crate::db::table_exists;
use crate::domain::decode::decode_integer;
use crate::domain::material::{MachiningFactors, NewMaterial, ToolMaterial};
use crate::domain::types::{Decoded, MaterialType, Value};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::store::StoreHandle;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction};
use tracing::{debug, warn};

pub const MATERIALS_TABLE: &str = "Materials";

const SELECT_COLUMNS: &str =
    "id, type, name, norm_code, comment, obj_guid, parent_id, chipping_class";

const INSERT_COLUMNS: [&str; 9] = [
    "id",
    "type",
    "name",
    "norm_code",
    "comment",
    "obj_guid",
    "parent_id",
    "mat_db_obj_guid",
    "chipping_class",
];

// ==========================================
// ToolMaterialRepository - 刀具库材料仓储
// ==========================================
pub struct ToolMaterialRepository {
    store: StoreHandle,
}

impl ToolMaterialRepository {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// 在单个事务内执行一次逻辑写操作
    ///
    /// # 说明
    /// - 闭包返回 Ok → 提交; 提交失败报告 PersistenceError
    /// - 闭包返回 Err → 回滚,原错误原样返回
    pub fn with_transaction<T, F>(&self, operation: &str, f: F) -> RepositoryResult<T>
    where
        F: FnOnce(&Transaction) -> RepositoryResult<T>,
    {
        self.store.with_connection(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| RepositoryError::persistence(operation, e))?;

            match f(&tx) {
                Ok(value) => {
                    tx.commit()
                        .map_err(|e| RepositoryError::persistence(operation, e))?;
                    debug!(operation, "事务已提交");
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback_err) = tx.rollback() {
                        warn!(operation, error = %rollback_err, "事务回滚失败");
                    }
                    debug!(operation, error = %err, "事务已回滚");
                    Err(err)
                }
            }
        })
    }

    /// 按名称精确查询
    pub fn find_by_name(&self, name: &str) -> RepositoryResult<Option<ToolMaterial>> {
        self.store.with_connection(|conn| find_by_name(conn, name))
    }

    /// 记录总数
    pub fn count(&self) -> RepositoryResult<usize> {
        self.store.with_connection(|conn| {
            ensure_materials_table(conn)?;
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM Materials", [], |row| row.get(0))?;
            Ok(n as usize)
        })
    }

    /// 按 id 升序列出全部材料
    pub fn list_all(&self) -> RepositoryResult<Vec<ToolMaterial>> {
        self.store.with_connection(|conn| {
            ensure_materials_table(conn)?;
            let sql = format!("SELECT {} FROM Materials ORDER BY id", SELECT_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query([])?;
            let mut materials = Vec::new();
            while let Some(row) = rows.next()? {
                materials.push(map_material(row)?);
            }
            Ok(materials)
        })
    }
}

// ==========================================
// 连接/事务内操作
// ==========================================

/// Materials 表必须存在
pub fn ensure_materials_table(conn: &Connection) -> RepositoryResult<()> {
    if table_exists(conn, MATERIALS_TABLE)? {
        Ok(())
    } else {
        Err(RepositoryError::schema_mismatch(MATERIALS_TABLE, "表不存在"))
    }
}

/// 按名称精确查询（区分大小写）
pub fn find_by_name(conn: &Connection, name: &str) -> RepositoryResult<Option<ToolMaterial>> {
    ensure_materials_table(conn)?;
    let sql = format!("SELECT {} FROM Materials WHERE name = ?1 LIMIT 1", SELECT_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![name])?;
    match rows.next()? {
        Some(row) => Ok(Some(map_material(row)?)),
        None => Ok(None),
    }
}

/// 下一个可用 id = max(id) + 1（空表为 1）
pub fn next_id(conn: &Connection) -> RepositoryResult<i64> {
    ensure_materials_table(conn)?;
    let max: Option<Value> = conn
        .query_row("SELECT MAX(id) FROM Materials", [], |row| {
            Ok(Value::from(row.get_ref(0)?))
        })
        .optional()?;

    match max {
        None | Some(Value::Null) => Ok(1),
        Some(value) => match decode_integer(&value) {
            Decoded::Integer(n) => Ok(n + 1),
            Decoded::Fallback(text) => Err(RepositoryError::FieldValueError {
                field: "Materials.id".to_string(),
                message: format!("无法解析为整数: {}", text),
            }),
        },
    }
}

/// 批量插入（单条 INSERT 语句,一行或多行）
///
/// # 返回
/// - Ok(usize): 插入行数
/// - Err(PersistenceError): 插入失败（调用方事务负责回滚）
pub fn insert_batch(conn: &Connection, materials: &[NewMaterial]) -> RepositoryResult<usize> {
    if materials.is_empty() {
        return Ok(0);
    }

    let columns: Vec<&str> = INSERT_COLUMNS
        .iter()
        .copied()
        .chain(MachiningFactors::COLUMNS.iter().copied())
        .collect();
    let width = columns.len();

    let tuples = (0..materials.len())
        .map(|row| {
            let placeholders = (1..=width)
                .map(|col| format!("?{}", row * width + col))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", placeholders)
        })
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "INSERT INTO Materials ({}) VALUES {}",
        columns.join(", "),
        tuples
    );

    let values: Vec<SqlValue> = materials.iter().flat_map(material_params).collect();

    conn.execute(&sql, params_from_iter(values))
        .map_err(|e| RepositoryError::persistence("insert_materials", e))
}

fn material_params(material: &NewMaterial) -> Vec<SqlValue> {
    let mut values = vec![
        SqlValue::Integer(material.id),
        SqlValue::Integer(material.material_type.code()),
        SqlValue::Text(material.name.clone()),
        material
            .norm_code
            .clone()
            .map(SqlValue::Text)
            .unwrap_or(SqlValue::Null),
        SqlValue::Text(material.comment.clone()),
        SqlValue::Blob(material.obj_guid.to_vec()),
        material
            .parent_id
            .map(SqlValue::Integer)
            .unwrap_or(SqlValue::Null),
        SqlValue::Blob(material.mat_db_obj_guid.to_vec()),
        SqlValue::Integer(material.chipping_class),
    ];
    values.extend(material.factors.to_array().iter().map(|f| SqlValue::Real(*f)));
    values
}

fn map_material(row: &Row<'_>) -> RepositoryResult<ToolMaterial> {
    let id = integer_field(row, 0, "id")?.unwrap_or(0);
    let type_code = integer_field(row, 1, "type")?.unwrap_or(0);
    let material_type =
        MaterialType::from_code(type_code).ok_or_else(|| RepositoryError::FieldValueError {
            field: "Materials.type".to_string(),
            message: format!("未知材料类型: {}", type_code),
        })?;

    Ok(ToolMaterial {
        id,
        material_type,
        name: row.get(2)?,
        norm_code: row.get(3)?,
        comment: row.get(4)?,
        obj_guid: row.get::<_, Option<Vec<u8>>>(5)?.unwrap_or_default(),
        parent_id: integer_field(row, 6, "parent_id")?,
        chipping_class: integer_field(row, 7, "chipping_class")?,
    })
}

/// 读取可能以非整数类型存储的整数列（NULL → None）
fn integer_field(row: &Row<'_>, idx: usize, field: &str) -> RepositoryResult<Option<i64>> {
    let value = Value::from(row.get_ref(idx)?);
    if value.is_null() {
        return Ok(None);
    }
    match decode_integer(&value) {
        Decoded::Integer(n) => Ok(Some(n)),
        Decoded::Fallback(text) => Err(RepositoryError::FieldValueError {
            field: format!("Materials.{}", field),
            message: format!("无法解析为整数: {}", text),
        }),
    }
}
