// ==========================================
// 刀具数据库目录 - 表快照与扁平视图
// ==========================================
// 职责: 定义带来源信息的列、逐阶段 Schema、表快照、只读扁平视图
// 约束: 列按 (来源表, 源列名) 寻址,与连接后的重命名无关
// ==========================================

use crate::domain::types::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

// ==========================================
// Column - 列定义
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,   // 当前输出列名（可能带 _of_<origin> 后缀）
    pub origin: String, // 来源表
    pub source: String, // 来源表中的原始列名
}

impl Column {
    pub fn new(origin: &str, source: &str) -> Self {
        Self {
            name: source.to_string(),
            origin: origin.to_string(),
            source: source.to_string(),
        }
    }
}

// ==========================================
// ColumnRef - 列引用
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub origin: String,
    pub source: String,
}

impl ColumnRef {
    pub fn new(origin: &str, source: &str) -> Self {
        Self {
            origin: origin.to_string(),
            source: source.to_string(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.origin, self.source)
    }
}

// ==========================================
// Schema - 列集合（按声明顺序）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// 按来源寻址列位置
    pub fn position_of(&self, column: &ColumnRef) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.origin == column.origin && c.source == column.source)
    }

    /// 按当前输出列名寻址列位置
    pub fn position_by_name(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

// ==========================================
// Table - 单表快照
// ==========================================
// 用途: 快照加载器输出,连接重建输入
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub schema: Schema,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// 以列名列表构建表（所有列来源均为本表）
    pub fn new(name: &str, column_names: &[&str], rows: Vec<Vec<Value>>) -> Self {
        let columns = column_names.iter().map(|c| Column::new(name, c)).collect();
        Self {
            name: name.to_string(),
            schema: Schema::new(columns),
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_position(&self, column_name: &str) -> Option<usize> {
        self.schema.position_by_name(column_name)
    }
}

// ==========================================
// TableSet - 一个库的快照集合
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSet {
    tables: BTreeMap<String, Table>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }
}

impl FromIterator<Table> for TableSet {
    fn from_iter<I: IntoIterator<Item = Table>>(iter: I) -> Self {
        let mut set = TableSet::new();
        for table in iter {
            set.insert(table);
        }
        set
    }
}

// ==========================================
// FlattenedView - 只读扁平视图
// ==========================================
// 每次读取时由快照重建,从不持久化
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedView {
    schema: Arc<Schema>,
    rows: Vec<Vec<Value>>,
}

impl FlattenedView {
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self {
            schema: Arc::new(schema),
            rows,
        }
    }

    pub fn from_table(table: Table) -> Self {
        Self::new(table.schema, table.rows)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema.names()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<Value>> {
        &mut self.rows
    }

    /// 按位置取行（共享 Schema）
    pub fn row(&self, index: usize) -> Option<CatalogRow> {
        self.rows.get(index).map(|values| CatalogRow {
            schema: Arc::clone(&self.schema),
            values: values.clone(),
        })
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = CatalogRow> + '_ {
        (0..self.rows.len()).filter_map(move |i| self.row(i))
    }

    /// 保留满足条件的行（Schema 不变）
    pub fn filter_rows<F>(&self, mut keep: F) -> FlattenedView
    where
        F: FnMut(&[Value]) -> bool,
    {
        FlattenedView {
            schema: Arc::clone(&self.schema),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// JSON 记录形式（列名 → 值）
    pub fn to_json_records(&self) -> Vec<serde_json::Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = serde_json::Map::new();
                for (column, value) in self.schema.columns.iter().zip(row) {
                    record.insert(column.name.clone(), value.to_json());
                }
                serde_json::Value::Object(record)
            })
            .collect()
    }
}

// ==========================================
// CatalogRow - 视图中的单行
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl CatalogRow {
    pub fn new(schema: Schema, values: Vec<Value>) -> Self {
        Self {
            schema: Arc::new(schema),
            values,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// 按来源取值（列不存在返回 None）
    pub fn get(&self, column: &ColumnRef) -> Option<&Value> {
        self.schema.position_of(column).map(|i| &self.values[i])
    }

    /// 按输出列名取值
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.schema.position_by_name(name).map(|i| &self.values[i])
    }

    /// 按来源取非空文本
    pub fn text(&self, column: &ColumnRef) -> Option<String> {
        self.get(column).and_then(Value::as_non_empty_text)
    }
}
