// ==========================================
// 刀具数据库目录 - 多表连接重建
// ==========================================
// 职责: 按显式、固定顺序的左外连接列表,将多张快照合并为一张扁平视图
// 约束:
// - 左表每一行至少产出一行;未匹配的右侧列填 NULL
// - 连接键按 (来源表, 源列名) 引用,不受之前步骤的后缀重命名影响
// - 同名连接键合并为一列;其它同名列左侧加 _of_<左标签>,右侧加 _of_<右标签>
// - 声明式重命名在每步结束后按来源应用
// - 任一源表缺失即整体失败,不返回部分视图
// ==========================================

use crate::domain::table::{Column, ColumnRef, FlattenedView, Schema, Table, TableSet};
use crate::domain::types::{JoinKey, Value};
use crate::engine::error::{EngineError, EngineResult};
use std::collections::{HashMap, HashSet};
use tracing::debug;

// ==========================================
// JoinStep - 单步左外连接
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct JoinStep {
    pub right_table: String,
    pub left_origin: String,
    pub right_origin: String,
    pub left_key: ColumnRef,
    pub right_key: String,
    pub renames: Vec<(ColumnRef, String)>,
}

impl JoinStep {
    /// # 参数
    /// - right_table: 右表名
    /// - left_key: 左侧连接键（按来源引用）
    /// - right_key: 右表中的连接键列名
    pub fn new(right_table: &str, left_key: ColumnRef, right_key: &str) -> Self {
        Self {
            right_table: right_table.to_string(),
            left_origin: "left".to_string(),
            right_origin: right_table.to_string(),
            left_key,
            right_key: right_key.to_string(),
            renames: Vec::new(),
        }
    }

    /// 冲突后缀标签
    pub fn suffixes(mut self, left_origin: &str, right_origin: &str) -> Self {
        self.left_origin = left_origin.to_string();
        self.right_origin = right_origin.to_string();
        self
    }

    /// 本步结束后将指定来源列重命名
    pub fn rename(mut self, column: ColumnRef, new_name: &str) -> Self {
        self.renames.push((column, new_name.to_string()));
        self
    }
}

// ==========================================
// JoinPlan - 固定顺序的连接计划
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct JoinPlan {
    pub name: String,
    pub base_table: String,
    pub steps: Vec<JoinStep>,
}

impl JoinPlan {
    pub fn new(name: &str, base_table: &str, steps: Vec<JoinStep>) -> Self {
        Self {
            name: name.to_string(),
            base_table: base_table.to_string(),
            steps,
        }
    }

    /// 计划引用的全部源表（基表在前,按步骤顺序）
    pub fn required_tables(&self) -> Vec<&str> {
        let mut tables = vec![self.base_table.as_str()];
        for step in &self.steps {
            if !tables.contains(&step.right_table.as_str()) {
                tables.push(step.right_table.as_str());
            }
        }
        tables
    }

    /// 执行连接计划
    ///
    /// # 返回
    /// - Err(MissingRelation): 快照集合中缺少任一源表
    /// - Err(SchemaMismatch): 连接键或重命名列不存在,或输出列名重复
    pub fn execute(&self, tables: &TableSet) -> EngineResult<FlattenedView> {
        if let Some(missing) = self
            .required_tables()
            .into_iter()
            .find(|name| !tables.contains(name))
        {
            return Err(EngineError::MissingRelation {
                table: missing.to_string(),
            });
        }

        let base = lookup(tables, &self.base_table)?;
        let mut schema = base.schema.clone();
        let mut rows = base.rows.clone();

        for (idx, step) in self.steps.iter().enumerate() {
            let right = lookup(tables, &step.right_table)?;
            let left_rows = rows.len();
            let (next_schema, next_rows) = left_outer_join(&schema, &rows, right, step)?;
            debug!(
                plan = %self.name,
                step = idx + 1,
                right = %step.right_table,
                left_rows,
                output_rows = next_rows.len(),
                "连接步骤完成"
            );
            schema = next_schema;
            rows = next_rows;
        }

        Ok(FlattenedView::new(schema, rows))
    }
}

fn lookup<'a>(tables: &'a TableSet, name: &str) -> EngineResult<&'a Table> {
    tables.get(name).ok_or_else(|| EngineError::MissingRelation {
        table: name.to_string(),
    })
}

/// 单步左外连接
pub fn left_outer_join(
    left_schema: &Schema,
    left_rows: &[Vec<Value>],
    right: &Table,
    step: &JoinStep,
) -> EngineResult<(Schema, Vec<Vec<Value>>)> {
    let left_key_idx = left_schema.position_of(&step.left_key).ok_or_else(|| {
        EngineError::schema_mismatch(
            &step.left_key.origin,
            format!("缺少连接键列 {}", step.left_key),
        )
    })?;
    let right_key_idx = right.column_position(&step.right_key).ok_or_else(|| {
        EngineError::schema_mismatch(&right.name, format!("缺少连接键列 {}", step.right_key))
    })?;

    // 同名连接键合并为一列（保留左侧值）
    let merged_key = left_schema.columns[left_key_idx].name == step.right_key;
    let right_kept: Vec<usize> = (0..right.schema.len())
        .filter(|&i| !(merged_key && i == right_key_idx))
        .collect();

    let left_names: HashSet<&str> = left_schema.columns.iter().map(|c| c.name.as_str()).collect();
    let overlap: HashSet<&str> = right_kept
        .iter()
        .map(|&i| right.schema.columns[i].name.as_str())
        .filter(|name| left_names.contains(name))
        .collect();

    let mut columns: Vec<Column> = Vec::with_capacity(left_schema.len() + right_kept.len());
    for column in &left_schema.columns {
        let mut column = column.clone();
        if overlap.contains(column.name.as_str()) {
            column.name = format!("{}_of_{}", column.name, step.left_origin);
        }
        columns.push(column);
    }
    for &i in &right_kept {
        let mut column = right.schema.columns[i].clone();
        if overlap.contains(column.name.as_str()) {
            column.name = format!("{}_of_{}", column.name, step.right_origin);
        }
        columns.push(column);
    }

    let mut schema = Schema::new(columns);
    apply_renames(&mut schema, step)?;
    ensure_unique_names(&schema, &right.name)?;

    // 右表按键建索引,保持右表行序
    let mut index: HashMap<JoinKey, Vec<usize>> = HashMap::new();
    for (row_idx, row) in right.rows.iter().enumerate() {
        if let Some(key) = row[right_key_idx].join_key() {
            index.entry(key).or_default().push(row_idx);
        }
    }

    let mut output = Vec::with_capacity(left_rows.len());
    for left_row in left_rows {
        let matches = left_row[left_key_idx]
            .join_key()
            .and_then(|key| index.get(&key));

        match matches {
            Some(matched) => {
                for &right_idx in matched {
                    let right_row = &right.rows[right_idx];
                    let mut combined = left_row.clone();
                    combined.extend(right_kept.iter().map(|&i| right_row[i].clone()));
                    output.push(combined);
                }
            }
            None => {
                let mut combined = left_row.clone();
                combined.extend(std::iter::repeat(Value::Null).take(right_kept.len()));
                output.push(combined);
            }
        }
    }

    Ok((schema, output))
}

fn apply_renames(schema: &mut Schema, step: &JoinStep) -> EngineResult<()> {
    for (column, new_name) in &step.renames {
        let idx = schema.position_of(column).ok_or_else(|| {
            EngineError::schema_mismatch(&column.origin, format!("重命名列不存在: {}", column))
        })?;
        schema.columns[idx].name = new_name.clone();
    }
    Ok(())
}

fn ensure_unique_names(schema: &Schema, table: &str) -> EngineResult<()> {
    let mut seen = HashSet::new();
    for column in &schema.columns {
        if !seen.insert(column.name.as_str()) {
            return Err(EngineError::schema_mismatch(
                table,
                format!("连接后列名重复: {}", column.name),
            ));
        }
    }
    Ok(())
}
