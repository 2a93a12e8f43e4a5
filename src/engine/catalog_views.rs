// ==========================================
// 刀具数据库目录 - 目录视图定义
// ==========================================
// 职责:
// 1. 刀具目录视图: NCTools 为锚点的 6 步左外连接 + 固定摘要投影
// 2. 材料目录视图: Materials 为锚点的 4 步左外连接 + 切屑分类 id 整数化
// 约束: 连接顺序固定,不可重排
// ==========================================

use crate::domain::table::{ColumnRef, FlattenedView, Schema, TableSet};
use crate::engine::coercion::coerce_columns;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::join::{JoinPlan, JoinStep};
use tracing::info;

// ==========================================
// 表名
// ==========================================
pub mod tool_tables {
    pub const NC_TOOLS: &str = "NCTools";
    pub const HOLDERS: &str = "Holders";
    pub const TOOLS: &str = "Tools";
    pub const TOOL_TECHNOLOGIES: &str = "ToolTechnologies";
    pub const GEOMETRY_CLASSES: &str = "GeometryClasses";
    pub const TECHNOLOGIES: &str = "Technologies";
    pub const TECHNOLOGY_PURPOSES: &str = "TechnologyPurposes";
    pub const FOLDERS: &str = "Folders";
    pub const MATERIALS: &str = "Materials";
}

pub mod material_tables {
    pub const MATERIALS: &str = "Materials";
    pub const CHIPPING_CLASSES: &str = "ChippingClasses";
    pub const MATERIAL_GROUPS: &str = "MaterialGroups";
    pub const MATERIAL_SUB_GROUPS: &str = "MaterialSubGroups";
    pub const QUALITIES: &str = "Qualities";
}

// ==========================================
// 材料目录视图中的关键列（按来源寻址）
// ==========================================
pub mod material_columns {
    use super::material_tables::*;
    use crate::domain::table::ColumnRef;

    /// 国家标准牌号列（显示名称优先级顺序）
    pub const NATIONAL_NAME_COLUMNS: [&str; 10] = [
        "jis_name",
        "din_name",
        "aisi_name",
        "afnor_name",
        "bs_name",
        "uni_name",
        "csn_name",
        "ss_name",
        "gost_name",
        "uns_name",
    ];

    pub fn material_id() -> ColumnRef {
        ColumnRef::new(MATERIALS, "material_id")
    }

    pub fn group_name() -> ColumnRef {
        ColumnRef::new(MATERIAL_GROUPS, "name")
    }

    pub fn sub_group_name() -> ColumnRef {
        ColumnRef::new(MATERIAL_SUB_GROUPS, "name")
    }

    pub fn quality_name() -> ColumnRef {
        ColumnRef::new(QUALITIES, "name")
    }

    pub fn national_names() -> Vec<ColumnRef> {
        NATIONAL_NAME_COLUMNS
            .iter()
            .map(|c| ColumnRef::new(MATERIALS, c))
            .collect()
    }

    pub fn hardness_min() -> ColumnRef {
        ColumnRef::new(MATERIALS, "hardness_min")
    }

    pub fn hardness_max() -> ColumnRef {
        ColumnRef::new(MATERIALS, "hardness_max")
    }

    pub fn norm_code() -> ColumnRef {
        ColumnRef::new(MATERIALS, "norm_code")
    }

    pub fn milling_chipping_class() -> ColumnRef {
        ColumnRef::new(MATERIALS, "milling_chipping_class_id")
    }

    pub fn factor(column: &str) -> ColumnRef {
        ColumnRef::new(MATERIALS, column)
    }
}

// ==========================================
// KeyMapping - 具名外键映射
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMapping {
    pub name: &'static str,
    pub left_origin: &'static str,
    pub left_column: &'static str,
    pub right_table: &'static str,
    pub right_column: &'static str,
}

impl KeyMapping {
    pub fn left_ref(&self) -> ColumnRef {
        ColumnRef::new(self.left_origin, self.left_column)
    }
}

/// 刀具 → 工艺关联
///
/// 刀具库的 ToolTechnologies 以刀具 id 作为 technology_id 存储,
/// 因此 NCTools.tool_id 直接与 ToolTechnologies.technology_id 匹配。
/// 这是源库的真实结构,保持原样。
pub const TOOL_TECHNOLOGY_LINK: KeyMapping = KeyMapping {
    name: "tool_technology_link",
    left_origin: tool_tables::NC_TOOLS,
    left_column: "tool_id",
    right_table: tool_tables::TOOL_TECHNOLOGIES,
    right_column: "technology_id",
};

/// 几何分类名称在完整视图中的列名
pub const GEOMETRY_CLASS_NAME_COLUMN: &str = "name_of_geometry_classes";

// ==========================================
// 刀具目录视图
// ==========================================

/// 刀具目录连接计划（固定 6 步）
///
/// 第 N 步之后的左侧后缀标签为 `dfN`,与既有导出列名（如 `name_of_df1`）保持一致
pub fn tool_catalog_plan() -> JoinPlan {
    use tool_tables::*;

    JoinPlan::new(
        "tool_catalog",
        NC_TOOLS,
        vec![
            JoinStep::new(HOLDERS, ColumnRef::new(NC_TOOLS, "holder_id"), "id")
                .suffixes("nc_tools", "holders"),
            JoinStep::new(TOOLS, ColumnRef::new(NC_TOOLS, "tool_id"), "id")
                .suffixes("df1", "tools"),
            JoinStep::new(
                TOOL_TECHNOLOGY_LINK.right_table,
                TOOL_TECHNOLOGY_LINK.left_ref(),
                TOOL_TECHNOLOGY_LINK.right_column,
            )
            .suffixes("df2", "tool_technologies"),
            JoinStep::new(GEOMETRY_CLASSES, ColumnRef::new(TOOLS, "tool_type_id"), "id")
                .suffixes("df3", "geometry_classes")
                .rename(
                    ColumnRef::new(GEOMETRY_CLASSES, "name"),
                    GEOMETRY_CLASS_NAME_COLUMN,
                ),
            JoinStep::new(
                TECHNOLOGIES,
                ColumnRef::new(TOOL_TECHNOLOGIES, "technology_id"),
                "technology_id",
            )
            .suffixes("df4", "technologies_data"),
            JoinStep::new(
                TECHNOLOGY_PURPOSES,
                ColumnRef::new(TECHNOLOGIES, "purpose_id"),
                "id",
            )
            .suffixes("df5", "technology_purposes"),
        ],
    )
}

/// 刀具目录摘要投影（purpose / 刀具名 / 几何分类 / 总长 / 刀长 / 刀柄名）
pub fn tool_summary_columns() -> Vec<ColumnRef> {
    use tool_tables::*;

    vec![
        ColumnRef::new(TECHNOLOGY_PURPOSES, "purpose"),
        ColumnRef::new(TOOLS, "name"),
        ColumnRef::new(GEOMETRY_CLASSES, "name"),
        ColumnRef::new(TOOLS, "total_length"),
        ColumnRef::new(TOOLS, "tool_length"),
        ColumnRef::new(HOLDERS, "name"),
    ]
}

/// 构建完整刀具目录视图
pub fn build_tool_catalog(tables: &TableSet) -> EngineResult<FlattenedView> {
    let view = tool_catalog_plan().execute(tables)?;
    info!(
        rows = view.row_count(),
        columns = view.schema().len(),
        "刀具目录视图已重建"
    );
    Ok(view)
}

/// 按来源投影（输出列名沿用完整视图中的列名）
pub fn project(view: &FlattenedView, columns: &[ColumnRef]) -> EngineResult<FlattenedView> {
    let mut positions = Vec::with_capacity(columns.len());
    for column in columns {
        let idx = view.schema().position_of(column).ok_or_else(|| {
            EngineError::schema_mismatch(&column.origin, format!("投影列不存在: {}", column))
        })?;
        positions.push(idx);
    }

    let schema = Schema::new(
        positions
            .iter()
            .map(|&i| view.schema().columns[i].clone())
            .collect(),
    );
    let rows = view
        .rows()
        .iter()
        .map(|row| positions.iter().map(|&i| row[i].clone()).collect())
        .collect();

    Ok(FlattenedView::new(schema, rows))
}

// ==========================================
// 材料目录视图
// ==========================================

/// 材料目录连接计划（固定 4 步）
pub fn material_catalog_plan() -> JoinPlan {
    use material_tables::*;

    JoinPlan::new(
        "material_catalog",
        MATERIALS,
        vec![
            JoinStep::new(
                CHIPPING_CLASSES,
                ColumnRef::new(MATERIALS, "milling_chipping_class_id"),
                "chipping_class_id",
            )
            .suffixes("materials", "chipping_classes"),
            JoinStep::new(
                MATERIAL_GROUPS,
                ColumnRef::new(MATERIALS, "material_group_id"),
                "material_group_id",
            )
            .suffixes("materials_chipping", "material_groups"),
            JoinStep::new(
                MATERIAL_SUB_GROUPS,
                ColumnRef::new(MATERIALS, "material_sub_group_id"),
                "material_sub_group_id",
            )
            .suffixes("materials_grouped", "material_sub_groups"),
            JoinStep::new(QUALITIES, ColumnRef::new(MATERIALS, "quality_id"), "quality_id")
                .suffixes("materials_sub_grouped", "qualities"),
        ],
    )
}

/// 切屑分类 id 列（含 milling_/drilling_ 前缀及冲突后缀变体）
pub fn is_chipping_class_id_column(source: &str) -> bool {
    source.contains("chipping_class_id")
}

/// 构建材料目录视图并整数化切屑分类 id 列（NULL → 0）
pub fn build_material_catalog(tables: &TableSet) -> EngineResult<FlattenedView> {
    let mut view = material_catalog_plan().execute(tables)?;
    let coerced = coerce_columns(&mut view, |c| is_chipping_class_id_column(&c.source));

    info!(
        rows = view.row_count(),
        coerced_columns = coerced,
        "材料目录视图已重建"
    );
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::Table;
    use crate::domain::types::Value;

    fn int(n: i64) -> Value {
        Value::Integer(n)
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn tool_tables() -> TableSet {
        vec![
            Table::new(
                "NCTools",
                &["id", "holder_id", "tool_id"],
                vec![vec![int(1), int(1), int(10)], vec![int(2), int(2), int(11)]],
            ),
            Table::new("Holders", &["id", "name"], vec![vec![int(1), text("HSK63")]]),
            Table::new(
                "Tools",
                &["id", "name", "tool_type_id", "total_length", "tool_length"],
                vec![
                    vec![int(10), text("EM D10"), int(1), Value::Real(75.0), Value::Real(30.0)],
                    vec![int(11), text("DR D6"), int(2), Value::Real(90.0), Value::Real(45.0)],
                ],
            ),
            Table::new("ToolTechnologies", &["id", "technology_id"], vec![vec![int(1), int(10)]]),
            Table::new(
                "GeometryClasses",
                &["id", "name"],
                vec![vec![int(1), text("End mill")], vec![int(2), text("Drill")]],
            ),
            Table::new(
                "Technologies",
                &["technology_id", "purpose_id", "name"],
                vec![vec![int(10), int(5), text("Roughing")]],
            ),
            Table::new("TechnologyPurposes", &["id", "purpose"], vec![vec![int(5), text("Milling")]]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_tool_catalog_column_naming() {
        let view = build_tool_catalog(&tool_tables()).unwrap();
        let names = view.column_names();
        for expected in [
            "id_of_nc_tools",
            "id_of_holders",
            "name_of_df1",
            "name_of_tools",
            "id_of_df2",
            "id_of_tool_technologies",
            GEOMETRY_CLASS_NAME_COLUMN,
            "technology_id",
            "purpose",
        ] {
            assert!(names.contains(&expected), "缺少列 {}: {:?}", expected, names);
        }
        assert_eq!(view.row_count(), 2);
    }

    #[test]
    fn test_tool_summary_projection() {
        let view = build_tool_catalog(&tool_tables()).unwrap();
        let summary = project(&view, &tool_summary_columns()).unwrap();
        assert_eq!(
            summary.column_names(),
            vec![
                "purpose",
                "name_of_tools",
                GEOMETRY_CLASS_NAME_COLUMN,
                "total_length",
                "tool_length",
                "name_of_df1"
            ]
        );
        assert_eq!(
            summary.rows()[0],
            vec![
                text("Milling"),
                text("EM D10"),
                text("End mill"),
                Value::Real(75.0),
                Value::Real(30.0),
                text("HSK63")
            ]
        );
        // 第二把刀无刀柄、无工艺
        assert_eq!(summary.rows()[1][0], Value::Null);
        assert_eq!(summary.rows()[1][2], text("Drill"));
        assert_eq!(summary.rows()[1][5], Value::Null);
    }

    #[test]
    fn test_tool_catalog_missing_relation() {
        let mut tables = TableSet::new();
        tables.insert(Table::new("NCTools", &["id", "holder_id", "tool_id"], vec![]));
        match build_tool_catalog(&tables).unwrap_err() {
            EngineError::MissingRelation { table } => assert_eq!(table, "Holders"),
            other => panic!("Expected MissingRelation, got {:?}", other),
        }
    }

    #[test]
    fn test_material_catalog_coerces_chipping_class_ids() {
        let tables: TableSet = vec![
            Table::new(
                "Materials",
                &["material_id", "material_group_id", "material_sub_group_id", "quality_id", "milling_chipping_class_id"],
                vec![
                    vec![int(1), int(1), int(1), int(1), int(3)],
                    vec![int(2), int(1), int(1), int(1), Value::Null],
                ],
            ),
            Table::new("ChippingClasses", &["chipping_class_id", "name"], vec![vec![int(3), text("P")]]),
            Table::new("MaterialGroups", &["material_group_id", "name"], vec![vec![int(1), text("Steel")]]),
            Table::new("MaterialSubGroups", &["material_sub_group_id", "name"], vec![vec![int(1), text("Carbon")]]),
            Table::new("Qualities", &["quality_id", "name"], vec![vec![int(1), text("C45")]]),
        ]
        .into_iter()
        .collect();

        let view = build_material_catalog(&tables).unwrap();
        let row = view.row(1).unwrap();
        assert_eq!(
            row.get(&ColumnRef::new("Materials", "milling_chipping_class_id")),
            Some(&int(0))
        );
        assert_eq!(
            row.get(&ColumnRef::new("ChippingClasses", "chipping_class_id")),
            Some(&int(0))
        );
        assert_eq!(
            row.get(&ColumnRef::new("MaterialGroups", "name")),
            Some(&text("Steel"))
        );
    }
}
