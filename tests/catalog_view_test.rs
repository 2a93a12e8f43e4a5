// ==========================================
// 目录视图集成测试
// ==========================================
// 测试范围:
// 1. 刀具目录: 6 步左外连接、列命名、摘要投影、工艺关联行数
// 2. 材料目录: 4 步左外连接、切屑分类 id 整数化
// 3. 缺表 / 缺库 / 原始表浏览 / CSV 导出
// ==========================================


use std::collections::HashMap;

use test_helpers::*;
use tool_catalog::api::{ApiError, CatalogSource};
use tool_catalog::domain::{ColumnRef, Value};
use tool_catalog::engine::catalog_views::TOOL_TECHNOLOGY_LINK;
use tool_catalog::exporter::export_view;

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

// ==========================================
// 刀具目录
// ==========================================

#[test]
fn test_tool_catalog_左外连接保留全部NC刀具() {
    let env = CatalogTestEnv::new().expect("无法创建测试环境");
    let session = env.session();

    let view = session.api().get_tool_catalog_view().expect("刀具目录构建失败");

    // NC1 关联两条工艺 → 2 行; 其余各 1 行
    assert_eq!(view.row_count(), 5);

    let nc_id = ColumnRef::new("NCTools", "id");
    let holder_name = ColumnRef::new("Holders", "name");
    let tool_name = ColumnRef::new("Tools", "name");

    let rows: Vec<_> = view.iter_rows().collect();
    let ids: Vec<_> = rows.iter().map(|r| r.get(&nc_id).cloned()).collect();
    assert_eq!(
        ids,
        vec![
            Some(Value::Integer(1)),
            Some(Value::Integer(1)),
            Some(Value::Integer(2)),
            Some(Value::Integer(3)),
            Some(Value::Integer(4)),
        ]
    );

    // BLOB 存储的 holder_id 解码后仍能连接
    assert_eq!(rows[2].text(&holder_name), Some("SK40 Collet".to_string()));
    // 无刀柄 / 无刀具时右侧列为 NULL
    assert_eq!(rows[3].get(&holder_name), Some(&Value::Null));
    assert_eq!(rows[4].get(&tool_name), Some(&Value::Null));
}

#[test]
fn test_tool_catalog_列名冲突后缀() {
    let env = CatalogTestEnv::new().expect("无法创建测试环境");
    let view = env.session().api().get_tool_catalog_view().unwrap();
    let names = view.column_names();

    for expected in [
        "id_of_nc_tools",
        "holder_id",
        "tool_id",
        "folder_id",
        "id_of_holders",
        "name_of_df1",
        "name_of_tools",
        "tool_type_id",
        "total_length",
        "tool_length",
        "id_of_df2",
        "id_of_tool_technologies",
        "technology_id",
        "name_of_geometry_classes",
        "purpose_id",
        "id_of_df5",
        "id_of_technology_purposes",
        "purpose",
    ] {
        assert!(names.contains(&expected), "缺少列 {}: {:?}", expected, names);
    }

    let mut unique = names.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), names.len(), "输出列名必须唯一");
}

#[test]
fn test_tool_catalog_摘要投影() {
    let env = CatalogTestEnv::new().expect("无法创建测试环境");
    let summary = env.session().api().get_tool_catalog_summary().unwrap();

    assert_eq!(
        summary.column_names(),
        vec![
            "purpose",
            "name_of_tools",
            "name_of_geometry_classes",
            "total_length",
            "tool_length",
            "name_of_df1"
        ]
    );
    assert_eq!(summary.row_count(), 5);
    assert_eq!(
        summary.rows()[0],
        vec![
            text("Milling"),
            text("EM D10"),
            text("End mill"),
            Value::Real(75.0),
            Value::Real(30.0),
            text("HSK63 Shrink"),
        ]
    );
    // 刀具 12 没有工艺关联
    assert_eq!(summary.rows()[3][0], Value::Null);
    assert_eq!(summary.rows()[3][1], text("EM D6"));
}

#[test]
fn test_tool_technology_link_行数与源库一致() {
    let env = CatalogTestEnv::new().expect("无法创建测试环境");
    let api = env.session().catalog_api.clone();
    let view = api.get_tool_catalog_view().unwrap();
    let nc_tools = api.read_raw_table(CatalogSource::ToolDb, "NCTools").unwrap();
    let links = {
        let conn = rusqlite::Connection::open(&env.tool_db_path).unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {}, COUNT(*) FROM {} GROUP BY {}",
                TOOL_TECHNOLOGY_LINK.right_column,
                TOOL_TECHNOLOGY_LINK.right_table,
                TOOL_TECHNOLOGY_LINK.right_column
            ))
            .unwrap();
        stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))
            .unwrap()
            .collect::<Result<HashMap<_, _>, _>>()
            .unwrap()
    };

    let nc_id = ColumnRef::new("NCTools", "id");
    for nc in nc_tools.iter_rows() {
        let id = nc.get(&nc_id).cloned().unwrap();
        let tool_id = nc.get(&TOOL_TECHNOLOGY_LINK.left_ref()).and_then(|v| v.as_i64());
        let expected = tool_id
            .and_then(|t| links.get(&t).copied())
            .unwrap_or(0)
            .max(1) as usize;

        let actual = view
            .iter_rows()
            .filter(|r| r.get(&nc_id) == Some(&id))
            .count();
        assert_eq!(actual, expected, "NC {:?} 的输出行数", id);
    }
}

#[test]
fn test_tool_catalog_缺表报告MissingRelation() {
    let env = CatalogTestEnv::new().expect("无法创建测试环境");
    execute_sql(&env.tool_db_path, "DROP TABLE GeometryClasses;").unwrap();

    let err = env.session().api().get_tool_catalog_view().unwrap_err();
    match err {
        ApiError::MissingRelation(table) => assert_eq!(table, "GeometryClasses"),
        other => panic!("Expected MissingRelation, got {:?}", other),
    }
}

#[test]
fn test_tool_catalog_缓存连接与每次打开结果一致() {
    let env = CatalogTestEnv::new().expect("无法创建测试环境");
    let per_operation = env.session().api().get_tool_catalog_view().unwrap();

    let cached = env.cached_session();
    assert!(cached.is_cached());
    let first = cached.api().get_tool_catalog_view().unwrap();
    let second = cached.api().get_tool_catalog_view().unwrap();
    cached.close();

    assert_eq!(per_operation, first);
    assert_eq!(first, second);
}

// ==========================================
// 材料目录
// ==========================================

#[test]
fn test_material_catalog_连接与切屑分类整数化() {
    let env = CatalogTestEnv::new().expect("无法创建测试环境");
    let view = env.session().api().get_material_catalog_view().unwrap();
    assert_eq!(view.row_count(), 6);

    let milling = ColumnRef::new("Materials", "milling_chipping_class_id");
    let drilling = ColumnRef::new("Materials", "drilling_chipping_class_id");
    let class_name = ColumnRef::new("ChippingClasses", "name");
    let group = ColumnRef::new("MaterialGroups", "name");
    let sub_group = ColumnRef::new("MaterialSubGroups", "name");
    let quality = ColumnRef::new("Qualities", "name");

    let first = view.row(0).unwrap();
    assert_eq!(first.get(&milling), Some(&Value::Integer(2)));
    assert_eq!(first.get(&drilling), Some(&Value::Integer(0)));
    assert_eq!(first.text(&class_name), Some("P2".to_string()));
    assert_eq!(first.text(&group), Some("Steel".to_string()));
    assert_eq!(first.text(&sub_group), Some("Carbon Steel".to_string()));
    assert_eq!(first.text(&quality), Some("C45".to_string()));

    // 无切屑分类 → 0,右侧分类列为 NULL
    let last = view.row(5).unwrap();
    assert_eq!(last.get(&milling), Some(&Value::Integer(0)));
    assert_eq!(
        last.get(&ColumnRef::new("ChippingClasses", "chipping_class_id")),
        Some(&Value::Integer(0))
    );
    assert_eq!(last.get(&class_name), Some(&Value::Null));
    assert_eq!(last.text(&group), Some("Aluminium".to_string()));
}

#[test]
fn test_material_catalog_缺表报告MissingRelation() {
    let env = CatalogTestEnv::new().expect("无法创建测试环境");
    execute_sql(&env.material_db_path, "DROP TABLE Qualities;").unwrap();

    let err = env.session().api().get_material_catalog_view().unwrap_err();
    assert!(matches!(err, ApiError::MissingRelation(ref t) if t == "Qualities"));
}

// ==========================================
// 原始表 / 导出
// ==========================================

#[test]
fn test_read_raw_table_浏览与限制() {
    let env = CatalogTestEnv::new().expect("无法创建测试环境");
    let session = env.session();
    let api = session.api();

    let folders = api.read_raw_table(CatalogSource::ToolDb, "Folders").unwrap();
    assert_eq!(folders.column_names(), vec!["id", "name", "parent_id"]);
    assert_eq!(folders.row_count(), 2);

    let err = api
        .read_raw_table(CatalogSource::ToolDb, "ToolTechnologies")
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    let qualities = api.read_raw_table(CatalogSource::MaterialDb, "Qualities").unwrap();
    assert_eq!(qualities.row_count(), 5);

    let err = api.read_raw_table(CatalogSource::MaterialDb, "Nope").unwrap_err();
    assert!(matches!(err, ApiError::SchemaMismatch { .. }));
}

#[test]
fn test_missing_db_file_报告StorageUnavailable() {
    let env = CatalogTestEnv::new().expect("无法创建测试环境");
    let dir = tempfile::tempdir().unwrap();
    let mut config = env.config(false);
    config.material_db_path = dir.path().join("missing.db");

    let session = tool_catalog::CatalogSession::open(config).unwrap();
    let err = session.api().get_material_catalog_view().unwrap_err();
    assert!(matches!(err, ApiError::StorageUnavailable { .. }));
    // 缺库不影响另一个库
    assert!(session.api().get_tool_catalog_view().is_ok());
    // 未创建新文件
    assert!(!dir.path().join("missing.db").exists());
}

#[test]
fn test_export_tool_summary_csv() {
    let env = CatalogTestEnv::new().expect("无法创建测试环境");
    let summary = env.session().api().get_tool_catalog_summary().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("summary.csv");
    let rows = export_view(&summary, &path).unwrap();
    assert_eq!(rows, 5);

    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("purpose,name_of_tools,name_of_geometry_classes,total_length,tool_length,name_of_df1")
    );
    assert_eq!(lines.next(), Some("Milling,EM D10,End mill,75,30,HSK63 Shrink"));
}
