// ==========================================
// 刀具数据库目录 - CSV 导出
// ==========================================
// 格式: 首行为输出列名; NULL 输出为空字段; BLOB 输出为十六进制
// ==========================================

use crate::domain::table::FlattenedView;
use crate::exporter::error::{ExportError, ExportResult};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// 将视图写入任意输出流
///
/// # 返回
/// 写入的数据行数（不含表头）
pub fn write_view<W: Write>(view: &FlattenedView, writer: W) -> ExportResult<usize> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(view.column_names())?;
    for row in view.rows() {
        csv_writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    csv_writer
        .flush()
        .map_err(|e| ExportError::CsvWriteError(e.to_string()))?;

    Ok(view.row_count())
}

/// 将视图导出为 CSV 文件（覆盖已有文件）
pub fn export_view<P: AsRef<Path>>(view: &FlattenedView, path: P) -> ExportResult<usize> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|e| ExportError::FileWriteError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let rows = write_view(view, file)?;
    info!(path = %path.display(), rows, "视图已导出为 CSV");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::Table;
    use crate::domain::types::Value;

    #[test]
    fn test_write_view_with_header_and_nulls() {
        let view = FlattenedView::from_table(Table::new(
            "Holders",
            &["id", "name", "guid"],
            vec![
                vec![Value::Integer(1), Value::Text("HSK63, short".to_string()), Value::Blob(vec![0xab, 0x01])],
                vec![Value::Integer(2), Value::Null, Value::Null],
            ],
        ));

        let mut buffer = Vec::new();
        let rows = write_view(&view, &mut buffer).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id,name,guid");
        assert_eq!(lines[1], "1,\"HSK63, short\",ab01");
        assert_eq!(lines[2], "2,,");
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let view = FlattenedView::from_table(Table::new("T", &["id"], vec![]));
        let err = export_view(&view, "/nonexistent-dir/out.csv").unwrap_err();
        assert!(matches!(err, ExportError::FileWriteError { .. }));
    }
}
