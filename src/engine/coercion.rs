// ==========================================
// 刀具数据库目录 - 视图列整数化
// ==========================================
// 规则与快照加载器一致（decode_integer）,另外 NULL → 0
// ==========================================

use crate::domain::decode::decode_integer;
use crate::domain::table::{Column, FlattenedView};
use tracing::warn;

/// 对满足条件的列逐格解码为整数
///
/// # 参数
/// - view: 目标视图（原地修改）
/// - predicate: 列选择条件
///
/// # 返回
/// 被处理的列数
pub fn coerce_columns<P>(view: &mut FlattenedView, predicate: P) -> usize
where
    P: Fn(&Column) -> bool,
{
    let targets: Vec<usize> = view
        .schema()
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| predicate(c))
        .map(|(i, _)| i)
        .collect();

    let mut fallbacks = 0usize;
    for row in view.rows_mut() {
        for &i in &targets {
            let decoded = decode_integer(&row[i]);
            if decoded.is_fallback() {
                fallbacks += 1;
            }
            row[i] = decoded.into_value();
        }
    }

    if fallbacks > 0 {
        warn!(fallbacks, "部分单元格无法解析为整数,保留为文本");
    }
    targets.len()
}
