// ==========================================
// 刀具数据库目录 - 整数解码
// ==========================================
// 规则（逻辑为整数、物理存储类型不明确的列）:
// - NULL / 空文本 / 空 BLOB → Integer(0)
// - Integer 原样; Real 截断取整（非有限值 → 0）
// - Text 可解析为整数或浮点 → Integer; 否则 Fallback(原文本)
// - BLOB 先按 UTF-8 数字文本解析; 不是数字文本时 8 字节 / 4 字节 → 小端整数;
//   其它 → Fallback(文本或十六进制)
// 约束: 永不 panic,永不返回错误
// ==========================================

use crate::domain::types::{to_hex, Decoded, Value};

/// 解码单元格为整数
pub fn decode_integer(value: &Value) -> Decoded {
    match value {
        Value::Null => Decoded::Integer(0),
        Value::Integer(n) => Decoded::Integer(*n),
        Value::Real(f) => Decoded::Integer(truncate(*f)),
        Value::Text(s) => decode_text(s),
        Value::Blob(bytes) => decode_blob(bytes),
    }
}

fn truncate(f: f64) -> i64 {
    if f.is_finite() {
        f.trunc() as i64
    } else {
        0
    }
}

/// 非空数字文本（整数或有限浮点）
fn parse_numeric(trimmed: &str) -> Option<i64> {
    if let Ok(n) = trimmed.parse::<i64>() {
        return Some(n);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => Some(truncate(f)),
        _ => None,
    }
}

fn decode_text(text: &str) -> Decoded {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Decoded::Integer(0);
    }
    match parse_numeric(trimmed) {
        Some(n) => Decoded::Integer(n),
        None => Decoded::Fallback(trimmed.to_string()),
    }
}

fn decode_blob(bytes: &[u8]) -> Decoded {
    if bytes.is_empty() {
        return Decoded::Integer(0);
    }

    let text = std::str::from_utf8(bytes).ok();
    if let Some(n) = text.map(str::trim).and_then(parse_numeric) {
        return Decoded::Integer(n);
    }

    match bytes.len() {
        8 => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(bytes);
            Decoded::Integer(i64::from_le_bytes(buf))
        }
        4 => {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(bytes);
            Decoded::Integer(i32::from_le_bytes(buf) as i64)
        }
        _ => match text {
            Some(text) => decode_text(text),
            None => Decoded::Fallback(to_hex(bytes)),
        },
    }
}
