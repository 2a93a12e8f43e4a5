// ==========================================
// 刀具数据库目录 - 领域类型定义
// ==========================================
// 职责: 单元格值、连接键、整数解码结果、材料类型
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 单元格值 (Value)
// ==========================================
// 与 SQLite 存储类一一对应
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// 读取整数（Real 仅在为整数值时返回）
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Real(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// 读取浮点数（Text 尝试解析）
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Real(f) => Some(*f),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// 非空文本（去除首尾空白后为空视为 None）
    pub fn as_non_empty_text(&self) -> Option<String> {
        match self {
            Value::Null | Value::Blob(_) => None,
            other => {
                let text = other.to_string();
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
        }
    }

    /// 连接键投影
    ///
    /// - Null 永不匹配（SQL 语义）
    /// - 整数值的 Real 与 Integer 视为同一个键
    pub fn join_key(&self) -> Option<JoinKey> {
        match self {
            Value::Null => None,
            Value::Integer(n) => Some(JoinKey::Int(*n)),
            Value::Real(f) => match self.as_i64() {
                Some(n) => Some(JoinKey::Int(n)),
                None => Some(JoinKey::Real(f.to_bits())),
            },
            Value::Text(s) => Some(JoinKey::Text(s.clone())),
            Value::Blob(b) => Some(JoinKey::Bytes(b.clone())),
        }
    }

    /// JSON 表示（Blob 输出为十六进制字符串）
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Integer(n) => serde_json::Value::from(*n),
            Value::Real(f) => serde_json::Value::from(*f),
            Value::Text(s) => serde_json::Value::from(s.clone()),
            Value::Blob(b) => serde_json::Value::from(to_hex(b)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Real(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
            Value::Blob(b) => write!(f, "{}", to_hex(b)),
        }
    }
}

impl From<rusqlite::types::ValueRef<'_>> for Value {
    fn from(value: rusqlite::types::ValueRef<'_>) -> Self {
        use rusqlite::types::ValueRef;
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(n) => Value::Integer(n),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// ==========================================
// 连接键 (JoinKey)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JoinKey {
    Int(i64),
    Real(u64),
    Text(String),
    Bytes(Vec<u8>),
}

// ==========================================
// 整数解码结果 (Decoded)
// ==========================================
// 存储类型不明确的 ID/数值列经解码后的标记结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decoded {
    Integer(i64),
    Fallback(String),
}

impl Decoded {
    pub fn into_value(self) -> Value {
        match self {
            Decoded::Integer(n) => Value::Integer(n),
            Decoded::Fallback(s) => Value::Text(s),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Decoded::Fallback(_))
    }
}

// ==========================================
// 材料类型 (MaterialType)
// ==========================================
// 1 = 父级分类, 2 = 子级实例
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialType {
    Class,
    Instance,
}

impl MaterialType {
    pub fn code(self) -> i64 {
        match self {
            MaterialType::Class => 1,
            MaterialType::Instance => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(MaterialType::Class),
            2 => Some(MaterialType::Instance),
            _ => None,
        }
    }
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaterialType::Class => write!(f, "CLASS"),
            MaterialType::Instance => write!(f, "INSTANCE"),
        }
    }
}
