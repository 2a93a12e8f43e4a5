// ==========================================
// 刀具数据库目录 - 运行配置
// ==========================================
// 职责: 两个库文件路径与连接缓存开关
// 优先级（低 → 高）: 默认值 → JSON 配置文件 → 环境变量 → 命令行参数
// ==========================================

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const ENV_TOOL_DB: &str = "TOOL_CATALOG_TOOL_DB";
pub const ENV_MATERIAL_DB: &str = "TOOL_CATALOG_MATERIAL_DB";
pub const ENV_CACHE_CONNECTIONS: &str = "TOOL_CATALOG_CACHE_CONNECTIONS";

pub const DEFAULT_TOOL_DB_FILE: &str = "tools.db";
pub const DEFAULT_MATERIAL_DB_FILE: &str = "materials.db";

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败: {path}: {reason}")]
    FileReadError { path: String, reason: String },

    #[error("配置文件解析失败: {path}: {reason}")]
    ParseError { path: String, reason: String },

    #[error("配置项取值无效: {key}={value}")]
    InvalidValue { key: String, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ==========================================
// CatalogConfig - 运行配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// 刀具库路径（Materials / NCTools / Tools / Holders ...）
    pub tool_db_path: PathBuf,
    /// 材料目录库路径（Materials / ChippingClasses / MaterialGroups ...）
    pub material_db_path: PathBuf,
    /// 会话内缓存连接（否则每次操作打开/关闭库文件）
    pub cache_connections: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            tool_db_path: default_db_path(DEFAULT_TOOL_DB_FILE),
            material_db_path: default_db_path(DEFAULT_MATERIAL_DB_FILE),
            cache_connections: false,
        }
    }
}

impl CatalogConfig {
    /// 从 JSON 文件加载（缺失字段取默认值）
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// 完整加载: 默认值 / 可选配置文件 / 进程环境变量
    pub fn load(config_file: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        debug!(
            tool_db = %config.tool_db_path.display(),
            material_db = %config.material_db_path.display(),
            cache_connections = config.cache_connections,
            "配置已加载"
        );
        Ok(config)
    }

    /// 应用环境变量覆写（空值忽略）
    ///
    /// # 参数
    /// - lookup: 变量读取函数（测试中可替换为固定表）
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(path) = non_empty(ENV_TOOL_DB) {
            self.tool_db_path = PathBuf::from(path);
        }
        if let Some(path) = non_empty(ENV_MATERIAL_DB) {
            self.material_db_path = PathBuf::from(path);
        }
        if let Some(flag) = non_empty(ENV_CACHE_CONNECTIONS) {
            self.cache_connections = parse_bool(&flag).ok_or_else(|| ConfigError::InvalidValue {
                key: ENV_CACHE_CONNECTIONS.to_string(),
                value: flag.clone(),
            })?;
        }
        Ok(())
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// 默认库文件路径: 用户数据目录/tool-catalog/<file>,取不到数据目录时使用当前目录
pub fn default_db_path(file_name: &str) -> PathBuf {
    match dirs::data_dir() {
        Some(data_dir) => data_dir.join("tool-catalog").join(file_name),
        None => PathBuf::from(".").join(file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_paths_end_with_file_names() {
        let config = CatalogConfig::default();
        assert!(config.tool_db_path.ends_with(DEFAULT_TOOL_DB_FILE));
        assert!(config.material_db_path.ends_with(DEFAULT_MATERIAL_DB_FILE));
        assert!(!config.cache_connections);
    }

    #[test]
    fn test_file_then_env_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "tool_db_path": "/data/tools.db", "cache_connections": true }}"#
        )
        .unwrap();

        let mut config = CatalogConfig::from_file(file.path()).unwrap();
        assert_eq!(config.tool_db_path, PathBuf::from("/data/tools.db"));
        assert!(config.material_db_path.ends_with(DEFAULT_MATERIAL_DB_FILE));
        assert!(config.cache_connections);

        config
            .apply_env_overrides(lookup_from(&[
                (ENV_MATERIAL_DB, "/env/materials.db"),
                (ENV_CACHE_CONNECTIONS, "off"),
                (ENV_TOOL_DB, "  "),
            ]))
            .unwrap();
        assert_eq!(config.tool_db_path, PathBuf::from("/data/tools.db"));
        assert_eq!(config.material_db_path, PathBuf::from("/env/materials.db"));
        assert!(!config.cache_connections);
    }

    #[test]
    fn test_invalid_cache_flag() {
        let mut config = CatalogConfig::default();
        let err = config
            .apply_env_overrides(lookup_from(&[(ENV_CACHE_CONNECTIONS, "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_malformed_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = CatalogConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
