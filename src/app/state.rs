// ==========================================
// 刀具数据库目录 - 会话状态
// ==========================================
// 职责: 管理一次会话的存储句柄和API实例
// 约束:
// - 缓存连接在会话开始时打开,close() / drop 时关闭
// - 会话之间不共享连接,不存在进程级全局状态
// ==========================================

use std::sync::Arc;

use crate::api::{ApiResult, CatalogApi};
use crate::config::CatalogConfig;
use crate::engine::promotion::MaterialPromotionEngine;
use crate::repository::{SnapshotRepository, StoreHandle, ToolMaterialRepository};

/// 目录会话
///
/// 包含API实例和两个库的存储句柄
pub struct CatalogSession {
    /// 会话配置
    config: CatalogConfig,

    /// 刀具库句柄
    tool_store: StoreHandle,

    /// 材料目录库句柄
    material_store: StoreHandle,

    /// 目录API
    pub catalog_api: Arc<CatalogApi>,
}

impl CatalogSession {
    /// 打开会话
    ///
    /// # 参数
    /// - config: 运行配置
    ///
    /// # 返回
    /// - Ok(CatalogSession): 会话实例
    /// - Err(StorageUnavailable): 启用缓存且库文件无法打开
    ///
    /// # 说明
    /// 未启用缓存时不会在此处打开文件,库文件错误在首次操作时报告
    pub fn open(config: CatalogConfig) -> ApiResult<Self> {
        tracing::info!(
            "打开目录会话，刀具库: {}，材料库: {}，缓存连接: {}",
            config.tool_db_path.display(),
            config.material_db_path.display(),
            config.cache_connections
        );

        let (tool_store, material_store) = if config.cache_connections {
            (
                StoreHandle::open_cached(&config.tool_db_path)?,
                StoreHandle::open_cached(&config.material_db_path)?,
            )
        } else {
            (
                StoreHandle::per_operation(&config.tool_db_path),
                StoreHandle::per_operation(&config.material_db_path),
            )
        };

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let tool_snapshots = Arc::new(SnapshotRepository::new(tool_store.clone()));
        let material_snapshots = Arc::new(SnapshotRepository::new(material_store.clone()));
        let tool_materials = Arc::new(ToolMaterialRepository::new(tool_store.clone()));

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let promotion_engine = Arc::new(MaterialPromotionEngine::new(Arc::clone(&tool_materials)));

        // ==========================================
        // 创建API实例
        // ==========================================
        let catalog_api = Arc::new(CatalogApi::new(
            tool_snapshots,
            material_snapshots,
            tool_materials,
            promotion_engine,
        ));

        Ok(Self {
            config,
            tool_store,
            material_store,
            catalog_api,
        })
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn api(&self) -> &CatalogApi {
        &self.catalog_api
    }

    pub fn is_cached(&self) -> bool {
        self.tool_store.is_cached() && self.material_store.is_cached()
    }

    /// 结束会话并释放缓存连接
    pub fn close(self) {
        tracing::info!(
            "关闭目录会话，刀具库: {}，材料库: {}",
            self.tool_store.path().display(),
            self.material_store.path().display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use rusqlite::Connection;

    fn config_for(dir: &std::path::Path, cache: bool) -> CatalogConfig {
        CatalogConfig {
            tool_db_path: dir.join("tools.db"),
            material_db_path: dir.join("materials.db"),
            cache_connections: cache,
        }
    }

    #[test]
    fn test_per_operation_session_defers_open() {
        let dir = tempfile::tempdir().unwrap();
        let session = CatalogSession::open(config_for(dir.path(), false)).unwrap();
        assert!(!session.is_cached());

        // 文件不存在,首次操作时报告
        let err = session.api().get_tool_catalog_view().unwrap_err();
        assert!(matches!(err, ApiError::StorageUnavailable { .. }));
    }

    #[test]
    fn test_cached_session_opens_eagerly() {
        let dir = tempfile::tempdir().unwrap();
        let err = CatalogSession::open(config_for(dir.path(), true)).err().unwrap();
        assert!(matches!(err, ApiError::StorageUnavailable { .. }));

        for file in ["tools.db", "materials.db"] {
            Connection::open(dir.path().join(file))
                .unwrap()
                .execute_batch("CREATE TABLE Placeholder (id INTEGER);")
                .unwrap();
        }
        let session = CatalogSession::open(config_for(dir.path(), true)).unwrap();
        assert!(session.is_cached());
        assert!(session.api().list_tool_materials().is_err());
        session.close();
    }
}
