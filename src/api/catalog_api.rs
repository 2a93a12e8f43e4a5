// ==========================================
// 刀具数据库目录 - 目录 API
// ==========================================
// 职责: 目录视图查询、层级选择、材料提升
// 约束:
// - 视图每次调用由快照重建,不缓存
// - 写操作只有 promote_material 一个入口
// ==========================================

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::material::{PromotionOutcome, ToolMaterial};
use crate::domain::table::{CatalogRow, FlattenedView, TableSet};
use crate::engine::catalog_views::{
    self, material_catalog_plan, tool_catalog_plan, tool_summary_columns,
};
use crate::engine::join::JoinPlan;
use crate::engine::promotion::MaterialPromotionEngine;
use crate::engine::selector::{HierarchicalSelector, MaterialOption, Selection, SelectionStage};
use crate::repository::material_repo::ToolMaterialRepository;
use crate::repository::snapshot_repo::SnapshotRepository;

/// 刀具库中可直接浏览的原始表
pub const BROWSABLE_TOOL_TABLES: [&str; 5] = ["Folders", "Materials", "Tools", "NCTools", "Holders"];

// ==========================================
// CatalogSource - 数据来源库
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    ToolDb,
    MaterialDb,
}

impl CatalogSource {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "tool" | "tools" | "tool_db" => Some(CatalogSource::ToolDb),
            "material" | "materials" | "material_db" => Some(CatalogSource::MaterialDb),
            _ => None,
        }
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogSource::ToolDb => write!(f, "tool_db"),
            CatalogSource::MaterialDb => write!(f, "material_db"),
        }
    }
}

// ==========================================
// CatalogApi - 目录 API
// ==========================================

/// 目录API
///
/// 职责：
/// 1. 刀具目录视图（完整 / 摘要）
/// 2. 材料目录视图与逐级选择
/// 3. 材料提升到刀具库
pub struct CatalogApi {
    tool_snapshots: Arc<SnapshotRepository>,
    material_snapshots: Arc<SnapshotRepository>,
    tool_materials: Arc<ToolMaterialRepository>,
    promotion_engine: Arc<MaterialPromotionEngine>,
    selector: HierarchicalSelector,
}

impl CatalogApi {
    /// 创建新的CatalogApi实例
    ///
    /// # 参数
    /// - tool_snapshots: 刀具库快照仓储
    /// - material_snapshots: 材料目录库快照仓储
    /// - tool_materials: 刀具库材料仓储
    /// - promotion_engine: 材料提升引擎
    pub fn new(
        tool_snapshots: Arc<SnapshotRepository>,
        material_snapshots: Arc<SnapshotRepository>,
        tool_materials: Arc<ToolMaterialRepository>,
        promotion_engine: Arc<MaterialPromotionEngine>,
    ) -> Self {
        Self {
            tool_snapshots,
            material_snapshots,
            tool_materials,
            promotion_engine,
            selector: HierarchicalSelector::new(),
        }
    }

    // ==========================================
    // 刀具目录
    // ==========================================

    /// 完整刀具目录视图
    ///
    /// # 返回
    /// - Err(MissingRelation): 刀具库缺少任一参与连接的表
    /// - Err(StorageUnavailable): 刀具库无法打开
    pub fn get_tool_catalog_view(&self) -> ApiResult<FlattenedView> {
        let tables = load_plan_tables(&self.tool_snapshots, &tool_catalog_plan())?;
        Ok(catalog_views::build_tool_catalog(&tables)?)
    }

    /// 刀具目录摘要（purpose / 刀具名 / 几何分类 / 总长 / 刀长 / 刀柄名）
    pub fn get_tool_catalog_summary(&self) -> ApiResult<FlattenedView> {
        let view = self.get_tool_catalog_view()?;
        Ok(catalog_views::project(&view, &tool_summary_columns())?)
    }

    // ==========================================
    // 材料目录
    // ==========================================

    /// 材料目录视图（切屑分类 id 已整数化）
    pub fn get_material_catalog_view(&self) -> ApiResult<FlattenedView> {
        let tables = load_plan_tables(&self.material_snapshots, &material_catalog_plan())?;
        Ok(catalog_views::build_material_catalog(&tables)?)
    }

    /// 某一选择阶段的可选值
    ///
    /// # 参数
    /// - view: 材料目录视图
    /// - stage: 目标阶段
    /// - selection: 之前各阶段的选择
    pub fn list_options(
        &self,
        view: &FlattenedView,
        stage: SelectionStage,
        selection: &Selection,
    ) -> ApiResult<Vec<String>> {
        let options = self.selector.options(view, stage, selection)?;
        debug!(stage = %stage, count = options.len(), "可选值已计算");
        Ok(options)
    }

    /// 材料阶段候选项（带 material_id,用于区分同名标签）
    pub fn list_material_options(
        &self,
        view: &FlattenedView,
        selection: &Selection,
    ) -> ApiResult<Vec<MaterialOption>> {
        Ok(self.selector.material_options(view, selection)?)
    }

    /// 逐级收窄到唯一一行
    pub fn narrow(&self, view: &FlattenedView, selection: &Selection) -> ApiResult<CatalogRow> {
        Ok(self.selector.narrow(view, selection)?)
    }

    // ==========================================
    // 材料提升
    // ==========================================

    /// 将选中的材料目录行写入刀具库
    ///
    /// # 参数
    /// - row: 选中的材料目录行
    /// - comment: 子级行备注
    ///
    /// # 返回
    /// - Ok(AlreadyExists): 未写入（不是错误）
    /// - Err(PersistenceError): 写入失败,事务已回滚
    pub fn promote_material(&self, row: &CatalogRow, comment: &str) -> ApiResult<PromotionOutcome> {
        let outcome = self.promotion_engine.promote_row(row, comment)?;
        info!(outcome = ?outcome, "材料提升请求已处理");
        Ok(outcome)
    }

    /// 选择并提升（重建材料视图 → 收窄 → 提升）
    pub fn promote_selection(
        &self,
        selection: &Selection,
        comment: &str,
    ) -> ApiResult<PromotionOutcome> {
        let view = self.get_material_catalog_view()?;
        let row = self.narrow(&view, selection)?;
        self.promote_material(&row, comment)
    }

    // ==========================================
    // 原始数据浏览
    // ==========================================

    /// 刀具库 Materials 表（按 id 升序）
    pub fn list_tool_materials(&self) -> ApiResult<Vec<ToolMaterial>> {
        Ok(self.tool_materials.list_all()?)
    }

    /// 读取原始表
    ///
    /// # 参数
    /// - source: 来源库
    /// - table: 表名（刀具库限于可浏览表）
    pub fn read_raw_table(&self, source: CatalogSource, table: &str) -> ApiResult<FlattenedView> {
        if table.trim().is_empty() {
            return Err(ApiError::InvalidInput("表名不能为空".to_string()));
        }

        let repo = match source {
            CatalogSource::ToolDb => {
                if !BROWSABLE_TOOL_TABLES.contains(&table) {
                    return Err(ApiError::InvalidInput(format!(
                        "刀具库表{}不可浏览,可选: {}",
                        table,
                        BROWSABLE_TOOL_TABLES.join(", ")
                    )));
                }
                &self.tool_snapshots
            }
            CatalogSource::MaterialDb => &self.material_snapshots,
        };

        let snapshot = repo.read_table(table)?;
        Ok(FlattenedView::from_table(snapshot))
    }

    /// 列出来源库中的全部表
    pub fn list_tables(&self, source: CatalogSource) -> ApiResult<Vec<String>> {
        let repo = match source {
            CatalogSource::ToolDb => &self.tool_snapshots,
            CatalogSource::MaterialDb => &self.material_snapshots,
        };
        Ok(repo.list_tables()?)
    }
}

/// 在一次连接内读取连接计划所需的全部表
///
/// 缺表不在此处报错,由连接计划统一报告 MissingRelation
fn load_plan_tables(repo: &SnapshotRepository, plan: &JoinPlan) -> ApiResult<TableSet> {
    let required = plan.required_tables();
    Ok(repo.read_available(&required)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_source_parse() {
        assert_eq!(CatalogSource::parse("Tools"), Some(CatalogSource::ToolDb));
        assert_eq!(CatalogSource::parse("material_db"), Some(CatalogSource::MaterialDb));
        assert_eq!(CatalogSource::parse("nc"), None);
        assert_eq!(CatalogSource::MaterialDb.to_string(), "material_db");
    }
}
