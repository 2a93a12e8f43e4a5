// ==========================================
// 刀具数据库目录 - 材料提升引擎
// ==========================================
// 职责: 将材料目录中选中的一行写入刀具库 Materials 表
// 状态: CHECK_CHILD → CHECK_PARENT → { SKIP | ATTACH_CHILD | CREATE_PARENT_AND_CHILD } → COMMITTED
// 红线: Engine 不拼 SQL; 查询与插入通过仓储完成
// 约束:
// - 三个状态在同一事务内按固定顺序执行; 子级已存在时直接跳过,先于任何其它校验
// - 写入失败整体回滚,不留部分行
// - max(id)+1 无行锁,只支持单写入者
// ==========================================

use crate::domain::material::{
    MachiningFactors, NewMaterial, PromotionCandidate, PromotionOutcome, NEUTRAL_FACTOR,
    PARENT_CLASS_COMMENT, PLACEHOLDER_GUID,
};
use crate::domain::table::CatalogRow;
use crate::domain::types::MaterialType;
use crate::engine::catalog_views::material_columns;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::selector::HierarchicalSelector;
use crate::repository::material_repo::{self, ToolMaterialRepository};
use std::fmt;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

// ==========================================
// PromotionPath - 提升路径
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionPath {
    Skip,
    AttachChild,
    CreateParentAndChild,
}

impl fmt::Display for PromotionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromotionPath::Skip => write!(f, "SKIP"),
            PromotionPath::AttachChild => write!(f, "ATTACH_CHILD"),
            PromotionPath::CreateParentAndChild => write!(f, "CREATE_PARENT_AND_CHILD"),
        }
    }
}

/// 从材料目录行提取提升候选
///
/// # 规则
/// - child_name: 首个非空国家标准牌号,否则质量 → 子组 → 材料组名称
/// - parent_name: 材料组名称
/// - 缺失的切削系数按 1.0 处理
pub fn candidate_from_row(row: &CatalogRow) -> EngineResult<PromotionCandidate> {
    let child_name = HierarchicalSelector::material_name(row)?
        .ok_or_else(|| EngineError::InvalidInput("所选材料没有可用名称".to_string()))?;
    let parent_name = row
        .text(&material_columns::group_name())
        .ok_or_else(|| EngineError::InvalidInput("所选材料没有材料组名称".to_string()))?;

    let mut factors = [NEUTRAL_FACTOR; 10];
    for (slot, column) in factors.iter_mut().zip(MachiningFactors::COLUMNS.iter()) {
        if let Some(v) = row
            .get(&material_columns::factor(column))
            .and_then(|v| v.as_f64())
        {
            *slot = v;
        }
    }

    Ok(PromotionCandidate {
        source_material_id: row
            .get(&material_columns::material_id())
            .and_then(|v| v.as_i64()),
        child_name,
        parent_name,
        norm_code: row.text(&material_columns::norm_code()),
        chipping_class: row
            .get(&material_columns::milling_chipping_class())
            .and_then(|v| v.as_i64())
            .unwrap_or(0),
        factors: MachiningFactors::from_array(factors),
    })
}

// ==========================================
// MaterialPromotionEngine - 材料提升引擎
// ==========================================
pub struct MaterialPromotionEngine {
    repo: Arc<ToolMaterialRepository>,
}

impl MaterialPromotionEngine {
    pub fn new(repo: Arc<ToolMaterialRepository>) -> Self {
        Self { repo }
    }

    /// 提升选中的材料目录行
    pub fn promote_row(&self, row: &CatalogRow, comment: &str) -> EngineResult<PromotionOutcome> {
        let candidate = candidate_from_row(row)?;
        self.promote(&candidate, comment)
    }

    /// 提升候选材料
    ///
    /// # 参数
    /// - candidate: 子/父名称及复制字段
    /// - comment: 子级行备注（原样保存）
    ///
    /// # 返回
    /// - Ok(AlreadyExists): 子级已存在,未写入
    /// - Ok(AttachedAsChild): 父级已存在,写入 1 行
    /// - Ok(Created): 写入父级 + 子级 2 行
    /// - Err(Repository(PersistenceError)): 写入失败,事务已回滚
    pub fn promote(
        &self,
        candidate: &PromotionCandidate,
        comment: &str,
    ) -> EngineResult<PromotionOutcome> {
        validate_candidate(candidate)?;

        let decided = self.repo.with_transaction("promote_material", |tx| {
            // CHECK_CHILD
            if material_repo::find_by_name(tx, &candidate.child_name)?.is_some() {
                return Ok(Some((
                    PromotionPath::Skip,
                    PromotionOutcome::AlreadyExists {
                        name: candidate.child_name.clone(),
                    },
                )));
            }

            // 子级不存在且与父级同名: 无法构成两级层次,不写入
            if candidate.child_name == candidate.parent_name {
                return Ok(None);
            }

            // CHECK_PARENT
            let parent = material_repo::find_by_name(tx, &candidate.parent_name)?;
            let next_id = material_repo::next_id(tx)?;

            match parent {
                Some(parent) => {
                    let child = build_row(
                        candidate,
                        next_id,
                        MaterialType::Instance,
                        &candidate.child_name,
                        comment,
                        Some(parent.id),
                    );
                    material_repo::insert_batch(tx, &[child])?;
                    Ok(Some((
                        PromotionPath::AttachChild,
                        PromotionOutcome::AttachedAsChild {
                            id: next_id,
                            parent_id: parent.id,
                        },
                    )))
                }
                None => {
                    let parent_id = next_id;
                    let child_id = next_id + 1;
                    let rows = [
                        build_row(
                            candidate,
                            parent_id,
                            MaterialType::Class,
                            &candidate.parent_name,
                            PARENT_CLASS_COMMENT,
                            None,
                        ),
                        build_row(
                            candidate,
                            child_id,
                            MaterialType::Instance,
                            &candidate.child_name,
                            comment,
                            Some(parent_id),
                        ),
                    ];
                    material_repo::insert_batch(tx, &rows)?;
                    Ok(Some((
                        PromotionPath::CreateParentAndChild,
                        PromotionOutcome::Created {
                            id: child_id,
                            parent_id,
                        },
                    )))
                }
            }
        })?;

        let Some((path, outcome)) = decided else {
            return Err(EngineError::InvalidInput(format!(
                "子级与父级名称相同: {}",
                candidate.child_name
            )));
        };

        info!(
            path = %path,
            child = %candidate.child_name,
            parent = %candidate.parent_name,
            rows_written = outcome.rows_written(),
            "材料提升完成"
        );
        Ok(outcome)
    }
}

fn validate_candidate(candidate: &PromotionCandidate) -> EngineResult<()> {
    if candidate.child_name.trim().is_empty() {
        return Err(EngineError::InvalidInput("子级名称为空".to_string()));
    }
    if candidate.parent_name.trim().is_empty() {
        return Err(EngineError::InvalidInput("父级名称为空".to_string()));
    }
    Ok(())
}

fn build_row(
    candidate: &PromotionCandidate,
    id: i64,
    material_type: MaterialType,
    name: &str,
    comment: &str,
    parent_id: Option<i64>,
) -> NewMaterial {
    NewMaterial {
        id,
        material_type,
        name: name.to_string(),
        norm_code: candidate.norm_code.clone(),
        comment: comment.to_string(),
        obj_guid: *Uuid::new_v4().as_bytes(),
        parent_id,
        mat_db_obj_guid: PLACEHOLDER_GUID,
        chipping_class: candidate.chipping_class,
        factors: candidate.factors,
    }
}
