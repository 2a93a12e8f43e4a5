// ==========================================
// 刀具数据库目录 - 材料领域模型
// ==========================================
// 对齐: 刀具库 Materials 表
// 层级: type=1 父级分类 (parent_id = NULL), type=2 子级实例 (parent_id → 父级)
// ==========================================

use crate::domain::types::MaterialType;
use serde::{Deserialize, Serialize};

/// 父级分类行的固定备注
pub const PARENT_CLASS_COMMENT: &str = "Parent Class";

/// mat_db_obj_guid 占位值（16 字节全零）
pub const PLACEHOLDER_GUID: [u8; 16] = [0u8; 16];

/// 缺失切削系数时写入的中性倍率
pub const NEUTRAL_FACTOR: f64 = 1.0;

// ==========================================
// MachiningFactors - 切削系数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MachiningFactors {
    pub milling_vc: f64,
    pub milling_fz: f64,
    pub milling_ae: f64,
    pub milling_ap: f64,
    pub drilling_vc: f64,
    pub drilling_fz: f64,
    pub insert_vc: f64,
    pub insert_fz: f64,
    pub insert_ae: f64,
    pub insert_ap: f64,
}

impl Default for MachiningFactors {
    fn default() -> Self {
        Self {
            milling_vc: NEUTRAL_FACTOR,
            milling_fz: NEUTRAL_FACTOR,
            milling_ae: NEUTRAL_FACTOR,
            milling_ap: NEUTRAL_FACTOR,
            drilling_vc: NEUTRAL_FACTOR,
            drilling_fz: NEUTRAL_FACTOR,
            insert_vc: NEUTRAL_FACTOR,
            insert_fz: NEUTRAL_FACTOR,
            insert_ae: NEUTRAL_FACTOR,
            insert_ap: NEUTRAL_FACTOR,
        }
    }
}

impl MachiningFactors {
    /// 列名顺序与 Materials 表一致
    pub const COLUMNS: [&'static str; 10] = [
        "milling_factor_vc",
        "milling_factor_fz",
        "milling_factor_ae",
        "milling_factor_ap",
        "drilling_factor_vc",
        "drilling_factor_fz",
        "insert_factor_vc",
        "insert_factor_fz",
        "insert_factor_ae",
        "insert_factor_ap",
    ];

    pub fn to_array(&self) -> [f64; 10] {
        [
            self.milling_vc,
            self.milling_fz,
            self.milling_ae,
            self.milling_ap,
            self.drilling_vc,
            self.drilling_fz,
            self.insert_vc,
            self.insert_fz,
            self.insert_ae,
            self.insert_ap,
        ]
    }

    pub fn from_array(values: [f64; 10]) -> Self {
        Self {
            milling_vc: values[0],
            milling_fz: values[1],
            milling_ae: values[2],
            milling_ap: values[3],
            drilling_vc: values[4],
            drilling_fz: values[5],
            insert_vc: values[6],
            insert_fz: values[7],
            insert_ae: values[8],
            insert_ap: values[9],
        }
    }
}

// ==========================================
// ToolMaterial - 刀具库 Materials 表中的一行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMaterial {
    pub id: i64,
    pub material_type: MaterialType,
    pub name: String,
    pub norm_code: Option<String>,
    pub comment: Option<String>,
    pub obj_guid: Vec<u8>,
    pub parent_id: Option<i64>,
    pub chipping_class: Option<i64>,
}

// ==========================================
// NewMaterial - 待插入的材料行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMaterial {
    pub id: i64,
    pub material_type: MaterialType,
    pub name: String,
    pub norm_code: Option<String>,
    pub comment: String,
    pub obj_guid: [u8; 16],
    pub parent_id: Option<i64>,
    pub mat_db_obj_guid: [u8; 16],
    pub chipping_class: i64,
    pub factors: MachiningFactors,
}

// ==========================================
// PromotionCandidate - 从材料目录选中的一行
// ==========================================
// 用途: 材料提升引擎输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionCandidate {
    pub source_material_id: Option<i64>, // 材料目录中的 material_id（仅用于追溯）
    pub child_name: String,              // 首个非空国家标准牌号,否则回退到质量名称
    pub parent_name: String,             // 顶层（材料组）显示名称
    pub norm_code: Option<String>,
    pub chipping_class: i64,
    pub factors: MachiningFactors,
}

// ==========================================
// PromotionOutcome - 材料提升结果
// ==========================================
// AlreadyExists 不是错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromotionOutcome {
    Created { id: i64, parent_id: i64 },
    AttachedAsChild { id: i64, parent_id: i64 },
    AlreadyExists { name: String },
}

impl PromotionOutcome {
    /// 本次写入的行数
    pub fn rows_written(&self) -> usize {
        match self {
            PromotionOutcome::Created { .. } => 2,
            PromotionOutcome::AttachedAsChild { .. } => 1,
            PromotionOutcome::AlreadyExists { .. } => 0,
        }
    }
}
