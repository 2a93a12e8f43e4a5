// ==========================================
// 刀具数据库目录 - 层级选择器
// ==========================================
// 职责: 将材料目录视图逐级收窄到唯一一行
// 顺序: 材料组 → 子组 → 质量 → 材料显示标签（固定,不可重排）
// 说明: 不同材料可能合成出相同的显示标签,
//       此时返回 AmbiguousSelection 并附带全部 material_id,
//       调用方在 Selection.material_id 中指定即可唯一确定
// ==========================================

use crate::domain::table::{CatalogRow, ColumnRef, FlattenedView, Schema};
use crate::domain::types::Value;
use crate::engine::catalog_views::material_columns;
use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

// ==========================================
// SelectionStage - 选择阶段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStage {
    Group,
    SubGroup,
    Quality,
    Material,
}

impl SelectionStage {
    pub const ORDER: [SelectionStage; 4] = [
        SelectionStage::Group,
        SelectionStage::SubGroup,
        SelectionStage::Quality,
        SelectionStage::Material,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionStage::Group => "group",
            SelectionStage::SubGroup => "sub_group",
            SelectionStage::Quality => "quality",
            SelectionStage::Material => "material",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "group" => Some(SelectionStage::Group),
            "sub_group" | "subgroup" | "sub-group" => Some(SelectionStage::SubGroup),
            "quality" => Some(SelectionStage::Quality),
            "material" | "label" => Some(SelectionStage::Material),
            _ => None,
        }
    }
}

impl fmt::Display for SelectionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// Selection - 调用方的逐级选择
// ==========================================
// 未填写的阶段不参与过滤
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub group: Option<String>,
    pub sub_group: Option<String>,
    pub quality: Option<String>,
    pub material_label: Option<String>,
    pub material_id: Option<i64>,
}

impl Selection {
    pub fn value_for(&self, stage: SelectionStage) -> Option<&str> {
        match stage {
            SelectionStage::Group => self.group.as_deref(),
            SelectionStage::SubGroup => self.sub_group.as_deref(),
            SelectionStage::Quality => self.quality.as_deref(),
            SelectionStage::Material => self.material_label.as_deref(),
        }
    }
}

// ==========================================
// MaterialOption - 材料阶段的候选项
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialOption {
    pub label: String,
    pub material_id: Option<i64>,
}

// ==========================================
// 视图列定位（每个视图解析一次）
// ==========================================
struct SelectorColumns {
    group: usize,
    sub_group: usize,
    quality: usize,
    national: Vec<usize>,
    hardness_min: Option<usize>,
    hardness_max: Option<usize>,
    material_id: Option<usize>,
}

impl SelectorColumns {
    fn resolve(schema: &Schema) -> EngineResult<Self> {
        let required = |column: ColumnRef| {
            schema.position_of(&column).ok_or_else(|| {
                EngineError::schema_mismatch(&column.origin, format!("缺少列: {}", column))
            })
        };

        Ok(Self {
            group: required(material_columns::group_name())?,
            sub_group: required(material_columns::sub_group_name())?,
            quality: required(material_columns::quality_name())?,
            national: material_columns::national_names()
                .iter()
                .filter_map(|c| schema.position_of(c))
                .collect(),
            hardness_min: schema.position_of(&material_columns::hardness_min()),
            hardness_max: schema.position_of(&material_columns::hardness_max()),
            material_id: schema.position_of(&material_columns::material_id()),
        })
    }

    fn stage_value(&self, stage: SelectionStage, values: &[Value]) -> Option<String> {
        match stage {
            SelectionStage::Group => values[self.group].as_non_empty_text(),
            SelectionStage::SubGroup => values[self.sub_group].as_non_empty_text(),
            SelectionStage::Quality => values[self.quality].as_non_empty_text(),
            SelectionStage::Material => Some(self.display_label(values)),
        }
    }

    /// 首个非空国家标准牌号
    fn national_name(&self, values: &[Value]) -> Option<String> {
        self.national
            .iter()
            .find_map(|&i| values[i].as_non_empty_text())
    }

    /// 提升子级名称的回退: 质量 → 子组 → 材料组
    fn fallback_name(&self, values: &[Value]) -> Option<String> {
        [self.quality, self.sub_group, self.group]
            .iter()
            .find_map(|&i| values[i].as_non_empty_text())
    }

    /// 显示标签: 首个非空牌号,否则材料组（父级）名称
    fn display_label(&self, values: &[Value]) -> String {
        let base = self
            .national_name(values)
            .or_else(|| values[self.group].as_non_empty_text())
            .unwrap_or_default();

        let min = self.hardness_min.and_then(|i| values[i].as_non_empty_text());
        let max = self.hardness_max.and_then(|i| values[i].as_non_empty_text());
        match (min, max) {
            (Some(min), Some(max)) => format!("{} ({} - {})", base, min, max),
            (Some(min), None) => format!("{} (>= {})", base, min),
            (None, Some(max)) => format!("{} (<= {})", base, max),
            (None, None) => base,
        }
    }

    fn material_id(&self, values: &[Value]) -> Option<i64> {
        self.material_id.and_then(|i| values[i].as_i64())
    }
}

// ==========================================
// HierarchicalSelector - 层级选择器
// ==========================================
// 无状态; 每次调用都基于传入视图重新计算
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchicalSelector;

impl HierarchicalSelector {
    pub fn new() -> Self {
        Self
    }

    /// 合成单行的材料显示标签
    pub fn display_label(row: &CatalogRow) -> EngineResult<String> {
        let columns = SelectorColumns::resolve(row.schema())?;
        Ok(columns.display_label(row.values()))
    }

    /// 提升用子级名称: 首个非空国家标准牌号,否则回退到质量/子组/材料组名称
    ///
    /// 与显示标签的回退不同,这里优先取最细一级的名称,避免与父级（材料组）同名
    pub fn material_name(row: &CatalogRow) -> EngineResult<Option<String>> {
        let columns = SelectorColumns::resolve(row.schema())?;
        let values = row.values();
        Ok(columns
            .national_name(values)
            .or_else(|| columns.fallback_name(values)))
    }

    /// 按选择过滤到 `stage` 之前的所有阶段
    ///
    /// # 返回
    /// - Ok(FlattenedView): 幸存行（至少一行）
    /// - Err(NoCandidates): 输入为空或某一级过滤后为空
    pub fn filter_before(
        &self,
        view: &FlattenedView,
        selection: &Selection,
        stage: SelectionStage,
    ) -> EngineResult<FlattenedView> {
        let columns = SelectorColumns::resolve(view.schema())?;
        if view.is_empty() {
            return Err(EngineError::NoCandidates {
                stage: SelectionStage::Group.to_string(),
                value: String::new(),
            });
        }

        let mut current = view.clone();
        for step in SelectionStage::ORDER.iter().take_while(|s| **s != stage) {
            let Some(wanted) = selection.value_for(*step) else {
                continue;
            };

            let next =
                current.filter_rows(|values| columns.stage_value(*step, values).as_deref() == Some(wanted));
            debug!(
                stage = %step,
                value = wanted,
                before = current.row_count(),
                after = next.row_count(),
                "选择过滤"
            );
            if next.is_empty() {
                return Err(EngineError::NoCandidates {
                    stage: step.to_string(),
                    value: wanted.to_string(),
                });
            }
            current = next;
        }
        Ok(current)
    }

    /// 列出某一阶段的可选值（首次出现顺序去重,空值不列出）
    pub fn options(
        &self,
        view: &FlattenedView,
        stage: SelectionStage,
        selection: &Selection,
    ) -> EngineResult<Vec<String>> {
        let columns = SelectorColumns::resolve(view.schema())?;
        let surviving = self.filter_before(view, selection, stage)?;

        let mut seen = HashSet::new();
        Ok(surviving
            .rows()
            .iter()
            .filter_map(|values| columns.stage_value(stage, values))
            .filter(|value| seen.insert(value.clone()))
            .collect())
    }

    /// 材料阶段候选项（标签 + material_id,同名标签逐行列出）
    pub fn material_options(
        &self,
        view: &FlattenedView,
        selection: &Selection,
    ) -> EngineResult<Vec<MaterialOption>> {
        let columns = SelectorColumns::resolve(view.schema())?;
        let surviving = self.filter_before(view, selection, SelectionStage::Material)?;

        Ok(surviving
            .rows()
            .iter()
            .map(|values| MaterialOption {
                label: columns.display_label(values),
                material_id: columns.material_id(values),
            })
            .collect())
    }

    /// 逐级收窄到唯一一行
    ///
    /// # 返回
    /// - Ok(CatalogRow): 唯一候选行
    /// - Err(NoCandidates): 任一级结果为空
    /// - Err(AmbiguousSelection): 全部过滤后仍有多行
    pub fn narrow(&self, view: &FlattenedView, selection: &Selection) -> EngineResult<CatalogRow> {
        let columns = SelectorColumns::resolve(view.schema())?;
        // 标签阶段在下面单独过滤
        let mut current = self.filter_before(view, selection, SelectionStage::Material)?;

        if let Some(label) = selection.material_label.as_deref() {
            current = current.filter_rows(|values| columns.display_label(values) == label);
            if current.is_empty() {
                return Err(EngineError::NoCandidates {
                    stage: SelectionStage::Material.to_string(),
                    value: label.to_string(),
                });
            }
        }

        if let Some(id) = selection.material_id {
            current = current.filter_rows(|values| columns.material_id(values) == Some(id));
            if current.is_empty() {
                return Err(EngineError::NoCandidates {
                    stage: "material_id".to_string(),
                    value: id.to_string(),
                });
            }
        }

        if current.row_count() > 1 {
            return Err(EngineError::AmbiguousSelection {
                label: selection.material_label.clone().unwrap_or_default(),
                material_ids: current
                    .rows()
                    .iter()
                    .map(|values| columns.material_id(values))
                    .collect(),
            });
        }

        current.row(0).ok_or_else(|| EngineError::NoCandidates {
            stage: SelectionStage::Material.to_string(),
            value: selection.material_label.clone().unwrap_or_default(),
        })
    }
}
