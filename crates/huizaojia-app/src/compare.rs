// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use anyhow::{Context, Result, anyhow, bail};

use crate::ids::RowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CostSide {
    Contract,
    Audit,
}

impl CostSide {
    pub const ALL: [Self; 2] = [Self::Contract, Self::Audit];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contract => "contract",
            Self::Audit => "audit",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "contract" => Some(Self::Contract),
            "audit" => Some(Self::Audit),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Contract => "合同价",
            Self::Audit => "送审价",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeeField {
    Labor,
    Material,
    Machinery,
    Management,
    Profit,
    Subtotal,
    Total,
}

impl FeeField {
    pub const ALL: [Self; 7] = [
        Self::Labor,
        Self::Material,
        Self::Machinery,
        Self::Management,
        Self::Profit,
        Self::Subtotal,
        Self::Total,
    ];

    /// The five fee components that sum to the subtotal.
    pub const FEES: [Self; 5] = [
        Self::Labor,
        Self::Material,
        Self::Machinery,
        Self::Management,
        Self::Profit,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Labor => "labor",
            Self::Material => "material",
            Self::Machinery => "machinery",
            Self::Management => "management",
            Self::Profit => "profit",
            Self::Subtotal => "subtotal",
            Self::Total => "total",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "labor" => Some(Self::Labor),
            "material" => Some(Self::Material),
            "machinery" => Some(Self::Machinery),
            "management" => Some(Self::Management),
            "profit" => Some(Self::Profit),
            "subtotal" => Some(Self::Subtotal),
            "total" => Some(Self::Total),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Labor => "人工费",
            Self::Material => "材料费",
            Self::Machinery => "机械费",
            Self::Management => "管理费",
            Self::Profit => "利润",
            Self::Subtotal => "综合单价",
            Self::Total => "合价",
        }
    }

    pub const fn is_editable(self) -> bool {
        !matches!(self, Self::Subtotal | Self::Total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CostDetail {
    pub labor: f64,
    pub material: f64,
    pub machinery: f64,
    pub management: f64,
    pub profit: f64,
    pub subtotal: f64,
    pub total: f64,
}

impl CostDetail {
    pub fn from_fees(fees: [f64; 5], quantity: f64) -> Self {
        let [labor, material, machinery, management, profit] = fees;
        let mut detail = Self {
            labor,
            material,
            machinery,
            management,
            profit,
            ..Self::default()
        };
        detail.recompute(quantity);
        detail
    }

    /// Re-derives `subtotal` from the five fees and `total` from the
    /// subtotal and quantity.
    pub fn recompute(&mut self, quantity: f64) {
        self.subtotal = self.labor + self.material + self.machinery + self.management + self.profit;
        self.total = (self.subtotal * quantity).round();
    }

    pub const fn get(&self, field: FeeField) -> f64 {
        match field {
            FeeField::Labor => self.labor,
            FeeField::Material => self.material,
            FeeField::Machinery => self.machinery,
            FeeField::Management => self.management,
            FeeField::Profit => self.profit,
            FeeField::Subtotal => self.subtotal,
            FeeField::Total => self.total,
        }
    }

    fn fee_mut(&mut self, field: FeeField) -> Option<&mut f64> {
        match field {
            FeeField::Labor => Some(&mut self.labor),
            FeeField::Material => Some(&mut self.material),
            FeeField::Machinery => Some(&mut self.machinery),
            FeeField::Management => Some(&mut self.management),
            FeeField::Profit => Some(&mut self.profit),
            FeeField::Subtotal | FeeField::Total => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MarkColor {
    Red,
    Yellow,
    Green,
    Blue,
}

impl MarkColor {
    pub const ALL: [Self; 4] = [Self::Red, Self::Yellow, Self::Green, Self::Blue];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Red => "红色",
            Self::Yellow => "黄色",
            Self::Green => "绿色",
            Self::Blue => "蓝色",
        }
    }
}

/// Identifies one numeric cell, written `rowId|field|side`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub row_id: RowId,
    pub field: FeeField,
    pub side: CostSide,
}

impl CellKey {
    pub const fn new(row_id: RowId, field: FeeField, side: CostSide) -> Self {
        Self {
            row_id,
            field,
            side,
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        let mut parts = value.split('|');
        let (Some(row), Some(field), Some(side), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            bail!("cell key {value:?} must look like rowId|field|side");
        };
        let row_id = row
            .parse::<i64>()
            .with_context(|| format!("cell key {value:?} has a non-numeric row id"))?;
        let field = FeeField::parse(field)
            .ok_or_else(|| anyhow!("cell key {value:?} names unknown field {field:?}"))?;
        let side = CostSide::parse(side)
            .ok_or_else(|| anyhow!("cell key {value:?} names unknown side {side:?}"))?;
        Ok(Self::new(RowId::new(row_id), field, side))
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            self.row_id,
            self.field.as_str(),
            self.side.as_str()
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub id: RowId,
    pub index: usize,
    pub code: String,
    pub name: String,
    pub unit: String,
    pub quantity: f64,
    pub contract: CostDetail,
    pub audit: CostDetail,
    pub marks: BTreeMap<(FeeField, CostSide), MarkColor>,
}

impl ComparisonRow {
    pub const fn side(&self, side: CostSide) -> &CostDetail {
        match side {
            CostSide::Contract => &self.contract,
            CostSide::Audit => &self.audit,
        }
    }

    fn side_mut(&mut self, side: CostSide) -> &mut CostDetail {
        match side {
            CostSide::Contract => &mut self.contract,
            CostSide::Audit => &mut self.audit,
        }
    }

    pub fn mark(&self, field: FeeField, side: CostSide) -> Option<MarkColor> {
        self.marks.get(&(field, side)).copied()
    }

    pub fn difference_count(&self) -> usize {
        FeeField::ALL
            .iter()
            .filter(|field| differs(self, **field))
            .count()
    }
}

/// Plain per-field inequality between the two sides of a row.
pub fn differs(row: &ComparisonRow, field: FeeField) -> bool {
    row.contract.get(field) != row.audit.get(field)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextMenu {
    pub x: u16,
    pub y: u16,
    pub row_id: RowId,
    pub cell: CellKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SelectionSummary {
    pub count: usize,
    pub sum: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTable {
    pub rows: Vec<ComparisonRow>,
    pub selection: BTreeSet<CellKey>,
    pub dragging: bool,
    pub context_menu: Option<ContextMenu>,
    pub highlighted_row: Option<RowId>,
    pub visible_fees: BTreeSet<FeeField>,
    pub file_changed: bool,
}

impl Default for ComparisonTable {
    fn default() -> Self {
        Self::new(seed_rows())
    }
}

impl ComparisonTable {
    pub fn new(rows: Vec<ComparisonRow>) -> Self {
        Self {
            rows,
            selection: BTreeSet::new(),
            dragging: false,
            context_menu: None,
            highlighted_row: None,
            visible_fees: FeeField::FEES.into_iter().collect(),
            file_changed: false,
        }
    }

    pub fn row(&self, row_id: RowId) -> Option<&ComparisonRow> {
        self.rows.iter().find(|row| row.id == row_id)
    }

    pub fn cell_value(&self, cell: CellKey) -> Option<f64> {
        self.row(cell.row_id)
            .map(|row| row.side(cell.side).get(cell.field))
    }

    /// Fields shown as columns, in display order. Subtotal and total are
    /// always visible.
    pub fn visible_fields(&self) -> Vec<FeeField> {
        FeeField::ALL
            .into_iter()
            .filter(|field| !field.is_editable() || self.visible_fees.contains(field))
            .collect()
    }

    pub fn toggle_fee_column(&mut self, field: FeeField) -> bool {
        if !field.is_editable() {
            return true;
        }
        if self.visible_fees.remove(&field) {
            false
        } else {
            self.visible_fees.insert(field);
            true
        }
    }

    pub fn begin_drag(&mut self, cell: CellKey) {
        self.selection.clear();
        self.selection.insert(cell);
        self.dragging = true;
    }

    pub fn hover(&mut self, cell: CellKey) {
        if self.dragging {
            self.selection.insert(cell);
        }
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.dragging = false;
    }

    pub fn selection_summary(&self) -> SelectionSummary {
        self.selection
            .iter()
            .filter_map(|cell| self.cell_value(*cell))
            .fold(SelectionSummary::default(), |acc, value| SelectionSummary {
                count: acc.count + 1,
                sum: acc.sum + value,
            })
    }

    pub fn open_context_menu(&mut self, x: u16, y: u16, row_id: RowId, cell: CellKey) {
        self.context_menu = Some(ContextMenu {
            x,
            y,
            row_id,
            cell,
        });
    }

    pub fn close_context_menu(&mut self) {
        self.context_menu = None;
    }

    /// Marks the context menu's cell with `color` and closes the menu.
    pub fn apply_mark(&mut self, color: MarkColor) -> Option<CellKey> {
        let menu = self.context_menu.take()?;
        let row = self.rows.iter_mut().find(|row| row.id == menu.row_id)?;
        row.marks.insert((menu.cell.field, menu.cell.side), color);
        Some(menu.cell)
    }

    pub fn clear_mark(&mut self, cell: CellKey) -> bool {
        self.rows
            .iter_mut()
            .find(|row| row.id == cell.row_id)
            .is_some_and(|row| row.marks.remove(&(cell.field, cell.side)).is_some())
    }

    pub fn clear_all_marks(&mut self) {
        for row in &mut self.rows {
            row.marks.clear();
        }
    }

    /// Writes one fee of one side and re-derives that side's subtotal and
    /// total.
    pub fn edit_cell(&mut self, cell: CellKey, value: f64) -> Result<()> {
        if !value.is_finite() {
            bail!("{} must be a finite number", cell.field.label());
        }
        let row = self
            .rows
            .iter_mut()
            .find(|row| row.id == cell.row_id)
            .ok_or_else(|| anyhow!("row {} does not exist", cell.row_id))?;
        let quantity = row.quantity;
        let detail = row.side_mut(cell.side);
        let Some(slot) = detail.fee_mut(cell.field) else {
            bail!(
                "{} is derived from the fees and cannot be edited",
                cell.field.label()
            );
        };
        *slot = value;
        detail.recompute(quantity);
        self.file_changed = true;
        Ok(())
    }

    pub fn highlight_row(&mut self, row_id: RowId) -> Option<usize> {
        let position = self.rows.iter().position(|row| row.id == row_id)?;
        self.highlighted_row = Some(row_id);
        Some(position)
    }

    pub fn totals(&self, side: CostSide) -> f64 {
        self.rows.iter().map(|row| row.side(side).total).sum()
    }
}

fn row(
    id: i64,
    code: &str,
    name: &str,
    unit: &str,
    quantity: f64,
    contract: [f64; 5],
    audit: [f64; 5],
) -> ComparisonRow {
    ComparisonRow {
        id: RowId::new(id),
        index: id as usize,
        code: code.to_owned(),
        name: name.to_owned(),
        unit: unit.to_owned(),
        quantity,
        contract: CostDetail::from_fees(contract, quantity),
        audit: CostDetail::from_fees(audit, quantity),
        marks: BTreeMap::new(),
    }
}

pub fn seed_rows() -> Vec<ComparisonRow> {
    vec![
        row(
            1,
            "010302001001",
            "泥浆护壁成孔灌注桩",
            "m",
            698.0,
            [28.5, 45.2, 12.8, 6.4, 3.2],
            [26.0, 45.2, 12.8, 6.1, 3.0],
        ),
        row(
            2,
            "010501003001",
            "独立基础",
            "m3",
            125.6,
            [86.4, 412.5, 8.6, 21.3, 10.7],
            [86.4, 398.0, 8.6, 20.5, 10.2],
        ),
        row(
            3,
            "010515001001",
            "现浇构件钢筋",
            "t",
            42.35,
            [865.0, 4120.0, 65.5, 215.4, 108.2],
            [820.0, 4120.0, 65.5, 205.1, 103.0],
        ),
        row(
            4,
            "011101001001",
            "水泥砂浆楼地面",
            "m2",
            1860.0,
            [12.6, 18.4, 0.8, 1.6, 0.8],
            [12.6, 18.4, 0.8, 1.6, 0.8],
        ),
        row(
            5,
            "030404017001",
            "配电箱",
            "台",
            1.0,
            [320.0, 18120.0, 0.0, 243.1, 121.36],
            [180.0, 560.0, 0.0, 59.5, 29.96],
        ),
        row(
            6,
            "030411001001",
            "配管",
            "m",
            2350.0,
            [4.2, 6.8, 0.3, 0.6, 0.3],
            [4.2, 6.5, 0.3, 0.6, 0.3],
        ),
    ]
}
