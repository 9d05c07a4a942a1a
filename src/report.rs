use serde::Serialize;
use std::collections::BTreeMap;

use crate::catalog::StockCandidate;
use crate::error::Warning;
use crate::guillotine::SheetPlan;
use crate::ledger::StockRef;
use crate::solver::CalculationContext;
use crate::types::{Category, Piece, Rect};

/// Material label for plywood sheets in the stock tally.
pub const PLYWOOD: &str = "Plywood";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockCount {
    pub material: String,
    pub size: Rect,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssignmentStatus {
    Placed,
    NoFit,
    NoFitInLockedGroup,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlywoodCut {
    pub sheet: StockRef,
    pub cut: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieceAssignment {
    pub source_index: usize,
    pub material: String,
    pub category: Category,
    pub group: String,
    pub status: AssignmentStatus,
    pub cut: Rect,
    pub source: Option<StockRef>,
    pub stock: Option<Rect>,
    /// Rest of the slab after this cut, in cut order.
    pub leftover: Option<Rect>,
    pub plywood: Option<PlywoodCut>,
}

impl PieceAssignment {
    pub fn source_description(&self) -> String {
        match (self.source, self.stock) {
            (Some(source), Some(stock)) => format!("{} ({})", stock, source),
            _ => match self.status {
                AssignmentStatus::NoFitInLockedGroup => "No fit (locked group)".to_string(),
                AssignmentStatus::Invalid => "Invalid".to_string(),
                _ => "No fit".to_string(),
            },
        }
    }

    pub fn leftover_description(&self) -> String {
        match (self.leftover, self.source) {
            (Some(left), Some(source)) => format!("{} ({})", left, source),
            _ => "-".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationPlan {
    pub stock_counts: Vec<StockCount>,
    pub piece_assignments: Vec<PieceAssignment>,
    pub slab_count: usize,
    pub sheet_count: usize,
    pub total_stock_area: f64,
    pub total_cut_area: f64,
    pub total_leftover_area: f64,
    pub warnings: Vec<Warning>,
}

impl AllocationPlan {
    pub fn waste_percent(&self) -> f64 {
        if self.total_stock_area == 0.0 {
            return 0.0;
        }
        (self.total_stock_area - self.total_cut_area) / self.total_stock_area * 100.0
    }

    pub fn assignment(&self, source_index: usize) -> Option<&PieceAssignment> {
        self.piece_assignments
            .iter()
            .find(|a| a.source_index == source_index)
    }
}

fn status_from(warnings: &[Warning], source_index: usize) -> Option<AssignmentStatus> {
    warnings
        .iter()
        .filter(|w| w.source_index() == source_index && w.blocks_slab())
        .map(|w| match w {
            Warning::InvalidDimension { .. } => AssignmentStatus::Invalid,
            Warning::GroupLockConflict { .. } => AssignmentStatus::NoFitInLockedGroup,
            _ => AssignmentStatus::NoFit,
        })
        .next()
}

/// Aggregates final slabs and sheets. Makes no sizing decisions.
pub fn build(pieces: &[Piece], ctx: &CalculationContext, sheets: &SheetPlan) -> AllocationPlan {
    let mut counts: BTreeMap<(String, StockCandidate), usize> = BTreeMap::new();
    let mut slab_of: BTreeMap<usize, (StockRef, Rect, Rect)> = BTreeMap::new();
    let mut total_stock_area = 0.0;
    let mut total_cut_area = 0.0;

    for bin in &ctx.bins {
        *counts.entry((bin.material.clone(), bin.size())).or_default() += 1;
        total_stock_area += bin.size().area();

        let lane = bin.max_lane_width();
        let mut running = bin.long_side;
        for cut in &bin.cuts {
            running -= cut.length;
            total_cut_area += cut.length * cut.width;
            slab_of.insert(
                cut.source_index,
                (
                    StockRef::Slab(bin.id),
                    bin.size().rect(),
                    Rect::new(running.max(0.0), lane),
                ),
            );
        }
    }

    for sheet in &sheets.sheets {
        let size = StockCandidate {
            long_side: sheet.stock.length.max(sheet.stock.width),
            short_side: sheet.stock.length.min(sheet.stock.width),
        };
        *counts.entry((PLYWOOD.to_string(), size)).or_default() += 1;
        total_stock_area += sheet.stock.area();
        total_cut_area += sheet.used_area();
    }

    let piece_assignments = pieces
        .iter()
        .map(|piece| {
            let slab = slab_of.get(&piece.source_index).copied();
            let status = status_from(&ctx.warnings, piece.source_index).unwrap_or(
                if slab.is_some() {
                    AssignmentStatus::Placed
                } else {
                    AssignmentStatus::NoFit
                },
            );
            let plywood = sheets
                .placement_of(piece.source_index)
                .map(|(i, p)| PlywoodCut {
                    sheet: StockRef::Sheet(i),
                    cut: p.rect,
                });
            PieceAssignment {
                source_index: piece.source_index,
                material: piece.material.clone(),
                category: piece.category,
                group: piece.group.clone(),
                status,
                cut: piece.rect(),
                source: slab.map(|s| s.0),
                stock: slab.map(|s| s.1),
                leftover: slab.map(|s| s.2),
                plywood,
            }
        })
        .collect();

    let stock_counts = counts
        .into_iter()
        .map(|((material, size), count)| StockCount {
            material,
            size: size.rect(),
            count,
        })
        .collect();

    AllocationPlan {
        stock_counts,
        piece_assignments,
        slab_count: ctx.bins.len(),
        sheet_count: sheets.sheet_count(),
        total_stock_area,
        total_cut_area,
        total_leftover_area: ctx.ledger.total_area(),
        warnings: ctx.warnings.clone(),
    }
}
