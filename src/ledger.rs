use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::slab::Bin;
use crate::types::{EPSILON, Rect};

/// A slab or plywood sheet opened during one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "kebab-case")]
pub enum StockRef {
    Slab(usize),
    Sheet(usize),
}

impl fmt::Display for StockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockRef::Slab(i) => write!(f, "Slab #{}", i + 1),
            StockRef::Sheet(i) => write!(f, "Sheet #{}", i + 1),
        }
    }
}

/// Unused rectangles per slab and sheet, owned by a single run.
#[derive(Debug, Clone, Default)]
pub struct LeftoverLedger {
    entries: BTreeMap<StockRef, Vec<Rect>>,
}

impl LeftoverLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slabs are consumed lane by lane, so at most one strip is left: the
    /// unused length at the widest lane cut from the slab.
    pub fn remaining_rectangles(bin: &Bin) -> Vec<Rect> {
        let remaining = bin.remaining();
        if remaining > EPSILON {
            vec![Rect::new(remaining, bin.max_lane_width())]
        } else {
            Vec::new()
        }
    }

    pub fn record_bin(&mut self, bin: &Bin) {
        self.entries
            .insert(StockRef::Slab(bin.id), Self::remaining_rectangles(bin));
    }

    pub fn record_sheet(&mut self, index: usize, leftovers: Vec<Rect>) {
        self.entries.insert(StockRef::Sheet(index), leftovers);
    }

    pub fn leftovers(&self, stock: StockRef) -> &[Rect] {
        self.entries.get(&stock).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (StockRef, &[Rect])> {
        self.entries.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub fn total_area(&self) -> f64 {
        self.entries.values().flatten().map(Rect::area).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StockCandidate;
    use crate::types::{Category, Piece};

    fn bin_with(lengths: &[(f64, f64)]) -> Bin {
        let size = StockCandidate::new(108.0, 26.0).unwrap();
        let mut bin = Bin::open(0, "Quartz", 0, size, None);
        for (i, &(len, lane)) in lengths.iter().enumerate() {
            bin.assign(&Piece::new(i + 1, "Quartz", Category::Countertop, len, lane), lane);
        }
        bin
    }

    #[test]
    fn test_slab_leftover_uses_widest_lane() {
        let bin = bin_with(&[(60.0, 25.5), (20.0, 16.0)]);
        let rects = LeftoverLedger::remaining_rectangles(&bin);
        assert_eq!(rects, vec![Rect::new(28.0, 25.5)]);
    }

    #[test]
    fn test_full_slab_leaves_nothing() {
        let bin = bin_with(&[(100.0, 26.0), (8.0, 26.0)]);
        assert!(LeftoverLedger::remaining_rectangles(&bin).is_empty());
    }

    #[test]
    fn test_ledger_totals_slabs_and_sheets() {
        let mut ledger = LeftoverLedger::new();
        ledger.record_bin(&bin_with(&[(98.0, 26.0)]));
        ledger.record_sheet(0, vec![Rect::new(3.0, 24.0), Rect::new(96.0, 24.0)]);
        assert_eq!(ledger.leftovers(StockRef::Slab(0)), &[Rect::new(10.0, 26.0)]);
        assert_eq!(ledger.leftovers(StockRef::Sheet(0)).len(), 2);
        assert!(ledger.leftovers(StockRef::Sheet(3)).is_empty());
        assert!((ledger.total_area() - (260.0 + 72.0 + 2304.0)).abs() < 1e-9);
    }

    #[test]
    fn test_stock_ref_labels_are_one_based() {
        assert_eq!(StockRef::Slab(0).to_string(), "Slab #1");
        assert_eq!(StockRef::Sheet(2).to_string(), "Sheet #3");
    }
}
