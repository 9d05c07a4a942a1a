use serde::Serialize;
use thiserror::Error;

use crate::types::{Category, Rect};

/// Contract violations. Business infeasibility never lands here, see [`Warning`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid stock {length}x{width} for {material}/{category}: dimensions must be positive and finite")]
    InvalidStock {
        material: String,
        category: Category,
        length: f64,
        width: f64,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown piece category '{0}'")]
    UnknownCategory(String),

    #[error("piece #{0} appears more than once")]
    DuplicateSourceIndex(usize),
}

/// Per-piece infeasibility, accumulated for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Warning {
    #[error("piece #{source_index}: invalid dimensions {length}x{width}, excluded")]
    InvalidDimension {
        source_index: usize,
        length: f64,
        width: f64,
    },

    #[error("piece #{source_index}: no {category} stock listed for {material}")]
    NoCatalogEntry {
        source_index: usize,
        material: String,
        category: Category,
    },

    #[error("piece #{source_index}: {piece} exceeds every {material} stock size, needs a seam or manual decision")]
    PieceExceedsAllStock {
        source_index: usize,
        material: String,
        piece: Rect,
    },

    #[error("piece #{source_index}: does not fit {locked}, the size locked for group '{group}'")]
    GroupLockConflict {
        source_index: usize,
        group: String,
        locked: Rect,
    },

    #[error("piece #{source_index}: plywood underlayment {piece} is larger than a {sheet} sheet")]
    PlywoodExceedsSheet {
        source_index: usize,
        piece: Rect,
        sheet: Rect,
    },
}

impl Warning {
    pub fn source_index(&self) -> usize {
        match self {
            Warning::InvalidDimension { source_index, .. }
            | Warning::NoCatalogEntry { source_index, .. }
            | Warning::PieceExceedsAllStock { source_index, .. }
            | Warning::GroupLockConflict { source_index, .. }
            | Warning::PlywoodExceedsSheet { source_index, .. } => *source_index,
        }
    }

    /// Whether the warning means the piece received no slab.
    pub fn blocks_slab(&self) -> bool {
        !matches!(self, Warning::PlywoodExceedsSheet { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_messages() {
        let w = Warning::GroupLockConflict {
            source_index: 4,
            group: "A".to_string(),
            locked: Rect::new(108.0, 26.0),
        };
        assert_eq!(
            w.to_string(),
            "piece #4: does not fit 108.00x26.00, the size locked for group 'A'"
        );
        assert_eq!(w.source_index(), 4);
        assert!(w.blocks_slab());
    }

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let w = Warning::NoCatalogEntry {
            source_index: 2,
            material: "Marble".to_string(),
            category: Category::Bartop,
        };
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["kind"], "no-catalog-entry");
        assert_eq!(json["category"], "bartop");
    }
}
