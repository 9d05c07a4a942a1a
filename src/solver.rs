use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::bucket::bucket_pieces;
use crate::catalog::{Catalog, CatalogResolver};
use crate::config::EngineConfig;
use crate::error::{EngineError, Warning};
use crate::guillotine::{SheetPacker, SheetPlan};
use crate::ledger::LeftoverLedger;
use crate::report::{self, AllocationPlan};
use crate::slab::{Bin, GroupLocks, SlabPacker, shrink_bins};
use crate::types::Piece;

/// Mutable state of one calculation run. Never shared between runs.
#[derive(Debug, Default)]
pub struct CalculationContext {
    pub bins: Vec<Bin>,
    pub locks: GroupLocks,
    pub ledger: LeftoverLedger,
    pub warnings: Vec<Warning>,
}

impl CalculationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(%warning, "allocation warning");
        self.warnings.push(warning);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Solution {
    pub plan: AllocationPlan,
    pub slabs: Vec<Bin>,
    pub sheets: SheetPlan,
}

pub struct Solver<'a> {
    catalog: &'a Catalog,
    config: EngineConfig,
}

impl<'a> Solver<'a> {
    pub fn new(catalog: &'a Catalog, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { catalog, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// One "calculate" run over the full piece list. Source indices identify
    /// pieces in the plan and must be unique.
    pub fn solve(&self, pieces: &[Piece]) -> Result<Solution, EngineError> {
        let mut seen = BTreeSet::new();
        if let Some(dup) = pieces.iter().find(|p| !seen.insert(p.source_index)) {
            return Err(EngineError::DuplicateSourceIndex(dup.source_index));
        }

        let mut ctx = CalculationContext::new();
        let resolver = CatalogResolver::new(self.catalog, &self.config.shared_pools);

        let valid = Self::valid_pieces(pieces, &mut ctx);

        let mut by_material: BTreeMap<&str, Vec<Piece>> = BTreeMap::new();
        for piece in &valid {
            by_material
                .entry(piece.material.as_str())
                .or_default()
                .push(piece.clone());
        }

        for (&material, group) in &by_material {
            for bucket in bucket_pieces(group, &resolver, self.config.width_tolerance) {
                let candidates = resolver.pool_candidates(material, bucket.pool);
                tracing::debug!(
                    material,
                    pool = %resolver.pool_label(bucket.pool),
                    width = bucket.quantized_width,
                    pieces = bucket.pieces.len(),
                    candidates = candidates.len(),
                    "packing bucket"
                );
                SlabPacker::new(&mut ctx, material, bucket.pool, &candidates).pack(&bucket);
            }
        }

        shrink_bins(&mut ctx, &resolver);
        for bin in &ctx.bins {
            ctx.ledger.record_bin(bin);
        }

        let sheets = SheetPacker::new(&self.config.plywood).pack(&valid, &mut ctx);
        let plan = report::build(pieces, &ctx, &sheets);

        tracing::info!(
            pieces = pieces.len(),
            slabs = plan.slab_count,
            sheets = plan.sheet_count,
            warnings = plan.warnings.len(),
            leftover_area = plan.total_leftover_area,
            "calculation complete"
        );

        Ok(Solution {
            plan,
            slabs: ctx.bins,
            sheets,
        })
    }

    fn valid_pieces(pieces: &[Piece], ctx: &mut CalculationContext) -> Vec<Piece> {
        pieces
            .iter()
            .filter(|p| {
                if p.has_valid_dimensions() {
                    return true;
                }
                ctx.warn(Warning::InvalidDimension {
                    source_index: p.source_index,
                    length: p.length,
                    width: p.width,
                });
                false
            })
            .cloned()
            .collect()
    }
}
