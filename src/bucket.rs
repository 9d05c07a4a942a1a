use std::collections::BTreeMap;

use crate::catalog::{CatalogResolver, PoolId};
use crate::types::Piece;

/// Same-pool pieces whose widths round to the same tolerance step.
#[derive(Debug, Clone)]
pub struct Bucket {
    pub pool: PoolId,
    /// Width in whole tolerance steps.
    pub width_key: i64,
    pub quantized_width: f64,
    /// Widest actual piece in the bucket; every chosen stock covers it.
    pub lane_width: f64,
    pub pieces: Vec<Piece>,
}

pub fn quantize(width: f64, tolerance: f64) -> f64 {
    (width / tolerance).round() * tolerance
}

fn width_key(width: f64, tolerance: f64) -> i64 {
    (width / tolerance).round() as i64
}

/// Groups one material's pieces by `(pool, quantized width)`.
///
/// Buckets come back ordered by pool, then widest first, so later narrower
/// buckets can reuse slabs opened for wider ones. Pieces keep input order.
pub fn bucket_pieces(pieces: &[Piece], resolver: &CatalogResolver, tolerance: f64) -> Vec<Bucket> {
    let mut by_key: BTreeMap<(PoolId, i64), Vec<Piece>> = BTreeMap::new();
    for piece in pieces {
        let key = (
            resolver.pool_of(piece.category),
            width_key(piece.width, tolerance),
        );
        by_key.entry(key).or_default().push(piece.clone());
    }

    let mut buckets: Vec<Bucket> = by_key
        .into_iter()
        .map(|((pool, key), pieces)| {
            let lane_width = pieces.iter().map(|p| p.width).fold(0.0, f64::max);
            Bucket {
                pool,
                width_key: key,
                quantized_width: key as f64 * tolerance,
                lane_width,
                pieces,
            }
        })
        .collect();
    buckets.sort_by(|a, b| a.pool.cmp(&b.pool).then(b.width_key.cmp(&a.width_key)));
    buckets
}
