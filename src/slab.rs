//! Slab packing: 1D length packing inside fixed-width lanes.
//!
//! Pieces of one bucket are cut end to end along a slab's long side. Each
//! piece first tries the open slab with the least headroom left after it
//! (best fit), then growing an open slab to the next catalog length, and only
//! then a new slab. Before any new slab is opened, the rest of the bucket is
//! checked against a single catalog size. Jointed groups are held to one
//! stock size for all members.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::bucket::Bucket;
use crate::catalog::{CatalogResolver, PoolId, StockCandidate};
use crate::error::Warning;
use crate::solver::CalculationContext;
use crate::types::{EPSILON, GroupKey, Piece};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cut {
    pub source_index: usize,
    pub length: f64,
    pub width: f64,
    pub lane_width: f64,
}

/// A slab being planned. Never removed once opened, only grown or shrunk.
#[derive(Debug, Clone, Serialize)]
pub struct Bin {
    pub id: usize,
    pub material: String,
    pub pool: PoolId,
    pub long_side: f64,
    pub short_side: f64,
    pub used_length: f64,
    pub cuts: Vec<Cut>,
    pub rows_used: BTreeSet<usize>,
    /// Join group holding this slab to its locked size.
    pub group: Option<String>,
}

impl Bin {
    pub fn open(
        id: usize,
        material: &str,
        pool: PoolId,
        size: StockCandidate,
        group: Option<String>,
    ) -> Self {
        Self {
            id,
            material: material.to_string(),
            pool,
            long_side: size.long_side,
            short_side: size.short_side,
            used_length: 0.0,
            cuts: Vec::new(),
            rows_used: BTreeSet::new(),
            group,
        }
    }

    pub fn size(&self) -> StockCandidate {
        StockCandidate {
            long_side: self.long_side,
            short_side: self.short_side,
        }
    }

    pub fn remaining(&self) -> f64 {
        self.long_side - self.used_length
    }

    pub fn serves(&self, material: &str, pool: PoolId, lane_width: f64) -> bool {
        self.material == material && self.pool == pool && self.short_side + EPSILON >= lane_width
    }

    pub fn can_hold(&self, length: f64) -> bool {
        self.remaining() + EPSILON >= length
    }

    pub fn assign(&mut self, piece: &Piece, lane_width: f64) {
        self.used_length += piece.length;
        debug_assert!(self.remaining() >= -EPSILON, "slab {} overfilled", self.id);
        self.cuts.push(Cut {
            source_index: piece.source_index,
            length: piece.length,
            width: piece.width,
            lane_width,
        });
        self.rows_used.insert(piece.source_index);
    }

    pub fn resize(&mut self, size: StockCandidate) {
        self.long_side = size.long_side;
        self.short_side = size.short_side;
    }

    pub fn max_lane_width(&self) -> f64 {
        self.cuts.iter().map(|c| c.lane_width).fold(0.0, f64::max)
    }

    pub fn recompute_used(&mut self) {
        self.used_length = self.cuts.iter().map(|c| c.length).sum();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupLock {
    pub size: StockCandidate,
    pub bins: Vec<usize>,
}

pub type GroupLocks = BTreeMap<GroupKey, GroupLock>;

/// Smallest long side covering `length`, ties going to the narrower stock.
/// `candidates` must be sorted by `(long_side, short_side)`.
pub fn smallest_covering(
    candidates: &[StockCandidate],
    length: f64,
    lane_width: f64,
) -> Option<StockCandidate> {
    candidates
        .iter()
        .find(|c| c.covers(length, lane_width))
        .copied()
}

/// Next catalog length in the same lane that fits `used + extra`.
fn upgrade_target(candidates: &[StockCandidate], bin: &Bin, extra: f64) -> Option<StockCandidate> {
    let needed = bin.used_length + extra;
    candidates
        .iter()
        .find(|c| {
            c.same_lane(bin.short_side)
                && c.long_side > bin.long_side + EPSILON
                && c.long_side + EPSILON >= needed
        })
        .copied()
}

pub struct SlabPacker<'a> {
    ctx: &'a mut CalculationContext,
    material: &'a str,
    pool: PoolId,
    candidates: &'a [StockCandidate],
}

impl<'a> SlabPacker<'a> {
    /// `candidates` is the pool's catalog, sorted by `(long_side, short_side)`.
    pub fn new(
        ctx: &'a mut CalculationContext,
        material: &'a str,
        pool: PoolId,
        candidates: &'a [StockCandidate],
    ) -> Self {
        Self {
            ctx,
            material,
            pool,
            candidates,
        }
    }

    pub fn pack(&mut self, bucket: &Bucket) {
        let lane = bucket.lane_width;

        if self.candidates.is_empty() {
            for piece in &bucket.pieces {
                self.ctx.warn(Warning::NoCatalogEntry {
                    source_index: piece.source_index,
                    material: self.material.to_string(),
                    category: piece.category,
                });
            }
            return;
        }

        let mut order: Vec<&Piece> = bucket.pieces.iter().collect();
        order.sort_by(|a, b| b.length.total_cmp(&a.length));

        let mut pending: Vec<&Piece> = Vec::with_capacity(order.len());
        for piece in order {
            if smallest_covering(self.candidates, piece.length, lane).is_some() {
                pending.push(piece);
            } else {
                self.ctx.warn(Warning::PieceExceedsAllStock {
                    source_index: piece.source_index,
                    material: self.material.to_string(),
                    piece: piece.rect(),
                });
            }
        }

        let mut placed = vec![false; pending.len()];

        // Once a slab serves this lane, remainders are tried piece by piece first.
        let lane_open = self
            .ctx
            .bins
            .iter()
            .any(|b| b.serves(self.material, self.pool, lane));
        let free: Vec<usize> = (0..pending.len())
            .filter(|&i| pending[i].lock_key().is_none())
            .collect();
        if free.len() > 1 && !lane_open {
            self.place_together(&pending, &free, lane, &mut placed);
        }

        for i in 0..pending.len() {
            if placed[i] {
                continue;
            }
            let piece = pending[i];

            if let Some(key) = piece.lock_key() {
                self.place_locked(&pending, i, &key, lane, &mut placed);
                continue;
            }

            if self.reuse(piece, lane) || self.upgrade(piece, lane) {
                placed[i] = true;
                continue;
            }

            let rest: Vec<usize> = (i..pending.len())
                .filter(|&j| !placed[j] && pending[j].lock_key().is_none())
                .collect();
            if rest.len() > 1 && self.place_together(&pending, &rest, lane, &mut placed) {
                continue;
            }

            if let Some(size) = smallest_covering(self.candidates, piece.length, lane) {
                let bin = self.open_bin(size, None);
                self.ctx.bins[bin].assign(piece, lane);
                placed[i] = true;
            }
        }
    }

    /// One new slab for all of `members` when their summed length fits one.
    fn place_together(
        &mut self,
        pieces: &[&Piece],
        members: &[usize],
        lane: f64,
        placed: &mut [bool],
    ) -> bool {
        let total: f64 = members.iter().map(|&i| pieces[i].length).sum();
        let Some(size) = smallest_covering(self.candidates, total, lane) else {
            return false;
        };
        let bin = self.open_bin(size, None);

        tracing::debug!(
            slab = bin,
            pieces = members.len(),
            total,
            "single slab covers remaining bucket"
        );
        for &i in members {
            self.ctx.bins[bin].assign(pieces[i], lane);
            placed[i] = true;
        }
        true
    }

    /// Open slab in this lane with the least headroom left after `length`.
    /// With `group`, only that group's slabs are considered.
    fn best_fit(&self, length: f64, lane: f64, group: Option<&str>) -> Option<usize> {
        self.ctx
            .bins
            .iter()
            .filter(|b| b.serves(self.material, self.pool, lane) && b.can_hold(length))
            .filter(|b| group.is_none_or(|g| b.group.as_deref() == Some(g)))
            .min_by(|a, b| {
                (a.remaining() - length).total_cmp(&(b.remaining() - length))
            })
            .map(|b| b.id)
    }

    fn reuse(&mut self, piece: &Piece, lane: f64) -> bool {
        let Some(bin) = self.best_fit(piece.length, lane, None) else {
            return false;
        };
        tracing::debug!(
            piece = piece.source_index,
            slab = bin,
            remaining = self.ctx.bins[bin].remaining(),
            "reusing open slab"
        );
        self.ctx.bins[bin].assign(piece, lane);
        true
    }

    fn upgrade(&mut self, piece: &Piece, lane: f64) -> bool {
        let best = self
            .ctx
            .bins
            .iter()
            .filter(|b| b.group.is_none() && b.serves(self.material, self.pool, lane))
            .filter_map(|b| {
                upgrade_target(self.candidates, b, piece.length).map(|size| (b.id, size))
            })
            .min_by(|(a, sa), (b, sb)| {
                let grow_a = sa.long_side - self.ctx.bins[*a].long_side;
                let grow_b = sb.long_side - self.ctx.bins[*b].long_side;
                grow_a.total_cmp(&grow_b)
            });

        let Some((bin, size)) = best else {
            return false;
        };
        tracing::debug!(
            piece = piece.source_index,
            slab = bin,
            from = %self.ctx.bins[bin].size(),
            to = %size,
            "upgrading slab in place"
        );
        self.ctx.bins[bin].resize(size);
        self.ctx.bins[bin].assign(piece, lane);
        true
    }

    fn place_locked(
        &mut self,
        pieces: &[&Piece],
        idx: usize,
        key: &GroupKey,
        lane: f64,
        placed: &mut [bool],
    ) {
        let piece = pieces[idx];
        placed[idx] = true;

        let Some(lock) = self.ctx.locks.get(key).cloned() else {
            self.resolve_group(pieces, idx, key, lane, placed);
            return;
        };

        if let Some(bin) = self.best_fit(piece.length, lane, Some(key.group.as_str())) {
            self.ctx.bins[bin].assign(piece, lane);
            return;
        }

        // A group still on a single slab may grow it; all members stay uniform.
        if let &[only] = lock.bins.as_slice() {
            let bin = &self.ctx.bins[only];
            if bin.serves(self.material, self.pool, lane)
                && let Some(size) = upgrade_target(self.candidates, bin, piece.length)
            {
                tracing::debug!(group = %key, slab = only, to = %size, "upgrading locked slab");
                self.ctx.bins[only].resize(size);
                self.ctx.bins[only].assign(piece, lane);
                if let Some(lock) = self.ctx.locks.get_mut(key) {
                    lock.size = size;
                }
                return;
            }
        }

        if lock.size.covers(piece.length, lane) && self.candidates.contains(&lock.size) {
            let bin = self.open_bin(lock.size, Some(key.group.clone()));
            self.ctx.bins[bin].assign(piece, lane);
            if let Some(lock) = self.ctx.locks.get_mut(key) {
                lock.bins.push(bin);
            }
            return;
        }

        self.ctx.warn(Warning::GroupLockConflict {
            source_index: piece.source_index,
            group: key.group.clone(),
            locked: lock.size.rect(),
        });
    }

    /// First member of a group fixes its size; unplaced members in this
    /// bucket share one slab when one covers them all.
    fn resolve_group(
        &mut self,
        pieces: &[&Piece],
        idx: usize,
        key: &GroupKey,
        lane: f64,
        placed: &mut [bool],
    ) {
        let mut members = vec![idx];
        members.extend(
            (idx + 1..pieces.len())
                .filter(|&j| !placed[j] && pieces[j].lock_key().as_ref() == Some(key)),
        );
        let total: f64 = members.iter().map(|&i| pieces[i].length).sum();

        let together = if members.len() > 1 {
            smallest_covering(self.candidates, total, lane)
        } else {
            None
        };
        let (size, members) = match together {
            Some(size) => (size, members),
            None => match smallest_covering(self.candidates, pieces[idx].length, lane) {
                Some(size) => (size, vec![idx]),
                None => return,
            },
        };

        let bin = self.open_bin(size, Some(key.group.clone()));
        for &i in &members {
            self.ctx.bins[bin].assign(pieces[i], lane);
            placed[i] = true;
        }
        tracing::debug!(group = %key, size = %size, slab = bin, "group size locked");
        self.ctx.locks.insert(
            key.clone(),
            GroupLock {
                size,
                bins: vec![bin],
            },
        );
    }

    fn open_bin(&mut self, size: StockCandidate, group: Option<String>) -> usize {
        let id = self.ctx.bins.len();
        tracing::debug!(slab = id, material = self.material, size = %size, "opening slab");
        self.ctx
            .bins
            .push(Bin::open(id, self.material, self.pool, size, group));
        id
    }
}

fn pool_catalog<'c>(
    catalogs: &'c BTreeMap<(String, PoolId), Vec<StockCandidate>>,
    bin: &Bin,
) -> &'c [StockCandidate] {
    catalogs
        .get(&(bin.material.clone(), bin.pool))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Resizes every slab to the smallest catalog length in its lane that still
/// holds its cuts. Runs once, after all packing. Locked groups shrink
/// together or not at all.
pub fn shrink_bins(ctx: &mut CalculationContext, resolver: &CatalogResolver) {
    let mut catalogs: BTreeMap<(String, PoolId), Vec<StockCandidate>> = BTreeMap::new();
    for bin in &ctx.bins {
        catalogs
            .entry((bin.material.clone(), bin.pool))
            .or_insert_with(|| resolver.pool_candidates(&bin.material, bin.pool));
    }

    for bin in ctx.bins.iter_mut() {
        bin.recompute_used();
    }

    for bin in ctx.bins.iter_mut().filter(|b| b.group.is_none()) {
        let smaller = pool_catalog(&catalogs, bin).iter().find(|c| {
            c.same_lane(bin.short_side) && c.long_side + EPSILON >= bin.used_length
        });
        if let Some(&size) = smaller
            && size.long_side < bin.long_side - EPSILON
        {
            tracing::debug!(slab = bin.id, from = %bin.size(), to = %size, "shrinking slab");
            bin.resize(size);
        }
    }

    for (key, lock) in ctx.locks.iter_mut() {
        let bins: Vec<&Bin> = lock.bins.iter().map(|&i| &ctx.bins[i]).collect();
        let Some(first) = bins.first() else {
            continue;
        };
        let needed = bins.iter().map(|b| b.used_length).fold(0.0, f64::max);
        let smaller = pool_catalog(&catalogs, first).iter().copied().find(|c| {
            c.same_lane(lock.size.short_side)
                && c.long_side + EPSILON >= needed
                && bins.iter().all(|b| pool_catalog(&catalogs, b).contains(c))
        });
        if let Some(size) = smaller
            && size.long_side < lock.size.long_side - EPSILON
        {
            tracing::debug!(group = %key, from = %lock.size, to = %size, "shrinking locked group");
            lock.size = size;
            for &i in &lock.bins {
                ctx.bins[i].resize(size);
            }
        }
    }
}
