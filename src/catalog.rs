use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::EngineError;
use crate::types::{Category, EPSILON, Rect};

/// A catalog rectangle with `long_side >= short_side`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StockCandidate {
    pub long_side: f64,
    pub short_side: f64,
}

impl StockCandidate {
    pub fn new(a: f64, b: f64) -> Option<Self> {
        if !a.is_finite() || !b.is_finite() || a <= 0.0 || b <= 0.0 {
            return None;
        }
        Some(Self {
            long_side: a.max(b),
            short_side: a.min(b),
        })
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.long_side, self.short_side)
    }

    pub fn area(&self) -> f64 {
        self.long_side * self.short_side
    }

    pub fn same_lane(&self, short_side: f64) -> bool {
        (self.short_side - short_side).abs() <= EPSILON
    }

    /// Holds `length` along the long side within a lane of `lane_width`.
    pub fn covers(&self, length: f64, lane_width: f64) -> bool {
        self.long_side + EPSILON >= length && self.short_side + EPSILON >= lane_width
    }
}

impl Eq for StockCandidate {}

impl Ord for StockCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.long_side
            .total_cmp(&other.long_side)
            .then(self.short_side.total_cmp(&other.short_side))
    }
}

impl PartialOrd for StockCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for StockCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rect())
    }
}

/// One typed catalog line as handed over by the catalog source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    pub material: String,
    pub category: Category,
    pub length: f64,
    pub width: f64,
}

/// Immutable-per-run snapshot: material -> category -> sorted, deduplicated sizes.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<String, BTreeMap<Category, Vec<StockCandidate>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows<I>(rows: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = CatalogRow>,
    {
        let mut catalog = Self::new();
        for row in rows {
            catalog.insert(&row.material, row.category, row.length, row.width)?;
        }
        Ok(catalog)
    }

    pub fn insert(
        &mut self,
        material: &str,
        category: Category,
        length: f64,
        width: f64,
    ) -> Result<(), EngineError> {
        let candidate =
            StockCandidate::new(length, width).ok_or_else(|| EngineError::InvalidStock {
                material: material.to_string(),
                category,
                length,
                width,
            })?;

        let sizes = self
            .entries
            .entry(material.to_string())
            .or_default()
            .entry(category)
            .or_default();
        if let Err(pos) = sizes.binary_search(&candidate) {
            sizes.insert(pos, candidate);
        }
        Ok(())
    }

    pub fn entries(&self, material: &str, category: Category) -> &[StockCandidate] {
        self.entries
            .get(material)
            .and_then(|by_category| by_category.get(&category))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn materials(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|m| m.values().all(Vec::is_empty))
    }
}

/// Index of a stock pool inside a [`CatalogResolver`].
pub type PoolId = usize;

/// Answers "which stock may this piece be cut from".
#[derive(Debug, Clone)]
pub struct CatalogResolver<'a> {
    catalog: &'a Catalog,
    pools: Vec<Vec<Category>>,
}

impl<'a> CatalogResolver<'a> {
    /// `shared` lists explicit cross-category pools; every other category
    /// is a pool of its own.
    pub fn new(catalog: &'a Catalog, shared: &[Vec<Category>]) -> Self {
        let mut pools: Vec<Vec<Category>> = Vec::new();
        for category in Category::ALL {
            if pools.iter().any(|p| p.contains(&category)) {
                continue;
            }
            match shared.iter().find(|p| p.contains(&category)) {
                Some(pool) => {
                    let members = Category::ALL
                        .into_iter()
                        .filter(|c| pool.contains(c))
                        .collect();
                    pools.push(members);
                }
                None => pools.push(vec![category]),
            }
        }
        Self { catalog, pools }
    }

    pub fn pool_of(&self, category: Category) -> PoolId {
        self.pools
            .iter()
            .position(|p| p.contains(&category))
            .unwrap_or_default()
    }

    pub fn pool_categories(&self, pool: PoolId) -> &[Category] {
        self.pools.get(pool).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pool_label(&self, pool: PoolId) -> String {
        self.pool_categories(pool)
            .iter()
            .map(Category::as_str)
            .collect::<Vec<_>>()
            .join("+")
    }

    /// Stock usable for `category`. Full-height backsplash borrows from the
    /// countertop, island and bartop catalogs, never from backsplash strips.
    pub fn candidates(&self, material: &str, category: Category) -> Vec<StockCandidate> {
        let sources: &[Category] = match category {
            Category::FullBacksplash => &[Category::Countertop, Category::Island, Category::Bartop],
            Category::Countertop => &[Category::Countertop],
            Category::Island => &[Category::Island],
            Category::Bartop => &[Category::Bartop],
            Category::Backsplash => &[Category::Backsplash],
        };
        let mut out: Vec<StockCandidate> = sources
            .iter()
            .flat_map(|&c| self.catalog.entries(material, c).iter().copied())
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Union of the candidates of every category in `pool`.
    pub fn pool_candidates(&self, material: &str, pool: PoolId) -> Vec<StockCandidate> {
        let mut out: Vec<StockCandidate> = self
            .pool_categories(pool)
            .iter()
            .flat_map(|&c| self.candidates(material, c))
            .collect();
        out.sort();
        out.dedup();
        out
    }
}
