use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::{Category, Rect};

/// Width quantization step for bucketing, one eighth of an inch.
pub const DEFAULT_WIDTH_TOLERANCE: f64 = 0.125;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub width_tolerance: f64,
    /// Categories that draw from one stock pool, e.g. countertop + island.
    pub shared_pools: Vec<Vec<Category>>,
    pub plywood: PlywoodConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width_tolerance: DEFAULT_WIDTH_TOLERANCE,
            shared_pools: Vec::new(),
            plywood: PlywoodConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlywoodConfig {
    pub sheet_length: f64,
    pub sheet_width: f64,
    pub length_offset: f64,
    pub width_offset: f64,
    pub price_per_sheet: f64,
    pub min_leftover_side: f64,
    pub categories: Vec<Category>,
}

impl Default for PlywoodConfig {
    fn default() -> Self {
        Self {
            sheet_length: 96.0,
            sheet_width: 48.0,
            length_offset: 3.0,
            width_offset: 2.0,
            price_per_sheet: 70.0,
            min_leftover_side: 1.0,
            categories: vec![Category::Countertop, Category::Island, Category::Bartop],
        }
    }
}

impl PlywoodConfig {
    pub fn sheet(&self) -> Rect {
        Rect::new(self.sheet_length, self.sheet_width).normalized()
    }

    pub fn needs_underlayment(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.width_tolerance.is_finite() || self.width_tolerance <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "width tolerance must be positive, got {}",
                self.width_tolerance
            )));
        }

        let mut seen: Vec<Category> = Vec::new();
        for pool in &self.shared_pools {
            for &category in pool {
                if seen.contains(&category) {
                    return Err(EngineError::InvalidConfig(format!(
                        "category '{}' listed in more than one shared pool",
                        category
                    )));
                }
                seen.push(category);
            }
        }

        let p = &self.plywood;
        let sheet_ok = p.sheet_length.is_finite()
            && p.sheet_width.is_finite()
            && p.sheet_length > 0.0
            && p.sheet_width > 0.0;
        if !sheet_ok {
            return Err(EngineError::InvalidConfig(format!(
                "plywood sheet {}x{} must have positive dimensions",
                p.sheet_length, p.sheet_width
            )));
        }
        if !p.length_offset.is_finite() || !p.width_offset.is_finite() {
            return Err(EngineError::InvalidConfig(
                "plywood offsets must be finite".to_string(),
            ));
        }
        if !p.price_per_sheet.is_finite() || p.price_per_sheet < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "price per sheet must be non-negative, got {}",
                p.price_per_sheet
            )));
        }
        if !p.min_leftover_side.is_finite() || p.min_leftover_side < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "minimum leftover side must be non-negative, got {}",
                p.min_leftover_side
            )));
        }
        Ok(())
    }
}
