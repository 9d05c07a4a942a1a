use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// Comparison slack for inch dimensions.
pub const EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub length: f64,
    pub width: f64,
}

impl Rect {
    pub fn new(length: f64, width: f64) -> Self {
        Self { length, width }
    }

    pub fn area(&self) -> f64 {
        self.length * self.width
    }

    pub fn rotated(&self) -> Self {
        Self {
            length: self.width,
            width: self.length,
        }
    }

    /// Same rectangle with the longer side as `length`.
    pub fn normalized(&self) -> Self {
        if self.length >= self.width {
            *self
        } else {
            self.rotated()
        }
    }

    pub fn fits_in(&self, other: &Rect) -> bool {
        self.length <= other.length + EPSILON && self.width <= other.width + EPSILON
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}x{:.2}", self.length, self.width)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Countertop,
    Island,
    Bartop,
    Backsplash,
    FullBacksplash,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Countertop,
        Category::Island,
        Category::Bartop,
        Category::Backsplash,
        Category::FullBacksplash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Countertop => "countertop",
            Category::Island => "island",
            Category::Bartop => "bartop",
            Category::Backsplash => "backsplash",
            Category::FullBacksplash => "full-backsplash",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect();
        match key.as_str() {
            "countertop" => Ok(Category::Countertop),
            "island" => Ok(Category::Island),
            "bartop" => Ok(Category::Bartop),
            "backsplash" => Ok(Category::Backsplash),
            "fullbacksplash" => Ok(Category::FullBacksplash),
            _ => Err(EngineError::UnknownCategory(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Joint {
    #[default]
    Standalone,
    Jointed,
}

/// Identity of a group lock: one material, one join-group tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub material: String,
    pub group: String,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.material, self.group)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub source_index: usize,
    pub length: f64,
    pub width: f64,
    pub material: String,
    pub category: Category,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub joint: Joint,
}

impl Piece {
    pub fn new(
        source_index: usize,
        material: impl Into<String>,
        category: Category,
        length: f64,
        width: f64,
    ) -> Self {
        Self {
            source_index,
            length,
            width,
            material: material.into(),
            category,
            group: String::new(),
            joint: Joint::Standalone,
        }
    }

    pub fn jointed(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self.joint = Joint::Jointed;
        self
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.length, self.width)
    }

    pub fn has_valid_dimensions(&self) -> bool {
        self.length.is_finite() && self.width.is_finite() && self.length > 0.0 && self.width > 0.0
    }

    /// Lock key when the piece is jointed into a named group.
    pub fn lock_key(&self) -> Option<GroupKey> {
        let group = self.group.trim();
        if self.joint == Joint::Jointed && !group.is_empty() {
            Some(GroupKey {
                material: self.material.clone(),
                group: group.to_string(),
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_keeps_long_side_first() {
        let r = Rect::new(26.0, 108.0).normalized();
        assert_eq!(r, Rect::new(108.0, 26.0));
        assert_eq!(Rect::new(96.0, 48.0).normalized(), Rect::new(96.0, 48.0));
    }

    #[test]
    fn test_category_parsing_is_lenient() {
        assert_eq!("FullBacksplash".parse::<Category>().unwrap(), Category::FullBacksplash);
        assert_eq!("full-backsplash".parse::<Category>().unwrap(), Category::FullBacksplash);
        assert_eq!(" Island ".parse::<Category>().unwrap(), Category::Island);
        assert!("sink".parse::<Category>().is_err());
    }

    #[test]
    fn test_lock_key_requires_jointed_and_group() {
        let plain = Piece::new(1, "Granite", Category::Countertop, 99.0, 26.0);
        assert!(plain.lock_key().is_none());

        let mut tagged = plain.clone();
        tagged.group = "A".to_string();
        assert!(tagged.lock_key().is_none());

        let jointed = plain.jointed("A");
        let key = jointed.lock_key().unwrap();
        assert_eq!(key.material, "Granite");
        assert_eq!(key.group, "A");

        let blank = Piece::new(2, "Granite", Category::Countertop, 99.0, 26.0).jointed("  ");
        assert!(blank.lock_key().is_none());
    }

    #[test]
    fn test_invalid_dimensions() {
        assert!(!Piece::new(1, "Quartz", Category::Island, 0.0, 26.0).has_valid_dimensions());
        assert!(!Piece::new(1, "Quartz", Category::Island, -4.0, 26.0).has_valid_dimensions());
        assert!(!Piece::new(1, "Quartz", Category::Island, f64::NAN, 26.0).has_valid_dimensions());
        assert!(!Piece::new(1, "Quartz", Category::Island, 40.0, f64::INFINITY).has_valid_dimensions());
        assert!(Piece::new(1, "Quartz", Category::Island, 40.0, 26.0).has_valid_dimensions());
    }
}
