use serde::Serialize;

use crate::config::PlywoodConfig;
use crate::error::Warning;
use crate::solver::CalculationContext;
use crate::types::{Piece, Rect};

/// Unused rectangle on a sheet. `rect` is kept in the frame it was split in;
/// `along_x` says whether `rect.length` runs along the sheet's x axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FreeRect {
    pub x: f64,
    pub y: f64,
    pub rect: Rect,
    pub along_x: bool,
}

impl FreeRect {
    /// Origin moved `dl` along this frame's length axis and `dw` along its width axis.
    fn offset(&self, along_x: bool, dl: f64, dw: f64) -> (f64, f64) {
        if along_x {
            (self.x + dl, self.y + dw)
        } else {
            (self.x + dw, self.y + dl)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SheetPlacement {
    pub source_index: usize,
    pub rect: Rect,
    pub x: f64,
    pub y: f64,
    /// Long side runs along the sheet's short axis.
    pub rotated: bool,
}

impl SheetPlacement {
    /// Footprint in sheet axes.
    pub fn extent(&self) -> Rect {
        if self.rotated {
            self.rect.rotated()
        } else {
            self.rect
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Fit {
    pub free_idx: usize,
    pub transposed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Sheet {
    pub stock: Rect,
    #[serde(skip)]
    min_side: f64,
    pub free_rects: Vec<FreeRect>,
    pub placements: Vec<SheetPlacement>,
}

impl Sheet {
    pub fn new(stock: Rect, min_side: f64) -> Self {
        Self {
            stock,
            min_side,
            free_rects: vec![FreeRect {
                x: 0.0,
                y: 0.0,
                rect: stock,
                along_x: true,
            }],
            placements: Vec::new(),
        }
    }

    pub fn used_area(&self) -> f64 {
        self.placements.iter().map(|p| p.rect.area()).sum()
    }

    /// First free rectangle holding `piece`, as stored or transposed.
    pub fn find_first(&self, piece: Rect) -> Option<Fit> {
        self.free_rects.iter().enumerate().find_map(|(idx, free)| {
            if piece.fits_in(&free.rect) {
                Some(Fit {
                    free_idx: idx,
                    transposed: false,
                })
            } else if piece.fits_in(&free.rect.rotated()) {
                Some(Fit {
                    free_idx: idx,
                    transposed: true,
                })
            } else {
                None
            }
        })
    }

    pub fn place(&mut self, fit: Fit, source_index: usize, piece: Rect) -> SheetPlacement {
        let free = self.free_rects.remove(fit.free_idx);
        let along_x = free.along_x != fit.transposed;

        let placement = SheetPlacement {
            source_index,
            rect: piece,
            x: free.x,
            y: free.y,
            rotated: !along_x,
        };

        self.split(free, fit.transposed, piece);
        self.placements.push(placement);
        placement
    }

    /// Two guillotine cuts: the strip beside the piece, then the full-length
    /// strip past it. Slivers not exceeding `min_side` are dropped.
    fn split(&mut self, free: FreeRect, transposed: bool, piece: Rect) {
        let along_x = free.along_x != transposed;
        let frame = if transposed {
            free.rect.rotated()
        } else {
            free.rect
        };

        let (x1, y1) = free.offset(along_x, piece.length, 0.0);
        let beside = FreeRect {
            x: x1,
            y: y1,
            rect: Rect::new(frame.length - piece.length, piece.width),
            along_x,
        };
        let (x2, y2) = free.offset(along_x, 0.0, piece.width);
        let past = FreeRect {
            x: x2,
            y: y2,
            rect: Rect::new(frame.length, frame.width - piece.width),
            along_x,
        };

        for rem in [beside, past] {
            if rem.rect.length > self.min_side && rem.rect.width > self.min_side {
                self.free_rects.push(rem);
            }
        }
    }

    pub fn leftovers(&self) -> Vec<Rect> {
        self.free_rects.iter().map(|f| f.rect).collect()
    }
}

/// Underlayment cut for one piece, long side first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlywoodPiece {
    pub source_index: usize,
    pub rect: Rect,
}

/// Derives underlayment cuts: fixed offsets off each dimension, non-positive
/// results dropped, largest area first.
pub fn plywood_pieces(pieces: &[Piece], config: &PlywoodConfig) -> Vec<PlywoodPiece> {
    let mut out: Vec<PlywoodPiece> = pieces
        .iter()
        .filter(|p| config.needs_underlayment(p.category))
        .filter_map(|p| {
            let length = p.length - config.length_offset;
            let width = p.width - config.width_offset;
            (length > 0.0 && width > 0.0).then(|| PlywoodPiece {
                source_index: p.source_index,
                rect: Rect::new(length, width).normalized(),
            })
        })
        .collect();
    out.sort_by(|a, b| b.rect.area().total_cmp(&a.rect.area()));
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetPlan {
    pub sheets: Vec<Sheet>,
    pub price_per_sheet: f64,
    pub cost: f64,
}

impl SheetPlan {
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Sheet index and placement for a piece's underlayment.
    pub fn placement_of(&self, source_index: usize) -> Option<(usize, &SheetPlacement)> {
        self.sheets.iter().enumerate().find_map(|(i, s)| {
            s.placements
                .iter()
                .find(|p| p.source_index == source_index)
                .map(|p| (i, p))
        })
    }

    pub fn total_waste_percent(&self) -> f64 {
        let stock: f64 = self.sheets.iter().map(|s| s.stock.area()).sum();
        if stock == 0.0 {
            return 0.0;
        }
        let used: f64 = self.sheets.iter().map(Sheet::used_area).sum();
        (stock - used) / stock * 100.0
    }
}

pub struct SheetPacker<'a> {
    config: &'a PlywoodConfig,
}

impl<'a> SheetPacker<'a> {
    pub fn new(config: &'a PlywoodConfig) -> Self {
        Self { config }
    }

    pub fn pack(&self, pieces: &[Piece], ctx: &mut CalculationContext) -> SheetPlan {
        let stock = self.config.sheet();
        let mut sheets: Vec<Sheet> = Vec::new();

        for ply in plywood_pieces(pieces, self.config) {
            let existing = sheets
                .iter()
                .enumerate()
                .find_map(|(i, s)| s.find_first(ply.rect).map(|fit| (i, fit)));
            if let Some((i, fit)) = existing {
                sheets[i].place(fit, ply.source_index, ply.rect);
                continue;
            }

            let mut sheet = Sheet::new(stock, self.config.min_leftover_side);
            match sheet.find_first(ply.rect) {
                Some(fit) => {
                    sheet.place(fit, ply.source_index, ply.rect);
                    tracing::debug!(
                        sheet = sheets.len(),
                        piece = ply.source_index,
                        "opening plywood sheet"
                    );
                    sheets.push(sheet);
                }
                None => ctx.warn(Warning::PlywoodExceedsSheet {
                    source_index: ply.source_index,
                    piece: ply.rect,
                    sheet: stock,
                }),
            }
        }

        for (i, sheet) in sheets.iter().enumerate() {
            ctx.ledger.record_sheet(i, sheet.leftovers());
        }

        let cost = sheets.len() as f64 * self.config.price_per_sheet;
        SheetPlan {
            sheets,
            price_per_sheet: self.config.price_per_sheet,
            cost,
        }
    }
}
