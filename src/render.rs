use crate::guillotine::Sheet;
use crate::slab::Bin;
use crate::types::Rect;

const MAX_WIDTH: f64 = 80.0;
const MAX_HEIGHT: f64 = 24.0;

/// A labelled box in stock coordinates.
struct Region {
    x: f64,
    y: f64,
    size: Rect,
    label: String,
}

pub fn render_sheet(sheet: &Sheet) -> String {
    let regions: Vec<Region> = sheet
        .placements
        .iter()
        .map(|p| Region {
            x: p.x,
            y: p.y,
            size: p.extent(),
            label: format!("#{}", p.source_index),
        })
        .collect();
    render(sheet.stock, &regions)
}

/// Cuts laid end to end from the slab's origin, each as tall as its lane.
pub fn render_slab(bin: &Bin) -> String {
    let mut x = 0.0;
    let regions: Vec<Region> = bin
        .cuts
        .iter()
        .map(|c| {
            let region = Region {
                x,
                y: 0.0,
                size: Rect::new(c.length, c.lane_width),
                label: format!("#{}", c.source_index),
            };
            x += c.length;
            region
        })
        .collect();
    render(bin.size().rect(), &regions)
}

fn render(stock: Rect, regions: &[Region]) -> String {
    let scale = f64::min(MAX_WIDTH / stock.length, MAX_HEIGHT / stock.width);
    let grid_w = (stock.length * scale).round() as usize;
    let grid_h = (stock.width * scale).round() as usize;

    if grid_w == 0 || grid_h == 0 {
        return String::new();
    }

    let mut grid = vec![vec![' '; grid_w + 1]; grid_h + 1];

    // Draw stock border first
    draw_rect(&mut grid, 0, 0, grid_w, grid_h);

    for r in regions {
        let sx = (r.x * scale).round() as usize;
        let sy = (r.y * scale).round() as usize;
        let sw = (r.size.length * scale).round() as usize;
        let sh = (r.size.width * scale).round() as usize;

        if sw == 0 || sh == 0 {
            continue;
        }

        draw_rect(&mut grid, sx, sy, sw, sh);

        let label_chars: Vec<char> = r.label.chars().collect();
        if sw > 2 && sh > 0 {
            let cx = sx + sw / 2;
            let cy = sy + sh / 2;
            let start_x = cx.saturating_sub(label_chars.len() / 2);

            for (i, &ch) in label_chars.iter().enumerate() {
                let x = start_x + i;
                if x > sx && x < sx + sw && cy > sy && cy < sy + sh {
                    grid[cy][x] = ch;
                }
            }
        }
    }

    let mut result = String::new();
    for row in &grid {
        let line: String = row.iter().collect();
        result.push_str(line.trim_end());
        result.push('\n');
    }
    result
}

fn edge(current: char, crossing: char, own: char) -> char {
    if current == crossing || current == '+' {
        '+'
    } else {
        own
    }
}

fn draw_rect(grid: &mut [Vec<char>], x: usize, y: usize, w: usize, h: usize) {
    let rows = grid.len();
    let cols = if rows > 0 { grid[0].len() } else { return };

    for i in (x..=x + w).filter(|&i| i < cols) {
        for j in [y, y + h].into_iter().filter(|&j| j < rows) {
            grid[j][i] = edge(grid[j][i], '|', '-');
        }
    }

    for j in (y..=y + h).filter(|&j| j < rows) {
        for i in [x, x + w].into_iter().filter(|&i| i < cols) {
            grid[j][i] = edge(grid[j][i], '-', '|');
        }
    }

    for cx in [x, x + w] {
        for cy in [y, y + h] {
            if cy < rows && cx < cols {
                grid[cy][cx] = '+';
            }
        }
    }
}
