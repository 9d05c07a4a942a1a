use clap::Parser;
use slab_allocator::catalog::Catalog;
use slab_allocator::config::{DEFAULT_WIDTH_TOLERANCE, EngineConfig};
use slab_allocator::ledger::StockRef;
use slab_allocator::render;
use slab_allocator::solver::Solver;
use slab_allocator::types::{Category, Joint, Piece};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "slab_allocator",
    about = "Slab and plywood allocation for stone countertop estimates"
)]
struct Cli {
    /// Catalog stock as MATERIAL:CATEGORY:LxW (e.g. Granite:countertop:108x26)
    #[arg(long = "stock", num_args = 1..)]
    stock: Vec<String>,

    /// Required pieces as MATERIAL:CATEGORY:LxW[:GROUP[:jointed]]
    #[arg(long = "piece", num_args = 1..)]
    pieces: Vec<String>,

    /// Categories sharing one stock pool, comma separated (e.g. countertop,island)
    #[arg(long = "share")]
    share: Vec<String>,

    /// Width bucketing tolerance in inches
    #[arg(long, default_value_t = DEFAULT_WIDTH_TOLERANCE)]
    tolerance: f64,

    /// Price of one plywood sheet
    #[arg(long)]
    sheet_price: Option<f64>,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,

    /// Show ASCII layout of each slab and sheet
    #[arg(long)]
    layout: bool,

    /// Log packing decisions to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn parse_dimensions(s: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = s.split(['x', 'X']).collect();
    if parts.len() != 2 {
        return Err(format!("invalid dimensions '{}', expected LxW", s));
    }
    let length = parts[0]
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid length in '{}'", s))?;
    let width = parts[1]
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid width in '{}'", s))?;
    Ok((length, width))
}

fn parse_category(s: &str) -> Result<Category, String> {
    s.parse::<Category>().map_err(|e| e.to_string())
}

fn parse_stock(s: &str, catalog: &mut Catalog) -> Result<(), String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return Err(format!("invalid stock '{}', expected MATERIAL:CATEGORY:LxW", s));
    }
    let category = parse_category(parts[1])?;
    let (length, width) = parse_dimensions(parts[2])?;
    catalog
        .insert(parts[0].trim(), category, length, width)
        .map_err(|e| e.to_string())
}

fn parse_piece(s: &str, source_index: usize) -> Result<Piece, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if !(3..=5).contains(&parts.len()) {
        return Err(format!(
            "invalid piece '{}', expected MATERIAL:CATEGORY:LxW[:GROUP[:jointed]]",
            s
        ));
    }
    let category = parse_category(parts[1])?;
    let (length, width) = parse_dimensions(parts[2])?;
    let mut piece = Piece::new(source_index, parts[0].trim(), category, length, width);
    if let Some(group) = parts.get(3) {
        piece.group = group.trim().to_string();
    }
    if let Some(joint) = parts.get(4) {
        piece.joint = match joint.trim() {
            "jointed" => Joint::Jointed,
            "standalone" => Joint::Standalone,
            other => {
                return Err(format!(
                    "invalid joint '{}' in '{}', expected jointed or standalone",
                    other, s
                ));
            }
        };
    }
    Ok(piece)
}

fn parse_share(s: &str) -> Result<Vec<Category>, String> {
    s.split(',').map(parse_category).collect()
}

fn fail(e: String) -> ! {
    eprintln!("Error: {}", e);
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::ERROR })
        .init();

    let mut catalog = Catalog::new();
    for s in &cli.stock {
        parse_stock(s, &mut catalog).unwrap_or_else(|e| fail(e));
    }

    let pieces: Vec<Piece> = cli
        .pieces
        .iter()
        .enumerate()
        .map(|(i, s)| parse_piece(s, i + 1))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| fail(e));

    let shared_pools = cli
        .share
        .iter()
        .map(|s| parse_share(s))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| fail(e));

    let mut config = EngineConfig {
        width_tolerance: cli.tolerance,
        shared_pools,
        ..EngineConfig::default()
    };
    if let Some(price) = cli.sheet_price {
        config.plywood.price_per_sheet = price;
    }

    let solver = Solver::new(&catalog, config).unwrap_or_else(|e| fail(e.to_string()));
    let solution = solver
        .solve(&pieces)
        .unwrap_or_else(|e| fail(e.to_string()));
    let plan = &solution.plan;

    if cli.json {
        match serde_json::to_string_pretty(&solution) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(e.to_string()),
        }
        return;
    }

    println!("Pieces:");
    for a in &plan.piece_assignments {
        println!(
            "  #{} {} {} {} -> {}, leftover {}",
            a.source_index,
            a.material,
            a.category,
            a.cut,
            a.source_description(),
            a.leftover_description(),
        );
        if let Some(ply) = &a.plywood {
            println!("      plywood {} on {}", ply.cut, ply.sheet);
        }
    }
    println!();

    println!("Stock:");
    for c in &plan.stock_counts {
        println!("  {} {} x {}", c.material, c.size, c.count);
    }
    println!();

    if cli.layout {
        for bin in &solution.slabs {
            println!("{} {} {}:", StockRef::Slab(bin.id), bin.material, bin.size());
            print!("{}", render::render_slab(bin));
        }
        for (i, sheet) in solution.sheets.sheets.iter().enumerate() {
            println!("{} {}:", StockRef::Sheet(i), sheet.stock);
            print!("{}", render::render_sheet(sheet));
        }
        println!();
    }

    if !plan.warnings.is_empty() {
        println!("Warnings:");
        for w in &plan.warnings {
            println!("  {}", w);
        }
        println!();
    }

    println!(
        "Summary: {} slab{}, {} sheet{} (${:.2}), {:.1}% waste, {:.2} sq in leftover",
        plan.slab_count,
        if plan.slab_count == 1 { "" } else { "s" },
        plan.sheet_count,
        if plan.sheet_count == 1 { "" } else { "s" },
        solution.sheets.cost,
        plan.waste_percent(),
        plan.total_leftover_area,
    );
}
