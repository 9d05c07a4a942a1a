//! End-to-end allocation runs through the public solver API.

use slab_allocator::catalog::{Catalog, CatalogRow};
use slab_allocator::config::EngineConfig;
use slab_allocator::error::Warning;
use slab_allocator::ledger::StockRef;
use slab_allocator::report::AssignmentStatus;
use slab_allocator::solver::{Solution, Solver};
use slab_allocator::types::{Category, Piece, Rect};

fn catalog(rows: &[(Category, f64, f64)]) -> Catalog {
    let mut c = Catalog::new();
    for &(category, l, w) in rows {
        c.insert("Granite", category, l, w).unwrap();
    }
    c
}

fn solve(catalog: &Catalog, pieces: &[Piece]) -> Solution {
    Solver::new(catalog, EngineConfig::default())
        .unwrap()
        .solve(pieces)
        .unwrap()
}

fn slab_lengths(sol: &Solution) -> Vec<f64> {
    let mut lengths: Vec<f64> = sol.slabs.iter().map(|b| b.long_side).collect();
    lengths.sort_by(f64::total_cmp);
    lengths
}

fn assert_slabs_consistent(sol: &Solution) {
    for bin in &sol.slabs {
        let cut_total: f64 = bin.cuts.iter().map(|c| c.length).sum();
        assert!((bin.used_length - cut_total).abs() < 1e-9);
        assert!(
            bin.remaining() >= -1e-9,
            "slab {} over-allocated: {} used of {}",
            bin.id,
            bin.used_length,
            bin.long_side
        );
        for cut in &bin.cuts {
            assert!(cut.width <= bin.short_side + 1e-9);
        }
    }
}

mod slab_scenarios {
    use super::*;

    #[test]
    fn test_two_long_countertops_need_two_slabs() {
        let c = catalog(&[(Category::Countertop, 108.0, 26.0)]);
        let pieces = vec![
            Piece::new(1, "Granite", Category::Countertop, 99.0, 26.0),
            Piece::new(2, "Granite", Category::Countertop, 80.0, 26.0),
        ];
        let sol = solve(&c, &pieces);
        assert_slabs_consistent(&sol);

        assert_eq!(sol.plan.slab_count, 2);
        let first = sol.plan.assignment(1).unwrap();
        let second = sol.plan.assignment(2).unwrap();
        assert_ne!(first.source, second.source);
        assert_eq!(first.leftover, Some(Rect::new(9.0, 26.0)));
        assert_eq!(second.leftover, Some(Rect::new(28.0, 26.0)));
    }

    #[test]
    fn test_backsplash_strips_split_over_two_slabs() {
        let c = catalog(&[(Category::Backsplash, 108.0, 4.0)]);
        let pieces = vec![
            Piece::new(1, "Granite", Category::Backsplash, 24.0, 4.0),
            Piece::new(2, "Granite", Category::Backsplash, 37.0, 4.0),
            Piece::new(3, "Granite", Category::Backsplash, 60.0, 4.0),
        ];
        let sol = solve(&c, &pieces);
        assert_slabs_consistent(&sol);

        assert_eq!(sol.plan.slab_count, 2);
        let shared = sol.plan.assignment(3).unwrap().source;
        assert_eq!(sol.plan.assignment(2).unwrap().source, shared);
        assert_ne!(sol.plan.assignment(1).unwrap().source, shared);

        let used: Vec<f64> = sol.slabs.iter().map(|b| b.used_length).collect();
        assert_eq!(used, vec![97.0, 24.0]);
        // backsplash never gets underlayment
        assert_eq!(sol.plan.sheet_count, 0);
    }

    #[test]
    fn test_oversize_piece_leaves_rest_of_plan_alone() {
        let c = catalog(&[(Category::Countertop, 120.0, 26.0)]);
        let alone = solve(
            &c,
            &[Piece::new(2, "Granite", Category::Countertop, 50.0, 26.0)],
        );
        let pieces = vec![
            Piece::new(1, "Granite", Category::Countertop, 200.0, 26.0),
            Piece::new(2, "Granite", Category::Countertop, 50.0, 26.0),
        ];
        let sol = solve(&c, &pieces);

        assert!(sol.plan.warnings.iter().any(|w| matches!(
            w,
            Warning::PieceExceedsAllStock { source_index: 1, .. }
        )));
        assert_eq!(sol.plan.assignment(1).unwrap().status, AssignmentStatus::NoFit);
        assert_eq!(sol.plan.assignment(1).unwrap().source, None);
        assert_eq!(sol.plan.slab_count, 1);
        assert_eq!(slab_lengths(&sol), slab_lengths(&alone));
        assert_eq!(
            sol.plan.assignment(2).unwrap().leftover,
            alone.plan.assignment(2).unwrap().leftover
        );
    }

    #[test]
    fn test_narrow_bucket_reuses_remainders_before_new_slab() {
        let c = catalog(&[(Category::Countertop, 108.0, 26.0)]);
        let pieces = vec![
            Piece::new(1, "Granite", Category::Countertop, 60.0, 26.0),
            Piece::new(2, "Granite", Category::Countertop, 60.0, 26.0),
            Piece::new(3, "Granite", Category::Countertop, 40.0, 16.0),
            Piece::new(4, "Granite", Category::Countertop, 40.0, 16.0),
        ];
        let sol = solve(&c, &pieces);
        assert_slabs_consistent(&sol);
        assert_eq!(sol.plan.slab_count, 2);
        assert_ne!(
            sol.plan.assignment(3).unwrap().source,
            sol.plan.assignment(4).unwrap().source
        );
    }

    #[test]
    fn test_bucket_that_fits_one_slab_uses_exactly_one() {
        let c = catalog(&[
            (Category::Countertop, 96.0, 26.0),
            (Category::Countertop, 108.0, 26.0),
            (Category::Countertop, 120.0, 26.0),
        ]);
        let pieces = vec![
            Piece::new(1, "Granite", Category::Countertop, 30.0, 26.0),
            Piece::new(2, "Granite", Category::Countertop, 40.0, 25.95),
            Piece::new(3, "Granite", Category::Countertop, 20.0, 26.0),
        ];
        let sol = solve(&c, &pieces);
        assert_slabs_consistent(&sol);
        assert_eq!(slab_lengths(&sol), vec![96.0]);
    }

    #[test]
    fn test_jointed_group_forced_onto_first_size() {
        let c = catalog(&[
            (Category::Countertop, 96.0, 26.0),
            (Category::Countertop, 108.0, 26.0),
            (Category::Countertop, 120.0, 26.0),
        ]);
        let standalone = solve(
            &c,
            &[
                Piece::new(1, "Granite", Category::Countertop, 100.0, 26.0),
                Piece::new(2, "Granite", Category::Countertop, 90.0, 26.0),
            ],
        );
        assert_eq!(slab_lengths(&standalone), vec![96.0, 108.0]);

        let jointed = solve(
            &c,
            &[
                Piece::new(1, "Granite", Category::Countertop, 100.0, 26.0).jointed("A"),
                Piece::new(2, "Granite", Category::Countertop, 90.0, 26.0).jointed("A"),
            ],
        );
        assert_slabs_consistent(&jointed);
        assert_eq!(slab_lengths(&jointed), vec![108.0, 108.0]);
        // 97in of underlayment overhangs a sheet, which never blocks the slab
        assert!(jointed.plan.warnings.iter().all(|w| !w.blocks_slab()));
        assert_eq!(jointed.plan.assignment(2).unwrap().group, "A");
    }
}

mod plywood_scenarios {
    use super::*;

    #[test]
    fn test_single_countertop_on_one_sheet() {
        let c = catalog(&[(Category::Countertop, 96.0, 26.0)]);
        let pieces = vec![Piece::new(1, "Granite", Category::Countertop, 96.0, 26.0)];
        let sol = solve(&c, &pieces);

        assert_eq!(sol.sheets.sheet_count(), 1);
        assert!((sol.sheets.cost - 70.0).abs() < 1e-9);

        let ply = sol.plan.assignment(1).unwrap().plywood.clone().unwrap();
        assert_eq!(ply.sheet, StockRef::Sheet(0));
        assert_eq!(ply.cut, Rect::new(93.0, 24.0));

        // the slab is consumed exactly; only the sheet leaves offcuts
        let expected = 3.0 * 24.0 + 96.0 * 24.0;
        assert!((sol.plan.total_leftover_area - expected).abs() < 1e-6);
    }

    #[test]
    fn test_sheet_price_drives_cost() {
        let c = catalog(&[(Category::Island, 120.0, 43.0)]);
        let mut config = EngineConfig::default();
        config.plywood.price_per_sheet = 55.5;
        let pieces = vec![
            Piece::new(1, "Granite", Category::Island, 90.0, 43.0),
            Piece::new(2, "Granite", Category::Island, 80.0, 40.0),
        ];
        let sol = Solver::new(&c, config).unwrap().solve(&pieces).unwrap();
        // 87x41 and 77x38 cannot share a 96x48 sheet
        assert_eq!(sol.plan.sheet_count, 2);
        assert!((sol.sheets.cost - 2.0 * 55.5).abs() < 1e-9);
    }
}

mod run_properties {
    use super::*;

    fn mixed_job() -> (Catalog, Vec<Piece>) {
        let mut c = catalog(&[
            (Category::Countertop, 96.0, 26.0),
            (Category::Countertop, 108.0, 26.0),
            (Category::Countertop, 120.0, 26.0),
            (Category::Island, 120.0, 43.0),
            (Category::Backsplash, 108.0, 4.0),
        ]);
        c.insert("Quartz", Category::Countertop, 126.0, 26.0).unwrap();
        let pieces = vec![
            Piece::new(1, "Granite", Category::Countertop, 72.0, 25.5).jointed("L"),
            Piece::new(2, "Granite", Category::Countertop, 40.0, 25.5).jointed("L"),
            Piece::new(3, "Granite", Category::Island, 84.0, 42.0),
            Piece::new(4, "Granite", Category::Backsplash, 72.0, 4.0),
            Piece::new(5, "Granite", Category::Backsplash, 40.0, 4.0),
            Piece::new(6, "Granite", Category::FullBacksplash, 30.0, 18.0),
            Piece::new(7, "Quartz", Category::Countertop, 60.0, 26.0),
            Piece::new(8, "Quartz", Category::Countertop, 0.0, 26.0),
            Piece::new(9, "Marble", Category::Countertop, 60.0, 26.0),
        ];
        (c, pieces)
    }

    #[test]
    fn test_identical_inputs_give_identical_output() {
        let (c, pieces) = mixed_job();
        let a = serde_json::to_string(&solve(&c, &pieces)).unwrap();
        let b = serde_json::to_string(&solve(&c, &pieces)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_every_piece_accounted_for() {
        let (c, pieces) = mixed_job();
        let sol = solve(&c, &pieces);
        assert_slabs_consistent(&sol);
        assert_eq!(sol.plan.piece_assignments.len(), pieces.len());

        assert_eq!(sol.plan.assignment(8).unwrap().status, AssignmentStatus::Invalid);
        assert!(sol.plan.warnings.iter().any(|w| matches!(
            w,
            Warning::NoCatalogEntry { source_index: 9, .. }
        )));

        for bin in &sol.slabs {
            let materials: Vec<&str> = bin
                .cuts
                .iter()
                .filter_map(|c| pieces.iter().find(|p| p.source_index == c.source_index))
                .map(|p| p.material.as_str())
                .collect();
            assert!(materials.iter().all(|m| *m == bin.material));
        }
    }

    #[test]
    fn test_area_is_conserved() {
        let (c, pieces) = mixed_job();
        let sol = solve(&c, &pieces);
        let plan = &sol.plan;

        let slab_area: f64 = sol.slabs.iter().map(|b| b.size().area()).sum();
        let sheet_area: f64 = sol.sheets.sheets.iter().map(|s| s.stock.area()).sum();
        assert!((plan.total_stock_area - slab_area - sheet_area).abs() < 1e-6);
        assert!(plan.total_cut_area <= plan.total_stock_area + 1e-6);
        assert!(plan.total_leftover_area <= plan.total_stock_area - plan.total_cut_area + 1e-6);
        assert!(plan.waste_percent() >= 0.0);
    }

    #[test]
    fn test_json_request_shapes() {
        let pieces: Vec<Piece> = serde_json::from_str(
            r#"[
                {"source_index": 1, "length": 99, "width": 26, "material": "Granite",
                 "category": "countertop"},
                {"source_index": 2, "length": 80, "width": 26, "material": "Granite",
                 "category": "countertop", "group": "A", "joint": "jointed"}
            ]"#,
        )
        .unwrap();
        let rows: Vec<CatalogRow> = serde_json::from_str(
            r#"[{"material": "Granite", "category": "countertop", "length": 108, "width": 26}]"#,
        )
        .unwrap();
        let c = Catalog::from_rows(rows).unwrap();
        let sol = solve(&c, &pieces);
        assert_eq!(sol.plan.slab_count, 2);

        let json = serde_json::to_value(&sol).unwrap();
        assert!(json["plan"]["piece_assignments"].is_array());
        assert!(json["sheets"]["cost"].is_number());
    }
}
