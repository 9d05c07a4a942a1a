pub mod bucket;
pub mod catalog;
pub mod config;
pub mod error;
pub mod guillotine;
pub mod ledger;
pub mod render;
pub mod report;
pub mod slab;
pub mod solver;
pub mod types;
