//! treetab - tree to table exporter
//!
//! Turns selected sub-trees of an XML document into delimited-text and
//! fixed-width binary tables.
//!
//! ## Quick Start
//!
//! ```bash
//! # Write a starter configuration
//! treetab init
//!
//! # See what an export would write
//! treetab check run.xml
//!
//! # Export
//! treetab export run.xml --set out_dir=results
//! ```

mod commands;

fn main() {
    if let Err(err) = commands::run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
