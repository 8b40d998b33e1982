//! # IFC Workbench
//!
//! Open several IFC files of one project side by side and browse them as a
//! single model.
//!
//! ## Features
//!
//! - Element registry across files, keyed by global id
//! - Location, class, flat and user defined trees, merged file by file
//! - Property and quantity columns picked at run time
//! - IDS rule checks and a cross-file integrity check
//! - Selection mirrored between the trees
//! - Export to CSV, JSON and BCF
//!
//! ## Example
//!
//! ```no_run
//! use ifc_workbench::session::Session;
//! use ifc_workbench::tree::TreeKind;
//! use std::path::PathBuf;
//!
//! let mut session = Session::default();
//! let summary = session.add_files(&[PathBuf::from("arch.ifc"), PathBuf::from("mep.ifc")]);
//! println!("{}", summary.message());
//! println!("Elements: {}", session.element_count());
//!
//! session.validate(None);
//! let location = session.tree(TreeKind::Location);
//! println!("Location rows: {}", location.len() - 1);
//! ```

pub mod error;
pub mod export;
pub mod loader;
pub mod model;
pub mod parser;
pub mod session;
pub mod sync;
pub mod tree;
pub mod ui;
pub mod validation;
