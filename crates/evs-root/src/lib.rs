//! # evs-root
//!
//! Native ROOT file reader for evsync.
//!
//! Reads flat TTrees of scalar branches from `.root` files without requiring
//! ROOT itself. Supports zlib, LZ4, ZSTD, and XZ compressed baskets, and
//! compiles TTreeFormula-like selection strings used for pre-selection.
//!
//! ## Example
//!
//! ```no_run
//! use evs_core::TreeSource;
//! use evs_root::RootTree;
//!
//! let tree = RootTree::open("sync_tree.root", "events").unwrap();
//! println!("{} entries", tree.entries());
//! let run = tree.read_branch("run").unwrap();
//! println!("run stored as {}", run.kind());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod basket;
pub mod branch_reader;
pub mod datasource;
pub mod decompress;
pub mod directory;
pub mod error;
pub mod expr;
pub mod file;
pub mod key;
pub mod objects;
pub mod rbuffer;
pub mod source;
pub mod tree;

pub use branch_reader::BranchReader;
pub use error::{Result, RootError};
pub use expr::SelectionExpr;
pub use file::RootFile;
pub use key::KeyInfo;
pub use source::RootTree;
pub use tree::{BranchInfo, LeafInfo, LeafType, Tree};
