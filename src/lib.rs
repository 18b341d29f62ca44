//! Pedigree and breeding analysis for livestock herds.
//!
//! Animal and breeding data is read through [`store::HerdStore`]; everything
//! downstream of the fetch is pure computation:
//!
//! - [`pedigree`] builds bounded ancestor trees
//! - [`inbreeding`] and [`diversity`] score a tree or a prospective pair
//! - [`recommend`] ranks male × female pairings
//! - [`analytics`] aggregates the breeding log

pub mod analytics;
pub mod cancel;
pub mod config;
pub mod db;
pub mod diversity;
pub mod error;
pub mod inbreeding;
pub mod models;
pub mod pedigree;
pub mod recommend;
pub mod report;
pub mod store;

pub use cancel::CancellationToken;
pub use error::{AnalysisError, StoreError};
pub use store::{HerdStore, MemoryStore};
