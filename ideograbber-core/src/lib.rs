#![doc = "ideograbber-core: core logic library for ideograbber."]

//! This crate contains the replication engine, the size-budget reducer and the data model
//! they share. Network clients and the CLI live in the `ideograbber` crate and plug in
//! through the traits in [`contract`].
//!
//! # Usage
//! Build a [`selection::SelectionModel`] from items and destinations, commit it, and hand
//! the [`selection::SelectionSet`] to [`replicate::ReplicationEngine::replicate`].

pub mod config;
pub mod contract;
pub mod extract;
pub mod item;
pub mod reduce;
pub mod replicate;
pub mod report;
pub mod selection;

pub use config::ReplicationConfig;
pub use item::{Item, ItemKind, Location};
pub use reduce::{reduce, ReduceError, SizeBudgetReducer};
pub use replicate::{ReplicationEngine, ReplicationError};
pub use report::{aggregate, CopyOutcome, FailureEntry, ReplicationReport};
pub use selection::{SelectionError, SelectionModel, SelectionSet, MAX_SELECTION};
