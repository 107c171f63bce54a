//! Offline-resilient ingestion and hybrid aggregation pipeline for the
//! waste-weighing tracker.
//!
//! The pipeline covers the path from a weighing submitted on a possibly
//! disconnected device to the chart-ready aggregates the dashboards consume:
//!
//! - [`queue`]: the local pending queue, an embedded SQLite table of
//!   measurements not yet confirmed by the remote store.
//! - [`sync`]: drains the queue into the remote store, one record at a
//!   time, idempotently, halting at the first failure.
//! - [`view`]: merges pending and remote records into one de-duplicated,
//!   newest-first list for operational-log screens.
//! - [`resolver`]: picks, per client and time window, between a live record
//!   subscription, precomputed rollup reads, or a raw-record fallback.
//! - [`rollup`]: unflattens path-flattened rollup documents and folds them
//!   into breakdowns by waste type, sub-type, area, destination and month.
//! - [`carbon`]: turns aggregated weights plus emission-factor tables into
//!   avoided/direct/net CO₂-equivalent figures and a cumulative series.
//!
//! The remote document store, the client catalog and the emissions
//! configuration source are external collaborators, abstracted as traits in
//! [`store`] and [`config`] so the whole pipeline runs against in-memory
//! fakes in tests. Nothing here is fatal to the process: every failure
//! degrades to a partial or empty result with the cause logged.

pub mod carbon;
pub mod config;
pub mod period;
pub mod queue;
pub mod resolver;
pub mod rollup;
pub mod store;
pub mod sync;
pub mod view;
