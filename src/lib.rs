//! # Guildsweep
//!
//! Batch orchestration for bulk Discord account maintenance: validate
//! tokens, collect guild memberships into CSV listings, and leave guilds
//! across many independent profiles, each optionally routed through its own
//! outbound proxy.
//!
//! Accounts run through a fixed per-account pipeline (proxy check, token
//! check, then the selected operation) under a bounded concurrency limit
//! with staggered starts. Failures are contained per account; the run
//! always finishes and prints an aggregate report.
//!
//! ## Modules
//!
//! - `aggregate` - shared leave ledger and token buffers mutated by concurrent pipelines
//! - `api` - Discord REST client and its retry policy
//! - `catalog` - accumulated guild id/name catalog and leave-target resolution
//! - `config` - environment-driven runtime settings
//! - `error` - leave-failure reason taxonomy
//! - `input` - line-oriented data-file loading and profile assembly
//! - `orchestrator` - semaphore-bounded scheduling and the join barrier
//! - `output` - persisted CSV artifacts
//! - `pipeline` - the per-account state machine
//! - `profile` - immutable account record
//! - `proxy` - proxy descriptor parsing and the multi-service liveness probe
//! - `report` - end-of-run reporting
//! - `stats` - atomic run counters

pub mod aggregate;
pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod input;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod profile;
pub mod proxy;
pub mod report;
pub mod stats;
