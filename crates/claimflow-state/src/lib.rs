//! Claimflow-State: persistence for per-claim orchestrator state
//!
//! This crate owns the storage shape of the orchestrator: one row per
//! `(claim, agent)` pair holding the agent's lifecycle status, its last output
//! or failure, and the digest of the claim snapshot it ran against.
//!
//! ## Key Components
//!
//! - `StateStore`: backend-agnostic async trait, atomic per `(claim, agent)` key
//! - `MemoryStateStore`: in-process implementation (see [`fakes`])
//! - `SurrealStateStore`: SurrealDB implementation (`mem://`, `surrealkv://`, `ws://`)

mod error;
pub mod fakes;
mod migrations;
pub mod storage_traits;
pub mod surreal_store;

pub use error::{StateError, StorageError};
pub use fakes::MemoryStateStore;
pub use storage_traits::{
    AgentRunRecord, AgentStatus, ClaimId, ContentDigest, StateStore, StorageResult,
};
pub use surreal_store::SurrealStateStore;

/// Result type for claimflow-state connection and setup operations
pub type Result<T> = std::result::Result<T, StateError>;
