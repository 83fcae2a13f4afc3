//! SurrealDB schema initialization
//!
//! Defines the `agent_states` table. Safe to call on every connection.

use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all claimflow tables in SurrealDB (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing claimflow SurrealDB schema");
    init_agent_states_table(db).await?;
    info!("claimflow schema initialization complete");
    Ok(())
}

/// Initialize `agent_states` table with constraints and indexes
///
/// Schema:
/// ```text
/// TABLE agent_states {
///   id:             agent_states:⟨claim_id/agent_id⟩
///   claim_id:       STRING (indexed)
///   agent_id:       STRING
///   status:         STRING (enum: idle | running | complete | error)
///   output:         OBJECT?
///   error_kind:     STRING?
///   error_message:  STRING?
///   input_digest:   STRING?
///   updated_at:     STRING (RFC 3339)
/// }
/// ```
///
/// Constraints:
/// - `(claim_id, agent_id)` is unique; writes go through `UPSERT` on the
///   deterministic record id so a key never has two rows.
async fn init_agent_states_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing agent_states table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS agent_states
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR select FULL
                FOR update FULL
                FOR delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_claim_agent ON TABLE agent_states COLUMNS claim_id, agent_id UNIQUE;

        DEFINE INDEX IF NOT EXISTS idx_claim_id ON TABLE agent_states COLUMNS claim_id;
    "#;

    db.query(sql)
        .await
        .map_err(|e| crate::StateError::SchemaSetup(e.to_string()))?
        .check()
        .map_err(|e| crate::StateError::SchemaSetup(e.to_string()))?;
    debug!("agent_states table initialized");
    Ok(())
}
