//! SurrealDB schema definitions

use crate::{DbConnection, Result};
use tracing::info;

/// Initialize the database schema
pub async fn initialize_schema(db: &DbConnection) -> Result<()> {
    info!("Initializing database schema...");

    db.query(SCHEMA_DEFINITION).await?;

    info!("Schema initialized successfully");
    Ok(())
}

const SCHEMA_DEFINITION: &str = r#"
-- ============================================
-- TABLES
-- ============================================

-- Entity nodes. SCHEMALESS: extraction attaches arbitrary scalar
-- properties which are flattened onto the record next to `label`.
DEFINE TABLE entity SCHEMALESS;

-- Registry of sanitized relationship types. Each entry names one edge
-- table, so read-back can enumerate edges without scanning the catalog.
DEFINE TABLE relation_type SCHEMAFULL;
DEFINE FIELD name ON relation_type TYPE string;

-- ============================================
-- INDEXES
-- ============================================

DEFINE INDEX idx_entity_label ON entity FIELDS label;
DEFINE INDEX idx_relation_type_name ON relation_type FIELDS name UNIQUE;
"#;

#[cfg(test)]
mod tests {
    use crate::init_memory;

    #[tokio::test]
    async fn test_schema_initialization() {
        let db = init_memory().await.expect("Failed to init db");

        // Verify tables exist by selecting from them
        let entities: Vec<serde_json::Value> = db.select("entity").await.unwrap();
        assert!(entities.is_empty());

        let types: Vec<serde_json::Value> = db.select("relation_type").await.unwrap();
        assert!(types.is_empty());
    }
}
