//! Canonical SQLite schema for the forest.
//!
//! - `nodes` records node identity; `AUTOINCREMENT` keeps ids append-only
//!   even after rows are deleted
//! - `closures` stores one row per (ancestor, descendant) pair with its depth
//! - `store_meta` tracks the applied schema version

/// Migration v1: node and closure relations plus metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT
);

CREATE TABLE IF NOT EXISTS closures (
    ancestor INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    descendant INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    depth INTEGER NOT NULL CHECK (depth >= 0),
    PRIMARY KEY (ancestor, descendant),
    CHECK (ancestor <> descendant OR depth = 0)
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 1);
";

/// Migration v2: indexes for both query directions.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_closures_ancestor_depth
    ON closures(ancestor, depth, descendant);

CREATE INDEX IF NOT EXISTS idx_closures_descendant_depth
    ON closures(descendant, depth, ancestor);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
";

/// Indexes expected by subtree and ancestor query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_closures_ancestor_depth",
    "idx_closures_descendant_depth",
];
