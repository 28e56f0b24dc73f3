//! Database schema definitions
//!
//! One statement per entry, applied in order by `Database::migrate`.

pub const CREATE_BLOCKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS blocks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    block_hash VARCHAR(64) NOT NULL UNIQUE,
    timestamp BIGINT NOT NULL,
    parent_ids TEXT NOT NULL DEFAULT '[]',
    height BIGINT NOT NULL,
    height_group_index BIGINT NOT NULL,
    selected_parent_id BIGINT,
    color VARCHAR(8) NOT NULL DEFAULT 'gray',
    is_in_virtual_selected_parent_chain BOOLEAN NOT NULL DEFAULT FALSE,
    merge_set_red_ids TEXT NOT NULL DEFAULT '[]',
    merge_set_blue_ids TEXT NOT NULL DEFAULT '[]',
    daa_score BIGINT NOT NULL DEFAULT 0
)
"#;

pub const CREATE_BLOCKS_HEIGHT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_blocks_height ON blocks(height)";

pub const CREATE_BLOCKS_CHAIN_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_blocks_chain ON blocks(is_in_virtual_selected_parent_chain, height)";

pub const CREATE_BLOCKS_DAA_SCORE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_blocks_daa_score ON blocks(daa_score)";

pub const CREATE_EDGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS edges (
    from_block_id BIGINT NOT NULL,
    to_block_id BIGINT NOT NULL,
    from_height BIGINT NOT NULL,
    to_height BIGINT NOT NULL,
    from_height_group_index BIGINT NOT NULL,
    to_height_group_index BIGINT NOT NULL,
    PRIMARY KEY (from_block_id, to_block_id)
)
"#;

pub const CREATE_EDGES_HEIGHT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_edges_heights ON edges(from_height, to_height)";

pub const CREATE_HEIGHT_GROUPS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS height_groups (
    height BIGINT PRIMARY KEY,
    size BIGINT NOT NULL
)
"#;

pub const CREATE_APP_CONFIG_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS app_config (
    id BOOLEAN PRIMARY KEY DEFAULT TRUE,
    engine_version VARCHAR(64) NOT NULL,
    processing_version VARCHAR(64) NOT NULL,
    network VARCHAR(64) NOT NULL,
    CHECK (id)
)
"#;

pub const MIGRATIONS: &[&str] = &[
    CREATE_BLOCKS_TABLE,
    CREATE_BLOCKS_HEIGHT_INDEX,
    CREATE_BLOCKS_CHAIN_INDEX,
    CREATE_BLOCKS_DAA_SCORE_INDEX,
    CREATE_EDGES_TABLE,
    CREATE_EDGES_HEIGHT_INDEX,
    CREATE_HEIGHT_GROUPS_TABLE,
    CREATE_APP_CONFIG_TABLE,
];
