//! CLI command implementations

mod config_gen;
mod key_pool;
mod mappings;
mod status;

pub use config_gen::{generate_config, validate_config};
pub use key_pool::{populate_pool, run_cleanup};
pub use mappings::{create_mapping, resolve_key};
pub use status::show_stats;
