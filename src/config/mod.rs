//! Configuration module for hubmeta
//!
//! Loads config from `$XDG_CONFIG_HOME/hubmeta/config.toml` or `~/.config/hubmeta/config.toml`.
//! Falls back to embedded defaults if file doesn't exist.
//! Partial configs are merged with defaults using serde's default attributes.
//!
//! # Example
//!
//! ```no_run
//! use hubmeta::config::Config;
//!
//! let config = Config::load().expect("Failed to load config");
//! println!("Cache dir: {}", config.cache.dir.display());
//! println!("Tasks: {:?}", config.hub.tasks);
//! ```

pub mod schema;

pub use schema::Config;
