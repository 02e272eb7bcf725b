//! Configuration loading (§6 Config surface).

mod loader;

pub use loader::{load, load_from_file, probe_config_paths};
