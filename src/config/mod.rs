//! JSON configuration for the command-line tools.

pub mod retile;

pub use retile::{load_config, GeometryConfig, RetileConfig};
