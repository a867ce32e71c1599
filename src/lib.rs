pub mod config;
pub mod registry;

pub use config::{Config, ConfigError, ConfigSource, Format, HjsonFormat, Table, TomlFormat, Value};
pub use registry::Registry;
