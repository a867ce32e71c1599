//! Configuration documents: loading, path lookup and typed access.

mod error;
mod format;
mod instance;
mod source;
mod value;

pub use error::{BoxError, ConfigError};
pub use format::{Format, HjsonFormat, TomlFormat};
pub use instance::Config;
pub use source::ConfigSource;
pub use value::{Table, Value};
