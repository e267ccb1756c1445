//! Document formats and the conversion registry.
//!
//! The registry owns the declarative table mapping (source, target)
//! pairs to ordered capability chains. It is built once at startup and
//! read-only afterwards; an unsupported pair resolves to `None` and is
//! rejected before any artifact or worker is touched.

mod config;
mod error;
mod registry;
mod types;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use registry::{ChainEntry, ConversionChain, FormatRegistry};
pub use types::{DocumentFormat, FormatKind, FormatPair};
