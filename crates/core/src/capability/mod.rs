//! Conversion capabilities.
//!
//! A capability is one concrete strategy for turning a source format
//! into a target format, usually by driving an external engine binary.
//! The format registry maps format pairs onto ordered capability
//! chains; the fallback router walks a chain until one capability
//! succeeds.

mod command;
mod config;
mod error;
mod image;
mod markdown;
mod office;
mod pdf;
mod render;
mod traits;
mod types;

pub use config::EnginesConfig;
pub use error::CapabilityError;
pub use image::ImageMagickCapability;
pub use markdown::PandocCapability;
pub use office::OfficeEngineCapability;
pub use pdf::{PdfConvertCapability, PdfRenderCapability};
pub use render::DocumentRenderCapability;
pub use traits::Capability;
pub use types::{CapabilityId, ConversionOptions, InvokeContext, PageRange, Quality};
