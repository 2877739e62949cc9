//! Convert HTML documents to PDF with a bundled, platform-specific rasterizer.
//!
//! The renderer executable and its driver script are provisioned into a root
//! folder on first use (see [`rasterpdf_provision`]), after which every call
//! to [`PdfGenerator::generate`] stages the HTML next to them, runs the
//! renderer once and returns the path of the finished PDF.

pub mod error;
mod generator;
mod layout;
mod params;
mod platform;
mod process;
mod staging;

pub use crate::generator::{DEFAULT_TIMEOUT, GeneratorConfig, PdfGenerator, RASTERIZE_SCRIPT};
pub use crate::params::{DimensionUnit, GenerationParameters, Orientation, PageFormat};
pub use crate::platform::Platform;
