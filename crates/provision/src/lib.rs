//! Lazy, idempotent extraction of packaged resources onto disk.
//!
//! The renderer executable and its rasterization script ship inside the
//! program (or next to it) and are only written to the provisioning root the
//! first time they are needed. Each resource is looked up as an archive
//! first (see [`Packing`]) and then as a plain file, so both packagings
//! work without configuration.
//!
//! - [`ResourceSource`] abstracts where bytes come from: [`EmbeddedSource`]
//!   (compiled in with `rust-embed`), [`DirectorySource`], and an in-memory
//!   `MemorySource` behind the `mock` feature.
//! - [`Provisioner`] writes resources into the root exactly once, even with
//!   concurrent callers, and marks executables as such on POSIX systems.

mod archive;
pub mod error;
mod provisioner;
mod source;

pub use crate::archive::Packing;
pub use crate::provisioner::{Provisioner, Resource};
#[cfg(any(test, feature = "mock"))]
pub use crate::source::MemorySource;
pub use crate::source::{DirectorySource, EmbeddedSource, ResourceSource, SourceHandle};
