//! Where provisionable resources come from.
//!
//! A [`ResourceSource`] hands out the raw bytes of a named resource. The
//! [`Provisioner`](crate::Provisioner) never cares whether those bytes were
//! compiled into the binary ([`EmbeddedSource`]), read from a folder next to
//! it ([`DirectorySource`]) or prepared by a test (`MemorySource`, behind the
//! `mock` feature).

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use rust_embed::Embed;
use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Shared, thread-safe handle to a resource source.
pub type SourceHandle = Arc<dyn ResourceSource>;

/// Load-by-name access to packaged resources.
pub trait ResourceSource: Send + Sync {
    /// Load the full contents of the resource called `name`.
    ///
    /// Returns [`ErrorKind::ResourceNotFound`] when the source has no such
    /// resource.
    fn load(&self, name: &str) -> Result<Cow<'static, [u8]>>;

    /// Check whether the resource exists without loading it.
    fn exists(&self, name: &str) -> bool;

    /// Human-readable identifier for `name` within this source, for logs and
    /// error messages.
    fn identifier(&self, name: &str) -> String;
}

#[derive(Embed)]
#[folder = "../../assets/renderer/"]
struct Assets;

/// Resources compiled into the binary from `assets/renderer/`.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbeddedSource;
impl EmbeddedSource {
    /// List the names of every embedded resource.
    pub fn list() -> Vec<Cow<'static, str>> {
        Assets::iter().collect()
    }
}
impl ResourceSource for EmbeddedSource {
    fn load(&self, name: &str) -> Result<Cow<'static, [u8]>> {
        Assets::get(name).map(|f| f.data).ok_or_raise(|| ErrorKind::ResourceNotFound(self.identifier(name)))
    }

    fn exists(&self, name: &str) -> bool {
        Assets::get(name).is_some()
    }

    fn identifier(&self, name: &str) -> String {
        format!("builtin:{}", name.trim().trim_start_matches("builtin:"))
    }
}

/// Resources read from a directory on disk, for deployments that ship the
/// renderer next to the program instead of inside it.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    dir: PathBuf,
}
impl DirectorySource {
    /// Create a source reading from `dir`, which must be an existing directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            exn::bail!(ErrorKind::InvalidRoot(dir));
        }
        Ok(Self { dir })
    }

    /// Resolve `name` inside the directory. Names are flat: anything with a
    /// separator or a parent component is refused.
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(file)), None) => Some(self.dir.join(file)),
            _ => None,
        }
    }
}
impl ResourceSource for DirectorySource {
    fn load(&self, name: &str) -> Result<Cow<'static, [u8]>> {
        let path = self.resolve(name).ok_or_raise(|| ErrorKind::ResourceNotFound(self.identifier(name)))?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Cow::Owned(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                exn::bail!(ErrorKind::ResourceNotFound(self.identifier(name)))
            },
            Err(e) => Err(e).or_raise(|| ErrorKind::Io),
        }
    }

    fn exists(&self, name: &str) -> bool {
        self.resolve(name).is_some_and(|path| path.is_file())
    }

    fn identifier(&self, name: &str) -> String {
        self.dir.join(name).display().to_string()
    }
}

#[cfg(any(test, feature = "mock"))]
pub use self::mock::MemorySource;

#[cfg(any(test, feature = "mock"))]
mod mock {
    use super::ResourceSource;
    use crate::error::{ErrorKind, Result};
    use exn::OptionExt;
    use std::borrow::Cow;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory resource source for testing.
    ///
    /// Counts every successful [`load`](ResourceSource::load) so tests can
    /// assert that provisioning happened exactly once.
    ///
    /// # Examples
    ///
    /// ```
    /// use rasterpdf_provision::{MemorySource, ResourceSource};
    ///
    /// let source = MemorySource::with_files([("rasterize.js", b"// script")]);
    /// assert!(source.exists("rasterize.js"));
    /// assert_eq!(source.load("rasterize.js").unwrap().as_ref(), b"// script");
    /// assert_eq!(source.loads(), 1);
    /// ```
    #[derive(Default)]
    pub struct MemorySource {
        files: Mutex<HashMap<String, Vec<u8>>>,
        loads: AtomicUsize,
    }

    impl MemorySource {
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a source pre-populated with files.
        pub fn with_files<N, D, I>(files: I) -> Self
        where
            N: Into<String>,
            D: AsRef<[u8]>,
            I: IntoIterator<Item = (N, D)>,
        {
            let source = Self::new();
            for (name, data) in files {
                source.insert(name, data);
            }
            source
        }

        pub fn insert(&self, name: impl Into<String>, data: impl AsRef<[u8]>) {
            self.files.lock().unwrap_or_else(|e| e.into_inner()).insert(name.into(), data.as_ref().to_vec());
        }

        /// Number of successful loads so far.
        pub fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    impl ResourceSource for MemorySource {
        fn load(&self, name: &str) -> Result<Cow<'static, [u8]>> {
            let files = self.files.lock().unwrap_or_else(|e| e.into_inner());
            let data = files.get(name).cloned().ok_or_raise(|| ErrorKind::ResourceNotFound(self.identifier(name)))?;
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Cow::Owned(data))
        }

        fn exists(&self, name: &str) -> bool {
            self.files.lock().unwrap_or_else(|e| e.into_inner()).contains_key(name)
        }

        fn identifier(&self, name: &str) -> String {
            format!("memory:{name}")
        }
    }
}
