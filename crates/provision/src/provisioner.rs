use crate::archive::Packing;
use crate::error::{ErrorKind, Result};
use crate::source::{ResourceSource, SourceHandle};
use exn::ResultExt;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};
use tracing::instrument;

const STAGING_PREFIX: &str = ".provision-";

// Keyed by absolute target path so that every provisioner pointing at the
// same root shares the same guard.
static LOCKS: LazyLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = LazyLock::new(|| Mutex::new(HashMap::new()));

/// A file that must exist in the provisioning root before the renderer runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    name: String,
    executable: bool,
}
impl Resource {
    /// A regular data file, such as a script.
    pub fn file(name: impl Into<String>) -> Self {
        Self { name: name.into(), executable: false }
    }

    /// A program that must carry the execute permission on POSIX systems.
    pub fn executable(name: impl Into<String>) -> Self {
        Self { name: name.into(), executable: true }
    }

    /// The root-relative file name of the resource once provisioned.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_executable(&self) -> bool {
        self.executable
    }

    /// Names to look the resource up under, archives first.
    ///
    /// `linux64_phantomjs.exe` is searched for as `linux64_phantomjs.tar.gz`,
    /// `linux64_phantomjs.tar.bz2`, `linux64_phantomjs.tar` and finally as
    /// the plain `linux64_phantomjs.exe`.
    pub fn candidates(&self) -> Vec<(String, Packing)> {
        let stem = Path::new(&self.name).file_stem().and_then(|s| s.to_str()).unwrap_or(&self.name);
        Packing::ARCHIVES
            .iter()
            .map(|packing| (format!("{stem}{}", packing.suffix()), *packing))
            .chain(std::iter::once((self.name.clone(), Packing::Plain)))
            .collect()
    }
}

/// Lazily materialises packaged resources into a fixed root directory.
///
/// Provisioning is idempotent: once a resource exists in the root it is
/// never extracted or written again. Resources are staged inside the root
/// and renamed into place, so a resource that exists is always complete and,
/// where required, already executable.
///
/// # Examples
///
/// ```no_run
/// use rasterpdf_provision::{EmbeddedSource, Provisioner, Resource};
/// use std::sync::Arc;
///
/// # fn example() -> rasterpdf_provision::error::Result<()> {
/// let provisioner = Provisioner::new("/opt/rasterpdf", Arc::new(EmbeddedSource))?;
/// let script = provisioner.ensure(&Resource::file("rasterize.js"))?;
/// assert!(script.is_file());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Provisioner {
    root: PathBuf,
    source: SourceHandle,
}

impl Provisioner {
    /// Create a provisioner writing into `root`, which must be an existing
    /// directory.
    pub fn new(root: impl AsRef<Path>, source: SourceHandle) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            exn::bail!(ErrorKind::InvalidRoot(root.to_path_buf()));
        }
        let root = std::path::absolute(root).or_raise(|| ErrorKind::InvalidRoot(root.to_path_buf()))?;
        Ok(Self { root, source })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source(&self) -> &dyn ResourceSource {
        self.source.as_ref()
    }

    /// Absolute path the resource occupies once provisioned.
    pub fn path_of(&self, resource: &Resource) -> PathBuf {
        self.root.join(resource.name())
    }

    pub fn is_provisioned(&self, resource: &Resource) -> bool {
        self.path_of(resource).exists()
    }

    /// Make sure `resource` exists in the root, extracting it if necessary,
    /// and return its absolute path.
    #[instrument(skip_all, fields(resource = resource.name()))]
    pub fn ensure(&self, resource: &Resource) -> Result<PathBuf> {
        let target = self.path_of(resource);
        if target.exists() {
            tracing::trace!("Resource already provisioned");
            return Ok(target);
        }
        let lock = Self::lock_for(&target);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        // Another thread may have finished while we waited for the lock.
        if target.exists() {
            tracing::debug!("Resource provisioned concurrently");
            return Ok(target);
        }
        let (name, packing) = self.locate(resource)?;
        let bytes = self.source.load(&name)?;
        tracing::info!(from = %self.source.identifier(&name), size = bytes.len(), "Provisioning resource");
        if packing.is_archive() {
            self.extract_archive(resource, &name, packing, &bytes, &target)?;
        } else {
            self.write_plain(resource, &bytes, &target)?;
        }
        Ok(target)
    }

    fn lock_for(target: &Path) -> Arc<Mutex<()>> {
        let mut locks = LOCKS.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(target.to_path_buf()).or_default().clone()
    }

    fn locate(&self, resource: &Resource) -> Result<(String, Packing)> {
        let candidates = resource.candidates();
        match candidates.iter().find(|(name, _)| self.source.exists(name)) {
            Some(found) => Ok(found.clone()),
            None => exn::bail!(ErrorKind::ResourceNotFound(self.source.identifier(resource.name()))),
        }
    }

    fn write_plain(&self, resource: &Resource, bytes: &[u8], target: &Path) -> Result<()> {
        let mut staged = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(&self.root)
            .or_raise(|| ErrorKind::Io)?;
        staged.write_all(bytes).or_raise(|| ErrorKind::Io)?;
        staged.as_file().sync_all().or_raise(|| ErrorKind::Io)?;
        if resource.is_executable() {
            mark_executable(staged.path()).or_raise(|| ErrorKind::Io)?;
        }
        match staged.persist_noclobber(target) {
            Ok(_) => Ok(()),
            // Another process got there first; its copy is just as good.
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                tracing::debug!("Resource provisioned by another process");
                Ok(())
            },
            Err(e) => Err(e.error).or_raise(|| ErrorKind::Io),
        }
    }

    fn extract_archive(
        &self,
        resource: &Resource,
        archive: &str,
        packing: Packing,
        bytes: &[u8],
        target: &Path,
    ) -> Result<()> {
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.root)
            .or_raise(|| ErrorKind::Io)?;
        let unpacked = packing.unpack(archive, bytes, staging.path())?;

        let wanted = staging.path().join(resource.name());
        if !wanted.is_file() {
            exn::bail!(ErrorKind::ResourceNotFound(format!(
                "{}!{}",
                self.source.identifier(archive),
                resource.name()
            )));
        }
        if resource.is_executable() {
            mark_executable(&wanted).or_raise(|| ErrorKind::Io)?;
        }

        // Companions first: once the target appears, everything it shipped
        // with must already be in place.
        for entry in unpacked.iter().filter(|entry| entry.as_os_str() != resource.name()) {
            let destination = self.root.join(entry);
            if !move_into_place(&staging.path().join(entry), &destination).or_raise(|| ErrorKind::Io)? {
                tracing::trace!(entry = %destination.display(), "Archive entry already present; keeping existing copy");
            }
        }
        move_into_place(&wanted, target).or_raise(|| ErrorKind::Io)?;
        // Dropping the staging directory removes whatever was left behind.
        Ok(())
    }
}

/// Rename `from` to `to` unless `to` already exists. Returns `false` when the
/// existing copy was kept, including when another process put it there
/// between the check and the rename (non-empty directories refuse to be
/// replaced).
fn move_into_place(from: &Path, to: &Path) -> std::io::Result<bool> {
    if to.exists() {
        return Ok(false);
    }
    match std::fs::rename(from, to) {
        Ok(()) => Ok(true),
        Err(e) if to.exists() => {
            tracing::debug!(path = %to.display(), error = %e, "Resource provisioned by another process");
            Ok(false)
        },
        Err(e) => Err(e),
    }
}

/// Grant execute permission; archives and raw writes both lose the bit.
#[cfg(unix)]
fn mark_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    std::fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
