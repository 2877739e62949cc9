//! Packed resource formats and unpacking.
//!
//! Renderer binaries are large and differ per platform, so they are usually
//! shipped as tarballs (optionally compressed) rather than as plain files.
//! The packing is detected from the resource name and cross-checked against
//! the payload's magic bytes before anything is written.

use crate::error::{ErrorKind, Result};
use bzip2::read::BzDecoder;
use exn::ResultExt;
use flate2::read::GzDecoder;
use std::ffi::OsString;
use std::io::Read;
use std::path::{Component, Path};
use tracing::instrument;

const BZIP2_MAGIC: [u8; 3] = [0x42, 0x5A, 0x68];
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
// POSIX tar headers carry "ustar" at offset 257; old v7 headers don't, so a
// missing marker is not treated as corruption.
const TAR_MAGIC_OFFSET: usize = 257;
const TAR_MAGIC: &[u8; 5] = b"ustar";

/// How a resource is packed inside a [`ResourceSource`](crate::ResourceSource).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Packing {
    /// The resource is stored verbatim.
    #[default]
    Plain,
    /// Uncompressed tarball (`.tar`).
    Tar,
    /// Gzip-compressed tarball (`.tar.gz`, `.tgz`).
    TarGzip,
    /// Bzip2-compressed tarball (`.tar.bz2`).
    TarBzip2,
}

impl Packing {
    /// Archive packings, in the order they are looked up.
    pub const ARCHIVES: [Packing; 3] = [Packing::TarGzip, Packing::TarBzip2, Packing::Tar];

    /// Detect packing from a resource name.
    #[must_use]
    pub fn from_name(name: impl AsRef<str>) -> Self {
        let name = name.as_ref().to_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Packing::TarGzip
        } else if name.ends_with(".tar.bz2") {
            Packing::TarBzip2
        } else if name.ends_with(".tar") {
            Packing::Tar
        } else {
            Packing::Plain
        }
    }

    /// Name suffix used when looking up an archive for a resource.
    #[inline]
    #[must_use]
    pub fn suffix(&self) -> &'static str {
        match self {
            Packing::Plain => "",
            Packing::Tar => ".tar",
            Packing::TarGzip => ".tar.gz",
            Packing::TarBzip2 => ".tar.bz2",
        }
    }

    #[inline]
    #[must_use]
    pub fn is_archive(&self) -> bool {
        !matches!(self, Packing::Plain)
    }

    /// Verify that `bytes` look like this packing.
    #[must_use]
    pub fn check_magic_bytes(&self, bytes: &[u8]) -> bool {
        match self {
            Packing::Plain => true,
            Packing::TarGzip => bytes.starts_with(&GZIP_MAGIC),
            Packing::TarBzip2 => bytes.starts_with(&BZIP2_MAGIC),
            Packing::Tar => {
                bytes.len() >= 512
                    && bytes
                        .get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + TAR_MAGIC.len())
                        .is_none_or(|magic| magic == TAR_MAGIC || magic.iter().all(|b| *b == 0))
            },
        }
    }

    fn wrap_reader<'a>(&self, bytes: &'a [u8]) -> Box<dyn Read + 'a> {
        match self {
            Packing::Plain | Packing::Tar => Box::new(bytes),
            Packing::TarGzip => Box::new(GzDecoder::new(bytes)),
            Packing::TarBzip2 => Box::new(BzDecoder::new(bytes)),
        }
    }

    /// Unpack every entry of the archive `bytes` into `into`, returning the
    /// top-level names that were created.
    ///
    /// Entries that would land outside `into` (absolute paths, `..`) are
    /// skipped by the tar reader. `name` is only used for error messages.
    #[instrument(skip(self, bytes, into), fields(packing = ?self, size = bytes.len()))]
    pub fn unpack(&self, name: &str, bytes: &[u8], into: &Path) -> Result<Vec<OsString>> {
        if !self.is_archive() {
            exn::bail!(ErrorKind::CorruptArchive(format!("{name}: not an archive")));
        }
        if !self.check_magic_bytes(bytes) {
            exn::bail!(ErrorKind::CorruptArchive(format!("{name}: unexpected magic bytes")));
        }
        let mut archive = tar::Archive::new(self.wrap_reader(bytes));
        let mut top_level = Vec::new();
        let entries = archive.entries().or_raise(|| ErrorKind::CorruptArchive(name.to_string()))?;
        for entry in entries {
            let mut entry = entry.or_raise(|| ErrorKind::CorruptArchive(name.to_string()))?;
            let path = entry.path().or_raise(|| ErrorKind::CorruptArchive(name.to_string()))?.into_owned();
            if !entry.unpack_in(into).or_raise(|| ErrorKind::CorruptArchive(name.to_string()))? {
                tracing::warn!(entry = %path.display(), "Skipped archive entry outside of the provisioning root");
                continue;
            }
            // `./name` is how `tar -C dir .` writes entries; the `.` itself is not an entry.
            let first = path.components().find_map(|component| match component {
                Component::Normal(part) => Some(part.to_os_string()),
                _ => None,
            });
            if let Some(first) = first
                && !top_level.contains(&first)
            {
                top_level.push(first);
            }
        }
        tracing::debug!(entries = top_level.len(), "Archive unpacked");
        Ok(top_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compression as GzCompression, write::GzEncoder};
    use rstest::rstest;
    use std::io::Write;

    fn tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), GzCompression::fast());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[rstest]
    #[case("linux64_phantomjs.tar.gz", Packing::TarGzip)]
    #[case("linux64_phantomjs.TGZ", Packing::TarGzip)]
    #[case("osx_phantomjs.tar.bz2", Packing::TarBzip2)]
    #[case("windows_phantomjs.tar", Packing::Tar)]
    #[case("windows_phantomjs.exe", Packing::Plain)]
    #[case("rasterize.js", Packing::Plain)]
    // Compressed, but not a tarball.
    #[case("rasterize.js.gz", Packing::Plain)]
    fn test_from_name(#[case] name: &str, #[case] expected: Packing) {
        assert_eq!(Packing::from_name(name), expected);
    }

    #[rstest]
    #[case(Packing::TarGzip, &[0x1F, 0x8B, 0x08, 0x00], true)]
    #[case(Packing::TarGzip, &[0x42, 0x5A, 0x68, 0x39], false)]
    #[case(Packing::TarBzip2, &[0x42, 0x5A, 0x68, 0x39], true)]
    #[case(Packing::TarBzip2, b"<html>", false)]
    #[case(Packing::Tar, b"short", false)]
    #[case(Packing::Plain, b"", true)]
    fn test_check_magic_bytes(#[case] packing: Packing, #[case] bytes: &[u8], #[case] expected: bool) {
        assert_eq!(packing.check_magic_bytes(bytes), expected);
    }

    #[test]
    fn test_unpack_tar_gz() {
        let dir = tempfile::tempdir().unwrap();
        let archive = gzip(&tarball(&[("renderer.exe", b"binary"), ("rasterize.js", b"// script")]));
        let top_level = Packing::TarGzip.unpack("bundle.tar.gz", &archive, dir.path()).unwrap();
        assert_eq!(top_level, vec![OsString::from("renderer.exe"), OsString::from("rasterize.js")]);
        assert_eq!(std::fs::read(dir.path().join("renderer.exe")).unwrap(), b"binary");
        assert_eq!(std::fs::read(dir.path().join("rasterize.js")).unwrap(), b"// script");
    }

    #[test]
    fn test_unpack_plain_tar_with_directory() {
        let dir = tempfile::tempdir().unwrap();
        let archive = tarball(&[("lib/one.so", b"1"), ("lib/two.so", b"2")]);
        let top_level = Packing::Tar.unpack("libs.tar", &archive, dir.path()).unwrap();
        assert_eq!(top_level, vec![OsString::from("lib")]);
        assert!(dir.path().join("lib/two.so").is_file());
    }

    /// Like [`tarball`], but writes the entry names verbatim; `append_data`
    /// would strip a leading `./`.
    fn raw_tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.as_old_mut().name[..name.len()].copy_from_slice(name.as_bytes());
            header.set_entry_type(tar::EntryType::Regular);
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn test_unpack_dot_prefixed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let archive = gzip(&raw_tarball(&[
            ("./renderer.exe", b"binary"),
            ("./rasterize.js", b"// script"),
            ("./lib/dep.so", b"lib"),
        ]));
        let top_level = Packing::TarGzip.unpack("bundle.tar.gz", &archive, dir.path()).unwrap();
        assert_eq!(
            top_level,
            vec![OsString::from("renderer.exe"), OsString::from("rasterize.js"), OsString::from("lib")]
        );
        assert!(dir.path().join("lib/dep.so").is_file());
    }

    #[test]
    fn test_unpack_corrupt_gzip() {
        let dir = tempfile::tempdir().unwrap();
        // Valid gzip, but the payload is not a whole tar block.
        let archive = gzip(b"this is not a tarball");
        let err = Packing::TarGzip.unpack("renderer.tar.gz", &archive, dir.path()).unwrap_err();
        assert!(matches!(*err, ErrorKind::CorruptArchive(_)));
    }

    #[test]
    fn test_unpack_wrong_format() {
        let dir = tempfile::tempdir().unwrap();
        let err = Packing::TarBzip2.unpack("renderer.tar.bz2", b"plain text", dir.path()).unwrap_err();
        assert_eq!(*err, ErrorKind::CorruptArchive("renderer.tar.bz2: unexpected magic bytes".to_string()));
    }

    #[test]
    fn test_unpack_plain_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let err = Packing::Plain.unpack("rasterize.js", b"// script", dir.path()).unwrap_err();
        assert!(matches!(*err, ErrorKind::CorruptArchive(_)));
    }
}
