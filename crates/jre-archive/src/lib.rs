//! Extraction of runtime archives (`.tar.gz`, `.tar`, `.zip`) into a directory.
//!
//! Runtime distributions wrap their contents in a single top-level directory
//! (`ibm-java-x86_64-80/bin/java`, ...). Callers usually want that directory
//! discarded, so extraction takes a `strip_components` count with the same
//! meaning as `tar --strip-components`.
//!
//! Every entry path is validated before anything is written: absolute paths,
//! `..` components, links pointing outside the destination, and entries that
//! would be written through a previously extracted symlink are rejected.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::EntryType;
use zip::ZipArchive;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to open archive {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read archive {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read zip {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("archive {archive} contains unsafe entry path {entry:?}")]
    UnsafeEntryPath { archive: PathBuf, entry: PathBuf },

    #[error("archive {archive} contains link {entry:?} pointing outside the destination ({target:?})")]
    UnsafeLinkTarget {
        archive: PathBuf,
        entry: PathBuf,
        target: PathBuf,
    },

    #[error("archive {archive} contains unsupported entry type for {entry:?}")]
    UnsupportedEntryType { archive: PathBuf, entry: PathBuf },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Container formats recognized by [`Archive::format`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Tar,
    Zip,
}

impl ArchiveFormat {
    /// Sniff the format from the leading magic bytes.
    ///
    /// Anything that is neither gzip nor zip is assumed to be an uncompressed
    /// tar; a malformed file then fails during extraction.
    pub fn from_magic(magic: &[u8]) -> Self {
        if magic.starts_with(&[0x1f, 0x8b]) {
            ArchiveFormat::TarGz
        } else if magic.starts_with(b"PK\x03\x04") || magic.starts_with(b"PK\x05\x06") {
            ArchiveFormat::Zip
        } else {
            ArchiveFormat::Tar
        }
    }
}

/// Counts of what an extraction wrote, for logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub directories: usize,
    pub links: usize,
}

#[derive(Clone, Debug)]
pub struct Archive {
    path: PathBuf,
}

impl Archive {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Result<ArchiveFormat> {
        let mut magic = [0_u8; 4];
        let mut file = self.open()?;
        let mut filled = 0;
        while filled < magic.len() {
            let read = file
                .read(&mut magic[filled..])
                .map_err(|source| self.read_error(source))?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        Ok(ArchiveFormat::from_magic(&magic[..filled]))
    }

    /// Extract the archive into `dest`, dropping the first `strip_components`
    /// path components of every entry.
    ///
    /// Entries that have no components left after stripping (such as the
    /// top-level directory itself) are skipped. `dest` is created if missing;
    /// existing files at entry paths are overwritten.
    pub fn extract(&self, dest: &Path, strip_components: usize) -> Result<ExtractSummary> {
        let format = self.format()?;
        fs::create_dir_all(dest).map_err(|source| ArchiveError::Write {
            path: dest.to_path_buf(),
            source,
        })?;

        let extractor = Extractor {
            archive: &self.path,
            dest,
            strip_components,
        };
        let summary = match format {
            ArchiveFormat::TarGz => extractor.extract_tar(GzDecoder::new(self.open()?))?,
            ArchiveFormat::Tar => extractor.extract_tar(self.open()?)?,
            ArchiveFormat::Zip => extractor.extract_zip(self.open()?)?,
        };

        tracing::debug!(
            target: "jre.archive",
            archive = %self.path.display(),
            dest = %dest.display(),
            ?format,
            files = summary.files,
            directories = summary.directories,
            links = summary.links,
            "extracted archive"
        );
        Ok(summary)
    }

    fn open(&self) -> Result<File> {
        File::open(&self.path).map_err(|source| ArchiveError::Open {
            path: self.path.clone(),
            source,
        })
    }

    fn read_error(&self, source: io::Error) -> ArchiveError {
        ArchiveError::Read {
            path: self.path.clone(),
            source,
        }
    }
}

struct Extractor<'a> {
    archive: &'a Path,
    dest: &'a Path,
    strip_components: usize,
}

impl Extractor<'_> {
    fn extract_tar(&self, reader: impl Read) -> Result<ExtractSummary> {
        let mut summary = ExtractSummary::default();
        let mut archive = tar::Archive::new(reader);

        for entry in archive.entries().map_err(|source| self.read_error(source))? {
            let mut entry = entry.map_err(|source| self.read_error(source))?;
            let entry_path = entry
                .path()
                .map_err(|source| self.read_error(source))?
                .into_owned();
            let entry_type = entry.header().entry_type();

            // Metadata-only records; the `tar` crate applies long names itself.
            if matches!(
                entry_type,
                EntryType::XGlobalHeader
                    | EntryType::XHeader
                    | EntryType::GNULongName
                    | EntryType::GNULongLink
            ) {
                continue;
            }

            let Some(rel) = self.strip(&entry_path)? else {
                continue;
            };
            self.reject_symlinked_ancestors(&entry_path, &rel)?;
            let out_path = self.dest.join(&rel);

            match entry_type {
                EntryType::Directory => {
                    create_dir_all(&out_path)?;
                    summary.directories += 1;
                }
                EntryType::Regular | EntryType::Continuous => {
                    create_parent(&out_path)?;
                    remove_existing_link(&out_path)?;
                    entry.unpack(&out_path).map_err(|source| ArchiveError::Write {
                        path: out_path.clone(),
                        source,
                    })?;
                    summary.files += 1;
                }
                EntryType::Symlink => {
                    let target = entry
                        .link_name()
                        .map_err(|source| self.read_error(source))?
                        .ok_or_else(|| ArchiveError::UnsupportedEntryType {
                            archive: self.archive.to_path_buf(),
                            entry: entry_path.clone(),
                        })?
                        .into_owned();
                    self.symlink(&entry_path, &rel, &target)?;
                    summary.links += 1;
                }
                EntryType::Link => {
                    let target = entry
                        .link_name()
                        .map_err(|source| self.read_error(source))?
                        .ok_or_else(|| ArchiveError::UnsupportedEntryType {
                            archive: self.archive.to_path_buf(),
                            entry: entry_path.clone(),
                        })?
                        .into_owned();
                    // Hard link targets name another archive entry, so they are stripped the
                    // same way entry paths are.
                    let Some(target_rel) = self.strip(&target)? else {
                        return Err(ArchiveError::UnsafeLinkTarget {
                            archive: self.archive.to_path_buf(),
                            entry: entry_path,
                            target,
                        });
                    };
                    if self.symlinked_component(&target_rel, true)? {
                        return Err(ArchiveError::UnsafeLinkTarget {
                            archive: self.archive.to_path_buf(),
                            entry: entry_path,
                            target,
                        });
                    }
                    create_parent(&out_path)?;
                    remove_existing_link(&out_path)?;
                    if out_path.exists() {
                        fs::remove_file(&out_path).map_err(|source| ArchiveError::Write {
                            path: out_path.clone(),
                            source,
                        })?;
                    }
                    fs::hard_link(self.dest.join(&target_rel), &out_path).map_err(|source| {
                        ArchiveError::Write {
                            path: out_path.clone(),
                            source,
                        }
                    })?;
                    summary.links += 1;
                }
                _ => {
                    return Err(ArchiveError::UnsupportedEntryType {
                        archive: self.archive.to_path_buf(),
                        entry: entry_path,
                    })
                }
            }
        }

        Ok(summary)
    }

    fn extract_zip(&self, file: File) -> Result<ExtractSummary> {
        let mut summary = ExtractSummary::default();
        let mut zip = ZipArchive::new(file).map_err(|source| self.zip_error(source))?;

        for idx in 0..zip.len() {
            let mut entry = zip.by_index(idx).map_err(|source| self.zip_error(source))?;
            let entry_path = PathBuf::from(entry.name());
            let Some(rel) = self.strip(&entry_path)? else {
                continue;
            };
            self.reject_symlinked_ancestors(&entry_path, &rel)?;
            let out_path = self.dest.join(&rel);
            let mode = entry.unix_mode();

            if entry.is_dir() {
                create_dir_all(&out_path)?;
                summary.directories += 1;
            } else if mode.is_some_and(|mode| mode & 0o170000 == 0o120000) {
                let mut target = String::new();
                entry
                    .read_to_string(&mut target)
                    .map_err(|source| self.read_error(source))?;
                self.symlink(&entry_path, &rel, Path::new(&target))?;
                summary.links += 1;
            } else {
                create_parent(&out_path)?;
                remove_existing_link(&out_path)?;
                let write_err = |source| ArchiveError::Write {
                    path: out_path.clone(),
                    source,
                };
                let mut out = File::create(&out_path).map_err(write_err)?;
                io::copy(&mut entry, &mut out).map_err(write_err)?;
                #[cfg(unix)]
                if let Some(mode) = mode {
                    use std::os::unix::fs::PermissionsExt;

                    fs::set_permissions(&out_path, fs::Permissions::from_mode(mode & 0o777))
                        .map_err(write_err)?;
                }
                summary.files += 1;
            }
        }

        Ok(summary)
    }

    /// Validate `path` and drop the leading components.
    ///
    /// Returns `Ok(None)` when nothing is left after stripping.
    fn strip(&self, path: &Path) -> Result<Option<PathBuf>> {
        let mut normal = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => normal.push(part),
                Component::CurDir => {}
                _ => {
                    return Err(ArchiveError::UnsafeEntryPath {
                        archive: self.archive.to_path_buf(),
                        entry: path.to_path_buf(),
                    })
                }
            }
        }

        if normal.len() <= self.strip_components {
            return Ok(None);
        }
        Ok(Some(normal[self.strip_components..].iter().collect()))
    }

    /// Earlier entries may have created symlinks; writing through one would
    /// land wherever it points, so no ancestor of `rel` may be a symlink.
    fn reject_symlinked_ancestors(&self, entry: &Path, rel: &Path) -> Result<()> {
        if self.symlinked_component(rel, false)? {
            return Err(ArchiveError::UnsafeEntryPath {
                archive: self.archive.to_path_buf(),
                entry: entry.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Whether any existing component of `dest/rel` is a symlink. The last
    /// component is only considered when `include_last` is set.
    fn symlinked_component(&self, rel: &Path, include_last: bool) -> Result<bool> {
        let components: Vec<_> = rel.components().collect();
        let checked = if include_last {
            components.len()
        } else {
            components.len().saturating_sub(1)
        };

        let mut current = self.dest.to_path_buf();
        for component in &components[..checked] {
            current.push(component);
            match fs::symlink_metadata(&current) {
                Ok(meta) if meta.file_type().is_symlink() => return Ok(true),
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
                Err(source) => return Err(ArchiveError::Write { path: current, source }),
            }
        }
        Ok(false)
    }

    fn symlink(&self, entry: &Path, rel: &Path, target: &Path) -> Result<()> {
        if !link_stays_within(rel, target) {
            return Err(ArchiveError::UnsafeLinkTarget {
                archive: self.archive.to_path_buf(),
                entry: entry.to_path_buf(),
                target: target.to_path_buf(),
            });
        }

        let out_path = self.dest.join(rel);
        create_parent(&out_path)?;
        remove_existing_link(&out_path)?;

        #[cfg(unix)]
        let linked = {
            if out_path.exists() {
                fs::remove_file(&out_path).map_err(|source| ArchiveError::Write {
                    path: out_path.clone(),
                    source,
                })?;
            }
            std::os::unix::fs::symlink(target, &out_path).map_err(|source| ArchiveError::Write {
                path: out_path.clone(),
                source,
            })
        };

        #[cfg(not(unix))]
        let linked = Err(ArchiveError::UnsupportedEntryType {
            archive: self.archive.to_path_buf(),
            entry: entry.to_path_buf(),
        });

        linked
    }

    fn read_error(&self, source: io::Error) -> ArchiveError {
        ArchiveError::Read {
            path: self.archive.to_path_buf(),
            source,
        }
    }

    fn zip_error(&self, source: zip::result::ZipError) -> ArchiveError {
        ArchiveError::Zip {
            path: self.archive.to_path_buf(),
            source,
        }
    }
}

/// Whether a symlink at `link_rel` (relative to the destination root) pointing
/// at `target` resolves lexically inside the destination.
fn link_stays_within(link_rel: &Path, target: &Path) -> bool {
    let mut depth = link_rel.components().count().saturating_sub(1) as isize;
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| ArchiveError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) => create_dir_all(parent),
        None => Ok(()),
    }
}

/// Writing through an existing symlink would escape the destination.
fn remove_existing_link(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            fs::remove_file(path).map_err(|source| ArchiveError::Write {
                path: path.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

/// Extract `archive` into `dest`, see [`Archive::extract`].
pub fn extract(archive: &Path, dest: &Path, strip_components: usize) -> Result<ExtractSummary> {
    Archive::new(archive).extract(dest, strip_components)
}
