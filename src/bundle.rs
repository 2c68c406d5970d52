//! Text Release Bundle handles.
//!
//! A bundle is a zip archive holding a metadata document plus the released
//! text resources. Opening one extracts the archive into a private temp
//! directory and loads the metadata through the version-tolerant loader;
//! the handle then owns that directory until it is closed or dropped. The
//! archive itself is never modified.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::metadata::loader::MetadataLoader;
use crate::metadata::{Language, LanguageRecord, TextMetadata};

/// File extension of a bundle archive.
pub const BUNDLE_EXTENSION: &str = "zip";

/// Versification file shipped inside text bundles.
pub const VERSIFICATION_FILENAME: &str = "versification.vrs";

/// Standard name of the LDML writing-system file.
pub const LDML_FILENAME: &str = "ldml.xml";

/// Extension carried by LDML files stored under a non-standard name.
pub const UNZIPPED_LDML_EXTENSION: &str = "ldml";

/// Surface shared by release bundle handles.
pub trait Bundle {
    /// Unique identifier of the enclosed publication.
    fn id(&self) -> &str;
    /// ISO 639 code of the publication language.
    fn language_iso(&self) -> &str;
    /// Human-readable publication name.
    fn name(&self) -> &str;
}

/// Options for opening a [`TextBundle`].
///
/// # Example
///
/// ```no_run
/// use dbl_bundle::{OpenOptions, TextBundle};
///
/// let bundle: TextBundle = OpenOptions::new()
///     .with_default_language_iso("und")
///     .open("path/to/bundle.zip")?;
/// # Ok::<(), dbl_bundle::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    default_language_iso: String,
    extraction_root: Option<PathBuf>,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// ISO code reported for bundles whose metadata does not declare one.
    pub fn with_default_language_iso(mut self, iso: impl Into<String>) -> Self {
        self.default_language_iso = iso.into();
        self
    }

    /// Parent directory for extraction temp dirs. Defaults to the system
    /// temp directory.
    pub fn with_extraction_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extraction_root = Some(dir.into());
        self
    }

    /// Open the bundle archive at `archive` with these options.
    pub fn open<L: LanguageRecord>(self, archive: impl AsRef<Path>) -> Result<TextBundle<L>> {
        let archive_path = archive.as_ref().to_path_buf();
        if !archive_path.is_file() {
            return Err(Error::BundleNotFound { path: archive_path });
        }

        let extracted_dir = self.extract(&archive_path)?;

        // On failure here the extracted directory stays on disk so the
        // rejected document can be inspected.
        let metadata = MetadataLoader::new()
            .bundle_path(archive_path.clone())
            .load::<L>(&extracted_dir)?;

        Ok(TextBundle {
            archive_path,
            extracted_dir,
            metadata,
            default_language_iso: self.default_language_iso,
            closed: false,
        })
    }

    fn extract(&self, archive_path: &Path) -> Result<PathBuf> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("dbl-bundle-");
        let dir = match &self.extraction_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|source| Error::ExtractionFailed {
            path: archive_path.to_path_buf(),
            source: source.into(),
        })?;

        let file = fs::File::open(archive_path).map_err(|source| Error::ExtractionFailed {
            path: archive_path.to_path_buf(),
            source: source.into(),
        })?;
        let mut archive = ZipArchive::new(file).map_err(|source| Error::ExtractionFailed {
            path: archive_path.to_path_buf(),
            source,
        })?;
        archive
            .extract(dir.path())
            .map_err(|source| Error::ExtractionFailed {
                path: archive_path.to_path_buf(),
                source,
            })?;

        debug!(
            archive = %archive_path.display(),
            dir = %dir.path().display(),
            "extracted bundle archive"
        );
        // From here cleanup belongs to the handle, not the temp-dir guard.
        Ok(dir.keep())
    }
}

/// An opened Text Release Bundle.
///
/// Generic over the language record so embedders can extend the
/// `<language>` sub-record; the default [`Language`] covers the standard
/// schema.
#[derive(Debug)]
pub struct TextBundle<L = Language> {
    archive_path: PathBuf,
    extracted_dir: PathBuf,
    metadata: TextMetadata<L>,
    default_language_iso: String,
    closed: bool,
}

impl TextBundle<Language> {
    /// Open a bundle archive with default options.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dbl_bundle::TextBundle;
    ///
    /// let mut bundle = TextBundle::open("path/to/bundle.zip")?;
    /// println!("{}", bundle.metadata().name());
    /// bundle.close();
    /// # Ok::<(), dbl_bundle::Error>(())
    /// ```
    pub fn open(archive: impl AsRef<Path>) -> Result<Self> {
        OpenOptions::new().open(archive)
    }
}

impl<L> TextBundle<L> {
    /// Path of the archive this handle was opened from.
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// The loaded metadata document.
    pub fn metadata(&self) -> &TextMetadata<L> {
        &self.metadata
    }

    /// Directory holding the extracted archive contents. Valid until the
    /// handle is closed.
    pub fn extracted_dir(&self) -> &Path {
        &self.extracted_dir
    }

    /// Path of the versification file, if the bundle ships one.
    pub fn versification_file(&self) -> Option<PathBuf> {
        let path = self.extracted_dir.join(VERSIFICATION_FILENAME);
        path.is_file().then_some(path)
    }

    /// Path of the LDML writing-system file, if the bundle ships one.
    /// Accepts the standard name or any top-level `.ldml` file.
    pub fn ldml_file(&self) -> Option<PathBuf> {
        let standard = self.extracted_dir.join(LDML_FILENAME);
        if standard.is_file() {
            return Some(standard);
        }
        let entries = fs::read_dir(&self.extracted_dir).ok()?;
        entries
            .flatten()
            .map(|entry| entry.path())
            .find(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext == UNZIPPED_LDML_EXTENSION)
            })
    }

    /// Delete the extracted directory. Idempotent; a failed delete is
    /// logged and the handle still counts as closed.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(error) = fs::remove_dir_all(&self.extracted_dir) {
            if error.kind() != ErrorKind::NotFound {
                warn!(
                    dir = %self.extracted_dir.display(),
                    error = %error,
                    "failed to remove extracted bundle directory"
                );
            }
        }
    }
}

impl<L: LanguageRecord> Bundle for TextBundle<L> {
    fn id(&self) -> &str {
        &self.metadata.id
    }

    fn language_iso(&self) -> &str {
        let iso = self.metadata.language.iso();
        if iso.is_empty() { &self.default_language_iso } else { iso }
    }

    fn name(&self) -> &str {
        self.metadata.name()
    }
}

impl<L> Drop for TextBundle<L> {
    fn drop(&mut self) {
        self.close();
    }
}
