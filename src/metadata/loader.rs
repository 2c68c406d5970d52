//! Version-tolerant metadata loading.
//!
//! Newer bundles carry metadata in schema shapes the legacy model cannot
//! load directly. Rather than refusing them, the loader retries after
//! rewriting the document down to the 1.5 shape, walking a fixed cascade:
//! try as-is, try after the 2.1 rewrite, try after the 2.0 rewrite, give up.
//! Each rewrite reads the original file, never a previous rewrite's output.
//!
//! Error reporting follows a first-diagnosis rule: the very first failure is
//! classified once (against the original document) and that classification
//! is what surfaces if every retry fails. Later attempts can rescue the
//! load, but they never replace the diagnosis.

use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::parser::{parse_metadata, probe_metadata};
use super::transform::{DowngradeStep, DowngradeTransforms, SchemaDowngrader};
use super::{LanguageRecord, TextMetadata, read_xml_file};

/// Name of the metadata document inside a bundle.
pub const METADATA_FILENAME: &str = "metadata.xml";

/// Directory marking an extracted source bundle.
const SOURCE_BUNDLE_DIR: &str = "gather";

/// Progress through the downgrade cascade. Advanced strictly forward; a
/// step is never attempted twice in one load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CascadeState {
    NotTried,
    TriedV21,
    TriedV20,
    Exhausted,
}

impl CascadeState {
    fn advance(self) -> (CascadeState, Option<DowngradeStep>) {
        match self {
            CascadeState::NotTried => (CascadeState::TriedV21, Some(DowngradeStep::V21ToV15)),
            CascadeState::TriedV21 => (CascadeState::TriedV20, Some(DowngradeStep::V20ToV15)),
            CascadeState::TriedV20 | CascadeState::Exhausted => (CascadeState::Exhausted, None),
        }
    }
}

/// Why one load attempt did not produce an acceptable document.
enum LoadFailure {
    /// The document loaded but declares a type other than `text`. Wrongly
    /// typed documents still go through the cascade, because a rewrite can
    /// rescue a document with no type marker at all; a declared wrong type
    /// survives every rewrite and the diagnosis stands.
    WrongType(String),
    /// The document could not be read or parsed. `xml` carries the raw text
    /// when the file itself was readable, for the probe.
    Parse { error: Error, xml: Option<String> },
}

/// Loads `metadata.xml` from an extracted bundle directory, downgrading
/// newer schemas as needed.
///
/// The loader holds no per-load state; one instance can serve any number of
/// calls, including concurrent ones, and repeated loads of an untouched
/// directory behave identically.
pub struct MetadataLoader<T = SchemaDowngrader> {
    transforms: T,
    bundle_path: Option<PathBuf>,
}

impl MetadataLoader<SchemaDowngrader> {
    pub fn new() -> Self {
        MetadataLoader {
            transforms: SchemaDowngrader,
            bundle_path: None,
        }
    }
}

impl Default for MetadataLoader<SchemaDowngrader> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DowngradeTransforms> MetadataLoader<T> {
    /// A loader with a custom downgrade implementation.
    pub fn with_transforms(transforms: T) -> Self {
        MetadataLoader {
            transforms,
            bundle_path: None,
        }
    }

    /// Path reported in errors instead of the extracted directory. Set to
    /// the archive path when loading on behalf of a bundle, so diagnostics
    /// name the file the user actually has.
    pub fn bundle_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.bundle_path = Some(path.into());
        self
    }

    /// Load and validate the metadata document under `dir`.
    pub fn load<L: LanguageRecord>(&self, dir: &Path) -> Result<TextMetadata<L>> {
        let message_path = self
            .bundle_path
            .clone()
            .unwrap_or_else(|| dir.to_path_buf());

        let original = dir.join(METADATA_FILENAME);
        if !original.is_file() {
            if looks_like_source_bundle(dir) {
                return Err(Error::SourceBundleUnsupported {
                    bundle: message_path,
                });
            }
            return Err(Error::MetadataFileMissing {
                filename: METADATA_FILENAME,
                bundle: message_path,
            });
        }

        let mut state = CascadeState::NotTried;
        let mut rewrites: Vec<NamedTempFile> = Vec::new();
        let mut current = original.clone();

        debug!(path = %current.display(), "parsing bundle metadata");
        let first_failure = match self.attempt::<L>(&current) {
            Ok(metadata) => return Ok(metadata),
            Err(failure) => failure,
        };

        // Classified once, against the document as shipped. Rescue attempts
        // below can still succeed, but they never change the diagnosis.
        let diagnosis = diagnose(first_failure, &message_path);

        loop {
            let (next, step) = state.advance();
            state = next;
            let Some(step) = step else {
                return Err(diagnosis);
            };

            match self.rewrite(step, &original) {
                Ok(temp) => {
                    current = temp.path().to_path_buf();
                    rewrites.push(temp);
                }
                Err(error) => {
                    // The rewrite itself failing is not worth reporting over
                    // the diagnosis of the document as it actually is.
                    warn!(step = %step, error = %error, "metadata downgrade failed");
                    return Err(diagnosis);
                }
            }

            debug!(path = %current.display(), "parsing rewritten bundle metadata");
            if let Ok(metadata) = self.attempt::<L>(&current) {
                return Ok(metadata);
            }
        }
    }

    /// One parse attempt. Acceptance requires the `text` type marker; the
    /// declared schema version is never checked here.
    fn attempt<L: LanguageRecord>(
        &self,
        path: &Path,
    ) -> std::result::Result<TextMetadata<L>, LoadFailure> {
        let xml = match read_xml_file(path) {
            Ok(xml) => xml,
            Err(error) => return Err(LoadFailure::Parse { error, xml: None }),
        };
        match parse_metadata::<L>(&xml) {
            Ok(metadata) if metadata.is_text_release_bundle() => {
                debug!(id = %metadata.id, version = %metadata.version, "bundle metadata accepted");
                Ok(metadata)
            }
            Ok(metadata) => Err(LoadFailure::WrongType(metadata.bundle_type)),
            Err(error) => Err(LoadFailure::Parse {
                error,
                xml: Some(xml),
            }),
        }
    }

    fn rewrite(&self, step: DowngradeStep, original: &Path) -> Result<NamedTempFile> {
        let temp = NamedTempFile::new()?;
        self.transforms.downgrade(step, original, temp.path())?;
        debug!(step = %step, "retrying metadata load after downgrade");
        Ok(temp)
    }
}

/// Classify the first failure. The probe distinguishes a recognizable
/// document in an unsupported shape from one that is not metadata at all;
/// a successful probe always yields the unsupported-version diagnosis
/// naming the declared type and version. Wrong-type reporting is reserved
/// for documents the model could load.
fn diagnose(failure: LoadFailure, message_path: &Path) -> Error {
    match failure {
        LoadFailure::WrongType(observed) => Error::WrongBundleType {
            observed,
            bundle: message_path.to_path_buf(),
        },
        LoadFailure::Parse { error, xml: None } => Error::MalformedMetadata {
            bundle: message_path.to_path_buf(),
            source: Box::new(error),
        },
        LoadFailure::Parse {
            error,
            xml: Some(xml),
        } => match probe_metadata(&xml) {
            Err(_) => Error::MalformedMetadata {
                bundle: message_path.to_path_buf(),
                source: Box::new(error),
            },
            Ok(probe) => {
                let version = probe.version().to_string();
                Error::UnsupportedMetadataVersion {
                    bundle_type: probe.bundle_type,
                    version,
                    bundle: message_path.to_path_buf(),
                }
            }
        },
    }
}

/// A missing metadata file with source-bundle markers alongside means the
/// user grabbed the wrong artifact kind, which deserves a better message
/// than "file missing". Markers: a `gather/` directory, or any top-level
/// file with `source` in its name.
fn looks_like_source_bundle(dir: &Path) -> bool {
    if dir.join(SOURCE_BUNDLE_DIR).is_dir() {
        return true;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    for entry in entries.flatten() {
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if is_file && entry.file_name().to_string_lossy().contains("source") {
            return true;
        }
    }
    false
}
