//! Error types for bundle operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while opening a bundle or loading its metadata.
///
/// Display strings are the English fallback text; [`Error::message_key`]
/// exposes the stable localization key for each user-facing variant so an
/// embedding application can substitute its own translations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The bundle archive does not exist.
    #[error("bundle file not found: {}", path.display())]
    BundleNotFound { path: PathBuf },

    /// The archive exists but could not be extracted.
    #[error("unable to read contents of Text Release Bundle: {}", path.display())]
    ExtractionFailed {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// The extracted directory looks like a source bundle rather than a
    /// text release bundle. Terminal; no downgrade is attempted.
    #[error(
        "this bundle appears to be a source bundle; only Text Release Bundles are supported: {}",
        bundle.display()
    )]
    SourceBundleUnsupported { bundle: PathBuf },

    /// No metadata file and no source-bundle marker.
    #[error(
        "required {filename} file not found; file is not a valid Text Release Bundle: {}",
        bundle.display()
    )]
    MetadataFileMissing {
        filename: &'static str,
        bundle: PathBuf,
    },

    /// Metadata parsed but declares a non-text bundle type.
    #[error(
        "the metadata in this bundle indicates that it is of type \"{observed}\"; only Text Release Bundles are supported: {}",
        bundle.display()
    )]
    WrongBundleType { observed: String, bundle: PathBuf },

    /// Metadata is well-formed XML but not a shape this reader understands.
    #[error(
        "unable to read metadata (type: {bundle_type}, version: {version}); file is not a valid Text Release Bundle: {}",
        bundle.display()
    )]
    UnsupportedMetadataVersion {
        bundle_type: String,
        version: String,
        bundle: PathBuf,
    },

    /// Metadata could not be read even by the lenient probe.
    #[error("unable to read metadata; file is not a valid Text Release Bundle: {}", bundle.display())]
    MalformedMetadata {
        bundle: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// A structural violation found by the metadata parser (wrong root
    /// element, bad attribute value). Callers see this wrapped inside the
    /// loader's diagnosis, never bare.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
}

impl Error {
    /// Stable lookup key for localized rendering of user-facing errors.
    ///
    /// Internal pass-through variants (`Io`, `Xml`, `Utf8`,
    /// `InvalidMetadata`) have no key of their own; they only ever surface
    /// as the cause of a keyed variant.
    pub fn message_key(&self) -> Option<&'static str> {
        match self {
            Error::BundleNotFound { .. } | Error::ExtractionFailed { .. } => {
                Some("DblBundle.UnableToExtractBundle")
            }
            Error::SourceBundleUnsupported { .. } => Some("DblBundle.SourceReleaseBundle"),
            Error::MetadataFileMissing { .. } => Some("DblBundle.FileMissingFromBundle"),
            Error::WrongBundleType { .. } => Some("DblBundle.NotTextReleaseBundle"),
            Error::UnsupportedMetadataVersion { .. } => Some("DblBundle.MetadataInvalidVersion"),
            Error::MalformedMetadata { .. } => Some("DblBundle.MetadataInvalid"),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
