//! # dbl-bundle
//!
//! A reader for Digital Bible Library (DBL) text release bundles: zip
//! archives carrying a publication's metadata document alongside its text
//! resources.
//!
//! ## Features
//!
//! - Open bundle archives and inspect their contents via [`TextBundle`]
//! - Version-tolerant metadata loading: newer schema shapes (2.0, 2.1) are
//!   rewritten down to the supported legacy shape and retried
//! - First-failure diagnostics with stable localization keys
//! - Scripture book code/number mapping for canon filtering
//!
//! ## Quick Start
//!
//! ```no_run
//! use dbl_bundle::{Bundle, TextBundle};
//!
//! let mut bundle = TextBundle::open("acholi.zip").unwrap();
//! println!("{} ({})", bundle.name(), bundle.language_iso());
//! bundle.close();
//! ```
//!
//! ## Working with Metadata
//!
//! [`TextMetadata`] can also be parsed on its own, without a bundle around
//! it:
//!
//! ```
//! use dbl_bundle::TextMetadata;
//!
//! let xml = r#"<DBLMetadata id="3b9f" version="2.1" revision="4" type="text">
//!   <identification><name>Example</name></identification>
//!   <language><iso>ach</iso></language>
//! </DBLMetadata>"#;
//!
//! let metadata: TextMetadata = TextMetadata::from_xml(xml).unwrap();
//! assert_eq!(metadata.name(), "Example");
//! assert!(metadata.is_text_release_bundle());
//! ```

pub mod bundle;
pub mod error;
pub mod metadata;
pub mod scripture;

pub use bundle::{Bundle, OpenOptions, TextBundle};
pub use error::{Error, Result};
pub use metadata::loader::MetadataLoader;
pub use metadata::{Language, LanguageRecord, TextMetadata};
