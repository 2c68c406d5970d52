//! Bundle open/close lifecycle tests.
//!
//! Each test builds a zip archive fixture with the zip writer inside a temp
//! directory, then drives [`TextBundle`] through it: successful opens,
//! every rejection diagnosis, cleanup behavior, and the downgrade rescue of
//! newer metadata documents.

use std::fs;
use std::io::Write;
use std::path::Path;

use dbl_bundle::{Bundle, Error, Language, OpenOptions, TextBundle};
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const TEXT_METADATA_2_1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<DBLMetadata id="3b9fdc679b9319c3" version="2.1" revision="4" type="text">
  <identification>
    <name>Acholi New Testament 1985</name>
    <systemId csetid="930c2979" type="paratext">
      <id>3b9fdc679b9319c3ee45ab86cc1c0c42930c2979</id>
    </systemId>
  </identification>
  <language>
    <iso>ach</iso>
    <name>Acholi</name>
  </language>
</DBLMetadata>"#;

const AUDIO_METADATA_2_1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<DBLMetadata id="deadbeef00112233" version="2.1" revision="1" type="audio">
  <identification>
    <name>Acholi Audio New Testament</name>
  </identification>
  <language>
    <iso>ach</iso>
  </language>
</DBLMetadata>"#;

/// Well-formed 2.1 document with no `type` attribute at all. Only the
/// downgrade rewrite, which stamps the type marker, can make it loadable.
const TYPELESS_METADATA_2_1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<DBLMetadata id="cafe0123cafe0123" version="2.1" revision="2">
  <identification>
    <name>Untyped Release</name>
  </identification>
  <language>
    <iso>ach</iso>
  </language>
</DBLMetadata>"#;

const NO_LANGUAGE_METADATA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<DBLMetadata id="0123456789abcdef" version="2.1" revision="1" type="text">
  <identification>
    <name>No Language Declared</name>
  </identification>
</DBLMetadata>"#;

fn write_zip(path: &Path, files: &[(&str, &str)]) {
    let file = fs::File::create(path).expect("Failed to create archive file");
    let mut zip = ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in files {
        zip.start_file(*name, options).expect("Failed to start zip entry");
        zip.write_all(content.as_bytes())
            .expect("Failed to write zip entry");
    }
    zip.finish().expect("Failed to finish archive");
}

// ============================================================================
// Opening and accessors
// ============================================================================

#[test]
fn test_open_bundle_and_accessors() {
    let dir = TempDir::new().expect("temp dir");
    let archive = dir.path().join("acholi.zip");
    write_zip(
        &archive,
        &[
            ("metadata.xml", TEXT_METADATA_2_1),
            ("versification.vrs", "# versification table"),
            ("ldml.xml", "<ldml/>"),
            ("release/USX_1/MAT.usx", "<usx version=\"2.5\"/>"),
        ],
    );

    let mut bundle = TextBundle::open(&archive).expect("Failed to open bundle");
    assert_eq!(bundle.id(), "3b9fdc679b9319c3");
    assert_eq!(bundle.name(), "Acholi New Testament 1985");
    assert_eq!(bundle.language_iso(), "ach");
    assert_eq!(bundle.archive_path(), archive.as_path());
    assert_eq!(bundle.metadata().version, "2.1");
    assert_eq!(bundle.metadata().revision, 4);

    // The archive contents are extracted, nested paths included.
    assert!(bundle.extracted_dir().join("metadata.xml").is_file());
    assert!(bundle.extracted_dir().join("release/USX_1/MAT.usx").is_file());
    assert_eq!(
        bundle.versification_file(),
        Some(bundle.extracted_dir().join("versification.vrs"))
    );
    assert_eq!(
        bundle.ldml_file(),
        Some(bundle.extracted_dir().join("ldml.xml"))
    );
    bundle.close();
}

#[test]
fn test_ldml_file_found_by_extension() {
    let dir = TempDir::new().expect("temp dir");
    let archive = dir.path().join("bundle.zip");
    write_zip(
        &archive,
        &[("metadata.xml", TEXT_METADATA_2_1), ("ach.ldml", "<ldml/>")],
    );

    let bundle = TextBundle::open(&archive).expect("Failed to open bundle");
    assert_eq!(
        bundle.ldml_file(),
        Some(bundle.extracted_dir().join("ach.ldml"))
    );
    // No versification file in this bundle.
    assert_eq!(bundle.versification_file(), None);
}

#[test]
fn test_default_language_iso_fallback() {
    let dir = TempDir::new().expect("temp dir");
    let archive = dir.path().join("bundle.zip");
    write_zip(&archive, &[("metadata.xml", NO_LANGUAGE_METADATA)]);

    let without_default = TextBundle::open(&archive).expect("Failed to open bundle");
    assert_eq!(without_default.language_iso(), "");

    let with_default: TextBundle = OpenOptions::new()
        .with_default_language_iso("und")
        .open(&archive)
        .expect("Failed to open bundle");
    assert_eq!(with_default.language_iso(), "und");
}

// ============================================================================
// Rejection diagnoses
// ============================================================================

#[test]
fn test_open_missing_archive() {
    let dir = TempDir::new().expect("temp dir");
    let missing = dir.path().join("nope.zip");
    let err = TextBundle::open(&missing).unwrap_err();
    match err {
        Error::BundleNotFound { path } => assert_eq!(path, missing),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_open_garbage_archive() {
    let dir = TempDir::new().expect("temp dir");
    let archive = dir.path().join("garbage.zip");
    fs::write(&archive, "this is not a zip archive").expect("write garbage");

    let err = TextBundle::open(&archive).unwrap_err();
    match err {
        Error::ExtractionFailed { path, .. } => assert_eq!(path, archive),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn test_unreadable_archive_reports_extraction_failure() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().expect("temp dir");
    let archive = dir.path().join("locked.zip");
    fs::write(&archive, "not a zip archive").expect("write archive");
    fs::set_permissions(&archive, fs::Permissions::from_mode(0o000)).expect("set permissions");

    let err = TextBundle::open(&archive).unwrap_err();
    assert_eq!(err.message_key(), Some("DblBundle.UnableToExtractBundle"));
    match err {
        Error::ExtractionFailed { path, .. } => assert_eq!(path, archive),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_missing_extraction_root_reports_extraction_failure() {
    let dir = TempDir::new().expect("temp dir");
    let archive = dir.path().join("bundle.zip");
    write_zip(&archive, &[("metadata.xml", TEXT_METADATA_2_1)]);

    let root = dir.path().join("no-such-root");
    let err = OpenOptions::new()
        .with_extraction_root(&root)
        .open::<Language>(&archive)
        .unwrap_err();
    assert_eq!(err.message_key(), Some("DblBundle.UnableToExtractBundle"));
    assert!(matches!(err, Error::ExtractionFailed { .. }));
}

#[test]
fn test_missing_metadata_file_diagnosis() {
    let dir = TempDir::new().expect("temp dir");
    let archive = dir.path().join("no-metadata.zip");
    write_zip(&archive, &[("release/USX_1/MAT.usx", "<usx/>")]);

    let err = TextBundle::open(&archive).unwrap_err();
    assert!(matches!(
        err,
        Error::MetadataFileMissing { filename, .. } if filename == "metadata.xml"
    ));
    assert_eq!(err.message_key(), Some("DblBundle.FileMissingFromBundle"));
}

#[test]
fn test_source_bundle_diagnosis_both_markers() {
    // A gather directory marks a source bundle.
    let dir = TempDir::new().expect("temp dir");
    let archive = dir.path().join("source-gather.zip");
    write_zip(&archive, &[("gather/MAT.usx", "<usx/>")]);
    let err = TextBundle::open(&archive).unwrap_err();
    assert!(matches!(err, Error::SourceBundleUnsupported { .. }));
    assert_eq!(err.message_key(), Some("DblBundle.SourceReleaseBundle"));

    // So does a top-level file with "source" in its name.
    let archive = dir.path().join("source-file.zip");
    write_zip(&archive, &[("source.txt", "exported from the source tree")]);
    let err = TextBundle::open(&archive).unwrap_err();
    assert!(matches!(err, Error::SourceBundleUnsupported { .. }));
}

#[test]
fn test_wrong_type_bundle_reported_after_cascade() {
    let dir = TempDir::new().expect("temp dir");
    let archive = dir.path().join("audio.zip");
    write_zip(&archive, &[("metadata.xml", AUDIO_METADATA_2_1)]);

    // The declared type survives every downgrade rewrite, so the cascade
    // cannot turn an audio bundle into an acceptable one.
    let err = TextBundle::open(&archive).unwrap_err();
    match err {
        Error::WrongBundleType { observed, .. } => assert_eq!(observed, "audio"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_type_less_document_rescued_by_downgrade() {
    let dir = TempDir::new().expect("temp dir");
    let archive = dir.path().join("typeless.zip");
    write_zip(&archive, &[("metadata.xml", TYPELESS_METADATA_2_1)]);

    let bundle = TextBundle::open(&archive).expect("downgrade should rescue this bundle");
    assert_eq!(bundle.id(), "cafe0123cafe0123");
    // The accepted document is the rewritten one.
    assert_eq!(bundle.metadata().bundle_type, "text");
    assert_eq!(bundle.metadata().version, "1.5");
    assert_eq!(bundle.name(), "Untyped Release");
}

// ============================================================================
// Cleanup
// ============================================================================

#[test]
fn test_close_deletes_extracted_dir_and_is_idempotent() {
    let dir = TempDir::new().expect("temp dir");
    let archive = dir.path().join("bundle.zip");
    write_zip(&archive, &[("metadata.xml", TEXT_METADATA_2_1)]);

    let mut bundle = TextBundle::open(&archive).expect("Failed to open bundle");
    let extracted = bundle.extracted_dir().to_path_buf();
    assert!(extracted.is_dir());

    bundle.close();
    assert!(!extracted.exists(), "close should delete the extracted dir");
    bundle.close();
    assert!(!extracted.exists());
}

#[test]
fn test_drop_deletes_extracted_dir() {
    let dir = TempDir::new().expect("temp dir");
    let archive = dir.path().join("bundle.zip");
    write_zip(&archive, &[("metadata.xml", TEXT_METADATA_2_1)]);

    let extracted = {
        let bundle = TextBundle::open(&archive).expect("Failed to open bundle");
        bundle.extracted_dir().to_path_buf()
    };
    assert!(!extracted.exists(), "drop should delete the extracted dir");
}

#[test]
fn test_extraction_root_is_respected() {
    let dir = TempDir::new().expect("temp dir");
    let archive = dir.path().join("bundle.zip");
    write_zip(&archive, &[("metadata.xml", TEXT_METADATA_2_1)]);

    let root = TempDir::new().expect("temp dir");
    let bundle: TextBundle = OpenOptions::new()
        .with_extraction_root(root.path())
        .open(&archive)
        .expect("Failed to open bundle");
    assert!(bundle.extracted_dir().starts_with(root.path()));
}

#[test]
fn test_extracted_dir_retained_on_metadata_failure() {
    let dir = TempDir::new().expect("temp dir");
    let archive = dir.path().join("bad-metadata.zip");
    write_zip(&archive, &[("metadata.xml", "certainly not xml")]);

    let root = TempDir::new().expect("temp dir");
    let err = OpenOptions::new()
        .with_extraction_root(root.path())
        .open::<Language>(&archive)
        .unwrap_err();
    assert!(matches!(err, Error::MalformedMetadata { .. }));

    // The extraction directory stays behind so the rejected document can be
    // inspected.
    let mut entries = fs::read_dir(root.path()).expect("read extraction root").flatten();
    let retained = entries.next().expect("extraction dir should be retained").path();
    assert!(entries.next().is_none(), "exactly one extraction dir expected");
    assert!(retained.join("metadata.xml").is_file());
}

#[test]
fn test_reopening_same_archive_is_stable() {
    let dir = TempDir::new().expect("temp dir");
    let archive = dir.path().join("bundle.zip");
    write_zip(&archive, &[("metadata.xml", TEXT_METADATA_2_1)]);

    let mut first = TextBundle::open(&archive).expect("first open");
    let mut second = TextBundle::open(&archive).expect("second open");
    assert_eq!(first.metadata(), second.metadata());
    // Each handle owns its own extraction directory.
    assert_ne!(first.extracted_dir(), second.extracted_dir());

    first.close();
    assert!(second.extracted_dir().join("metadata.xml").is_file());
    second.close();
}
