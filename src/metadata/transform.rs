//! Downgrade rewrites for newer metadata schemas.
//!
//! When a document will not load as-is, the loader retries after rewriting
//! it into the legacy 1.5 shape. The rewrite is a structural pass over the
//! event stream, not a model round-trip: it never inspects the declared
//! version, succeeds on any well-formed input, and carries unknown elements
//! through untouched. Rewritten documents differ from their source in three
//! ways:
//!
//! * the root's `version`/`typeVersion` attributes are replaced by
//!   `typeVersion="1.5"`, and `type="text"` is stamped on roots that declare
//!   no type at all (a declared type is never altered, so a wrongly-typed
//!   bundle stays wrongly typed);
//! * `copyright/fullStatement/statementContent` collapses to the legacy
//!   `copyright/statement` element;
//! * `systemId/id` collapses to the legacy text-node form.

use std::fmt;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::error::{Error, Result};

use super::read_xml_file;

/// Schema version the downgrade rewrites target.
pub const LEGACY_VERSION: &str = "1.5";

/// One step of the downgrade sequence, named for the schema migration it
/// undoes. Both steps apply the same structural rewrite; they exist as
/// distinct retry slots so a failed attempt is never repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DowngradeStep {
    V21ToV15,
    V20ToV15,
}

impl DowngradeStep {
    pub fn source_version(&self) -> &'static str {
        match self {
            DowngradeStep::V21ToV15 => "2.1",
            DowngradeStep::V20ToV15 => "2.0",
        }
    }
}

impl fmt::Display for DowngradeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.source_version(), LEGACY_VERSION)
    }
}

/// Seam between the loader's retry protocol and the rewrite itself.
pub trait DowngradeTransforms {
    /// Rewrite the document at `source` into the legacy shape at `target`.
    /// `source` is read-only; a failed call must leave no partial claim on
    /// the loader's state.
    fn downgrade(&self, step: DowngradeStep, source: &Path, target: &Path) -> Result<()>;
}

/// The standard rewrite.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaDowngrader;

impl DowngradeTransforms for SchemaDowngrader {
    fn downgrade(&self, step: DowngradeStep, source: &Path, target: &Path) -> Result<()> {
        let xml = read_xml_file(source)?;
        let rewritten = rewrite_to_legacy(&xml)?;
        std::fs::write(target, rewritten)?;
        debug!(step = %step, source = %source.display(), "rewrote metadata to legacy schema");
        Ok(())
    }
}

fn rewrite_to_legacy(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");

    let mut saw_root = false;
    let mut in_system_id = false;
    let mut in_full_statement = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if !saw_root {
                    push_root_tag(&mut out, &e, false);
                    saw_root = true;
                    continue;
                }
                match e.name().as_ref() {
                    b"systemId" => {
                        in_system_id = true;
                        push_tag(&mut out, &e, false);
                    }
                    b"id" if in_system_id => {}
                    b"fullStatement" => in_full_statement = true,
                    b"statementContent" if in_full_statement => {
                        push_statement_tag(&mut out, &e);
                    }
                    _ => push_tag(&mut out, &e, false),
                }
            }
            Event::Empty(e) => {
                if !saw_root {
                    push_root_tag(&mut out, &e, true);
                    saw_root = true;
                    continue;
                }
                match e.name().as_ref() {
                    b"id" if in_system_id => {}
                    b"fullStatement" => {}
                    _ => push_tag(&mut out, &e, true),
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"systemId" => {
                    in_system_id = false;
                    push_end_tag(&mut out, b"systemId");
                }
                b"id" if in_system_id => {}
                b"fullStatement" => in_full_statement = false,
                b"statementContent" if in_full_statement => push_end_tag(&mut out, b"statement"),
                name => push_end_tag(&mut out, name),
            },
            Event::Text(t) => out.push_str(&String::from_utf8_lossy(t.as_ref())),
            Event::GeneralRef(e) => {
                out.push('&');
                out.push_str(&String::from_utf8_lossy(e.as_ref()));
                out.push(';');
            }
            Event::CData(t) => {
                out.push_str("<![CDATA[");
                out.push_str(&String::from_utf8_lossy(&t.into_inner()));
                out.push_str("]]>");
            }
            Event::Comment(t) => {
                out.push_str("<!--");
                out.push_str(&String::from_utf8_lossy(t.as_ref()));
                out.push_str("-->");
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(Error::InvalidMetadata(
            "document has no root element".to_string(),
        ));
    }
    Ok(out)
}

/// Root tag with the version attributes replaced and a missing bundle type
/// stamped in.
fn push_root_tag(out: &mut String, e: &BytesStart<'_>, empty: bool) {
    out.push('<');
    out.push_str(&String::from_utf8_lossy(e.name().as_ref()));
    let mut has_type = false;
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"version" | b"typeVersion" => continue,
            b"type" => has_type = true,
            _ => {}
        }
        push_attr(out, attr.key.as_ref(), &attr.value);
    }
    push_attr(out, b"typeVersion", LEGACY_VERSION.as_bytes());
    if !has_type {
        push_attr(out, b"type", b"text");
    }
    out.push_str(if empty { "/>" } else { ">" });
}

/// `statementContent` becomes `statement`; its `type` attribute is respelled
/// `contentType` and defaulted when absent.
fn push_statement_tag(out: &mut String, e: &BytesStart<'_>) {
    out.push_str("<statement");
    let mut has_content_type = false;
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"type" | b"contentType" => {
                has_content_type = true;
                push_attr(out, b"contentType", &attr.value);
            }
            key => push_attr(out, key, &attr.value),
        }
    }
    if !has_content_type {
        push_attr(out, b"contentType", super::DEFAULT_CONTENT_TYPE.as_bytes());
    }
    out.push('>');
}

fn push_tag(out: &mut String, e: &BytesStart<'_>, empty: bool) {
    out.push('<');
    out.push_str(&String::from_utf8_lossy(e.name().as_ref()));
    for attr in e.attributes().flatten() {
        push_attr(out, attr.key.as_ref(), &attr.value);
    }
    out.push_str(if empty { "/>" } else { ">" });
}

fn push_end_tag(out: &mut String, name: &[u8]) {
    out.push_str("</");
    out.push_str(&String::from_utf8_lossy(name));
    out.push('>');
}

fn push_attr(out: &mut String, key: &[u8], value: &[u8]) {
    out.push(' ');
    out.push_str(&String::from_utf8_lossy(key));
    out.push_str("=\"");
    out.push_str(&String::from_utf8_lossy(value));
    out.push('"');
}
