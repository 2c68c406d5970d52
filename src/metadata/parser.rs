//! Event-driven parser for metadata documents.
//!
//! One pass over the event stream builds the model; a second, lenient entry
//! point ([`probe_metadata`]) reads only the root attributes for diagnosing
//! documents the full parse rejects. Text is kept untrimmed while reading so
//! embedded XHTML survives verbatim; leaf fields are trimmed at assignment.

use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};

use super::{
    ArchiveStatus, AvailableBook, Canon, ContentNode, Copyright, Identification, LanguageRecord,
    METADATA_ROOT_ELEMENT, Promotion, SystemId, TextMetadata,
};

/// Read an XML file to a string, dropping a leading UTF-8 byte order mark.
pub(crate) fn read_xml_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8(bytes)?;
    Ok(strip_bom(&text).to_string())
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Parse a complete metadata document.
pub(crate) fn parse_metadata<L: LanguageRecord>(xml: &str) -> Result<TextMetadata<L>> {
    let mut reader = Reader::from_str(strip_bom(xml));
    let mut metadata = TextMetadata::<L>::new();
    let mut type_version = String::new();
    let mut saw_root = false;
    let mut root_closed = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if !saw_root {
                    check_root_name(&e)?;
                    read_root_attributes(&e, &mut metadata, &mut type_version)?;
                    saw_root = true;
                    continue;
                }
                match e.name().as_ref() {
                    b"language" => parse_language(&mut reader, &mut metadata.language)?,
                    b"identification" => {
                        metadata.identification = parse_identification(&mut reader)?
                    }
                    b"copyright" => metadata.copyright = Some(parse_copyright(&mut reader)?),
                    b"promotion" => metadata.promotion = Some(parse_promotion(&mut reader)?),
                    b"archiveStatus" => {
                        metadata.archive_status = Some(parse_archive_status(&mut reader)?)
                    }
                    b"bookNames" => metadata.available_books = parse_book_names(&mut reader)?,
                    b"contents" => metadata.canons = parse_contents(&mut reader)?,
                    other => {
                        let name = other.to_vec();
                        skip_element(&mut reader, &name)?;
                    }
                }
            }
            Event::Empty(e) => {
                if !saw_root {
                    check_root_name(&e)?;
                    read_root_attributes(&e, &mut metadata, &mut type_version)?;
                    saw_root = true;
                    root_closed = true;
                    continue;
                }
                match e.name().as_ref() {
                    b"copyright" => metadata.copyright = Some(Copyright::default()),
                    b"promotion" => metadata.promotion = Some(Promotion::default()),
                    b"archiveStatus" => metadata.archive_status = Some(ArchiveStatus::default()),
                    _ => {}
                }
            }
            Event::End(e) => {
                if e.name().as_ref() == METADATA_ROOT_ELEMENT.as_bytes() {
                    root_closed = true;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root || !root_closed {
        return Err(unexpected_eof());
    }
    if metadata.version.is_empty() {
        metadata.version = type_version;
    }
    if metadata.id.is_empty() {
        return Err(Error::InvalidMetadata(
            "metadata document has no id attribute".to_string(),
        ));
    }
    Ok(metadata)
}

/// Root attributes of a document the full parse could not load.
#[derive(Debug, Clone, Default)]
pub(crate) struct MetadataProbe {
    pub bundle_type: String,
    version: String,
    type_version: String,
}

impl MetadataProbe {
    /// Declared schema version, preferring the legacy `typeVersion` spelling
    /// when both attributes are present.
    pub fn version(&self) -> &str {
        if self.type_version.is_empty() {
            &self.version
        } else {
            &self.type_version
        }
    }
}

/// Read only the root attributes, still requiring a well-formed document
/// with the fixed root element. Succeeds on any schema version or bundle
/// type; used to tell "recognizable but unsupported" apart from garbage.
pub(crate) fn probe_metadata(xml: &str) -> Result<MetadataProbe> {
    let mut reader = Reader::from_str(strip_bom(xml));
    let mut probe = MetadataProbe::default();
    let mut saw_root = false;
    let mut root_closed = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if !saw_root {
                    check_root_name(&e)?;
                    read_probe_attributes(&e, &mut probe);
                    saw_root = true;
                }
            }
            Event::Empty(e) => {
                if !saw_root {
                    check_root_name(&e)?;
                    read_probe_attributes(&e, &mut probe);
                    saw_root = true;
                    root_closed = true;
                }
            }
            Event::End(e) => {
                if e.name().as_ref() == METADATA_ROOT_ELEMENT.as_bytes() {
                    root_closed = true;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root || !root_closed {
        return Err(unexpected_eof());
    }
    Ok(probe)
}

fn check_root_name(e: &BytesStart<'_>) -> Result<()> {
    if e.name().as_ref() != METADATA_ROOT_ELEMENT.as_bytes() {
        return Err(Error::InvalidMetadata(format!(
            "expected {METADATA_ROOT_ELEMENT} root element, found {}",
            String::from_utf8_lossy(e.name().as_ref())
        )));
    }
    Ok(())
}

fn read_root_attributes<L: LanguageRecord>(
    e: &BytesStart<'_>,
    metadata: &mut TextMetadata<L>,
    type_version: &mut String,
) -> Result<()> {
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        match attr.key.as_ref() {
            b"id" => metadata.id = value,
            b"version" => metadata.version = value,
            b"typeVersion" => *type_version = value,
            b"type" => metadata.bundle_type = value,
            b"revision" => {
                metadata.revision = value.trim().parse().map_err(|_| {
                    Error::InvalidMetadata(format!("invalid revision attribute: {value}"))
                })?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn read_probe_attributes(e: &BytesStart<'_>, probe: &mut MetadataProbe) {
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        match attr.key.as_ref() {
            b"type" => probe.bundle_type = value,
            b"version" => probe.version = value,
            b"typeVersion" => probe.type_version = value,
            _ => {}
        }
    }
}

fn parse_language<L: LanguageRecord>(reader: &mut Reader<&[u8]>, language: &mut L) -> Result<()> {
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let text = read_element_text(reader, name.as_bytes())?;
                language.set_field(&name, text);
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                language.set_field(&name, String::new());
            }
            Event::End(e) if e.name().as_ref() == b"language" => return Ok(()),
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }
}

fn parse_identification(reader: &mut Reader<&[u8]>) -> Result<Identification> {
    let mut ident = Identification::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"name" => ident.name = read_element_text(reader, b"name")?,
                b"nameLocal" => ident.name_local = read_element_text(reader, b"nameLocal")?,
                b"systemId" => ident.system_ids.push(parse_system_id(reader, &e)?),
                other => {
                    let name = other.to_vec();
                    skip_element(reader, &name)?;
                }
            },
            Event::Empty(e) if e.name().as_ref() == b"systemId" => {
                ident.system_ids.push(system_id_from_attrs(&e));
            }
            Event::End(e) if e.name().as_ref() == b"identification" => return Ok(ident),
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }
}

/// `systemId` appears in two shapes: the id as the element's text node, or
/// (in version 2 and later) in an `id` child element. The child wins when
/// both are somehow present.
fn parse_system_id(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<SystemId> {
    let mut system_id = system_id_from_attrs(start);
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"id" => system_id.id = read_element_text(reader, b"id")?,
                b"csetid" => system_id.change_set_id = read_element_text(reader, b"csetid")?,
                other => {
                    let name = other.to_vec();
                    skip_element(reader, &name)?;
                }
            },
            Event::Text(t) => text.push_str(&String::from_utf8_lossy(t.as_ref())),
            Event::GeneralRef(e) => {
                if let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref())) {
                    text.push_str(&resolved);
                }
            }
            Event::End(e) if e.name().as_ref() == b"systemId" => break,
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }
    if system_id.id.is_empty() {
        system_id.id = text.trim().to_string();
    }
    Ok(system_id)
}

fn system_id_from_attrs(e: &BytesStart<'_>) -> SystemId {
    let mut system_id = SystemId::default();
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        match attr.key.as_ref() {
            b"type" => system_id.kind = value,
            b"csetid" => system_id.change_set_id = value,
            _ => {}
        }
    }
    system_id
}

fn parse_copyright(reader: &mut Reader<&[u8]>) -> Result<Copyright> {
    let mut copyright = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"statement" => {
                    let node = parse_content_node(reader, &e, b"statement")?;
                    copyright = Some(Copyright::from_statement(node));
                }
                b"fullStatement" => {
                    if let Some(node) = parse_full_statement(reader)? {
                        copyright = Some(Copyright::from_full_statement(node));
                    }
                }
                other => {
                    let name = other.to_vec();
                    skip_element(reader, &name)?;
                }
            },
            Event::End(e) if e.name().as_ref() == b"copyright" => break,
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }
    Ok(copyright.unwrap_or_default())
}

/// Version 2 wraps the statement one level deeper:
/// `fullStatement/statementContent`.
fn parse_full_statement(reader: &mut Reader<&[u8]>) -> Result<Option<ContentNode>> {
    let mut node = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"statementContent" => {
                    node = Some(parse_content_node(reader, &e, b"statementContent")?);
                }
                other => {
                    let name = other.to_vec();
                    skip_element(reader, &name)?;
                }
            },
            Event::End(e) if e.name().as_ref() == b"fullStatement" => return Ok(node),
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }
}

fn parse_promotion(reader: &mut Reader<&[u8]>) -> Result<Promotion> {
    let mut promotion = Promotion::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"promoVersionInfo" => {
                    promotion.promo_version_info =
                        Some(parse_content_node(reader, &e, b"promoVersionInfo")?);
                }
                b"promoEmail" => {
                    promotion.promo_email = Some(parse_content_node(reader, &e, b"promoEmail")?);
                }
                other => {
                    let name = other.to_vec();
                    skip_element(reader, &name)?;
                }
            },
            Event::End(e) if e.name().as_ref() == b"promotion" => return Ok(promotion),
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }
}

fn parse_archive_status(reader: &mut Reader<&[u8]>) -> Result<ArchiveStatus> {
    let mut status = ArchiveStatus::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"dateArchived" => {
                    status.date_archived = read_element_text(reader, b"dateArchived")?
                }
                b"dateUpdated" => status.date_updated = read_element_text(reader, b"dateUpdated")?,
                other => {
                    let name = other.to_vec();
                    skip_element(reader, &name)?;
                }
            },
            Event::End(e) if e.name().as_ref() == b"archiveStatus" => return Ok(status),
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }
}

fn parse_book_names(reader: &mut Reader<&[u8]>) -> Result<Vec<AvailableBook>> {
    let mut books = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"book" => {
                books.push(parse_book(reader, &e)?);
            }
            Event::Empty(e) if e.name().as_ref() == b"book" => {
                books.push(book_from_attrs(&e));
            }
            Event::End(e) if e.name().as_ref() == b"bookNames" => return Ok(books),
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }
}

fn parse_book(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<AvailableBook> {
    let mut book = book_from_attrs(start);
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"long" => book.long_name = read_element_text(reader, b"long")?,
                b"short" => book.short_name = read_element_text(reader, b"short")?,
                b"abbr" => book.abbreviation = read_element_text(reader, b"abbr")?,
                other => {
                    let name = other.to_vec();
                    skip_element(reader, &name)?;
                }
            },
            Event::End(e) if e.name().as_ref() == b"book" => return Ok(book),
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }
}

fn book_from_attrs(e: &BytesStart<'_>) -> AvailableBook {
    let mut book = AvailableBook::default();
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        match attr.key.as_ref() {
            b"code" => book.code = value,
            // Absent or unrecognized means included.
            b"include" => book.include_in_script = !value.trim().eq_ignore_ascii_case("false"),
            _ => {}
        }
    }
    book
}

fn parse_contents(reader: &mut Reader<&[u8]>) -> Result<Vec<Canon>> {
    let mut canons = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"bookList" => {
                canons.push(parse_book_list(reader, &e)?);
            }
            Event::Empty(e) if e.name().as_ref() == b"bookList" => {
                canons.push(canon_from_attrs(&e));
            }
            Event::End(e) if e.name().as_ref() == b"contents" => return Ok(canons),
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }
}

fn parse_book_list(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<Canon> {
    let mut canon = canon_from_attrs(start);
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"name" => canon.name = read_element_text(reader, b"name")?,
                b"nameLocal" => canon.name_local = read_element_text(reader, b"nameLocal")?,
                b"abbreviation" => {
                    canon.abbreviation = read_element_text(reader, b"abbreviation")?
                }
                b"abbreviationLocal" => {
                    canon.abbreviation_local = read_element_text(reader, b"abbreviationLocal")?
                }
                b"description" => canon.description = read_element_text(reader, b"description")?,
                b"descriptionLocal" => {
                    canon.description_local = read_element_text(reader, b"descriptionLocal")?
                }
                b"books" => parse_canon_books(reader, &mut canon.books)?,
                other => {
                    let name = other.to_vec();
                    skip_element(reader, &name)?;
                }
            },
            Event::End(e) if e.name().as_ref() == b"bookList" => return Ok(canon),
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }
}

fn canon_from_attrs(e: &BytesStart<'_>) -> Canon {
    let mut canon = Canon::default();
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        match attr.key.as_ref() {
            b"id" => canon.id = value,
            b"default" => canon.is_default = value.trim().eq_ignore_ascii_case("true"),
            _ => {}
        }
    }
    canon
}

fn parse_canon_books(reader: &mut Reader<&[u8]>, books: &mut Vec<String>) -> Result<()> {
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"book" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"code" {
                        books.push(String::from_utf8_lossy(&attr.value).into_owned());
                    }
                }
            }
            Event::End(e) if e.name().as_ref() == b"books" => return Ok(()),
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }
}

/// Accumulate the text content of the element whose start tag was just
/// consumed, through its matching end tag. Nested markup is dropped, its
/// text kept. The result is trimmed.
fn read_element_text(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<String> {
    let mut text = String::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == end => depth += 1,
            Event::End(e) if e.name().as_ref() == end => {
                if depth == 0 {
                    return Ok(text.trim().to_string());
                }
                depth -= 1;
            }
            Event::Text(t) => text.push_str(&String::from_utf8_lossy(t.as_ref())),
            Event::CData(t) => text.push_str(&String::from_utf8_lossy(&t.into_inner())),
            Event::GeneralRef(e) => {
                if let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref())) {
                    text.push_str(&resolved);
                }
            }
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }
}

/// Capture everything between the just-consumed start tag and its matching
/// end tag as markup, reconstructed from the event stream. Entity and
/// character references are passed through unresolved; attribute values are
/// requoted with double quotes, escaping any embedded quote.
fn read_inner_xml(reader: &mut Reader<&[u8]>, end: &[u8]) -> Result<String> {
    let mut xml = String::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if e.name().as_ref() == end {
                    depth += 1;
                }
                push_start_tag(&mut xml, &e, false);
            }
            Event::Empty(e) => push_start_tag(&mut xml, &e, true),
            Event::End(e) => {
                if e.name().as_ref() == end {
                    if depth == 0 {
                        return Ok(xml.trim().to_string());
                    }
                    depth -= 1;
                }
                xml.push_str("</");
                xml.push_str(&String::from_utf8_lossy(e.name().as_ref()));
                xml.push('>');
            }
            Event::Text(t) => xml.push_str(&String::from_utf8_lossy(t.as_ref())),
            Event::GeneralRef(e) => {
                xml.push('&');
                xml.push_str(&String::from_utf8_lossy(e.as_ref()));
                xml.push(';');
            }
            Event::CData(t) => {
                xml.push_str("<![CDATA[");
                xml.push_str(&String::from_utf8_lossy(&t.into_inner()));
                xml.push_str("]]>");
            }
            Event::Comment(t) => {
                xml.push_str("<!--");
                xml.push_str(&String::from_utf8_lossy(t.as_ref()));
                xml.push_str("-->");
            }
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }
}

fn push_start_tag(xml: &mut String, e: &BytesStart<'_>, empty: bool) {
    xml.push('<');
    xml.push_str(&String::from_utf8_lossy(e.name().as_ref()));
    for attr in e.attributes().flatten() {
        xml.push(' ');
        xml.push_str(&String::from_utf8_lossy(attr.key.as_ref()));
        xml.push_str("=\"");
        // Single-quoted source attributes can hold literal double quotes.
        xml.push_str(&String::from_utf8_lossy(&attr.value).replace('"', "&quot;"));
        xml.push('"');
    }
    xml.push_str(if empty { "/>" } else { ">" });
}

/// An element carrying raw markup plus a content-type attribute, spelled
/// `contentType` in most places but `type` on `statementContent`.
fn parse_content_node(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    end: &[u8],
) -> Result<ContentNode> {
    let mut node = ContentNode::default();
    for attr in start.attributes().flatten() {
        match attr.key.as_ref() {
            b"contentType" | b"type" => {
                node.content_type = String::from_utf8_lossy(&attr.value).into_owned();
            }
            _ => {}
        }
    }
    node.xhtml = read_inner_xml(reader, end)?;
    Ok(node)
}

/// Consume events through the end tag matching an unrecognized element.
fn skip_element(reader: &mut Reader<&[u8]>, name: &[u8]) -> Result<()> {
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == name => depth += 1,
            Event::End(e) if e.name().as_ref() == name => {
                if depth == 0 {
                    return Ok(());
                }
                depth -= 1;
            }
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }
}

/// Resolve XML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    if let Some(hex) = entity.strip_prefix("#x") {
        if let Ok(code) = u32::from_str_radix(hex, 16)
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#') {
        if let Ok(code) = dec.parse::<u32>()
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    }

    None
}

fn unexpected_eof() -> Error {
    Error::InvalidMetadata("unexpected end of document".to_string())
}

#[cfg(test)]
mod tests {
    use super::super::Language;
    use super::*;

    const MINIMAL_V1: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<DBLMetadata id="3b9fdc679b9319c3" revision="1" type="text" typeVersion="1.5">
  <identification>
    <name>Acholi New Testament 1985</name>
    <nameLocal>Acoli Baibul 1985</nameLocal>
    <systemId type="paratext">3b9fdc679b9319c3ee45ab86cc1c0c42930c2979</systemId>
  </identification>
  <language>
    <iso>ach</iso>
    <name>Acholi</name>
    <scriptDirection>LTR</scriptDirection>
  </language>
  <copyright>
    <statement contentType="xhtml">
      <p>&#169; 1985 The Bible Society of Uganda</p>
    </statement>
  </copyright>
  <archiveStatus>
    <dateArchived>2014-05-28T15:18:31.080800</dateArchived>
    <dateUpdated>2015-01-21T13:02:30.691015</dateUpdated>
  </archiveStatus>
  <bookNames>
    <book code="MAT">
      <long>JIRI ma MATAYO ocoyo</long>
      <short>Matayo</short>
      <abbr>Mat</abbr>
    </book>
  </bookNames>
</DBLMetadata>"#;

    const MINIMAL_V2: &str = r#"<DBLMetadata id="abc123" version="2.1" revision="4" type="text">
  <identification>
    <name>Test Bundle</name>
    <systemId type="paratext" csetid="c0ffee"><id>deadbeef</id></systemId>
  </identification>
  <language>
    <iso>grc</iso>
    <scriptDirection>RTL</scriptDirection>
  </language>
  <copyright>
    <fullStatement>
      <statementContent type="xhtml">
        <p>Public domain</p>
      </statementContent>
    </fullStatement>
  </copyright>
  <contents>
    <bookList id="1" default="true">
      <name>New Testament</name>
      <books>
        <book code="MAT"/>
        <book code="MRK"/>
      </books>
    </bookList>
  </contents>
</DBLMetadata>"#;

    #[test]
    fn parses_version_1_document() {
        let metadata: TextMetadata<Language> = parse_metadata(MINIMAL_V1).unwrap();
        assert_eq!(metadata.id, "3b9fdc679b9319c3");
        assert_eq!(metadata.revision, 1);
        assert_eq!(metadata.bundle_type, "text");
        assert!(metadata.is_text_release_bundle());
        // typeVersion feeds the version field.
        assert_eq!(metadata.version, "1.5");
        assert_eq!(metadata.type_version(), "1.5");

        assert_eq!(metadata.identification.name, "Acholi New Testament 1985");
        assert_eq!(metadata.identification.name_local, "Acoli Baibul 1985");
        let paratext = metadata.identification.system_id("paratext").unwrap();
        assert_eq!(paratext.id, "3b9fdc679b9319c3ee45ab86cc1c0c42930c2979");

        assert_eq!(metadata.language.iso, "ach");
        assert_eq!(metadata.language.name, "Acholi");

        let copyright = metadata.copyright.as_ref().unwrap();
        assert_eq!(
            copyright.statement().xhtml,
            "<p>&#169; 1985 The Bible Society of Uganda</p>"
        );
        assert_eq!(copyright.statement().content_type, "xhtml");

        let status = metadata.archive_status.as_ref().unwrap();
        assert_eq!(status.date_archived, "2014-05-28T15:18:31.080800");
        assert_eq!(status.date_updated, "2015-01-21T13:02:30.691015");

        assert_eq!(metadata.available_books.len(), 1);
        let mat = &metadata.available_books[0];
        assert_eq!(mat.code, "MAT");
        assert!(mat.include_in_script);
        assert_eq!(mat.long_name, "JIRI ma MATAYO ocoyo");
        assert_eq!(mat.short_name, "Matayo");
        assert_eq!(mat.abbreviation, "Mat");
    }

    #[test]
    fn parses_version_2_document() {
        let metadata: TextMetadata<Language> = parse_metadata(MINIMAL_V2).unwrap();
        assert_eq!(metadata.version, "2.1");
        assert_eq!(metadata.revision, 4);

        let paratext = metadata.identification.system_id("paratext").unwrap();
        assert_eq!(paratext.id, "deadbeef");
        assert_eq!(paratext.change_set_id, "c0ffee");

        assert_eq!(
            metadata.language.script_direction,
            super::super::ScriptDirection::RightToLeft
        );

        let copyright = metadata.copyright.as_ref().unwrap();
        assert_eq!(copyright.full_statement().xhtml, "<p>Public domain</p>");
        // Both access paths see the one value.
        assert_eq!(copyright.statement().xhtml, "<p>Public domain</p>");

        assert_eq!(metadata.canons.len(), 1);
        let canon = &metadata.canons[0];
        assert_eq!(canon.id, "1");
        assert!(canon.is_default);
        assert_eq!(canon.name, "New Testament");
        assert_eq!(canon.books, vec!["MAT", "MRK"]);
    }

    #[test]
    fn version_attribute_wins_over_type_version() {
        let xml = r#"<DBLMetadata id="x" version="2.0" typeVersion="1.5" type="text"></DBLMetadata>"#;
        let metadata: TextMetadata<Language> = parse_metadata(xml).unwrap();
        assert_eq!(metadata.version, "2.0");
    }

    #[test]
    fn inner_markup_survives_verbatim() {
        let xml = r#"<DBLMetadata id="x" version="2.0" type="text">
  <copyright>
    <statement contentType="xhtml"><p>&#169; 2001 <strong>ABS</strong>, all rights reserved</p></statement>
  </copyright>
</DBLMetadata>"#;
        let metadata: TextMetadata<Language> = parse_metadata(xml).unwrap();
        assert_eq!(
            metadata.copyright.unwrap().statement().xhtml,
            "<p>&#169; 2001 <strong>ABS</strong>, all rights reserved</p>"
        );
    }

    #[test]
    fn requotes_single_quoted_attribute_values() {
        let xml = r#"<DBLMetadata id="x" version="2.0" type="text">
  <copyright>
    <statement contentType="xhtml"><p data-note='he said "hi"'>x</p></statement>
  </copyright>
</DBLMetadata>"#;
        let metadata: TextMetadata<Language> = parse_metadata(xml).unwrap();
        let captured = metadata.copyright.as_ref().unwrap().statement().xhtml.clone();
        assert_eq!(captured, r#"<p data-note="he said &quot;hi&quot;">x</p>"#);

        // The requoted form survives another round trip unchanged.
        let reparsed: TextMetadata<Language> = parse_metadata(&metadata.to_xml()).unwrap();
        assert_eq!(reparsed.copyright.unwrap().statement().xhtml, captured);
    }

    #[test]
    fn named_entities_resolve_in_field_text() {
        let xml = r#"<DBLMetadata id="x" version="2.0" type="text">
  <identification><name>Tom &amp; Jerry</name></identification>
</DBLMetadata>"#;
        let metadata: TextMetadata<Language> = parse_metadata(xml).unwrap();
        assert_eq!(metadata.identification.name, "Tom & Jerry");
    }

    #[test]
    fn rejects_wrong_root_element() {
        let err = parse_metadata::<Language>("<html><body/></html>").unwrap_err();
        assert!(matches!(err, Error::InvalidMetadata(_)));
    }

    #[test]
    fn rejects_missing_id() {
        let xml = r#"<DBLMetadata version="2.0" type="text"></DBLMetadata>"#;
        let err = parse_metadata::<Language>(xml).unwrap_err();
        assert!(matches!(err, Error::InvalidMetadata(_)));
    }

    #[test]
    fn rejects_truncated_document() {
        let xml = r#"<DBLMetadata id="x" version="2.0" type="text"><language><iso>eng</iso>"#;
        assert!(parse_metadata::<Language>(xml).is_err());
    }

    #[test]
    fn rejects_malformed_markup() {
        assert!(parse_metadata::<Language>("this is not xml").is_err());
        assert!(parse_metadata::<Language>("<DBLMetadata id=\"x\"><a></b></DBLMetadata>").is_err());
    }

    #[test]
    fn skips_unknown_elements() {
        let xml = r#"<DBLMetadata id="x" version="9.9" type="text">
  <futureStuff><deeply><nested>ignored</nested></deeply></futureStuff>
  <identification><name>Still parsed</name></identification>
</DBLMetadata>"#;
        let metadata: TextMetadata<Language> = parse_metadata(xml).unwrap();
        assert_eq!(metadata.identification.name, "Still parsed");
    }

    #[test]
    fn strips_byte_order_mark() {
        let xml = "\u{feff}<DBLMetadata id=\"x\" version=\"2.0\" type=\"text\"></DBLMetadata>";
        let metadata: TextMetadata<Language> = parse_metadata(xml).unwrap();
        assert_eq!(metadata.id, "x");
    }

    #[test]
    fn probe_reads_root_attributes_only() {
        let xml = r#"<DBLMetadata id="x" version="9.9" type="audio">
  <unknownShape><whatever/></unknownShape>
</DBLMetadata>"#;
        let probe = probe_metadata(xml).unwrap();
        assert_eq!(probe.bundle_type, "audio");
        assert_eq!(probe.version(), "9.9");
    }

    #[test]
    fn probe_prefers_legacy_type_version() {
        let xml = r#"<DBLMetadata id="x" version="2.0" typeVersion="1.5" type="text"/>"#;
        let probe = probe_metadata(xml).unwrap();
        assert_eq!(probe.version(), "1.5");
    }

    #[test]
    fn probe_requires_well_formed_document() {
        assert!(probe_metadata("<DBLMetadata id=\"x\" type=\"text\">").is_err());
        assert!(probe_metadata("garbage").is_err());
    }

    #[test]
    fn empty_root_element_parses() {
        let xml = r#"<DBLMetadata id="x" version="2.0" type="text"/>"#;
        let metadata: TextMetadata<Language> = parse_metadata(xml).unwrap();
        assert_eq!(metadata.version, "2.0");
        assert!(metadata.copyright.is_none());
    }
}
