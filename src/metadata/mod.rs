//! The versioned bundle metadata model.
//!
//! A `metadata.xml` document describes one publication: identity, language,
//! copyright, promotional material, archive status, and the books it
//! contains. The schema evolved incompatibly across versions 1.x and 2.x;
//! this module presents one model for both shapes, with the differences
//! confined to [`parser`] and [`writer`].

use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::scripture;

pub mod loader;
pub mod transform;

mod parser;
mod writer;

pub(crate) use parser::read_xml_file;

/// The `type` marker of an acceptable bundle.
pub const TEXT_RELEASE_TYPE: &str = "text";

/// Fixed root element name of the metadata document.
pub const METADATA_ROOT_ELEMENT: &str = "DBLMetadata";

/// ISO 639-3 subtag for a language not listed in the registry.
pub const UNLISTED_LANGUAGE: &str = "qaa";

pub(crate) const DEFAULT_CONTENT_TYPE: &str = "xhtml";

/// Extension seam for the `<language>` sub-record.
///
/// The rest of the schema is fixed, but publishers' tooling extends the
/// language record with custom child elements. Implementations receive one
/// [`set_field`](LanguageRecord::set_field) call per child element while
/// parsing and hand back the fields to emit (in order) when serializing.
pub trait LanguageRecord: Default {
    /// Store one `<language>` child element. Unrecognized elements may be
    /// ignored or captured, at the implementation's discretion.
    fn set_field(&mut self, element: &str, value: String);

    /// ISO 639-2 code, empty when the document does not declare one.
    fn iso(&self) -> &str;

    /// Element name/value pairs to serialize, in emission order. Empty
    /// when nothing is set, in which case no `<language>` element is
    /// written at all.
    fn fields(&self) -> Vec<(&'static str, String)>;

    /// Human-readable language name.
    fn display_name(&self) -> String {
        self.iso().to_string()
    }
}

/// Horizontal direction of the language's script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptDirection {
    #[default]
    LeftToRight,
    RightToLeft,
}

impl ScriptDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptDirection::LeftToRight => "LTR",
            ScriptDirection::RightToLeft => "RTL",
        }
    }

    /// Wire values are `LTR`/`RTL`; anything unrecognized falls back to the
    /// default left-to-right.
    pub fn from_wire(value: &str) -> Self {
        if value.eq_ignore_ascii_case("RTL") {
            ScriptDirection::RightToLeft
        } else {
            ScriptDirection::LeftToRight
        }
    }
}

/// The standard language record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Language {
    pub iso: String,
    pub name: String,
    pub ldml: String,
    pub rod: String,
    pub script: String,
    pub script_direction: ScriptDirection,
    pub numerals: String,
}

impl LanguageRecord for Language {
    fn set_field(&mut self, element: &str, value: String) {
        match element {
            "iso" => self.iso = value,
            "name" => self.name = value,
            "ldml" => self.ldml = value,
            "rod" => self.rod = value,
            "script" => self.script = value,
            "scriptDirection" => self.script_direction = ScriptDirection::from_wire(&value),
            "numerals" => self.numerals = value,
            _ => {}
        }
    }

    fn iso(&self) -> &str {
        &self.iso
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if !self.iso.is_empty() {
            fields.push(("iso", self.iso.clone()));
        }
        if !self.name.is_empty() {
            fields.push(("name", self.name.clone()));
        }
        if !self.ldml.is_empty() {
            fields.push(("ldml", self.ldml.clone()));
        }
        if !self.rod.is_empty() {
            fields.push(("rod", self.rod.clone()));
        }
        if !self.script.is_empty() {
            fields.push(("script", self.script.clone()));
        }
        if self.script_direction != ScriptDirection::default() {
            fields.push(("scriptDirection", self.script_direction.as_str().to_string()));
        }
        if !self.numerals.is_empty() {
            fields.push(("numerals", self.numerals.clone()));
        }
        fields
    }

    fn display_name(&self) -> String {
        if self.name.is_empty() {
            if self.iso == UNLISTED_LANGUAGE {
                "Unknown".to_string()
            } else {
                self.iso.clone()
            }
        } else if self.iso.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.iso)
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A system identifier attached to the publication, e.g. the id the
/// publisher's authoring tool assigned it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SystemId {
    /// Which system the id belongs to, e.g. `paratext` or `tms`.
    /// Wire attribute `type`.
    pub kind: String,
    /// Change-set id, only relevant to ad-hoc bundles. Wire attribute
    /// `csetid`.
    pub change_set_id: String,
    /// In schema version 1 this was the element's text node; version 2+
    /// stores it in an `<id>` child. Parsed from either shape into this one
    /// field.
    pub id: String,
}

/// Identity of the publication.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Identification {
    pub name: String,
    pub name_local: String,
    pub system_ids: Vec<SystemId>,
}

impl Identification {
    /// Look up a system id by its `type` value.
    pub fn system_id(&self, kind: &str) -> Option<&SystemId> {
        self.system_ids.iter().find(|s| s.kind == kind)
    }
}

impl fmt::Display for Identification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name_local.is_empty() || self.name_local == self.name {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name_local, self.name)
        }
    }
}

/// A node holding raw XHTML markup plus its declared content type.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentNode {
    /// Inner markup captured between the element's tags. Attribute values
    /// are requoted with double quotes.
    pub xhtml: String,
    /// Declared content type; `xhtml` when the document does not say.
    pub content_type: String,
}

impl Default for ContentNode {
    fn default() -> Self {
        ContentNode {
            xhtml: String::new(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }
}

impl ContentNode {
    pub fn new(xhtml: impl Into<String>) -> Self {
        ContentNode {
            xhtml: xhtml.into(),
            ..Default::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// Copyright information.
///
/// Schema version 1 stored the statement under `copyright/statement`;
/// version 2+ moved it to `copyright/fullStatement/statementContent`. Both
/// shapes carry the same value, so there is exactly one underlying
/// [`ContentNode`] here and the two historical access paths are views over
/// it: writing through either updates the same state. Which wire shape gets
/// emitted is decided by the serializer from the document's version, not by
/// how the value was set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Copyright {
    statement: ContentNode,
}

impl Copyright {
    /// Construct through the version-1 access path.
    pub fn from_statement(statement: ContentNode) -> Self {
        Copyright { statement }
    }

    /// Construct through the version-2+ access path.
    pub fn from_full_statement(statement_content: ContentNode) -> Self {
        Copyright {
            statement: statement_content,
        }
    }

    pub fn statement(&self) -> &ContentNode {
        &self.statement
    }

    pub fn statement_mut(&mut self) -> &mut ContentNode {
        &mut self.statement
    }

    /// Same value as [`statement`](Copyright::statement), seen through the
    /// version-2+ path.
    pub fn full_statement(&self) -> &ContentNode {
        &self.statement
    }

    pub fn full_statement_mut(&mut self) -> &mut ContentNode {
        &mut self.statement
    }
}

/// Promotional XHTML snippets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Promotion {
    pub promo_version_info: Option<ContentNode>,
    pub promo_email: Option<ContentNode>,
}

/// Archival timestamps, kept as the opaque strings the archive wrote.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArchiveStatus {
    pub date_archived: String,
    pub date_updated: String,
}

/// One entry of the `bookNames` table.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailableBook {
    /// USFM book code, e.g. `MAT`.
    pub code: String,
    /// Wire attribute `include`; absent means included.
    pub include_in_script: bool,
    pub long_name: String,
    pub short_name: String,
    pub abbreviation: String,
}

impl Default for AvailableBook {
    fn default() -> Self {
        AvailableBook {
            code: String::new(),
            include_in_script: true,
            long_name: String::new(),
            short_name: String::new(),
            abbreviation: String::new(),
        }
    }
}

impl AvailableBook {
    pub fn new(code: impl Into<String>) -> Self {
        AvailableBook {
            code: code.into(),
            ..Default::default()
        }
    }
}

/// A named, ordered grouping of books (`contents/bookList` on the wire).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Canon {
    /// Wire attribute `id`.
    pub id: String,
    /// Wire attribute `default`.
    pub is_default: bool,
    pub name: String,
    pub name_local: String,
    pub abbreviation: String,
    pub abbreviation_local: String,
    pub description: String,
    pub description_local: String,
    /// Member book codes in reading order.
    pub books: Vec<String>,
}

/// A parsed metadata document, generic over the language record so callers
/// can extend the `<language>` sub-record (the rest of the schema is fixed).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextMetadata<L = Language> {
    /// Opaque unique bundle id; the parser only checks it is non-empty.
    pub id: String,
    /// Dotted major.minor schema version. On the wire this is the `version`
    /// attribute, or the legacy `typeVersion` alias in version-1 documents;
    /// both feed this one field.
    pub version: String,
    pub revision: i32,
    /// Declared bundle type (wire attribute `type`). Only
    /// [`TEXT_RELEASE_TYPE`] is acceptable.
    pub bundle_type: String,
    pub language: L,
    pub identification: Identification,
    pub copyright: Option<Copyright>,
    pub promotion: Option<Promotion>,
    pub archive_status: Option<ArchiveStatus>,
    pub available_books: Vec<AvailableBook>,
    pub canons: Vec<Canon>,
}

impl<L: LanguageRecord> TextMetadata<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a metadata document from its XML text.
    pub fn from_xml(xml: &str) -> Result<Self> {
        parser::parse_metadata(xml)
    }

    /// Read and parse a metadata file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let xml = parser::read_xml_file(path.as_ref())?;
        parser::parse_metadata(&xml)
    }

    /// Serialize to the fixed wire format. The copyright shape follows the
    /// document's own schema version.
    pub fn to_xml(&self) -> String {
        writer::metadata_to_xml(self)
    }

    /// Whether the document declares itself a text release bundle. This
    /// gates acceptance regardless of schema version.
    pub fn is_text_release_bundle(&self) -> bool {
        self.bundle_type == TEXT_RELEASE_TYPE
    }

    /// Legacy view of [`version`](TextMetadata::version): version-1
    /// documents called the attribute `typeVersion`, but it is the same
    /// underlying value.
    pub fn type_version(&self) -> &str {
        &self.version
    }

    /// The publication name.
    pub fn name(&self) -> &str {
        &self.identification.name
    }

    /// The subsequence of [`available_books`](TextMetadata::available_books)
    /// whose code resolves to a canonical Scripture book number, in the
    /// original order. Unrecognized and non-Scripture codes are excluded.
    pub fn available_bible_books(&self) -> Vec<&AvailableBook> {
        self.available_books
            .iter()
            .filter(|b| scripture::is_canonical(&b.code))
            .collect()
    }
}

impl<L: LanguageRecord> fmt::Display for TextMetadata<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Sample bundles identify themselves by id alone.
        if self.language.iso() == "sample" {
            return write!(f, "{}", self.id);
        }
        if self.identification.name.is_empty() {
            write!(f, "{} - {}", self.language.display_name(), self.id)
        } else {
            write!(f, "{} - {}", self.language.display_name(), self.identification)
        }
    }
}
