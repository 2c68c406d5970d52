//! Serializes a metadata model back to the wire format.
//!
//! Output is the canonical modern layout: root attributes are spelled
//! `version` (never the legacy `typeVersion`) and system ids always use the
//! `id` child element. The one version-sensitive spot is copyright, which is
//! written in the shape matching the document's own declared version.

use super::{
    Canon, ContentNode, DEFAULT_CONTENT_TYPE, LanguageRecord, METADATA_ROOT_ELEMENT, SystemId,
    TextMetadata,
};

pub(crate) fn metadata_to_xml<L: LanguageRecord>(metadata: &TextMetadata<L>) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");

    xml.push('<');
    xml.push_str(METADATA_ROOT_ELEMENT);
    xml.push_str(&format!(" id=\"{}\"", escape_xml(&metadata.id)));
    if !metadata.bundle_type.is_empty() {
        xml.push_str(&format!(" type=\"{}\"", escape_xml(&metadata.bundle_type)));
    }
    xml.push_str(&format!(" version=\"{}\"", escape_xml(&metadata.version)));
    xml.push_str(&format!(" revision=\"{}\"", metadata.revision));
    xml.push_str(">\n");

    write_language(&mut xml, &metadata.language);
    write_identification(&mut xml, metadata);
    write_copyright(&mut xml, metadata);
    write_promotion(&mut xml, metadata);
    write_archive_status(&mut xml, metadata);
    write_book_names(&mut xml, metadata);
    write_contents(&mut xml, &metadata.canons);

    xml.push_str(&format!("</{}>\n", METADATA_ROOT_ELEMENT));
    xml
}

fn write_language<L: LanguageRecord>(xml: &mut String, language: &L) {
    let fields = language.fields();
    if fields.is_empty() {
        return;
    }
    xml.push_str("  <language>\n");
    for (element, value) in fields {
        xml.push_str(&format!(
            "    <{}>{}</{}>\n",
            element,
            escape_xml(&value),
            element
        ));
    }
    xml.push_str("  </language>\n");
}

fn write_identification<L: LanguageRecord>(xml: &mut String, metadata: &TextMetadata<L>) {
    let ident = &metadata.identification;
    if ident.name.is_empty() && ident.name_local.is_empty() && ident.system_ids.is_empty() {
        return;
    }
    xml.push_str("  <identification>\n");
    if !ident.name.is_empty() {
        xml.push_str(&format!("    <name>{}</name>\n", escape_xml(&ident.name)));
    }
    if !ident.name_local.is_empty() {
        xml.push_str(&format!(
            "    <nameLocal>{}</nameLocal>\n",
            escape_xml(&ident.name_local)
        ));
    }
    for system_id in &ident.system_ids {
        write_system_id(xml, system_id);
    }
    xml.push_str("  </identification>\n");
}

fn write_system_id(xml: &mut String, system_id: &SystemId) {
    xml.push_str(&format!(
        "    <systemId type=\"{}\"",
        escape_xml(&system_id.kind)
    ));
    if !system_id.change_set_id.is_empty() {
        xml.push_str(&format!(
            " csetid=\"{}\"",
            escape_xml(&system_id.change_set_id)
        ));
    }
    if system_id.id.is_empty() {
        xml.push_str("/>\n");
    } else {
        xml.push_str(&format!(
            ">\n      <id>{}</id>\n    </systemId>\n",
            escape_xml(&system_id.id)
        ));
    }
}

fn write_copyright<L: LanguageRecord>(xml: &mut String, metadata: &TextMetadata<L>) {
    let Some(copyright) = &metadata.copyright else {
        return;
    };
    xml.push_str("  <copyright>\n");
    if major_version(&metadata.version) == 1 {
        let statement = copyright.statement();
        if statement.content_type == DEFAULT_CONTENT_TYPE {
            xml.push_str(&format!(
                "    <statement>{}</statement>\n",
                statement.xhtml
            ));
        } else {
            write_content_element(xml, "    ", "statement", "contentType", statement);
        }
    } else {
        xml.push_str("    <fullStatement>\n");
        write_content_element(
            xml,
            "      ",
            "statementContent",
            "type",
            copyright.full_statement(),
        );
        xml.push_str("    </fullStatement>\n");
    }
    xml.push_str("  </copyright>\n");
}

fn write_promotion<L: LanguageRecord>(xml: &mut String, metadata: &TextMetadata<L>) {
    let Some(promotion) = &metadata.promotion else {
        return;
    };
    if promotion.promo_version_info.is_none() && promotion.promo_email.is_none() {
        xml.push_str("  <promotion/>\n");
        return;
    }
    xml.push_str("  <promotion>\n");
    if let Some(info) = &promotion.promo_version_info {
        write_content_element(xml, "    ", "promoVersionInfo", "contentType", info);
    }
    if let Some(email) = &promotion.promo_email {
        write_content_element(xml, "    ", "promoEmail", "contentType", email);
    }
    xml.push_str("  </promotion>\n");
}

fn write_archive_status<L: LanguageRecord>(xml: &mut String, metadata: &TextMetadata<L>) {
    let Some(status) = &metadata.archive_status else {
        return;
    };
    if status.date_archived.is_empty() && status.date_updated.is_empty() {
        xml.push_str("  <archiveStatus/>\n");
        return;
    }
    xml.push_str("  <archiveStatus>\n");
    if !status.date_archived.is_empty() {
        xml.push_str(&format!(
            "    <dateArchived>{}</dateArchived>\n",
            escape_xml(&status.date_archived)
        ));
    }
    if !status.date_updated.is_empty() {
        xml.push_str(&format!(
            "    <dateUpdated>{}</dateUpdated>\n",
            escape_xml(&status.date_updated)
        ));
    }
    xml.push_str("  </archiveStatus>\n");
}

fn write_book_names<L: LanguageRecord>(xml: &mut String, metadata: &TextMetadata<L>) {
    if metadata.available_books.is_empty() {
        return;
    }
    xml.push_str("  <bookNames>\n");
    for book in &metadata.available_books {
        xml.push_str(&format!("    <book code=\"{}\"", escape_xml(&book.code)));
        if !book.include_in_script {
            xml.push_str(" include=\"false\"");
        }
        if book.long_name.is_empty() && book.short_name.is_empty() && book.abbreviation.is_empty()
        {
            xml.push_str("/>\n");
            continue;
        }
        xml.push_str(">\n");
        if !book.long_name.is_empty() {
            xml.push_str(&format!(
                "      <long>{}</long>\n",
                escape_xml(&book.long_name)
            ));
        }
        if !book.short_name.is_empty() {
            xml.push_str(&format!(
                "      <short>{}</short>\n",
                escape_xml(&book.short_name)
            ));
        }
        if !book.abbreviation.is_empty() {
            xml.push_str(&format!(
                "      <abbr>{}</abbr>\n",
                escape_xml(&book.abbreviation)
            ));
        }
        xml.push_str("    </book>\n");
    }
    xml.push_str("  </bookNames>\n");
}

fn write_contents(xml: &mut String, canons: &[Canon]) {
    if canons.is_empty() {
        return;
    }
    xml.push_str("  <contents>\n");
    for canon in canons {
        xml.push_str(&format!(
            "    <bookList id=\"{}\" default=\"{}\">\n",
            escape_xml(&canon.id),
            canon.is_default
        ));
        for (element, value) in [
            ("name", &canon.name),
            ("nameLocal", &canon.name_local),
            ("abbreviation", &canon.abbreviation),
            ("abbreviationLocal", &canon.abbreviation_local),
            ("description", &canon.description),
            ("descriptionLocal", &canon.description_local),
        ] {
            if !value.is_empty() {
                xml.push_str(&format!(
                    "      <{}>{}</{}>\n",
                    element,
                    escape_xml(value),
                    element
                ));
            }
        }
        if !canon.books.is_empty() {
            xml.push_str("      <books>\n");
            for code in &canon.books {
                xml.push_str(&format!("        <book code=\"{}\"/>\n", escape_xml(code)));
            }
            xml.push_str("      </books>\n");
        }
        xml.push_str("    </bookList>\n");
    }
    xml.push_str("  </contents>\n");
}

/// An XHTML content element. The inner markup is emitted verbatim; only the
/// content-type attribute value is escaped.
fn write_content_element(
    xml: &mut String,
    indent: &str,
    element: &str,
    attr: &str,
    node: &ContentNode,
) {
    xml.push_str(&format!(
        "{}<{} {}=\"{}\">{}</{}>\n",
        indent,
        element,
        attr,
        escape_xml(&node.content_type),
        node.xhtml,
        element
    ));
}

fn major_version(version: &str) -> u32 {
    version
        .split('.')
        .next()
        .and_then(|major| major.trim().parse().ok())
        .unwrap_or(0)
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
