//! Configuration parser
//!
//! Turns a [`RawConfigurationDocument`] into a [`ConfigurationModel`] or a
//! [`ParseError`]. A partially built model is never returned.

pub mod error;
mod json;
mod xml;

pub use error::{ParseError, ParseErrorReason, ParseResult};

use crate::config::compile_time::document;
use crate::document::{DocumentFormat, RawConfigurationDocument};
use crate::logging::codes;
use crate::model::ConfigurationModel;
use crate::{log_error, log_success};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Resource caps applied while parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub max_bytes: usize,
    pub max_depth: usize,
    pub max_nodes: u32,
    /// Required XML root element name; also the model root name for JSON
    pub root_element: Option<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_bytes: document::MAX_DOCUMENT_BYTES,
            max_depth: document::MAX_NESTING_DEPTH,
            max_nodes: document::MAX_NODE_COUNT,
            root_element: Some(document::EXPECTED_ROOT_ELEMENT.to_string()),
        }
    }
}

impl ParseOptions {
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: u32) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn with_root_element(mut self, root: Option<&str>) -> Self {
        self.root_element = root.map(str::to_string);
        self
    }
}

/// Parse with default caps
pub fn parse(document: RawConfigurationDocument) -> ParseResult<ConfigurationModel> {
    parse_with_options(document, &ParseOptions::default())
}

/// Consumes the document; its bytes are dropped when parsing ends
pub fn parse_with_options(
    document: RawConfigurationDocument,
    options: &ParseOptions,
) -> ParseResult<ConfigurationModel> {
    let format = document.format();
    let size = document.len();

    match parse_document(&document, options) {
        Ok(model) => {
            log_success!(
                codes::success::PARSE_COMPLETE,
                "Configuration parsed",
                "format" => format,
                "bytes" => size,
                "nodes" => model.node_count()
            );
            Ok(model)
        }
        Err(err) => {
            log_error!(
                err.error_code(),
                "Configuration rejected",
                "format" => format,
                "bytes" => size,
                "reason" => err.reason
            );
            Err(err)
        }
    }
}

fn parse_document(
    document: &RawConfigurationDocument,
    options: &ParseOptions,
) -> ParseResult<ConfigurationModel> {
    if document.is_empty() {
        return Err(ParseError::empty_document());
    }
    if document.len() > options.max_bytes {
        return Err(ParseError::size_exceeded(document.len(), options.max_bytes));
    }

    let bytes = document.as_bytes();
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes).map_err(|err| {
        ParseError::new(ParseErrorReason::InvalidEncoding, err.to_string())
    })?;
    if text.trim().is_empty() {
        return Err(ParseError::empty_document());
    }

    let root = match document.format() {
        DocumentFormat::Xml => xml::parse_xml(text, options)?,
        DocumentFormat::Json => json::parse_json(text, options)?,
    };
    Ok(ConfigurationModel::new(root, document.format()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Flag, Section};
    use assert_matches::assert_matches;

    fn xml(text: &str) -> RawConfigurationDocument {
        RawConfigurationDocument::new(text.as_bytes().to_vec(), DocumentFormat::Xml)
    }

    #[test]
    fn test_xml_and_json_produce_the_same_model_shape() {
        let from_xml = parse(xml(
            "<pfsense><system><webgui><protocol>https</protocol></webgui></system><ntpd><enable/></ntpd></pfsense>",
        ))
        .unwrap();
        let from_json = parse(RawConfigurationDocument::new(
            br#"{"pfsense":{"system":{"webgui":{"protocol":"https"}},"ntpd":{"enable":""}}}"#.to_vec(),
            DocumentFormat::Json,
        ))
        .unwrap();

        for model in [&from_xml, &from_json] {
            assert_eq!(model.value("system/webgui/protocol"), Some("https"));
            assert_eq!(model.flag("ntpd/enable"), Flag::Enabled);
            assert!(model.has_section(Section::Ntpd));
        }
        assert_eq!(from_json.format(), DocumentFormat::Json);
    }

    #[test]
    fn test_empty_and_whitespace_documents() {
        assert_matches!(
            parse(xml("")),
            Err(ParseError { reason: ParseErrorReason::EmptyDocument, .. })
        );
        assert_matches!(
            parse(xml("  \n ")),
            Err(ParseError { reason: ParseErrorReason::EmptyDocument, .. })
        );
    }

    #[test]
    fn test_size_cap_checked_before_parsing() {
        let doc = xml("<pfsense><system/></pfsense>");
        let err = parse_with_options(doc, &ParseOptions::default().with_max_bytes(8)).unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::SizeExceeded);
    }

    #[test]
    fn test_invalid_utf8() {
        let doc = RawConfigurationDocument::new(vec![b'<', 0xFF, 0xFE, b'>'], DocumentFormat::Xml);
        assert_eq!(parse(doc).unwrap_err().reason, ParseErrorReason::InvalidEncoding);
    }

    #[test]
    fn test_bom_is_accepted() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"<pfsense><system/></pfsense>");
        let model = parse(RawConfigurationDocument::new(bytes, DocumentFormat::Xml)).unwrap();
        assert!(model.has_section(Section::System));
    }

    #[test]
    fn test_billion_laughs_fails_closed() {
        let bomb = r#"<?xml version="1.0"?>
<!DOCTYPE lolz [
 <!ENTITY lol "lol">
 <!ENTITY lol2 "&lol;&lol;&lol;&lol;&lol;&lol;&lol;&lol;&lol;&lol;">
 <!ENTITY lol3 "&lol2;&lol2;&lol2;&lol2;&lol2;&lol2;&lol2;&lol2;&lol2;&lol2;">
]>
<pfsense><system><hostname>&lol3;</hostname></system></pfsense>"#;
        assert_eq!(parse(xml(bomb)).unwrap_err().reason, ParseErrorReason::ForbiddenDtd);
    }

    #[test]
    fn test_unknown_top_level_keys_pass_through() {
        let model = parse(RawConfigurationDocument::new(
            br#"{"system":{},"widgets":{"sequence":"a"},"revision":{"time":"1"}}"#.to_vec(),
            DocumentFormat::Json,
        ))
        .unwrap();
        assert_eq!(model.extra_sections(), vec!["revision", "widgets"]);
        assert_eq!(model.value("widgets/sequence"), Some("a"));
    }
}
