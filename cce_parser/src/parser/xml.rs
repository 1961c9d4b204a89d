//! XML front end
//!
//! roxmltree never resolves external entities. Documents carrying a DOCTYPE
//! or entity declaration are refused outright, before and during parsing.

use super::error::{ParseError, ParseResult};
use super::ParseOptions;
use crate::model::ConfigNode;

const FORBIDDEN_MARKERS: [&str; 2] = ["<!DOCTYPE", "<!ENTITY"];

pub(super) fn parse_xml(text: &str, options: &ParseOptions) -> ParseResult<ConfigNode> {
    if contains_declaration(text) {
        return Err(ParseError::forbidden_dtd());
    }

    let mut parsing = roxmltree::ParsingOptions::default();
    parsing.allow_dtd = false;
    parsing.nodes_limit = options.max_nodes;

    let document = roxmltree::Document::parse_with_options(text, parsing).map_err(map_error)?;
    let root = document.root_element();

    if let Some(expected) = options.root_element.as_deref() {
        if root.tag_name().name() != expected {
            return Err(ParseError::unexpected_root(root.tag_name().name(), expected));
        }
    }

    let mut budget = NodeBudget::new(options.max_nodes);
    convert(root, 1, options.max_depth, &mut budget)
}

fn contains_declaration(text: &str) -> bool {
    let upper = text.to_ascii_uppercase();
    FORBIDDEN_MARKERS.iter().any(|marker| upper.contains(marker))
}

fn map_error(err: roxmltree::Error) -> ParseError {
    match err {
        roxmltree::Error::DtdDetected => ParseError::forbidden_dtd(),
        roxmltree::Error::NodesLimitReached => {
            ParseError::new(super::ParseErrorReason::NodeLimitExceeded, err.to_string())
        }
        other => ParseError::malformed(other.to_string()),
    }
}

pub(super) struct NodeBudget {
    remaining: u32,
    limit: u32,
}

impl NodeBudget {
    pub(super) fn new(limit: u32) -> Self {
        Self {
            remaining: limit,
            limit,
        }
    }

    pub(super) fn take(&mut self) -> ParseResult<()> {
        if self.remaining == 0 {
            return Err(ParseError::node_limit_exceeded(self.limit));
        }
        self.remaining -= 1;
        Ok(())
    }
}

fn convert(
    node: roxmltree::Node<'_, '_>,
    depth: usize,
    max_depth: usize,
    budget: &mut NodeBudget,
) -> ParseResult<ConfigNode> {
    if depth > max_depth {
        return Err(ParseError::depth_exceeded(max_depth));
    }
    budget.take()?;

    let mut out = ConfigNode::new(node.tag_name().name());
    for attribute in node.attributes() {
        out.push_attribute(attribute.name(), attribute.value());
    }

    for child in node.children() {
        if child.is_element() {
            out.push_child(convert(child, depth + 1, max_depth, budget)?);
        } else if child.is_text() {
            if let Some(text) = child.text() {
                out.append_text(text);
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseErrorReason;
    use assert_matches::assert_matches;

    fn options() -> ParseOptions {
        ParseOptions::default()
    }

    #[test]
    fn test_attributes_text_and_cdata() {
        let xml = r#"<pfsense version="23.3"><system><hostname>fw01</hostname><motd><![CDATA[hi <there>]]></motd></system></pfsense>"#;
        let root = parse_xml(xml, &options()).unwrap();

        assert_eq!(root.attribute("version"), Some("23.3"));
        assert_eq!(root.value_at("system/hostname"), Some("fw01"));
        assert_eq!(root.value_at("system/motd"), Some("hi <there>"));
    }

    #[test]
    fn test_doctype_is_refused() {
        let xml = r#"<?xml version="1.0"?>
<!DOCTYPE pfsense [<!ENTITY xxe SYSTEM "file:///etc/passwd">]>
<pfsense><system><hostname>&xxe;</hostname></system></pfsense>"#;
        let err = parse_xml(xml, &options()).unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::ForbiddenDtd);
    }

    #[test]
    fn test_lowercase_doctype_is_refused() {
        let xml = "<!doctype pfsense><pfsense/>";
        assert_matches!(
            parse_xml(xml, &options()),
            Err(ParseError { reason: ParseErrorReason::ForbiddenDtd, .. })
        );
    }

    #[test]
    fn test_depth_cap() {
        let mut xml = String::from("<pfsense>");
        for _ in 0..10 {
            xml.push_str("<a>");
        }
        for _ in 0..10 {
            xml.push_str("</a>");
        }
        xml.push_str("</pfsense>");

        let err = parse_xml(&xml, &options().with_max_depth(5)).unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::DepthExceeded);
        assert!(parse_xml(&xml, &options().with_max_depth(11)).is_ok());
    }

    #[test]
    fn test_node_cap() {
        let xml = format!("<pfsense>{}</pfsense>", "<rule/>".repeat(50));
        let err = parse_xml(&xml, &options().with_max_nodes(20)).unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::NodeLimitExceeded);
    }

    #[test]
    fn test_wrong_root_and_malformed() {
        let err = parse_xml("<opnsense/>", &options()).unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::UnexpectedRoot);

        let err = parse_xml("<pfsense><system></pfsense>", &options()).unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::Malformed);
    }
}
