//! Read-only configuration model
//!
//! The parser builds a tree of [`ConfigNode`]s rooted at the document root.
//! Paths are `/`-separated element names relative to that root
//! (`system/webgui/protocol`). Every lookup is total: a missing path yields
//! [`Lookup::Absent`] or an empty collection, never an error.

use crate::document::DocumentFormat;
use serde::Serialize;
use std::fmt;

// ============================================================================
// NODES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigNode {
    name: String,
    text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attributes: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<ConfigNode>,
}

impl ConfigNode {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            text: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub(crate) fn append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match &mut self.text {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }

    pub(crate) fn push_attribute(&mut self, name: &str, value: &str) {
        self.attributes.push((name.to_string(), value.to_string()));
    }

    pub(crate) fn push_child(&mut self, child: ConfigNode) {
        self.children.push(child);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trimmed text content; `Some("")` for an empty element
    pub fn text(&self) -> &str {
        self.text.as_deref().map(str::trim).unwrap_or("")
    }

    /// Trimmed text content when it is not empty
    pub fn value(&self) -> Option<&str> {
        Some(self.text()).filter(|t| !t.is_empty())
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn children(&self) -> &[ConfigNode] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// First child with the given name
    pub fn child(&self, name: &str) -> Option<&ConfigNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a ConfigNode> + 'n
    where
        'a: 'n,
    {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    /// First node along a relative path
    pub fn lookup(&self, path: &str) -> Lookup<'_> {
        let mut current = self;
        for segment in split_path(path) {
            match current.child(segment) {
                Some(next) => current = next,
                None => return Lookup::Absent,
            }
        }
        Lookup::Present(current)
    }

    /// Text of the first node along a relative path
    pub fn text_at(&self, path: &str) -> Option<&str> {
        self.lookup(path).text()
    }

    /// Non-empty text of the first node along a relative path
    pub fn value_at(&self, path: &str) -> Option<&str> {
        self.lookup(path).value()
    }

    /// Toggle state of the first node along a relative path
    pub fn flag_at(&self, path: &str) -> Flag {
        match self.lookup(path) {
            Lookup::Absent => Flag::Absent,
            Lookup::Present(node) => Flag::from_text(node.text()),
        }
    }

    /// Every node matching a relative path, following repeated elements at
    /// each step in document order
    pub fn all(&self, path: &str) -> Vec<&ConfigNode> {
        let mut frontier = vec![self];
        for segment in split_path(path) {
            frontier = frontier
                .into_iter()
                .flat_map(|node| node.children.iter().filter(move |c| c.name == segment))
                .collect();
            if frontier.is_empty() {
                break;
            }
        }
        frontier
    }

    /// Concatenated text of this node and all descendants, lowercased
    pub fn flattened_text_lowercase(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out.to_lowercase()
    }

    fn collect_text(&self, out: &mut String) {
        out.push_str(&self.name);
        out.push(' ');
        if let Some(text) = &self.text {
            out.push_str(text.trim());
            out.push(' ');
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    pub(crate) fn count_nodes(&self) -> usize {
        1 + self.children.iter().map(ConfigNode::count_nodes).sum::<usize>()
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

// ============================================================================
// LOOKUP RESULTS
// ============================================================================

/// Result of a path lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Present(&'a ConfigNode),
    Absent,
}

impl<'a> Lookup<'a> {
    pub fn is_present(&self) -> bool {
        matches!(self, Lookup::Present(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Lookup::Absent)
    }

    pub fn node(&self) -> Option<&'a ConfigNode> {
        match self {
            Lookup::Present(node) => Some(node),
            Lookup::Absent => None,
        }
    }

    pub fn text(&self) -> Option<&'a str> {
        self.node().map(ConfigNode::text)
    }

    pub fn value(&self) -> Option<&'a str> {
        self.node().and_then(ConfigNode::value)
    }
}

/// Tri-state toggle. An empty element (`<enable/>`) or an affirmative value
/// is `Enabled`; an explicit negative value is `Disabled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Flag {
    Absent,
    Enabled,
    Disabled,
}

impl Flag {
    fn from_text(text: &str) -> Self {
        match text.to_ascii_lowercase().as_str() {
            "false" | "no" | "off" | "0" | "disabled" | "disable" => Flag::Disabled,
            _ => Flag::Enabled,
        }
    }

    pub fn is_enabled(self) -> bool {
        self == Flag::Enabled
    }
}

// ============================================================================
// SECTIONS
// ============================================================================

/// Top-level sections the engine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    System,
    Interfaces,
    Filter,
    Snmpd,
    Syslog,
    Ntpd,
    Unbound,
    OpenVpn,
    Ipsec,
    CaptivePortal,
    InstalledPackages,
}

impl Section {
    pub const ALL: [Section; 11] = [
        Section::System,
        Section::Interfaces,
        Section::Filter,
        Section::Snmpd,
        Section::Syslog,
        Section::Ntpd,
        Section::Unbound,
        Section::OpenVpn,
        Section::Ipsec,
        Section::CaptivePortal,
        Section::InstalledPackages,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Section::System => "system",
            Section::Interfaces => "interfaces",
            Section::Filter => "filter",
            Section::Snmpd => "snmpd",
            Section::Syslog => "syslog",
            Section::Ntpd => "ntpd",
            Section::Unbound => "unbound",
            Section::OpenVpn => "openvpn",
            Section::Ipsec => "ipsec",
            Section::CaptivePortal => "captiveportal",
            Section::InstalledPackages => "installedpackages",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Section::ALL.into_iter().find(|s| s.key() == key)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ============================================================================
// MODEL
// ============================================================================

/// Parsed configuration of one device. Built once by the parser and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigurationModel {
    root: ConfigNode,
    format: DocumentFormat,
    node_count: usize,
}

impl ConfigurationModel {
    pub(crate) fn new(root: ConfigNode, format: DocumentFormat) -> Self {
        let node_count = root.count_nodes();
        Self {
            root,
            format,
            node_count,
        }
    }

    pub fn root(&self) -> &ConfigNode {
        &self.root
    }

    /// Format of the document the model was built from
    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn lookup(&self, path: &str) -> Lookup<'_> {
        self.root.lookup(path)
    }

    pub fn all(&self, path: &str) -> Vec<&ConfigNode> {
        self.root.all(path)
    }

    /// Trimmed text at `path`; `None` when the path is absent
    pub fn text(&self, path: &str) -> Option<&str> {
        self.root.text_at(path)
    }

    /// Trimmed, non-empty text at `path`
    pub fn value(&self, path: &str) -> Option<&str> {
        self.root.value_at(path)
    }

    pub fn flag(&self, path: &str) -> Flag {
        self.root.flag_at(path)
    }

    pub fn section(&self, section: Section) -> Lookup<'_> {
        self.lookup(section.key())
    }

    pub fn has_section(&self, section: Section) -> bool {
        self.section(section).is_present()
    }

    /// Known sections present in the document
    pub fn sections(&self) -> Vec<Section> {
        Section::ALL
            .into_iter()
            .filter(|s| self.has_section(*s))
            .collect()
    }

    /// Top-level keys outside the known sections, in document order
    pub fn extra_sections(&self) -> Vec<&str> {
        let mut extras: Vec<&str> = Vec::new();
        for child in self.root.children() {
            let name = child.name();
            if Section::from_key(name).is_none() && !extras.contains(&name) {
                extras.push(name);
            }
        }
        extras
    }
}
