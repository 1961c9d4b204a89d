//! Event codes and their classification
//!
//! Every code the engine emits is declared here together with its metadata,
//! so log consumers can filter by category and recoverability.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Code attached to every log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// CLASSIFICATION TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CodeMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

// ============================================================================
// ERROR AND WARNING CODES
// ============================================================================

/// System error codes
pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const INITIALIZATION_FAILURE: Code = Code::new("ERR002");
    pub const INVALID_CONFIGURATION: Code = Code::new("ERR003");
}

/// Transport and fetch codes
pub mod transport {
    use super::Code;

    pub const CONNECTION_FAILED: Code = Code::new("E100");
    pub const HOST_VERIFICATION_FAILED: Code = Code::new("E101");
    pub const AUTHENTICATION_FAILED: Code = Code::new("E102");
    pub const CREDENTIAL_UNUSABLE: Code = Code::new("E103");
    pub const TIMEOUT: Code = Code::new("E104");
    pub const TRANSFER_FAILED: Code = Code::new("E105");
    pub const CANCELLED: Code = Code::new("E106");

    pub const HOST_KEY_CHECK_DISABLED: Code = Code::new("W100");
    pub const TEARDOWN_INCOMPLETE: Code = Code::new("W101");
}

/// Document parsing codes
pub mod parse {
    use super::Code;

    pub const EMPTY_DOCUMENT: Code = Code::new("E200");
    pub const INVALID_ENCODING: Code = Code::new("E201");
    pub const MALFORMED_DOCUMENT: Code = Code::new("E202");
    pub const FORBIDDEN_DTD: Code = Code::new("E203");
    pub const SIZE_EXCEEDED: Code = Code::new("E204");
    pub const DEPTH_EXCEEDED: Code = Code::new("E205");
    pub const NODE_LIMIT_EXCEEDED: Code = Code::new("E206");
    pub const UNEXPECTED_ROOT: Code = Code::new("E207");
}

/// Rule registry and evaluation codes
pub mod rules {
    use super::Code;

    pub const INVALID_RULE_ID: Code = Code::new("E300");
    pub const DUPLICATE_RULE: Code = Code::new("E301");
    pub const RULE_FAULT: Code = Code::new("E302");
    pub const RULE_PANIC: Code = Code::new("E303");
}

// ============================================================================
// SUCCESS CODES
// ============================================================================

pub mod success {
    use super::Code;

    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I001");

    pub const SESSION_ESTABLISHED: Code = Code::new("I100");
    pub const HOST_VERIFIED: Code = Code::new("I101");
    pub const AUTHENTICATED: Code = Code::new("I102");
    pub const FETCH_COMPLETE: Code = Code::new("I103");

    pub const PARSE_COMPLETE: Code = Code::new("I200");

    pub const RULE_REGISTERED: Code = Code::new("I300");
    pub const EVALUATION_COMPLETE: Code = Code::new("I301");

    pub const RUN_COMPLETE: Code = Code::new("I400");
}

// ============================================================================
// METADATA REGISTRY
// ============================================================================

static CODE_REGISTRY: OnceLock<HashMap<&'static str, CodeMetadata>> = OnceLock::new();

fn add(
    registry: &mut HashMap<&'static str, CodeMetadata>,
    code: Code,
    category: &'static str,
    severity: Severity,
    recoverable: bool,
    description: &'static str,
    recommended_action: &'static str,
) {
    registry.insert(
        code.as_str(),
        CodeMetadata {
            code: code.as_str(),
            category,
            severity,
            recoverable,
            description,
            recommended_action,
        },
    );
}

#[rustfmt::skip]
fn get_code_registry() -> &'static HashMap<&'static str, CodeMetadata> {
    CODE_REGISTRY.get_or_init(|| {
        let mut r = HashMap::new();

        add(&mut r, system::INTERNAL_ERROR, "System", Severity::Critical, false,
            "Internal engine error", "File a bug report with the run log");
        add(&mut r, system::INITIALIZATION_FAILURE, "System", Severity::Critical, false,
            "Engine initialization failed", "Check logging and registry setup");
        add(&mut r, system::INVALID_CONFIGURATION, "System", Severity::High, true,
            "Invalid operator configuration", "Correct the inventory or command line");

        add(&mut r, transport::CONNECTION_FAILED, "Transport", Severity::High, true,
            "Could not open a TCP/SSH connection", "Check address, port and reachability");
        add(&mut r, transport::HOST_VERIFICATION_FAILED, "Transport", Severity::Critical, false,
            "Server host key is unknown or does not match known_hosts",
            "Verify the fingerprint out of band before trusting the host");
        add(&mut r, transport::AUTHENTICATION_FAILED, "Transport", Severity::High, false,
            "Public key authentication was rejected", "Check the user and key on the appliance");
        add(&mut r, transport::CREDENTIAL_UNUSABLE, "Transport", Severity::High, false,
            "Credential reference resolves to nothing usable",
            "Check the key file path, passphrase variable or agent socket");
        add(&mut r, transport::TIMEOUT, "Transport", Severity::Medium, true,
            "Fetch exceeded its time budget", "Retry later or raise the timeout");
        add(&mut r, transport::TRANSFER_FAILED, "Transport", Severity::High, true,
            "SFTP transfer failed or was incomplete", "Check the remote path and permissions");
        add(&mut r, transport::CANCELLED, "Transport", Severity::Low, true,
            "Fetch was cancelled by the caller", "None");
        add(&mut r, transport::HOST_KEY_CHECK_DISABLED, "Transport", Severity::High, true,
            "Host key verification disabled for this connection",
            "Add the host key to known_hosts and re-enable strict checking");
        add(&mut r, transport::TEARDOWN_INCOMPLETE, "Transport", Severity::Low, true,
            "Session teardown reported an error", "None; the socket is closed regardless");

        add(&mut r, parse::EMPTY_DOCUMENT, "Parse", Severity::High, false,
            "Configuration document is empty", "Check the remote path");
        add(&mut r, parse::INVALID_ENCODING, "Parse", Severity::High, false,
            "Configuration document is not valid UTF-8", "Inspect the document encoding");
        add(&mut r, parse::MALFORMED_DOCUMENT, "Parse", Severity::High, false,
            "Configuration document could not be parsed", "Inspect the document syntax");
        add(&mut r, parse::FORBIDDEN_DTD, "Parse", Severity::Critical, false,
            "Document declares a DTD or entity", "Treat the document as hostile");
        add(&mut r, parse::SIZE_EXCEEDED, "Parse", Severity::High, false,
            "Document exceeds the byte limit", "Treat the document as hostile");
        add(&mut r, parse::DEPTH_EXCEEDED, "Parse", Severity::High, false,
            "Document exceeds the nesting limit", "Treat the document as hostile");
        add(&mut r, parse::NODE_LIMIT_EXCEEDED, "Parse", Severity::High, false,
            "Document exceeds the node limit", "Treat the document as hostile");
        add(&mut r, parse::UNEXPECTED_ROOT, "Parse", Severity::Medium, false,
            "Document root is not an appliance configuration", "Check the remote path");

        add(&mut r, rules::INVALID_RULE_ID, "Rules", Severity::High, false,
            "Rule identifier is not a dotted benchmark number", "Fix the rule definition");
        add(&mut r, rules::DUPLICATE_RULE, "Rules", Severity::High, false,
            "Rule identifier registered twice", "Fix the rule catalog");
        add(&mut r, rules::RULE_FAULT, "Rules", Severity::Medium, true,
            "Rule evaluator could not complete", "Review the rule manually");
        add(&mut r, rules::RULE_PANIC, "Rules", Severity::High, true,
            "Rule evaluator panicked", "Review the rule manually and file a bug report");

        r
    })
}

pub fn get_code_metadata(code: &str) -> Option<&'static CodeMetadata> {
    get_code_registry().get(code)
}

pub fn get_severity(code: &str) -> Severity {
    get_code_metadata(code)
        .map(|m| m.severity)
        .unwrap_or(Severity::Low)
}

pub fn is_recoverable(code: &str) -> bool {
    get_code_metadata(code).map(|m| m.recoverable).unwrap_or(true)
}

pub fn get_description(code: &str) -> &'static str {
    get_code_metadata(code)
        .map(|m| m.description)
        .unwrap_or("Unknown code")
}

pub fn get_action(code: &str) -> &'static str {
    get_code_metadata(code)
        .map(|m| m.recommended_action)
        .unwrap_or("No specific action available")
}

pub fn get_category(code: &str) -> &'static str {
    if let Some(meta) = get_code_metadata(code) {
        return meta.category;
    }
    match code.chars().next() {
        Some('I') => "Success",
        Some('D') => "Debug",
        Some('W') => "Warning",
        _ => "Unknown",
    }
}
