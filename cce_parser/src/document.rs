//! Raw configuration documents as retrieved from a device
//!
//! A document is handed to the parser by value exactly once; it is neither
//! `Clone` nor printable beyond its size and format.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Xml,
    Json,
}

impl DocumentFormat {
    /// `.json` is JSON, anything else is XML
    pub fn from_path(path: &str) -> Self {
        let is_json = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            DocumentFormat::Json
        } else {
            DocumentFormat::Xml
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Xml => "xml",
            DocumentFormat::Json => "json",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xml" => Ok(DocumentFormat::Xml),
            "json" => Ok(DocumentFormat::Json),
            other => Err(format!("unknown document format '{}'", other)),
        }
    }
}

pub struct RawConfigurationDocument {
    bytes: Vec<u8>,
    format: DocumentFormat,
    source: String,
}

impl RawConfigurationDocument {
    pub fn new(bytes: Vec<u8>, format: DocumentFormat) -> Self {
        Self {
            bytes,
            format,
            source: String::new(),
        }
    }

    /// Document whose format follows the source path extension
    pub fn from_source(bytes: Vec<u8>, source: &str) -> Self {
        Self {
            bytes,
            format: DocumentFormat::from_path(source),
            source: source.to_string(),
        }
    }

    /// Read a local file, refusing anything larger than `max_bytes`
    pub fn from_file(path: &Path, max_bytes: usize) -> std::io::Result<Self> {
        let size = std::fs::metadata(path)?.len();
        if size > max_bytes as u64 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{} is {} bytes, limit is {}", path.display(), size, max_bytes),
            ));
        }
        let bytes = std::fs::read(path)?;
        Ok(Self::from_source(bytes, &path.display().to_string()))
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for RawConfigurationDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawConfigurationDocument")
            .field("format", &self.format)
            .field("source", &self.source)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_format_from_path() {
        assert_eq!(DocumentFormat::from_path("/conf/config.xml"), DocumentFormat::Xml);
        assert_eq!(DocumentFormat::from_path("/tmp/export.JSON"), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path("/conf/config"), DocumentFormat::Xml);
        assert_eq!("json".parse::<DocumentFormat>(), Ok(DocumentFormat::Json));
        assert!("yaml".parse::<DocumentFormat>().is_err());
    }

    #[test]
    fn test_debug_does_not_dump_contents() {
        let doc = RawConfigurationDocument::new(b"<pfsense>secret</pfsense>".to_vec(), DocumentFormat::Xml);
        let debug = format!("{:?}", doc);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("len: 25"));
    }

    #[test]
    fn test_from_file_enforces_limit() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{"pfsense": {}}"#).unwrap();

        let doc = RawConfigurationDocument::from_file(file.path(), 1024).unwrap();
        assert_eq!(doc.format(), DocumentFormat::Json);
        assert_eq!(doc.len(), 15);

        let err = RawConfigurationDocument::from_file(file.path(), 4).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
