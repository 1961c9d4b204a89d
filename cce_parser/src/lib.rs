//! Configuration ingestion for the compliance check engine: raw documents,
//! the hardened parser, the read-only configuration model, and the shared
//! logging and configuration layers.

pub mod config;
pub mod document;
#[macro_use]
pub mod logging;
pub mod model;
pub mod parser;

pub use document::{DocumentFormat, RawConfigurationDocument};
pub use model::{ConfigNode, ConfigurationModel, Flag, Lookup, Section};
pub use parser::{parse, parse_with_options, ParseError, ParseErrorReason, ParseOptions};
