//! mida HTML Parser
//!
//! Builds a `mida_dom::Document` from markup using html5ever. The binding
//! engine itself never parses; hosts and cross-document lookups do.

mod parser;

pub use parser::HtmlParser;
pub use mida_dom::Document;

/// Parse an HTML string into a document at `about:blank`
pub fn parse(html: &str) -> Result<Document, ParseError> {
    HtmlParser::new().parse(html)
}

/// Parse error
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read markup: {0}")]
    Io(#[from] std::io::Error),
}
