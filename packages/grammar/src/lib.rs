//! # Sitefile Grammar
//!
//! Data model shared by every sitefile crate, plus an in-process
//! reference implementation of the text ⇄ structure conversion.
//!
//! ```text
//! text ──parse──▶ SiteFile { sites, unparsed } ──generate──▶ text
//! ```
//!
//! The editor treats conversion as an external service; this crate is the
//! local stand-in used for offline formatting and in tests.

pub mod error;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod serializer;

pub use error::{ParseError, ParseResult};
pub use model::{BasicAuthData, Directive, Site, SiteFile, BASICAUTH};
pub use parser::{parse, Parser};
pub use serializer::{generate, Serializer};

/// Parse and regenerate, normalizing layout
pub fn format(source: &str, indent: usize) -> ParseResult<String> {
    let doc = parse(source)?;
    Ok(Serializer::with_indent(indent).serialize(&doc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_normalizes_layout() {
        let source = "example.com\n{\n  reverse_proxy   localhost:8080\n}\n";
        assert_eq!(
            format(source, 4).unwrap(),
            "example.com {\n    reverse_proxy localhost:8080\n}"
        );
    }
}
