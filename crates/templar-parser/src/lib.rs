//! Parser for the declaration subset and type spellings the templar engine
//! consumes.
//!
//! Three entry points:
//! - [`parse_type`] for a single spelled type (`const std::vector<int>&`)
//! - [`parse_template_args`] for a comma-separated argument list
//!   (`"std::vector<float>, int"`)
//! - [`parse_source`] for declaration text
//!
//! # Example
//!
//! ```
//! use templar_core::decl::SourceItem;
//!
//! let items = templar_parser::parse_source("namespace ns { template<class T> T twice(T); }").unwrap();
//! assert!(matches!(&items[0], SourceItem::Namespace { name, .. } if name == "ns"));
//!
//! let ty = templar_parser::parse_type("const char*").unwrap();
//! assert_eq!(ty.to_string(), "const char*");
//! ```

mod decls;
pub mod lexer;
mod parser;
mod types;

use templar_core::decl::SourceItem;
use templar_core::{ParseError, TemplateArgName, TypeName};

pub use lexer::{Lexer, Token, TokenKind};
pub use parser::parse_int_literal;
use parser::Parser;

/// Parse one complete type spelling.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn parse_type(text: &str) -> Result<TypeName, ParseError> {
    let mut parser = Parser::new(text)?;
    let ty = parser.parse_type(true)?;
    if !parser.is_eof() {
        return Err(parser.unexpected("end of type"));
    }
    Ok(ty)
}

/// Parse a top-level, comma-separated template argument list without the
/// surrounding angle brackets.
pub fn parse_template_args(text: &str) -> Result<Vec<TemplateArgName>, ParseError> {
    let mut parser = Parser::new(text)?;
    let mut args = Vec::new();
    if parser.is_eof() {
        return Ok(args);
    }
    loop {
        args.push(parser.parse_template_arg(TokenKind::Eof)?);
        if parser.eat(TokenKind::Comma) {
            continue;
        }
        if !parser.is_eof() {
            return Err(parser.unexpected("',' or end of arguments"));
        }
        return Ok(args);
    }
}

/// Parse declaration text into source items.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn parse_source(text: &str) -> Result<Vec<SourceItem>, ParseError> {
    Parser::new(text)?.parse_items(false)
}
