//! Lexical analysis for type spellings and declaration source.

mod cursor;
mod lexer;
mod token;

pub use lexer::Lexer;
pub use token::{Token, TokenKind};
