//! Tokens, tokenizer and token cursor shared by the Jack compiler, the VM
//! translator and the assembler.

mod cursor;
mod diagnostic;
mod token;
mod tokenizer;

pub use cursor::{describe, TokenCursor};
pub use diagnostic::{join, Diagnostic};
pub use token::{CommentKind, Keyword, Spanned, Token, TokenKind, MAX_INT};
pub use tokenizer::{Dialect, Tokenizer, DEFAULT_TAB_WIDTH};
