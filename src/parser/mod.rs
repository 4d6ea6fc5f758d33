//! T-SQL parsing

pub mod ast;
mod ddl_parser;
mod expression_parser;
pub mod lexer;
mod procedure_parser;
mod statement_parser;
mod token_parser_base;
mod tsql_parser;

pub use ast::*;
pub use lexer::{tokenize, Token, TokenKind};
pub use statement_parser::StatementParser;
pub use tsql_parser::{parse_sql, parse_sql_file, parse_sql_files, ParsedStatement};
