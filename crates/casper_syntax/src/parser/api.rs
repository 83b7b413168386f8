/// Parse a token stream into an AST [`Program`].
///
/// This is the main public entrypoint for parsing.
///
/// ## Parameters
/// - `tokens`: Token stream produced by `casper_syntax::lexer`.
///
/// ## Errors
/// Returns the first unrecoverable [`SyntaxError`]; its span is relative to the lexed source.
#[tracing::instrument(skip_all, fields(token_count = tokens.len()))]
pub fn parse(tokens: &[Token]) -> Result<Program, SyntaxError> {
    Parser::new(tokens).parse()
}

/// Lex and parse `source`, resolving any failure to a line and column.
///
/// ## Errors
/// Returns a located [`ParseError`] for lexical errors and unrecoverable syntax errors.
pub fn parse_source(source: &str) -> Result<Program, ParseError> {
    let tokens = crate::lexer::lex(source).map_err(|e| e.locate(source))?;
    parse(&tokens).map_err(|e| e.locate(source))
}
