//! Line lexer for site files using logos
//!
//! The grammar is line-oriented, so lexing happens one line at a time.
//! Braces are only block delimiters when they stand alone; `{placeholder}`
//! forms stay inside a single word.

use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r]+")]
pub enum Token<'src> {
    #[token("{", priority = 10)]
    OpenBrace,

    #[token("}", priority = 10)]
    CloseBrace,

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    Quoted(&'src str),

    #[regex(r"'([^'\\]|\\.)*'", |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    SingleQuoted(&'src str),

    #[regex(r"#[^\n]*", |lex| lex.slice())]
    Comment(&'src str),

    #[regex(r#"[^\s"'#][^\s]*"#, |lex| lex.slice())]
    Word(&'src str),
}

impl<'src> Token<'src> {
    /// Argument text carried by this token, unquoted and unescaped
    pub fn text(&self) -> Option<String> {
        match self {
            Token::Word(w) => Some((*w).to_string()),
            Token::Quoted(q) | Token::SingleQuoted(q) => Some(unescape(q)),
            Token::OpenBrace => Some("{".to_string()),
            Token::CloseBrace => Some("}".to_string()),
            Token::Comment(_) => None,
        }
    }
}

/// Lex one line; `Err` carries the 0-based column of the offending byte
pub fn lex_line(line: &str) -> Result<Vec<Token<'_>>, usize> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(line);
    while let Some(result) = lexer.next() {
        match result {
            Ok(Token::Comment(_)) => break,
            Ok(token) => tokens.push(token),
            Err(()) => return Err(lexer.span().start),
        }
    }
    Ok(tokens)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next @ ('"' | '\'' | '\\')) => out.push(next),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_directive_with_block() {
        let tokens = lex_line("    reverse_proxy localhost:8080 {").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word("reverse_proxy"),
                Token::Word("localhost:8080"),
                Token::OpenBrace
            ]
        );
    }

    #[test]
    fn test_placeholder_stays_one_word() {
        let tokens = lex_line("header_up Host {upstream_hostport}").unwrap();
        assert_eq!(tokens[2], Token::Word("{upstream_hostport}"));
    }

    #[test]
    fn test_lone_braces_are_not_words() {
        assert_eq!(lex_line("{").unwrap(), vec![Token::OpenBrace]);
        assert_eq!(lex_line("  }").unwrap(), vec![Token::CloseBrace]);
        assert_eq!(
            lex_line("handle {path} {").unwrap(),
            vec![Token::Word("handle"), Token::Word("{path}"), Token::OpenBrace]
        );
    }

    #[test]
    fn test_quoted_argument_is_unescaped() {
        let tokens = lex_line(r#"respond "say \"hi\" now" 200"#).unwrap();
        assert_eq!(tokens[1].text().as_deref(), Some(r#"say "hi" now"#));
        assert_eq!(tokens[2], Token::Word("200"));
    }

    #[test]
    fn test_trailing_comment_dropped() {
        let tokens = lex_line("encode gzip # compress").unwrap();
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_unterminated_quote_reports_column() {
        assert_eq!(lex_line(r#"respond "oops"#), Err(8));
    }
}
