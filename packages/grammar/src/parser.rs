use crate::error::{ParseError, ParseResult};
use crate::lexer::{lex_line, Token};
use crate::model::{Directive, Site, SiteFile};

/// Comment prefixes that attach a note to the site that follows
const NOTE_PREFIX: &str = "# NOTE:";
const LOCALIZED_NOTE_MARKERS: [&str; 2] = ["备注：", "备注:"];

/// Line-oriented parser for site files
///
/// Tolerant by construction: stray braces are skipped, an unclosed site
/// block ends at the next unindented line, and anything that is not a site
/// lands in `unparsed` verbatim.
pub struct Parser<'src> {
    lines: Vec<&'src str>,
    pos: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            lines: source.lines().collect(),
            pos: 0,
        }
    }

    /// Parse a complete document
    pub fn parse_document(&mut self) -> ParseResult<SiteFile> {
        let mut doc = SiteFile::default();
        // comments and loose lines seen since the last site
        let mut pending: Vec<&'src str> = Vec::new();

        while let Some(line) = self.peek() {
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') || is_indented(line) {
                pending.push(line);
                self.pos += 1;
                continue;
            }

            if trimmed == "}" {
                self.pos += 1;
                continue;
            }

            if trimmed == "{" || is_snippet_header(trimmed) {
                pending.extend(self.take_raw_block());
                continue;
            }

            let line_number = self.pos + 1;
            let mut site = self.parse_site()?;
            site.line_number = Some(line_number);

            if let Some(notes) = find_note(&pending) {
                site.notes = notes;
            }
            doc.unparsed.extend(
                pending
                    .drain(..)
                    .filter(|l| !l.trim().is_empty() && !is_note(l.trim()))
                    .map(str::to_string),
            );
            doc.sites.push(site);
        }

        doc.unparsed.extend(
            pending
                .into_iter()
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string),
        );

        Ok(doc)
    }

    /// Parse a site header and its block
    fn parse_site(&mut self) -> ParseResult<Site> {
        let header = self.advance().unwrap_or_default().trim();
        let (address, opened) = match header.strip_suffix('{') {
            Some(rest) => (rest.trim(), true),
            None => (header, false),
        };

        let mut site = Site::new(address);

        if opened || self.skip_lone_open_brace() {
            site.directives = self.parse_block(0)?;
        }

        Ok(site)
    }

    /// Parse directives up to and including the closing brace of the
    /// current block. `depth` 0 is a site block.
    fn parse_block(&mut self, depth: usize) -> ParseResult<Vec<Directive>> {
        let mut directives = Vec::new();

        while let Some(line) = self.peek() {
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                self.pos += 1;
                continue;
            }

            if trimmed == "}" {
                self.pos += 1;
                return Ok(directives);
            }

            // a missing closing brace must not swallow the next site
            if depth == 0 && !is_indented(line) {
                return Ok(directives);
            }

            directives.push(self.parse_directive(depth)?);
        }

        Ok(directives)
    }

    fn parse_directive(&mut self, depth: usize) -> ParseResult<Directive> {
        let line_number = self.pos + 1;
        let line = self.advance().unwrap_or_default();

        let mut tokens = lex_line(line)
            .map_err(|column| ParseError::unterminated_quote(line_number, column + 1))?;

        let opened = matches!(tokens.last(), Some(Token::OpenBrace));
        if opened {
            tokens.pop();
        }

        let mut words = tokens.iter().filter_map(Token::text);
        let name = words.next().ok_or_else(|| {
            ParseError::invalid_syntax(line_number, "expected a directive name")
        })?;

        let mut directive = Directive::new(name, words);

        if opened || self.skip_lone_open_brace() {
            directive.directives = self.parse_block(depth + 1)?;
        }

        Ok(directive)
    }

    /// Consume a following line that holds only `{`
    fn skip_lone_open_brace(&mut self) -> bool {
        match self.peek() {
            Some(next) if next.trim() == "{" => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    /// Take a snippet or global options block verbatim, braces balanced
    fn take_raw_block(&mut self) -> Vec<&'src str> {
        let mut taken = Vec::new();
        let mut balance: isize = 0;
        let mut opened = false;

        while let Some(line) = self.advance() {
            taken.push(line);
            let trimmed = line.trim();
            let opens = trimmed.matches('{').count() as isize;
            let closes = trimmed.matches('}').count() as isize;
            opened |= opens > 0;
            balance += opens - closes;
            if opened && balance <= 0 {
                break;
            }
            // `(snippet)` with its brace on the next line
            if !opened && !matches!(self.peek(), Some(next) if next.trim() == "{") {
                break;
            }
        }

        taken
    }

    fn peek(&self) -> Option<&'src str> {
        self.lines.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<&'src str> {
        let line = self.peek()?;
        self.pos += 1;
        Some(line)
    }
}

/// Parse site file source into its structured form
pub fn parse(source: &str) -> ParseResult<SiteFile> {
    Parser::new(source).parse_document()
}

fn is_indented(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}

fn is_snippet_header(trimmed: &str) -> bool {
    trimmed.starts_with('(') && trimmed.contains(')')
}

fn is_note(trimmed: &str) -> bool {
    note_text(trimmed).is_some()
}

fn note_text(trimmed: &str) -> Option<&str> {
    if !trimmed.starts_with('#') {
        return None;
    }
    if trimmed.len() >= NOTE_PREFIX.len()
        && trimmed.is_char_boundary(NOTE_PREFIX.len())
        && trimmed[..NOTE_PREFIX.len()].eq_ignore_ascii_case(NOTE_PREFIX)
    {
        return Some(trimmed[NOTE_PREFIX.len()..].trim());
    }
    LOCALIZED_NOTE_MARKERS
        .iter()
        .find_map(|marker| trimmed.split_once(marker).map(|(_, rest)| rest.trim()))
}

/// The note closest to the site wins
fn find_note(pending: &[&str]) -> Option<String> {
    pending
        .iter()
        .rev()
        .find_map(|line| note_text(line.trim()))
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
