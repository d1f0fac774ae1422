use crate::model::{Directive, SiteFile};

/// Serializer converts the structured form back to site file text
///
/// Output is canonical: sites first (each preceded by its note comment),
/// then every unparsed passage verbatim. Sites without an address and
/// directives without a name are skipped.
pub struct Serializer {
    indent_string: String,
}

impl Serializer {
    pub fn new() -> Self {
        Self::with_indent(4)
    }

    pub fn with_indent(width: usize) -> Self {
        Self {
            indent_string: " ".repeat(width),
        }
    }

    pub fn serialize(&self, doc: &SiteFile) -> String {
        let mut lines: Vec<String> = Vec::new();

        for site in doc.sites.iter().filter(|s| s.has_address()) {
            let notes = site.notes.trim();
            if !notes.is_empty() {
                lines.push(format!("# NOTE: {}", notes));
            }
            lines.push(format!("{} {{", site.address.trim()));
            self.serialize_directives(&site.directives, 1, &mut lines);
            lines.push("}".to_string());
            lines.push(String::new());
        }

        if !doc.unparsed.is_empty() {
            if lines.last().is_some_and(|l| !l.trim().is_empty()) {
                lines.push(String::new());
            }
            lines.extend(doc.unparsed.iter().cloned());
        }

        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }

        lines.join("\n")
    }

    fn serialize_directives(&self, directives: &[Directive], depth: usize, lines: &mut Vec<String>) {
        let indent = self.indent_string.repeat(depth);

        for directive in directives {
            let name = directive.name.trim();
            if name.is_empty() {
                continue;
            }

            let mut line = format!("{}{}", indent, name);
            for arg in directive.args.iter().map(|a| a.trim()).filter(|a| !a.is_empty()) {
                line.push(' ');
                line.push_str(&quote_arg(arg));
            }

            if directive.directives.is_empty() {
                lines.push(line);
            } else {
                line.push_str(" {");
                lines.push(line);
                self.serialize_directives(&directive.directives, depth + 1, lines);
                lines.push(format!("{}}}", indent));
            }
        }
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate site file text with the default 4-space indent
pub fn generate(doc: &SiteFile) -> String {
    Serializer::new().serialize(doc)
}

fn quote_arg(arg: &str) -> String {
    let needs_quotes = arg.chars().any(char::is_whitespace)
        || arg.starts_with(['"', '\'', '#'])
        || arg == "{"
        || arg == "}";

    if needs_quotes {
        let escaped = arg.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{}\"", escaped)
    } else {
        arg.to_string()
    }
}
