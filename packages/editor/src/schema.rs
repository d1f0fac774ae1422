//! Directive field schemas
//!
//! Maps a directive name to the kind of editor its arguments need. Adding a
//! specialized editor is a new registry entry, not a new branch in the
//! front end.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use sitefile_grammar::Directive;

/// How a directive's arguments are edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    /// Username and password fields backed by the credential codec
    BasicAuth,
    /// Pick a header rule from the preset list or type a custom one
    Header,
    /// Space separated free arguments
    Plain { placeholder: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectiveSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub kind: DirectiveKind,
}

const fn plain(
    name: &'static str,
    label: &'static str,
    placeholder: &'static str,
    description: &'static str,
) -> DirectiveSpec {
    DirectiveSpec {
        name,
        label,
        description,
        kind: DirectiveKind::Plain { placeholder },
    }
}

/// Built-in catalogue, in menu order
pub const DIRECTIVES: &[DirectiveSpec] = &[
    plain("reverse_proxy", "Reverse proxy", "upstream (e.g. localhost:8080)", "Forward requests to a backend server"),
    plain("file_server", "Static files", "leave empty or give a path", "Serve static files"),
    plain("root", "Site root", "path (e.g. * /var/www)", "Set the site's root directory"),
    plain("tls", "HTTPS certificate", "email (e.g. admin@example.com)", "Obtain certificates automatically"),
    plain("respond", "Fixed response", "body (e.g. \"Hello, World!\")", "Reply with fixed content"),
    plain("rewrite", "URL rewrite", "rule (e.g. /api/* /api/v1/*)", "Rewrite the request URI"),
    DirectiveSpec {
        name: "header",
        label: "HTTP header",
        description: "Set or remove response headers",
        kind: DirectiveKind::Header,
    },
    plain("encode", "Compression", "encodings (e.g. gzip zstd)", "Compress responses"),
    DirectiveSpec {
        name: sitefile_grammar::BASICAUTH,
        label: "Basic auth",
        description: "Protect the site with a username and password",
        kind: DirectiveKind::BasicAuth,
    },
    plain("redir", "Redirect", "target (e.g. https://example.com)", "Redirect to another address"),
    plain("log", "Access log", "log name", "Configure access logging"),
    plain("cors", "CORS", "leave empty or give options", "Enable cross-origin requests"),
    plain("cache", "Cache", "cache options", "Configure HTTP caching"),
];

const CUSTOM: DirectiveKind = DirectiveKind::Plain {
    placeholder: "arguments (space separated)",
};

pub fn lookup(name: &str) -> Option<&'static DirectiveSpec> {
    DIRECTIVES.iter().find(|spec| spec.name == name)
}

/// Editor kind for a directive; unknown names get free arguments
pub fn kind_of(directive: &Directive) -> DirectiveKind {
    lookup(&directive.name).map_or(CUSTOM, |spec| spec.kind)
}

/// A ready-made `header` rule; the server may publish its own list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderPreset {
    pub value: Cow<'static, str>,
    pub label: Cow<'static, str>,
    #[serde(default)]
    pub description: Cow<'static, str>,
}

impl HeaderPreset {
    const fn builtin(value: &'static str, label: &'static str, description: &'static str) -> Self {
        Self {
            value: Cow::Borrowed(value),
            label: Cow::Borrowed(label),
            description: Cow::Borrowed(description),
        }
    }

    /// Arguments a `header` directive gets when this preset is picked
    pub fn args(&self) -> Vec<String> {
        self.value.split_whitespace().map(str::to_string).collect()
    }

    /// Preset whose value matches the directive's joined arguments
    pub fn matching<'a>(presets: &'a [HeaderPreset], directive: &Directive) -> Option<&'a HeaderPreset> {
        let joined = directive.joined_args();
        presets.iter().find(|preset| preset.value == joined)
    }

    /// Placeholder entries such as `custom` are not rules
    pub fn is_rule(&self) -> bool {
        !self.value.trim().is_empty() && self.value != "custom"
    }
}

pub const HEADER_PRESETS: &[HeaderPreset] = &[
    HeaderPreset::builtin(
        "-Server",
        "Hide server banner (-Server)",
        "Remove the Server response header",
    ),
    HeaderPreset::builtin(
        "X-Frame-Options SAMEORIGIN",
        "Clickjacking protection",
        "Only allow framing by the same origin",
    ),
    HeaderPreset::builtin(
        "X-Frame-Options DENY",
        "Deny framing",
        "Never allow the page inside a frame",
    ),
    HeaderPreset::builtin(
        "X-Content-Type-Options nosniff",
        "No MIME sniffing",
        "Stop browsers from guessing content types",
    ),
    HeaderPreset::builtin(
        "Strict-Transport-Security max-age=31536000",
        "Force HTTPS (HSTS)",
        "Require HTTPS connections",
    ),
    HeaderPreset::builtin(
        "Content-Security-Policy default-src self",
        "Content security policy",
        "Restrict where resources load from",
    ),
    HeaderPreset::builtin(
        "Access-Control-Allow-Origin *",
        "Allow any origin",
        "Accept cross-origin requests from anywhere",
    ),
    HeaderPreset::builtin(
        "Access-Control-Allow-Origin {http.request.header.Origin}",
        "Echo request origin",
        "Accept cross-origin requests from the caller's origin",
    ),
    HeaderPreset::builtin(
        "Access-Control-Allow-Methods GET,POST,OPTIONS",
        "Allowed methods",
        "List the HTTP methods allowed cross-origin",
    ),
    HeaderPreset::builtin(
        "Access-Control-Allow-Headers *",
        "Allow any request header",
        "Accept all request headers cross-origin",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_and_unknown() {
        assert_eq!(lookup("basicauth").map(|s| s.kind), Some(DirectiveKind::BasicAuth));
        assert_eq!(lookup("header").map(|s| s.kind), Some(DirectiveKind::Header));
        assert!(lookup("php_fastcgi").is_none());
    }

    #[test]
    fn test_kind_of_custom_directive_is_plain() {
        let directive = Directive::new("php_fastcgi", ["unix//run/php.sock"]);
        assert!(matches!(kind_of(&directive), DirectiveKind::Plain { .. }));
    }

    #[test]
    fn test_registry_names_are_unique() {
        for (i, spec) in DIRECTIVES.iter().enumerate() {
            assert!(DIRECTIVES[i + 1..].iter().all(|other| other.name != spec.name));
        }
    }

    #[test]
    fn test_header_preset_round_trip() {
        let preset = &HEADER_PRESETS[1];
        let directive = Directive::new("header", preset.args());
        assert_eq!(directive.args, vec!["X-Frame-Options", "SAMEORIGIN"]);
        assert_eq!(HeaderPreset::matching(HEADER_PRESETS, &directive), Some(preset));
        assert_eq!(
            HeaderPreset::matching(HEADER_PRESETS, &Directive::new("header", ["X-Custom", "1"])),
            None
        );
    }

    #[test]
    fn test_header_preset_from_server_json() {
        let presets: Vec<HeaderPreset> = serde_json::from_str(
            r#"[{"value": "Referrer-Policy no-referrer", "label": "No referrer"},
                {"value": "custom", "label": "Custom header"}]"#,
        )
        .unwrap();
        assert_eq!(presets[0].args(), vec!["Referrer-Policy", "no-referrer"]);
        assert!(presets[0].description.is_empty());
        assert!(presets[0].is_rule());
        assert!(!presets[1].is_rule());
    }
}
