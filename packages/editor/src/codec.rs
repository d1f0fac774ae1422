//! # Credential Field Codec
//!
//! A `basicauth` directive stores `[username, token]` where the token is
//! the standard base64 encoding of `username:password`. The form edits the
//! pair through a cached [`BasicAuthData`]; the arguments stay
//! authoritative.
//!
//! Decoding is best-effort. A token that is not base64, not UTF-8, or has
//! no `:` separator is a [`DecodeFailure`], and [`decode_args`] then
//! treats the raw arguments as a plaintext username/password pair. A
//! username containing `:` cannot be told apart from a password that
//! starts after it; the first `:` always splits.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sitefile_grammar::{BasicAuthData, Directive, Site};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeFailure {
    #[error("token is not valid base64")]
    NotBase64,

    #[error("decoded token is not UTF-8")]
    NotUtf8,

    #[error("decoded token has no ':' separator")]
    MissingSeparator,
}

/// Encode a credential pair into the token stored as the second argument
pub fn encode(username: &str, password: &str) -> String {
    STANDARD.encode(format!("{}:{}", username, password))
}

/// Invert [`encode`]
pub fn decode(token: &str) -> Result<BasicAuthData, DecodeFailure> {
    let bytes = STANDARD
        .decode(token.trim())
        .map_err(|_| DecodeFailure::NotBase64)?;
    let text = String::from_utf8(bytes).map_err(|_| DecodeFailure::NotUtf8)?;
    let (username, password) = text
        .split_once(':')
        .ok_or(DecodeFailure::MissingSeparator)?;
    Ok(BasicAuthData::new(username, password))
}

/// Arguments for a credential pair: `[username, token]` when both fields
/// are filled in, otherwise empty
pub fn encode_args(data: &BasicAuthData) -> Vec<String> {
    if data.is_complete() {
        vec![data.username.clone(), encode(&data.username, &data.password)]
    } else {
        Vec::new()
    }
}

/// Best-effort decoding of stored arguments for the editable fields
///
/// Returns `None` when fewer than two arguments exist. A token that fails
/// to decode falls back to the raw arguments as plaintext.
pub fn decode_args(args: &[String]) -> Option<BasicAuthData> {
    let [username, token, ..] = args else {
        return None;
    };
    match decode(token) {
        Ok(data) => Some(data),
        Err(failure) => {
            tracing::debug!(%failure, "credential token not decodable, using plaintext");
            Some(BasicAuthData::new(username.as_str(), token.as_str()))
        }
    }
}

/// Rebuild the cached credential fields of every `basicauth` directive
/// from its arguments. Other directives lose any stale cache.
pub fn refresh_credential_cache(sites: &mut [Site]) {
    for site in sites {
        refresh_directives(&mut site.directives);
    }
}

fn refresh_directives(directives: &mut [Directive]) {
    for directive in directives {
        directive.basicauth_data = if directive.is_basicauth() {
            decode_args(&directive.args)
        } else {
            None
        };
        refresh_directives(&mut directive.directives);
    }
}

/// Re-derive arguments from cached credential fields before the model
/// leaves the editor
pub fn encode_credential_fields(sites: &mut [Site]) {
    for site in sites {
        encode_directives(&mut site.directives);
    }
}

fn encode_directives(directives: &mut [Directive]) {
    for directive in directives {
        if directive.is_basicauth() {
            if let Some(data) = &directive.basicauth_data {
                directive.args = encode_args(data);
            }
        }
        encode_directives(&mut directive.directives);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_stable() {
        assert_eq!(encode("alice", "secret"), "YWxpY2U6c2VjcmV0");
        assert_eq!(encode("alice", "secret"), encode("alice", "secret"));
    }

    #[test]
    fn test_decode_inverts_encode() {
        let pairs = [("alice", "secret"), ("bob", "p:a:ss"), ("用户", "密码")];
        for (username, password) in pairs {
            let decoded = decode(&encode(username, password)).unwrap();
            assert_eq!(decoded, BasicAuthData::new(username, password));
        }
    }

    #[test]
    fn test_decode_failures() {
        assert_eq!(decode("not base64!"), Err(DecodeFailure::NotBase64));
        // "nocolon"
        assert_eq!(decode("bm9jb2xvbg=="), Err(DecodeFailure::MissingSeparator));
        assert_eq!(decode("//79"), Err(DecodeFailure::NotUtf8));
    }

    #[test]
    fn test_decode_args_falls_back_to_plaintext() {
        let args = vec!["carol".to_string(), "$2a$14$hashedvalue".to_string()];
        assert_eq!(
            decode_args(&args),
            Some(BasicAuthData::new("carol", "$2a$14$hashedvalue"))
        );
        assert_eq!(decode_args(&["only-one".to_string()]), None);
    }

    #[test]
    fn test_encode_args_clears_partial_credentials() {
        assert!(encode_args(&BasicAuthData::new("alice", "")).is_empty());
        assert!(encode_args(&BasicAuthData::new("", "secret")).is_empty());
        assert_eq!(
            encode_args(&BasicAuthData::new("alice", "secret")),
            vec!["alice", "YWxpY2U6c2VjcmV0"]
        );
    }

    #[test]
    fn test_refresh_cache_only_touches_basicauth() {
        let mut sites = vec![Site::new("a.com")
            .with_directive(Directive::new("basicauth", ["alice", "YWxpY2U6c2VjcmV0"]))
            .with_directive(Directive::new("log", Vec::<String>::new()))];
        sites[0].directives[1].basicauth_data = Some(BasicAuthData::new("x", "y"));

        refresh_credential_cache(&mut sites);

        assert_eq!(
            sites[0].directives[0].basicauth_data,
            Some(BasicAuthData::new("alice", "secret"))
        );
        assert_eq!(sites[0].directives[1].basicauth_data, None);
    }

    #[test]
    fn test_encode_fields_rewrites_args() {
        let mut directive = Directive::new("basicauth", Vec::<String>::new());
        directive.basicauth_data = Some(BasicAuthData::new("dave", "pw"));
        let mut sites = vec![Site::new("a.com").with_directive(directive)];

        encode_credential_fields(&mut sites);

        assert_eq!(sites[0].directives[0].args, vec!["dave", &encode("dave", "pw")]);
    }
}
