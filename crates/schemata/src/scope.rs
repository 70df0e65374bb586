//! Scope and pointer algebra.
//!
//! Scopes are plain strings (`http://example.com/root.json#/definitions/a`).
//! [`join_scope`] applies a child `$id`, `$ref` or `$anchor` token to the
//! scope in effect; the precedence of its rules is part of the contract:
//!
//! 1. no base and no child: the root scope `#`
//! 2. no child: the base without trailing `#`
//! 3. no base (or the root scope `#`): the child without trailing `#`
//! 4. a fragment child (`#...`): the base's fragment is replaced
//! 5. an absolute child URI: the child replaces the base
//! 6. an absolute-path child on an absolute base: scheme and authority are kept
//! 7. otherwise: the last path segment of the base is replaced

use percent_encoding::percent_decode_str;

/// Join a lexical base scope with a child token into an absolute scope
pub fn join_scope(base: Option<&str>, child: Option<&str>) -> String {
    let base = base.filter(|b| !b.is_empty());
    let child = child.filter(|c| !c.is_empty());

    let (base, child) = match (base, child) {
        (None, None) => return "#".to_string(),
        (Some(base), None) => return or_root(base.trim_end_matches('#')),
        (None, Some(child)) | (Some("#"), Some(child)) => {
            return or_root(child.trim_end_matches('#'));
        }
        (Some(base), Some(child)) => (base, child),
    };

    if child.starts_with('#') {
        return format!("{}{}", strip_fragment(base), child.trim_end_matches('#'));
    }

    if is_absolute_uri(child) {
        return child.trim_end_matches('#').to_string();
    }

    let base = strip_fragment(base);
    if child.starts_with('/')
        && let Some(end) = authority_end(base)
    {
        return format!("{}{}", &base[..end], child);
    }

    let child = child.trim_start_matches(['#', '/']);
    let dir = parent_directory(base);
    if dir.is_empty() || dir.ends_with('/') {
        format!("{dir}{child}")
    } else {
        format!("{dir}/{child}")
    }
}

fn or_root(scope: &str) -> String {
    if scope.is_empty() {
        "#".to_string()
    } else {
        scope.to_string()
    }
}

/// Check if a token carries a URI scheme (`http:`, `urn:`)
pub fn is_absolute_uri(token: &str) -> bool {
    let Some(colon) = token.find(':') else {
        return false;
    };
    let scheme = &token[..colon];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Split a scope into its document part and optional fragment
pub fn split_scope(scope: &str) -> (&str, Option<&str>) {
    match scope.find('#') {
        Some(index) => (&scope[..index], Some(&scope[index + 1..])),
        None => (scope, None),
    }
}

/// The document part of a scope
pub fn strip_fragment(scope: &str) -> &str {
    split_scope(scope).0
}

/// Table key for a named anchor inside the resource of `scope`
pub fn anchor_key(scope: &str, name: &str) -> String {
    format!("{}#{}", strip_fragment(scope), name)
}

/// Index just past `scheme://authority`, if the scope has one
fn authority_end(scope: &str) -> Option<usize> {
    let start = scope.find("://")? + 3;
    let rest = &scope[start..];
    Some(start + rest.find('/').unwrap_or(rest.len()))
}

/// Everything up to and including the last `/` of the path
fn parent_directory(scope: &str) -> &str {
    let start = authority_end(scope).unwrap_or(0);
    match scope[start..].rfind('/') {
        Some(index) => &scope[..start + index + 1],
        None => &scope[..start],
    }
}

/// Escape a single JSON pointer token
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Undo [`escape_token`]
pub fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Append a token to a `#`-prefixed pointer
pub fn join_pointer(pointer: &str, token: &str) -> String {
    format!("{}/{}", pointer, escape_token(token))
}

/// Unescaped tokens of a `#/a/b` or `/a/b` pointer
pub fn pointer_tokens(pointer: &str) -> Vec<String> {
    let pointer = pointer.strip_prefix('#').unwrap_or(pointer);
    if pointer.is_empty() || pointer == "/" {
        return Vec::new();
    }
    pointer
        .strip_prefix('/')
        .unwrap_or(pointer)
        .split('/')
        .map(unescape_token)
        .collect()
}

/// Percent-decode a URI fragment
pub fn decode_fragment(fragment: &str) -> String {
    percent_decode_str(fragment).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_scope_strips_trailing_hash() {
        assert_eq!(
            join_scope(Some("http://localhost.com/#"), None),
            "http://localhost.com/"
        );
    }

    #[test]
    fn test_join_scope_relative_folder() {
        assert_eq!(
            join_scope(Some("http://localhost.com/"), Some("folder")),
            "http://localhost.com/folder"
        );
    }

    #[test]
    fn test_join_scope_replaces_fragment() {
        assert_eq!(
            join_scope(Some("http://localhost.com/root#bar"), Some("#baz")),
            "http://localhost.com/root#baz"
        );
        assert_eq!(
            join_scope(
                Some("http://localhost.com/root#/definitions/foo"),
                Some("#/definitions/bar")
            ),
            "http://localhost.com/root#/definitions/bar"
        );
    }

    #[test]
    fn test_join_scope_absolute_child_wins() {
        assert_eq!(
            join_scope(Some("http://localhost.com/root/"), Some("http://example.com/")),
            "http://example.com/"
        );
    }

    #[test]
    fn test_join_scope_root_cases() {
        assert_eq!(join_scope(None, None), "#");
        assert_eq!(join_scope(Some("#"), Some("#/definitions/a")), "#/definitions/a");
        assert_eq!(join_scope(None, Some("tree.json#")), "tree.json");
        assert_eq!(join_scope(Some("#"), Some("#")), "#");
    }

    #[test]
    fn test_join_scope_absolute_path() {
        assert_eq!(
            join_scope(Some("http://localhost.com/a/b.json"), Some("/c.json")),
            "http://localhost.com/c.json"
        );
    }

    #[test]
    fn test_join_scope_replaces_last_segment() {
        assert_eq!(
            join_scope(Some("http://localhost:1234/nested/a.json"), Some("b.json")),
            "http://localhost:1234/nested/b.json"
        );
        assert_eq!(
            join_scope(Some("http://localhost:1234"), Some("b.json")),
            "http://localhost:1234/b.json"
        );
        assert_eq!(
            join_scope(Some("http://localhost:1234/a.json#/items"), Some("b.json")),
            "http://localhost:1234/b.json"
        );
    }

    #[test]
    fn test_is_absolute_uri() {
        assert!(is_absolute_uri("http://example.com"));
        assert!(is_absolute_uri("urn:uuid:deadbeef-1234-ffff-ffff-4321feebdaed"));
        assert!(!is_absolute_uri("folder/file.json"));
        assert!(!is_absolute_uri("#/definitions/a:b"));
    }

    #[test]
    fn test_pointer_helpers() {
        assert_eq!(join_pointer("#", "a/b"), "#/a~1b");
        assert_eq!(pointer_tokens("#/a~1b/0"), vec!["a/b", "0"]);
        assert!(pointer_tokens("#").is_empty());
        assert_eq!(decode_fragment("/definitions/foo%22bar"), "/definitions/foo\"bar");
        assert_eq!(anchor_key("http://x/y.json#/a", "node"), "http://x/y.json#node");
    }
}
