//! LDAP string utilities
//!
//! RFC 4515 filter-value escaping and DN helpers. Caller-supplied principal
//! values are escaped before they are interpolated into a search filter, so
//! hostile or malformed input fails to match instead of producing a
//! protocol error.

/// Escapes a string for safe use in an LDAP search filter (RFC 4515).
///
/// The following characters are escaped:
/// - `*` (asterisk) -> `\2a`
/// - `(` (left parenthesis) -> `\28`
/// - `)` (right parenthesis) -> `\29`
/// - `\` (backslash) -> `\5c`
/// - `\0` (NUL) -> `\00`
pub fn escape_ldap_filter(input: &str) -> String {
    input.chars().fold(String::new(), |mut acc, c| {
        match c {
            '*' => acc.push_str("\\2a"),
            '(' => acc.push_str("\\28"),
            ')' => acc.push_str("\\29"),
            '\\' => acc.push_str("\\5c"),
            '\0' => acc.push_str("\\00"),
            _ => acc.push(c),
        }
        acc
    })
}

/// Returns the leftmost relative distinguished name of `dn`, i.e. the full
/// DN minus its parent suffix (`"CN=John Smith"` for
/// `"CN=John Smith,OU=Staff,DC=corp,DC=example"`).
///
/// Commas escaped with a backslash are part of the RDN value and do not
/// terminate it.
pub fn leaf_rdn(dn: &str) -> Option<&str> {
    let bytes = dn.as_bytes();
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' => escaped = true,
            b',' => return non_empty(dn[..i].trim()),
            _ => {}
        }
    }
    non_empty(dn.trim())
}

fn non_empty(s: &str) -> Option<&str> {
    if s.contains('=') {
        Some(s)
    } else {
        None
    }
}
