//! Scalar resolution and quoting rules shared by the emitter and the editor.

/// Type a plain scalar resolves to under the YAML 1.2 core schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
}

impl ScalarKind {
    pub fn of(plain: &str) -> Self {
        if is_null(plain) {
            ScalarKind::Null
        } else if is_bool(plain) {
            ScalarKind::Bool
        } else if is_int(plain) {
            ScalarKind::Int
        } else if is_float(plain) {
            ScalarKind::Float
        } else {
            ScalarKind::Str
        }
    }
}

fn is_null(s: &str) -> bool {
    matches!(s, "" | "~" | "null" | "Null" | "NULL")
}

fn is_bool(s: &str) -> bool {
    matches!(
        s,
        "true" | "True" | "TRUE" | "false" | "False" | "FALSE"
    )
}

fn is_int(s: &str) -> bool {
    if let Some(octal) = s.strip_prefix("0o") {
        return !octal.is_empty() && octal.bytes().all(|b| (b'0'..=b'7').contains(&b));
    }
    if let Some(hex) = s.strip_prefix("0x") {
        return !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit());
    }
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_float(s: &str) -> bool {
    let unsigned = s.strip_prefix(['-', '+']).unwrap_or(s);
    if matches!(
        unsigned,
        ".inf" | ".Inf" | ".INF" | ".nan" | ".NaN" | ".NAN"
    ) {
        return true;
    }
    let numeric_chars = unsigned
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'-' | b'+'));
    numeric_chars
        && unsigned.bytes().any(|b| b.is_ascii_digit())
        && !unsigned.starts_with(['e', 'E'])
        && s.parse::<f64>().is_ok()
}

/// Whether `value` can be written as a plain scalar in flow context (and
/// therefore anywhere) and read back as the same string.
pub fn is_plain_safe(value: &str) -> bool {
    plain_allowed(value, true)
}

/// Block context also accepts flow indicators after the first character.
pub fn is_plain_safe_in_block(value: &str) -> bool {
    plain_allowed(value, false)
}

fn plain_allowed(value: &str, flow: bool) -> bool {
    let Some(first) = value.chars().next() else {
        return false;
    };
    if value.trim() != value {
        return false;
    }
    if matches!(
        first,
        '[' | ']' | '{' | '}' | ',' | '#' | '&' | '*' | '!' | '|' | '>' | '\'' | '"' | '%' | '@' | '`'
    ) {
        return false;
    }
    if matches!(first, '-' | '?' | ':') {
        let second = value.chars().nth(1);
        if second.map_or(true, char::is_whitespace) {
            return false;
        }
    }
    if value.starts_with("---") || value.starts_with("...") {
        return false;
    }
    if value.ends_with(':') || value.contains(": ") || value.contains(" #") {
        return false;
    }
    !value
        .chars()
        .any(|c| c.is_control() || (flow && matches!(c, ',' | '[' | ']' | '{' | '}')))
}

pub fn quote_double(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub fn quote_single(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
