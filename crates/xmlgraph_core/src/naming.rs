//! Name derivation rules.
//!
//! Member names for accessors, setter candidates for accessors, and the
//! reversible mapping between Rust type paths and XML-safe type names.

/// Derive the XML member name from an accessor name.
///
/// `get_radius`/`getRadius` become `radius`. For boolean accessors,
/// `is_visible`/`isVisible` become `visible`. Anything else is kept as is.
pub fn member_name_from_accessor(accessor: &str, returns_bool: bool) -> String {
    if let Some(name) = strip_accessor_prefix(accessor, "get") {
        return name;
    }
    if returns_bool {
        if let Some(name) = strip_accessor_prefix(accessor, "is") {
            return name;
        }
    }
    accessor.to_string()
}

fn strip_accessor_prefix(accessor: &str, prefix: &str) -> Option<String> {
    let rest = accessor.strip_prefix(prefix)?;
    if let Some(snake) = rest.strip_prefix('_') {
        return (!snake.is_empty()).then(|| snake.to_string());
    }
    rest.chars()
        .next()
        .filter(char::is_ascii_uppercase)
        .map(|_| uncapitalize(rest))
}

/// Setter names searched for an accessor member, in order.
///
/// `set_<name>` first, then `set<Name>`, then the bare name.
pub fn setter_candidates(member_name: &str) -> Vec<String> {
    vec![
        format!("set_{member_name}"),
        format!("set{}", capitalize(member_name)),
        member_name.to_string(),
    ]
}

/// Upper-case the first character.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lower-case the first character.
pub fn uncapitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Map a Rust type path to an XML-safe type name (`a::b::C` to `a-b-C`).
///
/// Returns `None` when the path is not a plain sequence of identifiers
/// (generic arguments, references, tuples, closures, trait objects): such
/// types have no deterministic name and need an explicit registration.
pub fn escape_type_path(path: &str) -> Option<String> {
    let mut segments = Vec::new();
    for segment in path.split("::") {
        if !is_identifier(segment) {
            return None;
        }
        segments.push(segment);
    }
    Some(segments.join("-"))
}

/// Inverse of [`escape_type_path`].
pub fn unescape_type_name(name: &str) -> String {
    name.replace('-', "::")
}

/// Whether `name` may be registered as an explicit type name.
///
/// Registered names are non-empty and made of ASCII letters, digits and
/// underscores.
pub fn is_valid_type_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
