/// Splits a `name@version` package reference.
///
/// The split happens at the last `@`, because package names may contain
/// `@` themselves. A reference without `@`, or ending in a bare `@`, has no
/// version: the empty string is returned rather than "latest".
pub fn parse_versioned_name(versioned_name: &str) -> (&str, &str) {
    match versioned_name.rfind('@') {
        Some(i) if i + 1 < versioned_name.len() => (&versioned_name[..i], &versioned_name[i + 1..]),
        _ => (versioned_name, ""),
    }
}

pub fn join_name_version(name: &str, version: &str) -> String {
    if version.is_empty() {
        name.to_string()
    } else {
        format!("{}@{}", name, version)
    }
}
