//! Open-redirect protection.

/// Whether a redirect target stays on this site: it must start with `/` but
/// not with `//` or `/\`.
pub fn is_local_url(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.starts_with("/\\")
}

/// The target if it is local, else `/`.
pub fn local_or_root(target: Option<&str>) -> String {
    match target {
        Some(t) if is_local_url(t) => t.to_string(),
        _ => "/".to_string(),
    }
}
