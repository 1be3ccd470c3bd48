/// Checks whether all bytes in the given slice may appear in a container id or name.
///
/// Allowed are ASCII digits, ASCII letters and the separators `_`, `.` and `-`.
/// Everything else, including `/`, `?` and non-ASCII bytes, is rejected as the
/// id ends up in runtime API request paths.
///
/// # Arguments
///
/// * `src` - A byte slice to check.
///
/// # Returns
///
/// `true` if every byte is allowed, otherwise `false`.
pub(super) fn is_container_id_charset(src: &[u8]) -> bool {
    src.iter()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'))
}

/// Returns the value of the first `KEY=VALUE` entry whose key is exactly `key`.
pub(super) fn find_env<'a>(env: &'a [String], key: &str) -> Option<&'a str> {
    env.iter().find_map(|entry| entry.strip_prefix(key)?.strip_prefix('='))
}
