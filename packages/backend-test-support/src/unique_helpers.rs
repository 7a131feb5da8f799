//! Unique identifiers so concurrently running tests never share players.

use ulid::Ulid;

/// `{prefix}-{ulid}`
///
/// ```
/// use backend_test_support::unique_helpers::unique_str;
///
/// let a = unique_str("lobby");
/// assert_ne!(a, unique_str("lobby"));
/// assert!(a.starts_with("lobby-"));
/// ```
pub fn unique_str(prefix: &str) -> String {
    format!("{}-{}", prefix, Ulid::new())
}

/// A wallet-style player id: `0x{prefix}{ulid}` in lowercase.
///
/// ```
/// use backend_test_support::unique_helpers::unique_player;
///
/// let p = unique_player("alice");
/// assert!(p.starts_with("0xalice"));
/// assert_ne!(p, unique_player("alice"));
/// ```
pub fn unique_player(prefix: &str) -> String {
    format!("0x{}{}", prefix, Ulid::new().to_string().to_lowercase())
}
