//! Artist name utilities
//!
//! Fingerprint services often report credits like "A/B/C" or "A & B feat. C".
//! Similarity lookups work much better with only the primary artist, so these
//! helpers reduce a credit string to its first artist before it is sent out.

use log::debug;

/// Separators between co-credited artists, in the order they are applied
pub static PRIMARY_ARTIST_SEPARATORS: &[&str] = &["/", "&", ",", ";"];

/// Tokens that introduce a featured artist (matched case-insensitively)
pub static FEATURING_TOKENS: &[&str] = &[" feat. ", " feat ", " ft. ", " ft ", " featuring "];

/// Reduce an artist credit to the primary artist
///
/// # Arguments
/// * `artist_name` - The artist credit as reported by the fingerprint service
///
/// # Returns
/// * `String` - The primary artist, trimmed
///
/// # Examples
/// ```
/// use trackscout::helpers::artistsplitter::primary_artist;
///
/// assert_eq!(primary_artist("Calvin Harris feat. Rihanna"), "Calvin Harris");
/// assert_eq!(primary_artist("A & B / C"), "A");
/// ```
pub fn primary_artist(artist_name: &str) -> String {
    let mut result = artist_name.trim().to_string();

    for separator in PRIMARY_ARTIST_SEPARATORS {
        if let Some(pos) = result.find(separator) {
            result = result[..pos].trim().to_string();
        }
    }

    for token in FEATURING_TOKENS {
        if let Some(pos) = find_case_insensitive(&result, token) {
            result = result[..pos].trim().to_string();
        }
    }

    if result != artist_name {
        debug!("Reduced artist credit '{}' to '{}'", artist_name, result);
    }
    result
}

/// Byte offset of the first case-insensitive occurrence of an ASCII `needle`
fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}
