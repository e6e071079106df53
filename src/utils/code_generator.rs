//! Short code generation and custom alias validation.

use rand::Rng;

/// The 62-symbol alphanumeric alphabet short codes are drawn from.
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Codes reserved for system endpoints; rejected as custom aliases.
const RESERVED_WORDS: &[&str] = &[
    "api", "admin", "auth", "links", "stats", "search", "shorten",
];

/// Minimum custom alias length.
const ALIAS_MIN_LEN: usize = 3;
/// Maximum custom alias length.
const ALIAS_MAX_LEN: usize = 20;

/// Generates a random short code of the given length.
///
/// Codes are drawn uniformly from the alphanumeric alphabet; at the default
/// length of 6 that is 62^6 ≈ 56.8 billion combinations. Uniqueness is not
/// guaranteed here - the caller checks the store and regenerates on
/// collision, and the store's unique constraint settles any remaining race.
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Validates a user-provided custom alias.
///
/// # Rules
///
/// - Length: 3-20 characters
/// - Allowed characters: letters, digits, underscores, hyphens
/// - Not a reserved system word (case-insensitive)
///
/// # Examples
///
/// ```
/// use snaplink::utils::code_generator::validate_alias;
///
/// assert!(validate_alias("my-link_2024"));
/// assert!(!validate_alias("ab"));           // too short
/// assert!(!validate_alias("Admin"));        // reserved
/// assert!(!validate_alias("my link"));      // whitespace
/// ```
pub fn validate_alias(alias: &str) -> bool {
    if alias.len() < ALIAS_MIN_LEN || alias.len() > ALIAS_MAX_LEN {
        return false;
    }

    if !alias
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return false;
    }

    !RESERVED_WORDS
        .iter()
        .any(|reserved| alias.eq_ignore_ascii_case(reserved))
}
