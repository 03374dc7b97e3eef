use regex::Regex;
use std::sync::LazyLock;

/// URL-safe character set for generated short codes.
const ALPHABET_CHARS: &[char] = &[
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M',
    'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm',
    'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
    '-', '_',
];

/// Longest code the resolver will look up.
pub const MAX_CODE_LENGTH: usize = 32;

static CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^[A-Za-z0-9_-]{{1,{}}}$", MAX_CODE_LENGTH))
        .expect("short code pattern is valid")
});

/// Generate a random short code of `length` characters.
pub fn generate(length: usize) -> String {
    nanoid::nanoid!(length, ALPHABET_CHARS)
}

/// Whether `code` could have been issued by this service.
pub fn is_well_formed(code: &str) -> bool {
    CODE_PATTERN.is_match(code)
}
