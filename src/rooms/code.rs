//! Human-typeable room codes

use rand::seq::SliceRandom;

/// Uppercase letters and digits without the look-alikes 0/O and 1/I
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const DEFAULT_ROOM_CODE_LEN: usize = 6;

/// Draw a random code of `len` characters from [`ROOM_CODE_ALPHABET`]
pub fn generate_room_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .filter_map(|_| ROOM_CODE_ALPHABET.choose(&mut rng))
        .map(|&b| b as char)
        .collect()
}

/// Room ids are case-insensitive; the canonical form is trimmed uppercase
pub fn normalize_room_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

pub fn is_in_alphabet(code: &str) -> bool {
    code.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b))
}
