use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Display character ROM, in code order. Code 0 is the blank cell.
pub const CHARSET: &str = " abcdefghijklmnopqrstuvwxyz0123456789!?.,:;'\"()[]<>=+-*/_|";

static CHAR_TO_CODE: Lazy<HashMap<char, u16>> = Lazy::new(|| {
    CHARSET
        .chars()
        .enumerate()
        .map(|(code, c)| (c, code as u16))
        .collect()
});

/// Character code for constant folding and string data. Letters are folded
/// to lowercase; characters outside the ROM have no code.
pub fn char_to_code(c: char) -> Option<u16> {
    let c = c.to_ascii_lowercase();
    CHAR_TO_CODE.get(&c).copied()
}

pub fn code_to_char(code: u16) -> Option<char> {
    CHARSET.chars().nth(code as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_is_zero() {
        assert_eq!(char_to_code(' '), Some(0));
    }

    #[test]
    fn letters_fold_case() {
        assert_eq!(char_to_code('a'), Some(1));
        assert_eq!(char_to_code('A'), Some(1));
        assert_eq!(char_to_code('z'), Some(26));
    }

    #[test]
    fn round_trip() {
        for (code, c) in CHARSET.chars().enumerate() {
            assert_eq!(char_to_code(c), Some(code as u16));
            assert_eq!(code_to_char(code as u16), Some(c));
        }
        assert_eq!(char_to_code('~'), None);
        assert_eq!(code_to_char(1000), None);
    }
}
