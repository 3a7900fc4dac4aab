//! Text syntax for bitfield variables.
//!
//! A bitfield value is written as an optional number followed by letters, each
//! letter naming one bit, and an optional trailing operator:
//!
//! | Text      | Meaning                                        |
//! |-----------|------------------------------------------------|
//! | `12`      | the literal value 12                           |
//! | `^3`      | a single bit mask, `1 << 3`                    |
//! | `ab`      | bits named `a` and `b`                         |
//! | `2c`      | the literal 2 plus bit `c`                     |
//! | `ab+`     | current value OR the mask                      |
//! | `ab-`     | current value AND NOT the mask                 |
//! | `ab^`     | current value XOR the mask                     |
//!
//! Lowercase letters map to bits 6 through 31 and uppercase letters to bits 38
//! through 63. The low six bits and bits 32..37 have no letter.

use super::convar::leading_int;

/// First bit named by a lowercase letter.
const LOWER_BASE: u32 = 6;
/// First bit named by an uppercase letter.
const UPPER_BASE: u32 = 38;

/// Mask of the bits that have no letter and print as a number.
const NUMERIC_BITS: i64 = (1 << LOWER_BASE) - 1;

/// Letter table indexed by bit number.
const BIT_LETTERS: [Option<u8>; 64] = {
    let mut table = [None; 64];
    let mut i = 0;
    while i < 26 {
        table[LOWER_BASE as usize + i] = Some(b'a' + i as u8);
        table[UPPER_BASE as usize + i] = Some(b'A' + i as u8);
        i += 1;
    }
    table
};

/// Bit mask named by a letter, or `None` for anything that is not an ASCII letter.
pub fn letter_bit(c: u8) -> Option<i64> {
    let bit = match c {
        b'a'..=b'z' => LOWER_BASE + u32::from(c - b'a'),
        b'A'..=b'Z' => UPPER_BASE + u32::from(c - b'A'),
        _ => return None,
    };
    Some(1i64.wrapping_shl(bit))
}

/// Letter naming `bit`, if it has one.
pub fn bit_letter(bit: u32) -> Option<char> {
    BIT_LETTERS.get(bit as usize).copied().flatten().map(char::from)
}

/// Parse bitfield text, combining with `current` when the text ends in an operator.
///
/// Unparseable input yields 0, like the plain integer parser.
///
/// # Examples
///
/// ```
/// use bevy_cvar_console::core::parse_bitfield;
///
/// assert_eq!(parse_bitfield("^2", 0), 4);
/// assert_eq!(parse_bitfield("a", 0), 1 << 6);
/// assert_eq!(parse_bitfield("1a+", 2), 3 | 1 << 6);
/// assert_eq!(parse_bitfield("^1-", 3), 1);
/// ```
pub fn parse_bitfield(text: &str, current: i64) -> i64 {
    let (mut value, rest) = match text.strip_prefix('^') {
        Some(shift) => {
            let (n, rest) = leading_int(shift);
            let mask = if (0..64).contains(&n) { 1i64 << n } else { 0 };
            (mask, rest)
        }
        None => leading_int(text),
    };

    let bytes = rest.as_bytes();
    let mut pos = 0;
    while let Some(bit) = bytes.get(pos).and_then(|&c| letter_bit(c)) {
        value |= bit;
        pos += 1;
    }

    match bytes.get(pos) {
        Some(b'+') => current | value,
        Some(b'-') => current & !value,
        Some(b'^') => current ^ value,
        _ => value,
    }
}

/// Describe a bitfield value as its numeric low bits followed by its letters.
///
/// Returns an empty string for 0.
///
/// # Examples
///
/// ```
/// use bevy_cvar_console::core::describe_bitfield;
///
/// assert_eq!(describe_bitfield(1 << 6 | 1 << 7), "ab");
/// assert_eq!(describe_bitfield(3 | 1 << 38), "3A");
/// ```
pub fn describe_bitfield(value: i64) -> String {
    let mut out = String::new();
    let numeric = value & NUMERIC_BITS;
    if numeric != 0 {
        out.push_str(&numeric.to_string());
    }
    for bit in 0..64u32 {
        if value & (1i64 << bit) != 0 {
            if let Some(letter) = bit_letter(bit) {
                out.push(letter);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_offsets() {
        assert_eq!(letter_bit(b'a'), Some(1 << 6));
        assert_eq!(letter_bit(b'z'), Some(1 << 31));
        assert_eq!(letter_bit(b'A'), Some(1 << 38));
        assert_eq!(letter_bit(b'Z'), Some(i64::MIN));
        assert_eq!(letter_bit(b'1'), None);

        assert_eq!(bit_letter(6), Some('a'));
        assert_eq!(bit_letter(63), Some('Z'));
        assert_eq!(bit_letter(0), None);
        assert_eq!(bit_letter(35), None);
        assert_eq!(bit_letter(64), None);
    }

    #[test]
    fn test_parse_plain_numbers() {
        assert_eq!(parse_bitfield("12", 99), 12);
        assert_eq!(parse_bitfield("-1", 0), -1);
        assert_eq!(parse_bitfield("", 5), 0);
        assert_eq!(parse_bitfield("?!", 5), 0);
    }

    #[test]
    fn test_parse_single_bit() {
        assert_eq!(parse_bitfield("^0", 0), 1);
        assert_eq!(parse_bitfield("^10", 0), 1024);
        assert_eq!(parse_bitfield("^64", 0), 0);
    }

    #[test]
    fn test_parse_letters() {
        assert_eq!(parse_bitfield("ab", 0), (1 << 6) | (1 << 7));
        assert_eq!(parse_bitfield("5B", 0), 5 | (1 << 39));
    }

    #[test]
    fn test_parse_operators() {
        let current = 0b1010;
        assert_eq!(parse_bitfield("1+", current), 0b1011);
        assert_eq!(parse_bitfield("2-", current), 0b1000);
        assert_eq!(parse_bitfield("^3^", current), 0b0010);
        // Operator applies even when the mask came from letters only
        assert_eq!(parse_bitfield("a+", 1), 1 | (1 << 6));
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe_bitfield(0), "");
        assert_eq!(describe_bitfield(5), "5");
        assert_eq!(describe_bitfield((1 << 6) | (1 << 31)), "az");
        // Bits without letters above the numeric range are not shown
        assert_eq!(describe_bitfield(1 << 33), "");
    }

    #[test]
    fn test_describe_then_parse() {
        let value = 3 | (1 << 8) | (1 << 40);
        assert_eq!(parse_bitfield(&describe_bitfield(value), 0), value);
    }
}
