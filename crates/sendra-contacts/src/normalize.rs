// SPDX-FileCopyrightText: 2026 Sendra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Canonical form of a phone number: digits only.
///
/// `+55 (11) 99999-0000`, `5511999990000`, and `55 11 99999 0000` all
/// normalize to the same key, which is what the contacts table is unique on.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::normalize_phone;

    #[test]
    fn strips_formatting_characters() {
        assert_eq!(normalize_phone("+55 (11) 99999-0000"), "5511999990000");
        assert_eq!(normalize_phone("55.11.99999.0000"), "5511999990000");
        assert_eq!(normalize_phone("5511999990000"), "5511999990000");
    }

    #[test]
    fn non_digits_only_normalizes_to_empty() {
        assert_eq!(normalize_phone("n/a"), "");
        assert_eq!(normalize_phone(""), "");
    }
}
