//! Pure text and numeric cleaning primitives shared by the record setters and
//! the field mapper.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{NormalizeError, Result};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[+-]?[0-9]*[.]?[0-9]+").unwrap());
static FIRST_INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+").unwrap());

/// Compile a vocabulary of case-insensitive removal patterns.
pub fn compile_patterns(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){}", p)).unwrap())
        .collect()
}

/// Remove every pattern in order, trimming between removals.
///
/// Patterns are applied sequentially, not as one alternation, so a later
/// pattern can depend on an earlier pattern's removal.
pub fn strip_patterns(value: &str, patterns: &[Regex]) -> String {
    let mut out = value.trim().to_string();
    for pattern in patterns {
        out = pattern.replace_all(&out, "").trim().to_string();
    }
    out
}

/// Replace the European decimal comma with a period.
pub fn normalize_decimal_separator(value: &str) -> String {
    value.replace(',', ".")
}

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn normalize_whitespace(value: &str) -> String {
    WHITESPACE_RUN.replace_all(value.trim(), " ").into_owned()
}

/// First decimal-looking substring in arbitrary surrounding text.
pub fn extract_leading_number(value: &str) -> Result<&str> {
    LEADING_NUMBER
        .find(value)
        .map(|m| m.as_str())
        .ok_or_else(|| NormalizeError::Parse(format!("no numeric value in {:?}", value)))
}

/// First signed integer substring.
pub fn extract_first_integer(value: &str) -> Result<&str> {
    FIRST_INTEGER
        .find(value)
        .map(|m| m.as_str())
        .ok_or_else(|| NormalizeError::Parse(format!("no integer value in {:?}", value)))
}

/// Every digit in the text, concatenated. Promotional texts spread a number
/// over whitespace and markup ("скидка 1 5 0 0 0 0").
pub fn extract_all_digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Word-initial uppercase, the rest lowered. A word starts after any
/// non-alphabetic character.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut word_start = true;
    for c in value.chars() {
        if c.is_alphabetic() {
            if word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            word_start = false;
        } else {
            out.push(c);
            word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_separator_replaces_commas_only() {
        assert_eq!(normalize_decimal_separator("54,3"), "54.3");
        assert_eq!(normalize_decimal_separator("1,5 млн"), "1.5 млн");
        assert_eq!(normalize_decimal_separator("no commas"), "no commas");
    }

    #[test]
    fn test_whitespace_collapse() {
        assert_eq!(normalize_whitespace("  общая \t площадь\n54  "), "общая площадь 54");
    }

    #[test]
    fn test_leading_number_in_surrounding_text() {
        assert_eq!(extract_leading_number("общая площадь 54.3 м²").unwrap(), "54.3");
        assert_eq!(extract_leading_number("-1.5").unwrap(), "-1.5");
        assert!(extract_leading_number("нет числа").is_err());
    }

    #[test]
    fn test_first_integer_is_signed() {
        assert_eq!(extract_first_integer("этаж -2 из 12").unwrap(), "-2");
        assert!(extract_first_integer("цоколь").is_err());
    }

    #[test]
    fn test_all_digits_concatenated() {
        assert_eq!(extract_all_digits("скидка 1 5 0 0 0 0"), "150000");
        assert_eq!(extract_all_digits("без цифр"), "");
    }

    #[test]
    fn test_strip_patterns_is_ordered_and_case_insensitive() {
        let patterns = compile_patterns(&[r"руб\.", "руб"]);
        assert_eq!(strip_patterns(" 100 РУБ. ", &patterns), "100");

        // the second pattern only matches once the first removed its prefix
        let ordered = compile_patterns(&["цена базовая", "цена"]);
        assert_eq!(strip_patterns("цена базовая: 5", &ordered), ": 5");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("жк лесной квартал"), "Жк Лесной Квартал");
        assert_eq!(title_case("дом-2"), "Дом-2");
    }
}
