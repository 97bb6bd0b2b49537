//! Pure per-field grammars: text in, typed value or error out.
//!
//! Every function here is side-effect free so each field's parsing rule can be
//! tested without a record in a particular partial state. The setters in
//! [`record`](super::record) are the thin mutation step on top.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use crate::clean;
use crate::error::{NormalizeError, Result};
use crate::mapper::RawValue;

use super::{ObjectKind, ObjectType, Rooms, TriFlag};

/// Currency and price-label vocabulary removed before a price is parsed.
/// Order matters: longer labels first, then their prefixes, then single
/// letters and whitespace variants.
static PRICE_NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    clean::compile_patterns(&[
        // the first "cтоимость" carries a Latin look-alike "c" seen in the wild
        "cтоимость",
        "стоимость",
        "рублей",
        "цена базовая",
        r"руб\.",
        "руб",
        "цена",
        "выгода до",
        "выгода",
        r"млн\.",
        "млн",
        "от",
        "₽",
        r"р\.",
        "р",
        "\u{a0}",
        "\u{202f}",
        ":",
        "’",
        "p",
        r"\s",
    ])
});

static UNSIGNED_INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

const PRICE_MIN: u64 = 10_000;
const PRICE_MAX: u64 = 100_000_000_000;

/// Classify free text into a canonical object type by Russian keyword
/// containment, first match wins. Unmatched text is kept raw and rejected at
/// finalization.
pub fn parse_object_type(value: &str) -> ObjectKind {
    let value = value.to_lowercase();
    let known = if value.contains("квартира") {
        ObjectType::Flat
    } else if value.contains("апаратамен") || value.contains("апартамент") {
        ObjectType::Apartment
    } else if value.contains("кладов") {
        ObjectType::Storeroom
    } else if value.contains("нежилое помещение")
        || value.contains("коммерческое")
        || value.contains("офис")
    {
        ObjectType::Commercial
    } else if value.contains("машиноместо")
        || value.contains("гараж")
        || value.contains("парк")
        || value.contains("место для мотоцикла")
    {
        ObjectType::Parking
    } else if value.contains("таунхаус") {
        ObjectType::Townhouse
    } else {
        // canonical names pass straight through; anything else stays raw
        return match ObjectType::from_name(&value) {
            Some(t) => ObjectKind::Known(t),
            None => ObjectKind::Raw(value),
        };
    };
    ObjectKind::Known(known)
}

/// Result of parsing a room-count text: the value plus the layout signals the
/// vocabulary carries along.
#[derive(Debug, PartialEq, Eq)]
pub struct RoomsParse {
    pub rooms: Rooms,
    /// The text mentioned a European-style layout.
    pub euro: bool,
    /// The text reclassifies the unit as an apartment.
    pub apartment: bool,
}

/// Parse the three families of Russian room-count vocabulary: spelled-out
/// ordinals, studio markers, and digit-bearing text.
pub fn parse_rooms(value: &str) -> Result<RoomsParse> {
    let value = value.to_lowercase();
    let value = value.replace("комнаты", "").replace("комната", "");
    let value = value.trim();

    let mut euro = value.contains("евро");
    let apartment = value.contains("апартамент");

    let spelled: &[(&[&str], u32)] = &[
        (&["одно", "1-а"], 1),
        (&["двух", "2-х", "двушка"], 2),
        (&["трех", "трёх", "3-х", "трешка", "трёшка"], 3),
        (&["четырех", "четырёх", "4-х"], 4),
        (&["пяти"], 5),
        (&["шести"], 6),
        (&["семи"], 7),
    ];

    let mut rooms = None;
    for (words, count) in spelled {
        if words.iter().any(|w| value.contains(w)) {
            rooms = Some(Rooms::Count(*count));
            break;
        }
    }

    let rooms = match rooms {
        Some(r) => r,
        None if is_studio_marker(value) => Rooms::Studio,
        None => {
            // short tokens like "2е"/"2e" mark a euro layout next to the digit
            if (value.contains('e') || value.contains('е')) && value.chars().count() < 4 {
                euro = true;
            }
            let digits = UNSIGNED_INTEGER.find(value).ok_or_else(|| {
                NormalizeError::Parse(format!("unreadable rooms value {:?}", value))
            })?;
            let count: u32 = digits
                .as_str()
                .parse()
                .map_err(|_| NormalizeError::Parse(format!("rooms out of range {:?}", value)))?;
            Rooms::Count(count)
        }
    };

    let rooms = match rooms {
        Rooms::Count(0) => Rooms::Studio,
        other => other,
    };

    Ok(RoomsParse { rooms, euro, apartment })
}

fn is_studio_marker(value: &str) -> bool {
    // "cтуд" covers the Latin-с misspelling of "студ"
    value.contains("студ")
        || value.contains("cтуд")
        || value.contains("studio")
        || matches!(value, "с" | "c" | "s" | "ст")
}

/// Floor text: basement marker, "5 из 12" and "5/12" forms, then the first
/// signed integer.
pub fn parse_floor(value: &str) -> Result<i32> {
    if value.contains("цоколь") {
        return Ok(-1);
    }
    let value = match value.split_once("из") {
        Some((before, _)) => before,
        None => value,
    };
    let value = match value.split_once('/') {
        Some((before, _)) => before,
        None => value,
    };
    clean::extract_first_integer(value)?
        .parse()
        .map_err(|_| NormalizeError::Parse(format!("floor out of range {:?}", value)))
}

/// Decode a price field to whole rubles, or to absence when the source says
/// "price on request" or "sold". Absence is never coerced to zero.
pub fn decode_price(value: &RawValue, multi: Decimal) -> Result<Option<Decimal>> {
    let Some(text) = value.text() else {
        return Ok(None);
    };

    let cleaned = match value {
        RawValue::Text(_) | RawValue::Html(_) => {
            let lower = text.to_lowercase();
            if lower.contains("запрос") || lower.contains("прода") {
                return Ok(None);
            }
            clean::strip_patterns(&clean::normalize_decimal_separator(&text), &PRICE_NOISE)
        }
        _ => text.clone(),
    };
    if cleaned.is_empty() {
        return Ok(None);
    }

    let price: Decimal = cleaned
        .parse()
        .map_err(|_| NormalizeError::Parse(format!("unreadable price {:?}", text)))?;
    let price = (price * multi).round_dp(0);
    check_price_value(price)?;
    Ok(Some(price))
}

/// Plausibility bounds for a decoded price: nonzero values below 10 000 or
/// above 100 billion rubles betray a unit or parsing mistake upstream.
pub fn check_price_value(price: Decimal) -> Result<()> {
    if price < Decimal::ZERO
        || (price > Decimal::ZERO && price < Decimal::from(PRICE_MIN))
        || price > Decimal::from(PRICE_MAX)
    {
        return Err(NormalizeError::Validation(format!(
            "implausible price value {}",
            price
        )));
    }
    Ok(())
}

/// An area-like value: first decimal-looking substring of the text, comma
/// separator tolerated.
pub fn parse_area(value: &RawValue) -> Result<Decimal> {
    let Some(text) = value.text() else {
        return Err(NormalizeError::Parse("empty area value".to_string()));
    };
    let text = clean::normalize_decimal_separator(&text);
    let number = match value {
        RawValue::Text(_) | RawValue::Html(_) => clean::extract_leading_number(&text)?,
        _ => text.as_str(),
    };
    number
        .parse()
        .map_err(|_| NormalizeError::Parse(format!("unreadable area {:?}", text)))
}

/// Result of interpreting a sale-status value: the tri-state flag plus the
/// human-readable status some phrases carry.
#[derive(Debug, PartialEq, Eq)]
pub struct InSaleParse {
    pub in_sale: Option<bool>,
    pub status: Option<&'static str>,
}

/// Interpret a sale-status value: the tri-state directly, or one of the known
/// Russian status phrases. Anything else is contradictory input.
pub fn parse_in_sale(value: &RawValue) -> Result<InSaleParse> {
    let (in_sale, status) = match value {
        RawValue::Text(_) | RawValue::Html(_) => {
            let text = value.text().unwrap_or_default().to_lowercase();
            if text.contains("брон") {
                (Some(true), Some("Забронирована"))
            } else if text.contains("зарезерв") {
                (Some(true), Some("Зарезервирована"))
            } else if text.contains("вторичная продажа") {
                (Some(true), Some("Вторичная продажа"))
            } else if text.contains("свобод") || text.contains("в продаже") {
                (Some(true), None)
            } else if text.contains("продан") {
                (Some(false), None)
            } else {
                return Err(NormalizeError::Validation(format!(
                    "unrecognized in_sale value {:?}",
                    text
                )));
            }
        }
        RawValue::Number(n) => match n.as_i64() {
            Some(0) => (Some(false), None),
            Some(1) => (Some(true), None),
            _ => {
                return Err(NormalizeError::Validation(format!(
                    "unrecognized in_sale value {}",
                    n
                )))
            }
        },
        RawValue::Bool(b) => (Some(*b), None),
        RawValue::Null => (None, None),
    };
    Ok(InSaleParse { in_sale, status })
}

/// The finished/furniture tri-state: 0, 1, null, or the literal "optional".
pub fn parse_tri_flag(value: &RawValue) -> Result<TriFlag> {
    match value {
        RawValue::Null => Ok(TriFlag::No),
        RawValue::Bool(false) => Ok(TriFlag::No),
        RawValue::Bool(true) => Ok(TriFlag::Yes),
        RawValue::Number(n) => match n.as_i64() {
            Some(0) => Ok(TriFlag::No),
            Some(1) => Ok(TriFlag::Yes),
            _ => Err(NormalizeError::Validation(format!(
                "unrecognized flag value {}",
                n
            ))),
        },
        RawValue::Text(s) if s == "optional" => Ok(TriFlag::Optional),
        other => Err(NormalizeError::Validation(format!(
            "unrecognized flag value {:?}",
            other
        ))),
    }
}

/// A strict 0/1 flag (euro-planning).
pub fn parse_int_flag(value: &RawValue) -> Result<bool> {
    let parsed = match value {
        RawValue::Bool(b) => i64::from(*b),
        RawValue::Number(n) => n.as_i64().ok_or_else(|| {
            NormalizeError::Parse(format!("unreadable flag value {}", n))
        })?,
        RawValue::Text(s) => s.trim().parse().map_err(|_| {
            NormalizeError::Parse(format!("unreadable flag value {:?}", s))
        })?,
        other => {
            return Err(NormalizeError::Parse(format!(
                "unreadable flag value {:?}",
                other
            )))
        }
    };
    match parsed {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(NormalizeError::Validation(format!(
            "flag value out of range: {}",
            other
        ))),
    }
}
