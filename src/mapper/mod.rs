//! Ordered-rule field mapper: routes arbitrary source vocabularies onto the
//! canonical record's setters.
//!
//! The rule table is a flat ordered list and the first matching rule wins, so
//! specific rules must precede general ones: the skip rule for "цена за
//! кв.м" sits above the generic "цена" rule on purpose. Replacing the list
//! with an unordered map would silently break that.

mod raw;

pub use raw::RawValue;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;
use url::Url;

use crate::clean;
use crate::domain::EstateRecord;
use crate::error::{NormalizeError, Result};

/// Canonical setters a mapping rule can route a source field to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSetter {
    InSale,
    Rooms,
    Area,
    PriceBase,
    Building,
    Number,
    Section,
    LivingArea,
    Ceil,
    Floor,
    FinishingName,
    Plan,
    Level,
    Balcony,
    Terrace,
    View,
    Article,
    DiscountPercent,
    Sale,
}

impl FieldSetter {
    pub fn name(&self) -> &'static str {
        match self {
            FieldSetter::InSale => "set_in_sale",
            FieldSetter::Rooms => "set_rooms",
            FieldSetter::Area => "set_area",
            FieldSetter::PriceBase => "set_price_base",
            FieldSetter::Building => "set_building",
            FieldSetter::Number => "set_number",
            FieldSetter::Section => "set_section",
            FieldSetter::LivingArea => "set_living_area",
            FieldSetter::Ceil => "set_ceil",
            FieldSetter::Floor => "set_floor",
            FieldSetter::FinishingName => "set_finishing_name",
            FieldSetter::Plan => "set_plan",
            FieldSetter::Level => "set_level",
            FieldSetter::Balcony => "set_balcony",
            FieldSetter::Terrace => "set_terrace",
            FieldSetter::View => "set_view",
            FieldSetter::Article => "set_article",
            FieldSetter::DiscountPercent => "set_discount_percent",
            FieldSetter::Sale => "set_sale",
        }
    }

    /// Dispatch a raw value into the record through this setter.
    pub fn apply(
        &self,
        record: &mut EstateRecord,
        value: &RawValue,
        options: &MapOptions,
    ) -> Result<()> {
        match self {
            FieldSetter::InSale => record.set_in_sale(value),
            FieldSetter::Rooms => record.set_rooms(value, options.check_euro, options.check_type),
            FieldSetter::Area => record.set_area(value),
            FieldSetter::PriceBase => record.set_price_base(value, None, options.price_multiplier),
            FieldSetter::Building => {
                record.set_building(value);
                Ok(())
            }
            FieldSetter::Number => {
                record.set_number(value);
                Ok(())
            }
            FieldSetter::Section => {
                record.set_section(value);
                Ok(())
            }
            FieldSetter::LivingArea => record.set_living_area(value),
            FieldSetter::Ceil => record.set_ceil(value),
            FieldSetter::Floor => record.set_floor(value),
            FieldSetter::FinishingName => {
                record.set_finishing_name(value);
                Ok(())
            }
            FieldSetter::Plan => match value.text() {
                Some(url) => record.set_plan(&url, options.plan_base_url.as_ref()),
                None => Ok(()),
            },
            FieldSetter::Level => {
                record.set_level(value);
                Ok(())
            }
            FieldSetter::Balcony => {
                record.set_balcony(value);
                Ok(())
            }
            FieldSetter::Terrace => {
                record.set_terrace(value);
                Ok(())
            }
            FieldSetter::View => {
                record.set_view(value);
                Ok(())
            }
            FieldSetter::Article => {
                record.set_article(value);
                Ok(())
            }
            FieldSetter::DiscountPercent => record.set_discount_percent(value),
            FieldSetter::Sale => {
                record.set_sale(value);
                Ok(())
            }
        }
    }
}

/// One mapping rule: the alias vocabulary and the setter it routes to.
/// A `None` setter marks a field that is recognized and intentionally
/// dropped, so it cannot fall through to a wrong generic rule.
#[derive(Debug)]
pub struct MappingRule {
    pub aliases: &'static [&'static str],
    pub setter: Option<FieldSetter>,
}

/// The shared rule table, ordered from specific to general.
pub static FIELD_RULES: &[MappingRule] = &[
    MappingRule {
        aliases: &[
            "цена за 1",
            "цена за кв.м",
            "площадь кухни",
            "datePriceIncrease",
            "withPriceIncrease",
        ],
        setter: None,
    },
    MappingRule {
        aliases: &["статус", "available", "statusFlat"],
        setter: Some(FieldSetter::InSale),
    },
    MappingRule {
        aliases: &[
            "количество комнат",
            "rooms_count",
            "roomsQuantity",
            "кол-во комнат",
            "тип квартиры",
            "число комнат",
            "комнат в квартире",
        ],
        setter: Some(FieldSetter::Rooms),
    },
    MappingRule {
        aliases: &["общая площадь", "area", "fullFlat", "метраж", "s общ", "totalSquare"],
        setter: Some(FieldSetter::Area),
    },
    MappingRule {
        aliases: &["price", "priceFlat"],
        setter: Some(FieldSetter::PriceBase),
    },
    MappingRule {
        aliases: &["housing", "building", "дом", "корпус"],
        setter: Some(FieldSetter::Building),
    },
    MappingRule {
        aliases: &["№ кв", "№ квартиры"],
        setter: Some(FieldSetter::Number),
    },
    MappingRule {
        aliases: &["номер"],
        setter: Some(FieldSetter::Number),
    },
    MappingRule {
        aliases: &["section", "секция", "парадная"],
        setter: Some(FieldSetter::Section),
    },
    MappingRule {
        aliases: &[
            "жилая площадь",
            "площадь комнат",
            "жилая",
            "s комнат",
            "livingSquare",
        ],
        setter: Some(FieldSetter::LivingArea),
    },
    MappingRule {
        aliases: &["высота потолков"],
        setter: Some(FieldSetter::Ceil),
    },
    MappingRule {
        aliases: &["этаж", "floor"],
        setter: Some(FieldSetter::Floor),
    },
    MappingRule {
        aliases: &["отделка", "decoration"],
        setter: Some(FieldSetter::FinishingName),
    },
    MappingRule {
        aliases: &["цена", "стоимость"],
        setter: Some(FieldSetter::PriceBase),
    },
    MappingRule {
        aliases: &["imgLink", "flatPlanImageUrl"],
        setter: Some(FieldSetter::Plan),
    },
    MappingRule {
        aliases: &["количество уровней"],
        setter: Some(FieldSetter::Level),
    },
    MappingRule {
        aliases: &["балкон"],
        setter: Some(FieldSetter::Balcony),
    },
    MappingRule {
        aliases: &["терраса"],
        setter: Some(FieldSetter::Terrace),
    },
    MappingRule {
        aliases: &["площадь"],
        setter: Some(FieldSetter::Area),
    },
    MappingRule {
        aliases: &["вид из окон"],
        setter: Some(FieldSetter::View),
    },
    MappingRule {
        aliases: &["артикул"],
        setter: Some(FieldSetter::Article),
    },
    MappingRule {
        aliases: &["скидка"],
        setter: Some(FieldSetter::DiscountPercent),
    },
    MappingRule {
        aliases: &["акция", "спецпредложение"],
        setter: Some(FieldSetter::Sale),
    },
];

/// How a cleaned key is compared against rule aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Case-insensitive full-string equality, after unit suffixes are
    /// stripped from the key.
    Exact,
    /// Case-insensitive containment.
    Substring,
}

/// Per-source knobs applied when dispatching values into the record.
#[derive(Debug, Clone)]
pub struct MapOptions {
    pub price_multiplier: Decimal,
    pub plan_base_url: Option<Url>,
    pub check_euro: bool,
    pub check_type: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            price_multiplier: Decimal::ONE,
            plan_base_url: None,
            check_euro: true,
            check_type: true,
        }
    }
}

/// Unit suffixes stripped from keys before exact-mode comparison, so
/// "Площадь, м²" and "площадь" are the same key.
static KEY_UNIT_NOISE: Lazy<Vec<Regex>> =
    Lazy::new(|| clean::compile_patterns(&[",", "м²", "м2", r"кв\.м\.", r"кв\.м"]));

/// Routes raw (key, value) pairs from one source schema into a record.
pub struct FieldMapper {
    rules: &'static [MappingRule],
    mode: MatchMode,
    strict: bool,
    options: MapOptions,
}

impl FieldMapper {
    pub fn new(mode: MatchMode) -> Self {
        Self {
            rules: FIELD_RULES,
            mode,
            strict: false,
            options: MapOptions::default(),
        }
    }

    /// Fail on unmatched keys instead of dropping them.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_options(mut self, options: MapOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    /// Map a key→value collection. Values pass through uncleaned: mapping
    /// sources are usually decoded JSON whose scalars must stay typed.
    pub fn map_pairs(&self, record: &mut EstateRecord, pairs: &[(RawValue, RawValue)]) -> Result<()> {
        for (key, value) in pairs {
            self.route(record, key, value, false)?;
        }
        Ok(())
    }

    /// Map a decoded JSON object.
    pub fn map_object(
        &self,
        record: &mut EstateRecord,
        object: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<()> {
        for (key, value) in object {
            self.route(
                record,
                &RawValue::from(key.as_str()),
                &RawValue::from(value.clone()),
                false,
            )?;
        }
        Ok(())
    }

    /// Map one (key, value) cell pair, as table walkers produce them.
    pub fn map_one(&self, record: &mut EstateRecord, key: &RawValue, value: &RawValue) -> Result<()> {
        if key.is_empty() || value.is_empty() {
            return Ok(());
        }
        self.route(record, key, value, true)
    }

    /// Map a header row plus data rows, zipped by column. A table without a
    /// header is one where each row is its own (name, value) pair.
    pub fn map_table(
        &self,
        record: &mut EstateRecord,
        header: &[RawValue],
        rows: &[Vec<RawValue>],
    ) -> Result<()> {
        if header.is_empty() {
            for row in rows {
                if let [key, value, ..] = row.as_slice() {
                    self.map_one(record, key, value)?;
                }
            }
            return Ok(());
        }
        for row in rows {
            for (key, value) in header.iter().zip(row) {
                self.map_one(record, key, value)?;
            }
        }
        Ok(())
    }

    /// Map two parallel sequences of keys and values. Length mismatch is a
    /// hard error: silently zipping would misalign every following pair.
    pub fn map_parallel(
        &self,
        record: &mut EstateRecord,
        keys: &[RawValue],
        values: &[RawValue],
    ) -> Result<()> {
        if keys.len() != values.len() {
            return Err(NormalizeError::Validation(format!(
                "keys and values differ in length: {} vs {}",
                keys.len(),
                values.len()
            )));
        }
        for (key, value) in keys.iter().zip(values) {
            self.map_one(record, key, value)?;
        }
        Ok(())
    }

    fn route(
        &self,
        record: &mut EstateRecord,
        key: &RawValue,
        value: &RawValue,
        clean_value: bool,
    ) -> Result<()> {
        let Some(cleaned_key) = self.clean_key(key) else {
            return Ok(());
        };
        if cleaned_key.is_empty() {
            return Ok(());
        }

        let value = if clean_value {
            self.clean_value(value)
        } else {
            value.clone()
        };

        match self.resolve(&cleaned_key) {
            Some(rule) => match rule.setter {
                Some(setter) => {
                    debug!(key = %cleaned_key, setter = setter.name(), "routing field");
                    setter.apply(record, &value, &self.options)
                }
                None => {
                    debug!(key = %cleaned_key, "field recognized and ignored");
                    Ok(())
                }
            },
            None if self.strict => Err(NormalizeError::Schema(cleaned_key)),
            None => {
                debug!(key = %cleaned_key, "no mapping rule, dropping field");
                Ok(())
            }
        }
    }

    /// First rule whose alias set matches the cleaned key.
    fn resolve(&self, cleaned_key: &str) -> Option<&'static MappingRule> {
        let key = cleaned_key.to_lowercase();
        self.rules.iter().find(|rule| {
            rule.aliases.iter().any(|alias| {
                let alias = alias.to_lowercase();
                match self.mode {
                    MatchMode::Exact => alias == key,
                    MatchMode::Substring => key.contains(&alias),
                }
            })
        })
    }

    fn clean_key(&self, key: &RawValue) -> Option<String> {
        let text = key.text()?;
        let mut cleaned = clean::normalize_whitespace(&text);
        if self.mode == MatchMode::Exact {
            cleaned = clean::strip_patterns(&cleaned, &KEY_UNIT_NOISE);
        }
        Some(cleaned)
    }

    fn clean_value(&self, value: &RawValue) -> RawValue {
        match value {
            RawValue::Text(_) | RawValue::Html(_) => {
                let text = value.text().unwrap_or_default();
                RawValue::Text(clean::normalize_whitespace(&text))
            }
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn text(value: &str) -> RawValue {
        RawValue::Text(value.to_string())
    }

    #[test]
    fn test_skip_rule_precedes_generic_price() {
        let mapper = FieldMapper::new(MatchMode::Substring);
        let mut record = EstateRecord::new();
        mapper
            .map_one(&mut record, &text("Цена за кв.м."), &text("250 000"))
            .unwrap();
        assert_eq!(record.price_base, None);

        mapper
            .map_one(&mut record, &text("Цена"), &text("12 500 000"))
            .unwrap();
        assert_eq!(record.price_base, Some(Decimal::from(12_500_000)));
    }

    #[test]
    fn test_exact_mode_strips_unit_suffixes() {
        let mapper = FieldMapper::new(MatchMode::Exact);
        let mut record = EstateRecord::new();
        mapper
            .map_one(&mut record, &text("Площадь, м²"), &text("54,3"))
            .unwrap();
        assert_eq!(record.area, Some("54.3".parse().unwrap()));
    }

    #[test]
    fn test_exact_mode_requires_full_match() {
        let mapper = FieldMapper::new(MatchMode::Exact);
        let mut record = EstateRecord::new();
        // a substring hit is not enough in exact mode
        mapper
            .map_one(&mut record, &text("Цена со скидкой"), &text("1 000 000"))
            .unwrap();
        assert_eq!(record.price_base, None);
    }

    #[test]
    fn test_unknown_keys_dropped_unless_strict() {
        let mut record = EstateRecord::new();
        let mapper = FieldMapper::new(MatchMode::Substring);
        mapper
            .map_one(&mut record, &text("застройщик"), &text("ООО Ромашка"))
            .unwrap();

        let strict = FieldMapper::new(MatchMode::Substring).strict(true);
        let err = strict
            .map_one(&mut record, &text("застройщик"), &text("ООО Ромашка"))
            .unwrap_err();
        assert!(matches!(err, NormalizeError::Schema(_)));
    }

    #[test]
    fn test_parallel_length_mismatch_is_hard_error() {
        let mapper = FieldMapper::new(MatchMode::Substring);
        let mut record = EstateRecord::new();
        let err = mapper
            .map_parallel(&mut record, &[text("этаж")], &[text("5"), text("6")])
            .unwrap_err();
        assert!(matches!(err, NormalizeError::Validation(_)));
    }

    #[test]
    fn test_markup_keys_and_values() {
        let mapper = FieldMapper::new(MatchMode::Substring);
        let mut record = EstateRecord::new();
        mapper
            .map_one(
                &mut record,
                &RawValue::Html("<th>Этаж</th>".to_string()),
                &RawValue::Html("<td>5 <span>из 12</span></td>".to_string()),
            )
            .unwrap();
        assert_eq!(record.floor, Some(5));
    }

    #[test]
    fn test_table_with_and_without_header() {
        let mapper = FieldMapper::new(MatchMode::Substring);

        let mut record = EstateRecord::new();
        mapper
            .map_table(
                &mut record,
                &[text("Этаж"), text("Общая площадь")],
                &[vec![text("7/25"), text("33,8 м²")]],
            )
            .unwrap();
        assert_eq!(record.floor, Some(7));
        assert_eq!(record.area, Some("33.8".parse().unwrap()));

        let mut record = EstateRecord::new();
        mapper
            .map_table(
                &mut record,
                &[],
                &[
                    vec![text("Этаж"), text("3")],
                    vec![text("Высота потолков"), text("2,7 м")],
                ],
            )
            .unwrap();
        assert_eq!(record.floor, Some(3));
        assert_eq!(record.ceil, Some("2.7".parse().unwrap()));
    }

    #[test]
    fn test_mapping_is_idempotent_across_fresh_records() {
        let mapper = FieldMapper::new(MatchMode::Substring);
        let pairs = vec![
            (text("Цена"), text("5 000 000")),
            (text("Этаж"), text("5 из 12")),
            (text("Количество комнат"), text("студия")),
        ];

        let mut first = EstateRecord::new();
        let mut second = EstateRecord::new();
        mapper.map_pairs(&mut first, &pairs).unwrap();
        mapper.map_pairs(&mut second, &pairs).unwrap();
        assert_eq!(first, second);
    }
}
