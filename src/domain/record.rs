//! The canonical record and its per-field setters.
//!
//! Each setter is one field's cleaning rule: clean text, disambiguate the
//! vocabulary, parse, assign. Cross-field invariants are enforced only by
//! [`EstateRecord::finalize`], which consumes the record, so a record is
//! accepted or rejected as a whole.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::clean;
use crate::error::{NormalizeError, Result};
use crate::mapper::RawValue;

use super::{parse, ser_bool_as_int, ser_tri_bool, ObjectKind, ObjectType, Rooms, TriFlag};

static TAB_NEWLINE: Lazy<Vec<Regex>> = Lazy::new(|| clean::compile_patterns(&[r"\t", r"\n"]));

static BUILDING_NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    clean::compile_patterns(&[
        "корпус", r"корп\.", "корп", "строение", "№", "дом", ":", r"\t", r"\n", "квартал",
    ])
});

static SECTION_NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    clean::compile_patterns(&["секция", "парадная", "№", ":", r"\t", "подъезд", "блок"])
});

static NUMBER_NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    clean::compile_patterns(&[
        "офис",
        "квартира",
        "№",
        "машиноместо",
        "кладовая",
        "нежилое помещение",
        "коммерческое помещение",
        "паркинг",
        "кладовка",
        "номер",
        "лот",
        "помещение",
        r"ком\.пом\.",
        r"пом\.",
    ])
});

static NUMBER_ON_SITE_NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    clean::compile_patterns(&[
        "офис",
        "квартира",
        "№",
        "машиноместо",
        "кладовая",
        "нежилое помещение",
        "коммерческое помещение",
        "паркинг",
        "кладовка",
        "номер",
        "лот",
    ])
});

static STATUS_NOISE: Lazy<Vec<Regex>> = Lazy::new(|| clean::compile_patterns(&["статус", ":"]));

static CEIL_NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    clean::compile_patterns(&["высота", "потолков", "потолки", "потолок", ":", r"м\.", "м"])
});

static ARTICLE_NOISE: Lazy<Vec<Regex>> =
    Lazy::new(|| clean::compile_patterns(&["№", "артикул:", "тип планировки", "тип"]));

static DISCOUNT_NOISE: Lazy<Vec<Regex>> =
    Lazy::new(|| clean::compile_patterns(&["скидка", "%", "-"]));

/// Living-area values some sources use to mean "not filled in".
const EMPTY_MARKERS: [&str; 3] = ["null", "-", "0"];

/// The promo phrase that means the listed price already includes a discount.
const DISCOUNT_INCLUDED: &str = "Цена указана с учетом скидки";
/// The promo phrase for finishing included with the purchase.
const FINISHING_GIFT: &str = " отделка в подарок";

static FINISHING_GIFT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+) отделка").unwrap());

/// One normalized real-estate unit for sale.
///
/// Constructed empty, mutated only through the named setters as the mapper
/// routes source fields in, then consumed by [`finalize`](Self::finalize).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstateRecord {
    pub complex: Option<String>,
    #[serde(rename = "type")]
    pub obj_type: Option<ObjectKind>,
    pub building: Option<String>,
    pub section: Option<String>,
    #[serde(with = "rust_decimal::serde::arbitrary_precision_option")]
    pub price_base: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::arbitrary_precision_option")]
    pub area: Option<Decimal>,
    pub number: Option<String>,
    pub number_on_site: Option<String>,
    pub rooms: Option<Rooms>,
    pub floor: Option<i32>,
    #[serde(serialize_with = "ser_tri_bool")]
    pub in_sale: Option<bool>,
    pub finished: TriFlag,
    pub sale_status: Option<String>,
    #[serde(with = "rust_decimal::serde::arbitrary_precision_option")]
    pub living_area: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::arbitrary_precision_option")]
    pub ceil: Option<Decimal>,
    pub article: Option<String>,
    pub finishing_name: Option<String>,
    #[serde(with = "rust_decimal::serde::arbitrary_precision_option")]
    pub price_sale: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::arbitrary_precision_option")]
    pub price_finished: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::arbitrary_precision_option")]
    pub price_finished_sale: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::arbitrary_precision_option")]
    pub furniture_price: Option<Decimal>,
    pub furniture: TriFlag,
    pub plan: Option<String>,
    pub feature: Vec<String>,
    pub view: Vec<String>,
    #[serde(serialize_with = "ser_bool_as_int")]
    pub euro_planning: bool,
    pub sale: Option<String>,
    #[serde(with = "rust_decimal::serde::arbitrary_precision_option")]
    pub discount_percent: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::arbitrary_precision_option")]
    pub discount: Option<Decimal>,
}

impl Default for EstateRecord {
    fn default() -> Self {
        Self {
            complex: None,
            obj_type: None,
            building: None,
            section: None,
            price_base: None,
            area: None,
            number: None,
            number_on_site: None,
            rooms: None,
            floor: None,
            // units are assumed on the market until the source says otherwise
            in_sale: Some(true),
            finished: TriFlag::No,
            sale_status: None,
            living_area: None,
            ceil: None,
            article: None,
            finishing_name: None,
            price_sale: None,
            price_finished: None,
            price_finished_sale: None,
            furniture_price: None,
            furniture: TriFlag::No,
            plan: None,
            feature: Vec::new(),
            view: Vec::new(),
            euro_planning: false,
            sale: None,
            discount_percent: None,
            discount: None,
        }
    }
}

impl EstateRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record pre-classified for sources that only list one category.
    pub fn with_type(obj_type: ObjectType) -> Self {
        Self {
            obj_type: Some(ObjectKind::Known(obj_type)),
            ..Self::default()
        }
    }

    pub fn set_complex(&mut self, value: &RawValue) {
        let Some(text) = value.text() else { return };
        let cleaned = clean::strip_patterns(&text, &TAB_NEWLINE);
        self.complex = Some(clean::title_case(&cleaned).replace("Жк", "ЖК"));
    }

    pub fn set_obj_type(&mut self, value: &str) {
        self.obj_type = Some(parse::parse_object_type(value));
    }

    pub fn set_building(&mut self, value: &RawValue) {
        let Some(text) = value.text() else { return };
        self.building = Some(clean::strip_patterns(&text, &BUILDING_NOISE));
    }

    pub fn set_section(&mut self, value: &RawValue) {
        let Some(text) = value.text() else { return };
        let cleaned = clean::strip_patterns(&text, &SECTION_NOISE);
        if cleaned.is_empty() || cleaned == "-" || cleaned == "–" {
            return;
        }
        self.section = Some(cleaned);
    }

    pub fn set_number(&mut self, value: &RawValue) {
        let Some(text) = value.text() else { return };
        self.number = Some(clean::strip_patterns(&text, &NUMBER_NOISE));
    }

    pub fn set_number_on_site(&mut self, value: &RawValue) {
        let Some(text) = value.text() else { return };
        self.number_on_site = Some(clean::strip_patterns(&text, &NUMBER_ON_SITE_NOISE));
    }

    pub fn set_article(&mut self, value: &RawValue) {
        let Some(text) = value.text() else { return };
        self.article = Some(clean::strip_patterns(&text, &ARTICLE_NOISE));
    }

    pub fn set_sale_status(&mut self, value: &RawValue) {
        let Some(text) = value.text() else { return };
        self.sale_status = Some(clean::strip_patterns(&text, &STATUS_NOISE));
    }

    /// Room count, with the euro-planning and apartment side effects gated by
    /// the caller: a source that already knows the layout or the type passes
    /// `false` to keep a noisy label from overriding it.
    pub fn set_rooms(&mut self, value: &RawValue, check_euro: bool, check_type: bool) -> Result<()> {
        match value {
            RawValue::Number(n) => {
                let count = n
                    .as_i64()
                    .filter(|n| *n >= 0)
                    .ok_or_else(|| {
                        NormalizeError::Parse(format!("unreadable rooms value {}", n))
                    })?;
                self.rooms = Some(match count {
                    0 => Rooms::Studio,
                    n => Rooms::Count(n as u32),
                });
            }
            other => {
                let Some(text) = other.text() else {
                    return Err(NormalizeError::Parse("empty rooms value".to_string()));
                };
                let parsed = parse::parse_rooms(&text)?;
                if check_euro && parsed.euro {
                    self.euro_planning = true;
                }
                if check_type && parsed.apartment {
                    self.obj_type = Some(ObjectKind::Known(ObjectType::Apartment));
                }
                self.rooms = Some(parsed.rooms);
            }
        }
        Ok(())
    }

    pub fn set_floor(&mut self, value: &RawValue) -> Result<()> {
        match value {
            RawValue::Null => Ok(()),
            RawValue::Number(n) => {
                let floor = n.as_i64().ok_or_else(|| {
                    NormalizeError::Parse(format!("unreadable floor value {}", n))
                })?;
                self.floor = Some(floor as i32);
                Ok(())
            }
            other => {
                let Some(text) = other.text() else { return Ok(()) };
                if text.trim().is_empty() {
                    return Ok(());
                }
                self.floor = Some(parse::parse_floor(&text)?);
                Ok(())
            }
        }
    }

    pub fn set_area(&mut self, value: &RawValue) -> Result<()> {
        if value.is_empty() {
            return Ok(());
        }
        self.area = Some(parse::parse_area(value)?);
        Ok(())
    }

    pub fn set_living_area(&mut self, value: &RawValue) -> Result<()> {
        if value.is_empty() {
            return Ok(());
        }
        if let RawValue::Text(s) = value {
            if EMPTY_MARKERS.contains(&s.trim().to_lowercase().as_str()) {
                return Ok(());
            }
        }
        self.living_area = Some(parse::parse_area(value)?);
        Ok(())
    }

    pub fn set_ceil(&mut self, value: &RawValue) -> Result<()> {
        let Some(text) = value.text() else {
            return Err(NormalizeError::Parse("empty ceiling value".to_string()));
        };
        let cleaned =
            clean::strip_patterns(&clean::normalize_decimal_separator(&text), &CEIL_NOISE);
        self.ceil = Some(cleaned.parse().map_err(|_| {
            NormalizeError::Parse(format!("unreadable ceiling height {:?}", text))
        })?);
        Ok(())
    }

    /// Base price, optionally with the source's simultaneous "sale" price.
    /// A sale price strictly below the base lands in `price_sale`; strictly
    /// above is contradictory data.
    pub fn set_price_base(
        &mut self,
        value: &RawValue,
        sale: Option<&RawValue>,
        multi: Decimal,
    ) -> Result<()> {
        self.price_base = parse::decode_price(value, multi)?;
        if let Some(sale) = sale {
            if let Some(price_sale) = parse::decode_price(sale, multi)? {
                match self.price_base {
                    Some(base) if price_sale < base => self.price_sale = Some(price_sale),
                    Some(base) if price_sale > base => {
                        return Err(NormalizeError::Validation(format!(
                            "sale price {} exceeds base price {}",
                            price_sale, base
                        )))
                    }
                    Some(_) => {}
                    None => {
                        return Err(NormalizeError::Validation(
                            "sale price given without a base price".to_string(),
                        ))
                    }
                }
            }
        }
        Ok(())
    }

    /// Discounted price. Ignored when it is no improvement over the base;
    /// some sources repeat the base price in the sale column.
    pub fn set_price_sale(&mut self, value: &RawValue, multi: Decimal) -> Result<()> {
        let Some(price_sale) = parse::decode_price(value, multi)? else {
            return Ok(());
        };
        if let Some(base) = self.price_base {
            if price_sale >= base {
                return Ok(());
            }
        }
        self.price_sale = Some(price_sale);
        Ok(())
    }

    pub fn set_price_finished(&mut self, value: &RawValue, multi: Decimal) -> Result<()> {
        self.price_finished = parse::decode_price(value, multi)?;
        Ok(())
    }

    pub fn set_price_finished_sale(&mut self, value: &RawValue, multi: Decimal) -> Result<()> {
        self.price_finished_sale = parse::decode_price(value, multi)?;
        Ok(())
    }

    pub fn set_furniture_price(&mut self, value: &RawValue, multi: Decimal) -> Result<()> {
        self.furniture_price = parse::decode_price(value, multi)?;
        Ok(())
    }

    pub fn set_discount(&mut self, value: &RawValue) -> Result<()> {
        self.discount = parse::decode_price(value, Decimal::ONE)?;
        Ok(())
    }

    /// Discount percentage. The plausibility bound is a cross-field concern
    /// and waits for finalization.
    pub fn set_discount_percent(&mut self, value: &RawValue) -> Result<()> {
        let percent = match value {
            RawValue::Text(_) | RawValue::Html(_) => {
                let text = value.text().unwrap_or_default();
                let cleaned = clean::strip_patterns(
                    &clean::normalize_decimal_separator(&text),
                    &DISCOUNT_NOISE,
                );
                cleaned.parse().map_err(|_| {
                    NormalizeError::Parse(format!("unreadable discount {:?}", text))
                })?
            }
            RawValue::Number(n) => n.to_string().parse().map_err(|_| {
                NormalizeError::Parse(format!("unreadable discount {}", n))
            })?,
            other => {
                return Err(NormalizeError::Parse(format!(
                    "unreadable discount {:?}",
                    other
                )))
            }
        };
        self.discount_percent = Some(percent);
        Ok(())
    }

    pub fn set_in_sale(&mut self, value: &RawValue) -> Result<()> {
        let parsed = parse::parse_in_sale(value)?;
        if let Some(status) = parsed.status {
            self.set_sale_status(&RawValue::from(status));
        }
        self.in_sale = parsed.in_sale;
        Ok(())
    }

    pub fn set_finished(&mut self, value: &RawValue) -> Result<()> {
        self.finished = parse::parse_tri_flag(value)?;
        Ok(())
    }

    pub fn set_furniture(&mut self, value: &RawValue) -> Result<()> {
        self.furniture = parse::parse_tri_flag(value)?;
        Ok(())
    }

    pub fn set_euro_planning(&mut self, value: &RawValue) -> Result<()> {
        self.euro_planning = parse::parse_int_flag(value)?;
        Ok(())
    }

    /// Finishing package name. "Без отделки"-style values mean the unit is
    /// sold bare and leave both fields untouched.
    pub fn set_finishing_name(&mut self, value: &RawValue) {
        let Some(text) = value.text() else { return };
        let text = text.trim().to_string();
        let lower = text.to_lowercase();
        if ["без отделки", "без ремонта", "–"]
            .iter()
            .any(|marker| lower.contains(marker))
        {
            return;
        }
        self.finished = TriFlag::Yes;
        self.finishing_name = Some(text);
    }

    /// Plan image URL, resolved against the source's base URL when relative.
    pub fn set_plan(&mut self, url: &str, base_url: Option<&Url>) -> Result<()> {
        if url.trim().is_empty() {
            return Ok(());
        }
        let resolved = match base_url {
            Some(base) => base
                .join(url)
                .map_err(|e| NormalizeError::Parse(format!("bad plan url {:?}: {}", url, e)))?
                .to_string(),
            None => url.to_string(),
        };
        self.plan = Some(resolved);
        Ok(())
    }

    pub fn set_feature(&mut self, value: &RawValue) {
        let Some(text) = value.text() else { return };
        let cleaned = clean::strip_patterns(&text, &TAB_NEWLINE);
        if !cleaned.is_empty() {
            self.feature.push(cleaned);
        }
    }

    pub fn set_view(&mut self, value: &RawValue) {
        let Some(text) = value.text() else { return };
        let cleaned = clean::strip_patterns(&text, &TAB_NEWLINE);
        if !cleaned.is_empty() {
            self.view.push(cleaned);
        }
    }

    /// Promotional text accumulates; repeated assignments join with "; ".
    pub fn set_sale(&mut self, value: &RawValue) {
        let Some(text) = value.text() else { return };
        self.sale = Some(match self.sale.take() {
            Some(existing) => format!("{}; {}", existing, text),
            None => text,
        });
    }

    /// Level count: a two-level unit becomes a feature, not a number.
    pub fn set_level(&mut self, value: &RawValue) {
        let Some(text) = value.text() else { return };
        if text.to_lowercase().contains("двухуровневая") || text.contains('2') {
            self.set_feature(&RawValue::from("Двухуровневая"));
        }
    }

    pub fn set_balcony(&mut self, value: &RawValue) {
        if !matches!(value, RawValue::Text(_) | RawValue::Html(_)) {
            return;
        }
        let text = value.text().unwrap_or_default().to_lowercase();
        if text.contains("балкон") {
            self.set_feature(&RawValue::from("Балкон"));
        }
        if text.contains("лоджия") {
            self.set_feature(&RawValue::from("Лоджия"));
        }
        if text.contains("да") || text.contains("есть") {
            self.set_feature(&RawValue::from("Балкон"));
        }
    }

    pub fn set_terrace(&mut self, value: &RawValue) {
        if !matches!(value, RawValue::Text(_) | RawValue::Html(_)) {
            return;
        }
        let text = value.text().unwrap_or_default().to_lowercase();
        if text.contains("терраса") || text.contains("да") || text.contains("есть") {
            self.set_feature(&RawValue::from("Терраса"));
        }
    }

    /// Fold accumulated promo text into the structured price fields.
    ///
    /// "Цена указана с учетом скидки ..." means the listed base price is
    /// already discounted: it moves to the sale slot and the discount amount
    /// is reassembled from the digits of the phrase. "... отделка в подарок"
    /// marks the unit finished and shifts whichever price applies into the
    /// finished-sale slot.
    pub fn reconcile_promotions(&mut self) {
        let Some(sale) = self.sale.clone() else { return };

        if sale.contains(DISCOUNT_INCLUDED) {
            debug!(sale = %sale, "promo text carries an included discount");
            let digits = clean::extract_all_digits(&sale);
            if let Ok(amount) = digits.parse::<Decimal>() {
                self.discount = Some(amount);
            }
            self.price_sale = self.price_base.take();
        }

        if sale.contains(FINISHING_GIFT) {
            debug!(sale = %sale, "promo text carries a finishing gift");
            if let Some(caps) = FINISHING_GIFT_NAME.captures(&sale) {
                self.finishing_name = Some(caps[1].to_string());
            }
            self.finished = TriFlag::Yes;
            self.price_finished_sale = self.price_base.take();
            if let Some(price_sale) = self.price_sale.take() {
                self.price_finished_sale = Some(price_sale);
            }
        }
    }

    /// One-time cross-field invariant pass. Consumes the record so no setter
    /// can run after validation; the record is accepted or rejected whole.
    pub fn finalize(mut self) -> Result<Self> {
        self.force_not_in_sale_without_price();
        self.promote_base_to_finished();
        self.validate_prices()?;
        self.validate_type()?;
        Ok(self)
    }

    fn has_any_price(&self) -> bool {
        self.price_base.is_some()
            || self.price_sale.is_some()
            || self.price_finished.is_some()
            || self.price_finished_sale.is_some()
    }

    fn force_not_in_sale_without_price(&mut self) {
        if !self.has_any_price() {
            self.in_sale = Some(false);
        }
    }

    /// For a finished unit, a lone "base" price is really the finished price.
    /// This can create the pairs the price validation below checks.
    fn promote_base_to_finished(&mut self) {
        if self.finished != TriFlag::Yes {
            return;
        }
        if self.price_base.is_some() && self.price_finished.is_none() {
            self.price_finished = self.price_base.take();
        }
        if self.price_sale.is_some() && self.price_finished_sale.is_none() {
            self.price_finished_sale = self.price_sale.take();
        }
    }

    fn validate_prices(&self) -> Result<()> {
        if let (Some(base), Some(sale)) = (self.price_base, self.price_sale) {
            if base < sale {
                return Err(NormalizeError::Validation(format!(
                    "sale price {} exceeds base price {}",
                    sale, base
                )));
            }
        }
        if let (Some(finished), Some(finished_sale)) =
            (self.price_finished, self.price_finished_sale)
        {
            if finished < finished_sale {
                return Err(NormalizeError::Validation(format!(
                    "finished sale price {} exceeds finished price {}",
                    finished_sale, finished
                )));
            }
        }
        if let Some(percent) = self.discount_percent {
            if percent > Decimal::from(30) {
                return Err(NormalizeError::Validation(format!(
                    "implausible discount rate {}%",
                    percent
                )));
            }
        }
        Ok(())
    }

    fn validate_type(&self) -> Result<()> {
        match &self.obj_type {
            Some(ObjectKind::Known(_)) => Ok(()),
            Some(ObjectKind::Raw(raw)) => Err(NormalizeError::Validation(format!(
                "unrecognized object type {:?}",
                raw
            ))),
            None => Err(NormalizeError::Validation(
                "object type is not set".to_string(),
            )),
        }
    }
}
