use rust_decimal::Decimal;
use serde_json::json;

use estate_normalizer::domain::{EstateRecord, ObjectType, Rooms, TriFlag};
use estate_normalizer::error::NormalizeError;
use estate_normalizer::mapper::{FieldMapper, MatchMode, RawValue};

fn text(value: &str) -> RawValue {
    RawValue::Text(value.to_string())
}

fn map_object(mapper: &FieldMapper, record: &mut EstateRecord, value: serde_json::Value) {
    let object = value.as_object().expect("test fixture must be an object");
    mapper.map_object(record, object).expect("mapping failed");
}

#[test]
fn test_full_flow_from_russian_table() {
    let mapper = FieldMapper::new(MatchMode::Substring);
    let mut record = EstateRecord::with_type(ObjectType::Flat);

    mapper
        .map_table(
            &mut record,
            &[
                text("Тип квартиры"),
                text("Этаж"),
                text("Общая площадь, м²"),
                text("Жилая площадь"),
                text("Цена"),
                text("Статус"),
            ],
            &[vec![
                text("Двухкомнатная евро"),
                text("5 из 12"),
                text("54,3"),
                text("32,1"),
                text("8 400 000 руб."),
                text("Свободна"),
            ]],
        )
        .unwrap();

    let record = record.finalize().unwrap();
    assert_eq!(record.rooms, Some(Rooms::Count(2)));
    assert!(record.euro_planning);
    assert_eq!(record.floor, Some(5));
    assert_eq!(record.area, Some("54.3".parse().unwrap()));
    assert_eq!(record.living_area, Some("32.1".parse().unwrap()));
    assert_eq!(record.price_base, Some(Decimal::from(8_400_000)));
    assert_eq!(record.in_sale, Some(true));
}

#[test]
fn test_json_source_with_typed_scalars() {
    let mapper = FieldMapper::new(MatchMode::Substring);
    let mut record = EstateRecord::with_type(ObjectType::Flat);

    map_object(
        &mapper,
        &mut record,
        json!({
            "rooms_count": 0,
            "floor": 3,
            "area": 26.4,
            "price": 5_600_000,
            "available": 1,
            "developer_id": 42
        }),
    );

    let record = record.finalize().unwrap();
    assert_eq!(record.rooms, Some(Rooms::Studio));
    assert_eq!(record.floor, Some(3));
    assert_eq!(record.area, Some("26.4".parse().unwrap()));
    assert_eq!(record.price_base, Some(Decimal::from(5_600_000)));
    assert_eq!(record.in_sale, Some(true));
}

#[test]
fn test_finished_unit_price_promotion() {
    let mapper = FieldMapper::new(MatchMode::Substring);
    let mut record = EstateRecord::with_type(ObjectType::Flat);

    map_object(
        &mapper,
        &mut record,
        json!({
            "Цена": "5 000 000",
            "Отделка": "Чистовая"
        }),
    );

    let record = record.finalize().unwrap();
    assert_eq!(record.finished, TriFlag::Yes);
    assert_eq!(record.finishing_name.as_deref(), Some("Чистовая"));
    assert_eq!(record.price_finished, Some(Decimal::from(5_000_000)));
    assert_eq!(record.price_base, None);
}

#[test]
fn test_record_without_prices_is_not_in_sale() {
    let mapper = FieldMapper::new(MatchMode::Substring);
    let mut record = EstateRecord::with_type(ObjectType::Flat);

    map_object(&mapper, &mut record, json!({ "Этаж": "2" }));

    let record = record.finalize().unwrap();
    assert_eq!(record.in_sale, Some(false));
}

#[test]
fn test_price_on_request_is_absence_not_zero() {
    let mapper = FieldMapper::new(MatchMode::Substring);
    let mut record = EstateRecord::with_type(ObjectType::Flat);

    map_object(&mapper, &mut record, json!({ "Цена": "по запросу" }));

    let record = record.finalize().unwrap();
    assert_eq!(record.price_base, None);
    assert_eq!(record.in_sale, Some(false));
}

#[test]
fn test_unknown_object_type_rejected() {
    let mapper = FieldMapper::new(MatchMode::Substring);
    let mut record = EstateRecord::new();
    record.set_obj_type("Сьюты");

    map_object(&mapper, &mut record, json!({ "Цена": "5 000 000" }));

    assert!(matches!(
        record.finalize(),
        Err(NormalizeError::Validation(_))
    ));
}

#[test]
fn test_promo_text_reconciliation_end_to_end() {
    let mapper = FieldMapper::new(MatchMode::Substring);
    let mut record = EstateRecord::with_type(ObjectType::Flat);

    map_object(
        &mapper,
        &mut record,
        json!({
            "Цена": "4 500 000",
            "Акция": "Цена указана с учетом скидки 150 000 руб."
        }),
    );
    record.reconcile_promotions();

    let record = record.finalize().unwrap();
    assert_eq!(record.price_base, None);
    assert_eq!(record.price_sale, Some(Decimal::from(4_500_000)));
    assert_eq!(record.discount, Some(Decimal::from(150_000)));
}

#[test]
fn test_mapper_idempotence_via_fresh_records() {
    let mapper = FieldMapper::new(MatchMode::Substring);
    let fixture = json!({
        "Комплекс": "жк лесной",
        "Цена": "7 200 000",
        "Этаж": "12/25",
        "Количество комнат": "3-х комнатная",
        "Вид из окон": "Во двор"
    });

    let mut first = EstateRecord::with_type(ObjectType::Flat);
    let mut second = EstateRecord::with_type(ObjectType::Flat);
    map_object(&mapper, &mut first, fixture.clone());
    map_object(&mapper, &mut second, fixture);

    assert_eq!(first, second);
    assert_eq!(first.finalize().unwrap(), second.finalize().unwrap());
}

#[test]
fn test_serialized_shape() {
    let mapper = FieldMapper::new(MatchMode::Substring);
    let mut record = EstateRecord::with_type(ObjectType::Flat);

    map_object(
        &mapper,
        &mut record,
        json!({
            "Количество комнат": "студия",
            "Цена": "5 000 000"
        }),
    );

    let record = record.finalize().unwrap();
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["type"], json!("flat"));
    assert_eq!(value["rooms"], json!("studio"));
    assert_eq!(value["in_sale"], json!(1));
    assert_eq!(value["finished"], json!(0));
    assert_eq!(value["euro_planning"], json!(0));
    // money stays an exact JSON number
    assert_eq!(value["price_base"], json!(5_000_000));
    assert_eq!(value["price_sale"], json!(null));
    assert_eq!(value["feature"], json!([]));
}
