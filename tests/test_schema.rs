use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_formtree::{
    Config, Describe, ErrorKind, ListStyle, Map, NullRule, ScalarKind, StructDescription,
    StructRef, Structure, TypeDescription, Value,
};
use std::collections::BTreeMap;

use pretty_assertions::assert_eq;

const QS: Config = Config::new().use_form_encoding(false);

fn item() -> StructDescription {
    StructDescription::new("Item")
        .field("name", String::describe())
        .renamed_field("quantity", "qty", i32::describe())
}

fn order() -> StructDescription {
    StructDescription::new("Order")
        .field("customer", String::describe())
        .field("items", TypeDescription::new_named(item))
        .field("note", Option::<String>::describe())
        .field("total", TypeDescription::Simple(ScalarKind::BigDecimal))
}

fn search() -> StructDescription {
    StructDescription::new("Search")
        .field("page", i32::describe())
        .extra("rest")
}

fn named(describe: fn() -> StructDescription) -> TypeDescription {
    TypeDescription::NamedStructure(StructRef::new(describe))
}

#[test]
fn decode_structure() {
    let value = QS
        .decode_value(
            "customer=Ann&items[0][name]=pen&items[0][qty]=2&\
             items[1][name]=ink&items[1][qty]=1&total=12.50",
            &named(order),
        )
        .unwrap();

    assert_eq!(value.get("customer").unwrap(), "Ann");
    assert!(value.get("note").is_none());
    assert_eq!(
        value.get("total").unwrap().kind(),
        Some(ScalarKind::BigDecimal)
    );

    let items = value.get("items").unwrap();
    assert_eq!(items.get(1).unwrap().get("name").unwrap(), "ink");
    assert_eq!(*items.get(0).unwrap().get("quantity").unwrap(), Value::Int(2));
}

#[test]
fn structure_roundtrip() {
    let input = "customer=Ann&items[0][name]=pen&items[0][qty]=2&\
                 items[1][name]=ink&items[1][qty]=1&total=12.50";
    let value = QS.decode_value(input, &named(order)).unwrap();
    assert_eq!(QS.encode_value(&value, &named(order)).unwrap(), input);
}

#[test]
fn encode_structure() {
    let value = Value::Struct(
        Structure::new("Order")
            .with("customer", "Bob")
            .with(
                "items",
                vec![Value::from(
                    Structure::new("Item").with("name", "cup").with("quantity", 3),
                )],
            )
            .with("note", None::<String>),
    );

    insta::assert_snapshot!(
        QS.encode_value(&value, &named(order)).unwrap(),
        @"customer=Bob&items[0][name]=cup&items[0][qty]=3"
    );
    insta::assert_snapshot!(
        QS.null_rule(NullRule::NullString).encode_value(&value, &named(order)).unwrap(),
        @"customer=Bob&items[0][name]=cup&items[0][qty]=3&note=null"
    );
}

#[test]
fn list_shapes_decode_alike() {
    let ty = Vec::<String>::describe();
    let wrap = |input: &str| {
        QS.decode_value(input, &TypeDescription::GenericMapping(Box::new(ty.clone())))
            .unwrap()
    };

    let expected = wrap("tags[0]=a&tags[1]=b");
    assert_eq!(wrap("tags=a&tags=b"), expected);
    assert_eq!(wrap("tags[]=a&tags[]=b"), expected);
    assert_eq!(
        *expected.get("tags").unwrap(),
        Value::List(vec!["a".into(), "b".into()])
    );
}

#[test]
fn extra_properties() {
    let value = QS
        .decode_value("page=2&q=rust&tags[]=a", &named(search))
        .unwrap();
    assert_eq!(*value.get("page").unwrap(), Value::Int(2));
    let rest = value.get("rest").unwrap();
    assert_eq!(rest.get("q").unwrap(), "rust");
    assert_eq!(*rest.get("tags").unwrap(), Value::List(vec!["a".into()]));

    fn strict_search() -> StructDescription {
        StructDescription::new("Search").field("page", i32::describe())
    }
    let err = QS
        .prohibit_extra_properties(true)
        .decode_value("page=2&q=rust", &named(strict_search))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnmappedExtraProperties);
    insta::assert_snapshot!(err, @"unmapped properties for `Search`: q");

    let value = QS
        .decode_value("page=2&q=rust", &named(strict_search))
        .unwrap();
    assert!(value.get("q").is_none());
}

#[test]
fn incompatible_scalars() {
    let err = QS
        .decode_value("page=two", &named(search))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleType);

    let err = QS
        .decode_value("page[x]=2", &named(search))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleType);
}

#[test]
fn opaque_structures() {
    fn handle() -> StructDescription {
        StructDescription::opaque("Handle").field("id", i64::describe())
    }
    let err = QS.decode_value("id=1", &named(handle)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InstantiationFailure);

    let value = Value::Struct(Structure::new("Handle").with("id", 7i64));
    assert_eq!(QS.encode_value(&value, &named(handle)).unwrap(), "id=7");
}

fn record() -> StructDescription {
    StructDescription::new("Record")
        .field("child", named(item))
        .field("count", i32::describe())
        .field("flag", bool::describe())
        .field("items", TypeDescription::new_named(item))
        .field("note", Option::<String>::describe())
        .field("ratio", f64::describe())
        .field("scores", Vec::<i64>::describe())
        .field("tags", BTreeMap::<String, String>::describe())
        .extra("rest")
}

const ALPHABET: &[&str] = &[
    "a", "b", "Z", "0", "9", " ", "&", "=", "[", "]", "%", "+", "#", "?", "/", "é", "🦀",
];

/// Never empty and never a number, boolean or null spelling.
fn random_string(rng: &mut StdRng) -> String {
    let len = rng.random_range(0..6);
    std::iter::once("x")
        .chain((0..len).map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())]))
        .collect()
}

fn random_key(rng: &mut StdRng, prefix: &str) -> String {
    let len = rng.random_range(1..5);
    let suffix: String = (0..len)
        .map(|_| char::from(b'a' + rng.random_range(0..26u8)))
        .collect();
    format!("{prefix}{suffix}")
}

fn random_item(rng: &mut StdRng) -> Value {
    Value::Struct(
        Structure::new("Item")
            .with("name", random_string(rng))
            .with("quantity", rng.random_range(-100..100i32)),
    )
}

/// A random `Record`. Lists of structures only read back unchanged with
/// numbered indexes, so other list styles get an empty `items`.
fn random_record(rng: &mut StdRng, rule: NullRule, style: ListStyle) -> Value {
    let items = if style == ListStyle::Explicit {
        (0..rng.random_range(0..4)).map(|_| random_item(rng)).collect()
    } else {
        Vec::new()
    };
    let scores: Vec<Value> = (0..rng.random_range(0..4))
        .map(|_| Value::Long(rng.random_range(-1_000_000..1_000_000)))
        .collect();
    let tags: Map<String, Value> = (0..rng.random_range(0..3))
        .map(|_| (random_key(rng, "t"), Value::from(random_string(rng))))
        .collect();
    let rest: Map<String, Value> = (0..rng.random_range(0..3))
        .map(|_| {
            let value = if rng.random_bool(0.5) {
                Value::Long(rng.random_range(-1000..1000))
            } else {
                Value::from(random_string(rng))
            };
            (random_key(rng, "extra_"), value)
        })
        .collect();

    let mut record = Structure::new("Record")
        .with("child", random_item(rng))
        .with("count", rng.random::<i32>())
        .with("flag", rng.random_bool(0.5))
        .with("items", items)
        .with("ratio", rng.random_range(-1e6..1e6f64))
        .with("scores", scores)
        .with("tags", tags)
        .with("rest", rest);
    if rng.random_bool(0.5) {
        record = record.with("note", random_string(rng));
    } else if rule != NullRule::Ignore {
        record = record.with("note", Value::Null);
    }
    Value::Struct(record)
}

#[test]
fn randomized_schema_roundtrip() {
    let mut rng = StdRng::seed_from_u64(0x5c4e);
    let ty = named(record);
    let rules = [
        NullRule::Ignore,
        NullRule::NullMarker,
        NullRule::EmptyString,
        NullRule::NullString,
    ];
    let styles = [ListStyle::Explicit, ListStyle::Implicit, ListStyle::Hidden];
    for _ in 0..200 {
        let rule = rules[rng.random_range(0..rules.len())];
        let style = styles[rng.random_range(0..styles.len())];
        let config = Config::new()
            .null_rule(rule)
            .list_style(style)
            .use_form_encoding(rng.random_bool(0.5));
        let value = random_record(&mut rng, rule, style);
        let encoded = config.encode_value(&value, &ty).unwrap();
        let decoded = config.decode_value(&encoded, &ty).unwrap();
        assert_eq!(value, decoded, "{config:?}: {encoded}");
    }
}
