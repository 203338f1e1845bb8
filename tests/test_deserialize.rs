use serde::Deserialize;
use serde_formtree::{Charset, Config, ErrorKind, RawNode};
use std::collections::{BTreeMap, HashMap};

use pretty_assertions::assert_eq;

const QS: Config = Config::new().use_form_encoding(false);

#[derive(Debug, PartialEq, Deserialize)]
struct Address {
    city: String,
    postcode: String,
}

#[derive(Debug, PartialEq, Deserialize)]
struct QueryParams {
    id: u8,
    name: String,
    address: Address,
    phone: u32,
    user_ids: Vec<u8>,
}

fn params() -> QueryParams {
    QueryParams {
        id: 42,
        name: "Acme".to_string(),
        phone: 12345,
        address: Address {
            city: "Carrot City".to_string(),
            postcode: "12345".to_string(),
        },
        user_ids: vec![1, 2, 3, 4],
    }
}

#[test]
fn deserialize_struct() {
    let rec_params: QueryParams = QS
        .deserialize_str(
            "name=Acme&id=42&phone=12345&address[postcode]=12345&\
             address[city]=Carrot+City&user_ids[0]=1&user_ids[1]=2&\
             user_ids[2]=3&user_ids[3]=4",
        )
        .unwrap();
    assert_eq!(rec_params, params());

    // pairs can come in any order
    let rec_params: QueryParams = QS
        .deserialize_str(
            "user_ids[3]=4&address[city]=Carrot+City&user_ids[1]=2&\
             name=Acme&user_ids[0]=1&address[postcode]=12345&\
             id=42&user_ids[2]=3&phone=12345",
        )
        .unwrap();
    assert_eq!(rec_params, params());
}

#[test]
fn deserialize_bytes_and_reader() {
    let input = "name=Acme&id=42&phone=12345&address[postcode]=12345&\
                 address[city]=Carrot+City&user_ids[]=1&user_ids[]=2&\
                 user_ids[]=3&user_ids[]=4";
    let from_bytes: QueryParams = QS.deserialize_bytes(input.as_bytes()).unwrap();
    assert_eq!(from_bytes, params());

    let from_reader: QueryParams = serde_formtree::from_reader(input.as_bytes()).unwrap();
    assert_eq!(from_reader, params());
}

#[test]
fn deserialize_form_encoded_brackets() {
    let input = "name=Acme&id=42&phone=12345&address%5Bpostcode%5D=12345&\
                 address%5Bcity%5D=Carrot+City&user_ids%5B0%5D=1&user_ids%5B1%5D=2&\
                 user_ids%5B2%5D=3&user_ids%5B3%5D=4";
    let config = Config::new().use_form_encoding(true);
    let rec_params: QueryParams = config.deserialize_str(input).unwrap();
    assert_eq!(rec_params, params());

    // without form encoding the escaped brackets are part of the key
    let map: HashMap<String, String> = QS.deserialize_str("a%5Bb%5D=1").unwrap();
    assert_eq!(map["a[b]"], "1");
}

#[test]
fn hidden_list_promotion() {
    #[derive(Debug, PartialEq, Deserialize)]
    struct Query {
        foo: Vec<String>,
    }
    let query: Query = QS.deserialize_str("foo=a&foo=b&foo=c").unwrap();
    assert_eq!(query.foo, ["a", "b", "c"]);

    // a single value also fills a list
    let query: Query = QS.deserialize_str("foo=a").unwrap();
    assert_eq!(query.foo, ["a"]);

    // and an empty value is an empty list
    let query: Query = QS.deserialize_str("foo=").unwrap();
    assert!(query.foo.is_empty());
}

#[test]
fn hidden_list_mixes_with_implicit_list() {
    let tree = QS.decode_str("a=1&a[]=2&a=3").unwrap();
    let items: Vec<_> = tree
        .get("a")
        .unwrap()
        .as_sequence()
        .unwrap()
        .iter()
        .map(|item| item.as_ref().and_then(RawNode::as_str).unwrap())
        .collect();
    assert_eq!(items, ["1", "2", "3"]);
}

#[test]
fn indexed_gap_fill() {
    let tree = QS.decode_str("b[2]=ccc&b[0]=a").unwrap();
    assert_eq!(
        tree.get("b"),
        Some(&RawNode::sequence(
            true,
            vec![Some("a".into()), None, Some("ccc".into())]
        ))
    );
    insta::assert_debug_snapshot!(tree, @r###"
    {
        "b": [
            "a",
            _,
            "ccc",
        ],
    }
    "###);

    // holes read as `None`
    #[derive(Debug, PartialEq, Deserialize)]
    struct Query {
        b: Vec<Option<String>>,
    }
    let query: Query = QS.deserialize_str("b[2]=ccc&b[0]=a").unwrap();
    assert_eq!(query.b, [Some("a".to_owned()), None, Some("ccc".to_owned())]);
}

#[test]
fn indexed_overwrite() {
    #[derive(Debug, PartialEq, Deserialize)]
    struct Query {
        a: Vec<u8>,
    }
    let query: Query = QS.deserialize_str("a[0]=1&a[1]=2&a[0]=3").unwrap();
    assert_eq!(query.a, [3, 2]);
}

#[test]
fn implicit_list_of_mappings_is_zipped() {
    // same keys at the same position are merged into one element
    let tree = QS.decode_str("a[][x]=1&a[][x]=2").unwrap();
    insta::assert_debug_snapshot!(tree, @r###"
    {
        "a": ~[
            {
                "x": ~[
                    "1",
                    "2",
                ],
            },
        ],
    }
    "###);

    // different keys are appended
    let tree = QS.decode_str("a[][x]=1&a[][y]=2").unwrap();
    assert_eq!(tree.get("a").unwrap().as_sequence().unwrap().len(), 2);
}

#[test]
fn deserialize_nested_lists_of_structs() {
    #[derive(Debug, PartialEq, Deserialize)]
    struct Item {
        id: u32,
        tags: Vec<String>,
    }
    #[derive(Debug, PartialEq, Deserialize)]
    struct Query {
        items: Vec<Item>,
    }
    let query: Query = QS
        .deserialize_str("items[1][id]=2&items[0][tags][]=x&items[0][id]=1&items[1][tags]=")
        .unwrap();
    assert_eq!(
        query.items,
        [
            Item {
                id: 1,
                tags: vec!["x".to_owned()],
            },
            Item {
                id: 2,
                tags: vec![],
            },
        ]
    );
}

#[test]
fn malformed_keys() {
    for input in [
        "key[[]]=1",
        "key[bar]0]=1",
        "key[a=1",
        "key]=1",
        "a[b]c[d]=1",
    ] {
        let err = QS.decode_str(input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedKey, "{input}");
    }

    for input in ["key[0][1][2]=x", "key[][][]=x"] {
        assert!(QS.decode_str(input).is_ok(), "{input}");
    }
}

#[test]
fn merge_conflicts() {
    for input in ["a=1&a[b]=2", "a[b]=1&a[0]=2", "a[0]=1&a[]=2", "a[b]=1&a=2"] {
        let err = QS.decode_str(input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MergeConflict, "{input}");
    }
}

#[test]
fn max_depth() {
    let config = QS.max_depth(1);
    let tree = config.decode_str("a[b][c][d]=1").unwrap();
    let b = tree.get("a").unwrap().get("b").unwrap();
    assert_eq!(b.get("[c][d]").and_then(RawNode::as_str), Some("1"));

    let config = QS.max_depth(0);
    let map: HashMap<String, String> = config.deserialize_str("a[b][c]=1").unwrap();
    assert_eq!(map["a[b][c]"], "1");
}

#[test]
fn max_index() {
    let config = QS.max_index(100);
    assert!(config.decode_str("a[100]=x").is_ok());
    let err = config.decode_str("a[101]=x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedKey);
}

#[test]
fn empty_and_valueless_pairs() {
    let map: BTreeMap<String, String> = QS.deserialize_str("&a=1&&b&c=&").unwrap();
    assert_eq!(
        map,
        BTreeMap::from([
            ("a".to_owned(), "1".to_owned()),
            ("b".to_owned(), String::new()),
            ("c".to_owned(), String::new()),
        ])
    );

    let map: BTreeMap<String, String> = QS.deserialize_str("").unwrap();
    assert!(map.is_empty());
}

#[test]
fn indexed_list_as_map() {
    let map: BTreeMap<u32, String> = QS.deserialize_str("1=a&5=b").unwrap();
    assert_eq!(map, BTreeMap::from([(1, "a".to_owned()), (5, "b".to_owned())]));

    #[derive(Debug, PartialEq, Deserialize)]
    struct Query {
        m: HashMap<u32, String>,
    }
    let query: Query = QS.deserialize_str("m[3]=c&m[1]=a").unwrap();
    assert_eq!(query.m, HashMap::from([(1, "a".to_owned()), (3, "c".to_owned())]));
}

#[test]
fn deserialize_enum() {
    #[derive(Debug, PartialEq, Deserialize)]
    #[serde(rename_all = "lowercase")]
    enum TestEnum {
        A,
        B(bool),
        C { x: u8, y: u8 },
        D(u8, u8),
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Query {
        e: TestEnum,
    }

    let cases = [
        ("e=a", TestEnum::A),
        ("e[b]=true", TestEnum::B(true)),
        ("e[c][x]=2&e[c][y]=3", TestEnum::C { x: 2, y: 3 }),
        ("e[d][0]=128&e[d][1]=1", TestEnum::D(128, 1)),
        ("e[d][]=128&e[d][]=1", TestEnum::D(128, 1)),
    ];
    for (input, e) in cases {
        let query: Query = QS.deserialize_str(input).unwrap();
        assert_eq!(query, Query { e }, "{input}");
    }

    let err = QS.deserialize_str::<Query>("e=z").unwrap_err();
    assert!(err.to_string().contains("unknown variant"), "{err}");
}

#[test]
fn strict_mode() {
    #[derive(Debug, PartialEq, Deserialize)]
    struct Query {
        a: u8,
    }
    let lax: Query = QS.deserialize_str("a=1&b=2").unwrap();
    assert_eq!(lax, Query { a: 1 });

    let strict = QS.prohibit_extra_properties(true);
    let err = strict.deserialize_str::<Query>("a=1&b=2&c[d]=3").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnmappedExtraProperties);
    insta::assert_snapshot!(err, @"unmapped properties for `Query`: b, c");

    // a flattened map collects the extra keys
    #[derive(Debug, PartialEq, Deserialize)]
    struct WithExtra {
        a: u8,
        #[serde(flatten)]
        extra: BTreeMap<String, String>,
    }
    let query: WithExtra = strict.deserialize_str("a=1&b=2").unwrap();
    assert_eq!(query.extra, BTreeMap::from([("b".to_owned(), "2".to_owned())]));
}

#[test]
fn incompatible_values() {
    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Query {
        n: u8,
        flag: bool,
    }
    let err = QS.deserialize_str::<Query>("n=300&flag=true").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleType);

    let err = QS.deserialize_str::<Query>("n=1&flag=yes").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleType);

    let err = QS.deserialize_str::<Query>("n[a]=1&flag=true").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleType);
}

#[test]
fn latin1_charset() {
    let config = QS.charset(Charset::Latin1);
    let map: HashMap<String, String> = config.deserialize_str("name=caf%E9").unwrap();
    assert_eq!(map["name"], "café");

    let map: HashMap<String, String> = QS.deserialize_str("name=caf%C3%A9").unwrap();
    assert_eq!(map["name"], "café");

    let err = QS.deserialize_str::<HashMap<String, String>>("name=caf%E9").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Utf8);
}

#[test]
fn top_level_decode() {
    let tree = serde_formtree::decode("a[b]=1").unwrap();
    assert_eq!(tree.get("a").unwrap().get("b").unwrap().as_str(), Some("1"));
    assert!(tree.as_mapping().is_some());
}

/// Flat input reads the same as with `serde_urlencoded`.
#[test]
fn flat_input_matches_serde_urlencoded() {
    #[derive(Debug, PartialEq, Deserialize)]
    struct Flat {
        first: u32,
        last: String,
        maybe: Option<String>,
    }
    for input in [
        "first=23&last=42",
        "first=23&last=a+b%26c&maybe=x",
        "last=%C3%A9t%C3%A9&first=0",
    ] {
        let ours: Flat = QS.deserialize_str(input).unwrap();
        let theirs: Flat = serde_urlencoded::from_str(input).unwrap();
        assert_eq!(ours, theirs, "{input}");
    }

    let ours: BTreeMap<String, String> = QS.deserialize_str("b=2&a=1").unwrap();
    let theirs: BTreeMap<String, String> = serde_urlencoded::from_str("b=2&a=1").unwrap();
    assert_eq!(ours, theirs);
}

#[test]
fn deserialize_untyped() {
    let value: serde_json::Value = QS
        .deserialize_str("a[b]=1&c[]=x&c[]=y&d=")
        .unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "a": { "b": "1" },
            "c": ["x", "y"],
            "d": "",
        })
    );
}
