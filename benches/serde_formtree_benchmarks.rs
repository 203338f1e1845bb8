use criterion::{Criterion, black_box, criterion_group, criterion_main};
use serde::{Deserialize, Serialize};
use serde_formtree::{
    Config, Describe, ListStyle, StructDescription, StructRef, TypeDescription,
};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SimpleStruct {
    active: bool,
    id: u32,
    name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Address {
    city: String,
    postcode: String,
    street: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct QueryParams {
    address: Address,
    id: u8,
    name: String,
    phone: u32,
    user_ids: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VecWrapper {
    items: Vec<u32>,
}

const NESTED_QUERY: &str = "id=42&name=Acme&phone=12345&address[city]=Carrot+City&\
    address[street]=Special-Street*+No.+11&address[postcode]=12345&\
    user_ids[0]=1&user_ids[1]=2&user_ids[2]=3&user_ids[3]=4";

fn nested_params() -> QueryParams {
    QueryParams {
        id: 42,
        name: "Acme".to_string(),
        phone: 12345,
        address: Address {
            city: "Carrot City".to_string(),
            street: "Special-Street* No. 11".to_string(),
            postcode: "12345".to_string(),
        },
        user_ids: vec![1, 2, 3, 4],
    }
}

fn large_query(style: ListStyle) -> String {
    let data = VecWrapper {
        items: (0..100).collect(),
    };
    Config::new()
        .use_form_encoding(false)
        .list_style(style)
        .serialize_string(&data)
        .unwrap()
}

fn decode_tree(c: &mut Criterion) {
    c.bench_function("decode_nested_tree", |b| {
        b.iter(|| serde_formtree::decode(black_box(NESTED_QUERY)).unwrap())
    });

    for (name, style) in [
        ("decode_explicit_list", ListStyle::Explicit),
        ("decode_implicit_list", ListStyle::Implicit),
        ("decode_hidden_list", ListStyle::Hidden),
    ] {
        let query = large_query(style);
        c.bench_function(name, |b| {
            b.iter(|| serde_formtree::decode(black_box(&query)).unwrap())
        });
    }
}

fn deserialize(c: &mut Criterion) {
    let query = "id=42&name=test_user&active=true";
    c.bench_function("deserialize_simple_struct", |b| {
        b.iter(|| {
            let _: SimpleStruct = serde_formtree::from_str(black_box(query)).unwrap();
        })
    });

    c.bench_function("deserialize_nested_struct", |b| {
        b.iter(|| {
            let _: QueryParams = serde_formtree::from_str(black_box(NESTED_QUERY)).unwrap();
        })
    });

    let query = large_query(ListStyle::Explicit);
    c.bench_function("deserialize_large_vec", |b| {
        b.iter(|| {
            let _: VecWrapper = serde_formtree::from_str(black_box(&query)).unwrap();
        })
    });
}

fn serialize(c: &mut Criterion) {
    let data = nested_params();
    c.bench_function("serialize_nested_struct", |b| {
        b.iter(|| serde_formtree::to_string(black_box(&data)).unwrap())
    });

    let data = VecWrapper {
        items: (0..100).collect(),
    };
    c.bench_function("serialize_large_vec", |b| {
        b.iter(|| serde_formtree::to_string(black_box(&data)).unwrap())
    });
}

fn address() -> StructDescription {
    StructDescription::new("Address")
        .field("city", String::describe())
        .field("postcode", String::describe())
        .field("street", String::describe())
}

fn query_params() -> StructDescription {
    StructDescription::new("QueryParams")
        .field("address", TypeDescription::NamedStructure(StructRef::new(address)))
        .field("id", i8::describe())
        .field("name", String::describe())
        .field("phone", i32::describe())
        .field("user_ids", Vec::<i8>::describe())
}

fn schema(c: &mut Criterion) {
    let config = Config::new();
    let ty = TypeDescription::NamedStructure(StructRef::new(query_params));

    c.bench_function("decode_value_nested_struct", |b| {
        b.iter(|| config.decode_value(black_box(NESTED_QUERY), &ty).unwrap())
    });

    let value = config.decode_value(NESTED_QUERY, &ty).unwrap();
    c.bench_function("encode_value_nested_struct", |b| {
        b.iter(|| config.encode_value(black_box(&value), &ty).unwrap())
    });
}

// only flat structures work with serde_urlencoded
fn comparison(c: &mut Criterion) {
    let data = SimpleStruct {
        id: 42,
        name: "test_user".to_string(),
        active: true,
    };
    c.bench_function("comparison_simple_struct_serde_formtree_serialize", |b| {
        b.iter(|| serde_formtree::to_string(black_box(&data)).unwrap())
    });
    c.bench_function("comparison_simple_struct_serde_urlencoded_serialize", |b| {
        b.iter(|| serde_urlencoded::to_string(black_box(&data)).unwrap())
    });

    let query = "key1=value1&key2=value2&key3=value3";
    c.bench_function("comparison_hashmap_serde_formtree_deserialize", |b| {
        b.iter(|| {
            let _: HashMap<String, String> = serde_formtree::from_str(black_box(query)).unwrap();
        })
    });
    c.bench_function("comparison_hashmap_serde_urlencoded_deserialize", |b| {
        b.iter(|| {
            let _: HashMap<String, String> =
                serde_urlencoded::from_str(black_box(query)).unwrap();
        })
    });
}

criterion_group!(trees, decode_tree);
criterion_group!(typed, deserialize, serialize, schema);
criterion_group!(compare, comparison);

criterion_main!(trees, typed, compare);
