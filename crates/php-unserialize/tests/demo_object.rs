//! Projection of a serialized `Demo\Ns\DemoA` instance.

use std::collections::HashMap;

use php_unserialize::{
    decode, decode_into, php_record, private_field, split_field_name, Error, ErrorKind, Value,
    Visibility,
};

// serialize(new DemoA("123", 3434)) where `a` is private
const DEMO: &[u8] = b"O:13:\"Demo\\Ns\\DemoA\":4:{s:16:\"\0Demo\\Ns\\DemoA\0a\";s:3:\"123\";s:1:\"b\";i:3434;s:1:\"m\";a:2:{s:1:\"d\";i:123;s:1:\"c\";s:1:\"f\";}s:4:\"list\";a:4:{i:0;i:1;i:1;i:2;i:2;i:3;i:3;i:4;}}";

#[derive(Debug, Default)]
struct DemoA {
    a: String,
    b: i64,
    m: HashMap<String, Value>,
    list: Vec<i64>,
}

php_record!(DemoA {
    a => "\0Demo\\Ns\\DemoA\0a",
    b => "b",
    m => "m",
    list => "list",
});

#[derive(Debug, Default)]
struct PublicOnly {
    a: String,
    b: i64,
}

php_record!(PublicOnly {
    a => "a",
    b => "b",
});

#[derive(Debug, Default)]
struct Wrapper {
    label: String,
    demo: DemoA,
}

php_record!(Wrapper {
    label => "label",
    demo => "demo",
});

#[test]
fn decodes_demo_object() {
    let value = decode(DEMO).unwrap();
    let fields = value.as_object().unwrap();
    assert_eq!(fields.len(), 4);

    let private_key = private_field("Demo\\Ns\\DemoA", "a");
    assert_eq!(fields.get(&private_key), Some(&Value::Str("123".into())));
    assert_eq!(
        split_field_name(&private_key),
        (Visibility::Private, Some("Demo\\Ns\\DemoA"), "a")
    );
    assert_eq!(
        value.get("list"),
        Some(&Value::List((1..=4).map(Value::Int).collect()))
    );
}

#[test]
fn projects_all_fields() {
    let mut demo = DemoA::default();
    decode_into(DEMO, &mut demo).unwrap();

    assert_eq!(demo.a, "123");
    assert_eq!(demo.b, 3434);
    assert_eq!(demo.m.get("d"), Some(&Value::Int(123)));
    assert_eq!(demo.m.get("c"), Some(&Value::Str("f".into())));
    assert_eq!(demo.list, vec![1, 2, 3, 4]);
}

#[test]
fn plain_tag_does_not_match_private_field() {
    let mut public = PublicOnly {
        a: "untouched".into(),
        b: 0,
    };
    decode_into(DEMO, &mut public).unwrap();
    assert_eq!(public.a, "untouched");
    assert_eq!(public.b, 3434);
}

#[test]
fn projects_nested_object() {
    let mut data = b"a:2:{s:5:\"label\";s:2:\"hi\";s:4:\"demo\";".to_vec();
    data.extend_from_slice(DEMO);
    data.push(b'}');

    let mut wrapper = Wrapper::default();
    decode_into(&data, &mut wrapper).unwrap();
    assert_eq!(wrapper.label, "hi");
    assert_eq!(wrapper.demo.a, "123");
    assert_eq!(wrapper.demo.list.len(), 4);
}

#[test]
fn damaged_input_leaves_target_alone() {
    let mut shrunk = DEMO.to_vec();
    // s:3:"123" -> s:2:"123"
    let at = shrunk.windows(5).position(|w| w == b"s:3:\"").unwrap();
    shrunk[at + 2] = b'2';

    let mut demo = DemoA::default();
    let err = decode_into(&shrunk, &mut demo).unwrap_err();
    assert!(matches!(
        err,
        Error::Decode(ref e)
            if e.kind == (ErrorKind::StringLengthMismatch { expected: 2, found: 3 })
    ));
    assert_eq!(demo.b, 0);

    let unclosed = &DEMO[..DEMO.len() - 1];
    assert!(decode_into(unclosed, &mut demo).is_err());
    assert!(demo.a.is_empty());
}
