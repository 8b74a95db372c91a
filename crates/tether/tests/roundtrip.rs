//! Value round trips between host and foreign representations

use tether::{to_foreign, to_host, Bytes, FromHost, ForeignValue, HostValue, IntoHost, MemoryRealm, Realm};

fn roundtrip<T: IntoHost + FromHost>(realm: &MemoryRealm, value: T) -> T {
    let foreign = to_foreign(realm, &value.into_host()).unwrap();
    T::from_host(to_host(realm, foreign).unwrap()).unwrap()
}

#[test]
fn test_scalar_roundtrip() {
    let realm = MemoryRealm::new();
    assert_eq!(roundtrip(&realm, 42i64), 42);
    assert_eq!(roundtrip(&realm, -7i32), -7);
    assert_eq!(roundtrip(&realm, 300u16), 300);
    assert_eq!(roundtrip(&realm, 1.25f64), 1.25);
    assert!(roundtrip(&realm, true));
    assert_eq!(roundtrip(&realm, "héllo".to_string()), "héllo");
    assert_eq!(roundtrip(&realm, String::new()), "");
}

#[test]
fn test_wide_integer_rounds_to_nearest_float() {
    let realm = MemoryRealm::new();
    let wide = (1i64 << 53) + 1;
    assert_eq!(roundtrip(&realm, wide), 1i64 << 53);
    let big = u64::MAX;
    let foreign = to_foreign(&realm, &HostValue::Uint(big)).unwrap();
    assert_eq!(foreign, ForeignValue::Number(big as f64));
}

#[test]
fn test_numbers_decode_as_float() {
    let realm = MemoryRealm::new();
    let foreign = to_foreign(&realm, &HostValue::Int(3)).unwrap();
    assert_eq!(to_host(&realm, foreign).unwrap(), HostValue::Float(3.0));
}

#[test]
fn test_bytes_are_strings() {
    let realm = MemoryRealm::new();
    let bytes = Bytes(b"raw\x01data".to_vec());
    let foreign = to_foreign(&realm, &bytes.clone().into_host()).unwrap();
    assert_eq!(realm.type_of(foreign), tether::ForeignType::String);
    assert_eq!(realm.read_string(foreign).unwrap(), "raw\u{1}data");
    assert_eq!(Bytes::from_host(to_host(&realm, foreign).unwrap()).unwrap(), bytes);
}

#[test]
fn test_invalid_utf8_is_replaced() {
    let realm = MemoryRealm::new();
    let foreign = to_foreign(&realm, &HostValue::Bytes(vec![b'a', 0xff])).unwrap();
    assert_eq!(realm.read_string(foreign).unwrap(), "a\u{fffd}");
}

#[test]
fn test_sequence_roundtrip() {
    let realm = MemoryRealm::new();
    let values = vec!["a".to_string(), "b".to_string()];
    assert_eq!(roundtrip(&realm, values.clone()), values);
    assert_eq!(roundtrip(&realm, vec![1i64, 2, 3]), vec![1, 2, 3]);
}

#[test]
fn test_structural_object_decode() {
    let realm = MemoryRealm::new();
    let obj = realm.json_parse(r#"{"x":1,"y":[1,2,3]}"#).unwrap();
    let host = to_host(&realm, obj).unwrap();
    assert_eq!(host.get("x"), Some(&HostValue::Float(1.0)));
    assert_eq!(
        host.get("y"),
        Some(&HostValue::Seq(vec![
            HostValue::Float(1.0),
            HostValue::Float(2.0),
            HostValue::Float(3.0)
        ]))
    );
}

#[test]
fn test_nested_map_decode() {
    let realm = MemoryRealm::new();
    let obj = realm.json_parse(r#"{"inner":{"ok":true,"none":null}}"#).unwrap();
    let host = to_host(&realm, obj).unwrap();
    let inner = host.get("inner").unwrap();
    assert_eq!(inner.get("ok"), Some(&HostValue::Bool(true)));
    assert_eq!(inner.get("none"), Some(&HostValue::Nil));
}

#[test]
fn test_nil_and_null() {
    let realm = MemoryRealm::new();
    assert_eq!(to_foreign(&realm, &HostValue::Nil).unwrap(), ForeignValue::Undefined);
    assert_eq!(roundtrip(&realm, Option::<i64>::None), None);
    assert_eq!(roundtrip(&realm, Some(4i64)), Some(4));
}
