//! Struct and interface projection through a realm

use tether::{
    Converter, BridgeOptions, ForeignValue, HostValue, InterfaceValue, IntoHost, MemoryRealm, Realm, Record,
    RecordType, Shared,
};

#[derive(Clone, Debug, Default)]
struct Account {
    balance: i64,
    owner: String,
    pin: String,
}

impl Record for Account {
    const NAME: &'static str = "Account";

    fn record_type() -> RecordType<Self> {
        RecordType::new()
            .field("Balance", |a: &Account| a.balance)
            .field("Owner", |a: &Account| a.owner.clone())
            .private_field("pin", |a: &Account| a.pin.clone())
            .method("Balance", |a: &Account, (): ()| a.balance)
            .method("Describe", |a: &Account, (prefix,): (String,)| format!("{}{}", prefix, a.owner))
            .method_mut("Deposit", |a: &mut Account, (amount,): (i64,)| {
                a.balance += amount;
                a.balance
            })
            .method_mut("Transfer", |a: &mut Account, (amount, memo): (i64, String)| {
                a.balance -= amount;
                memo
            })
    }
}

#[derive(Clone, Default)]
struct Pair {
    a: i64,
    b: String,
}

impl Record for Pair {
    const NAME: &'static str = "Pair";

    fn record_type() -> RecordType<Self> {
        RecordType::new()
            .field("A", |p: &Pair| p.a)
            .private_field("b", |p: &Pair| p.b.clone())
    }
}

fn call(realm: &MemoryRealm, obj: ForeignValue, method: &str, args: &[ForeignValue]) -> ForeignValue {
    let f = realm.get_property(obj, method).unwrap();
    realm.call(f, obj, args).unwrap()
}

#[test]
fn test_only_exported_fields_lowercased() {
    let realm = MemoryRealm::new();
    let conv = Converter::new(&realm, BridgeOptions::default());
    let projected = conv
        .project_struct(&HostValue::record(Pair { a: 1, b: "hidden".into() }))
        .unwrap();
    assert_eq!(projected.keys(), vec!["a"]);
    assert!(!projected.contains("b"));
    assert!(!projected.contains("A"));
}

#[test]
fn test_methods_override_fields_of_same_name() {
    let realm = MemoryRealm::new();
    let conv = Converter::new(&realm, BridgeOptions::default());
    let projected = conv
        .project_struct(&HostValue::record(Account { balance: 5, ..Default::default() }))
        .unwrap();
    assert_eq!(projected.keys(), vec!["balance", "owner", "describe", "deposit", "transfer"]);
    assert!(realm.is_function(projected.get("balance").unwrap()));
}

#[test]
fn test_fewer_arguments_are_zero_filled() {
    let realm = MemoryRealm::new();
    let account = Shared::new(Account { balance: 10, owner: "ann".into(), pin: String::new() });
    let obj = tether::to_foreign(&realm, &account.clone().into_host()).unwrap();

    let memo = call(&realm, obj, "transfer", &[]);
    assert_eq!(realm.read_string(memo).unwrap(), "");
    assert_eq!(account.borrow().balance, 10);

    let described = call(&realm, obj, "describe", &[]);
    assert_eq!(realm.read_string(described).unwrap(), "ann");
}

#[test]
fn test_pointer_projections_share_state() {
    let realm = MemoryRealm::new();
    let account = Shared::new(Account::default());
    let first = tether::to_foreign(&realm, &account.clone().into_host()).unwrap();
    let second = tether::to_foreign(&realm, &account.clone().into_host()).unwrap();

    call(&realm, first, "deposit", &[ForeignValue::Number(3.0)]);
    let seen = call(&realm, second, "deposit", &[ForeignValue::Number(4.0)]);
    assert_eq!(seen, ForeignValue::Number(7.0));
    assert_eq!(account.borrow().balance, 7);
}

#[test]
fn test_value_projections_are_independent() {
    let realm = MemoryRealm::new();
    let original = Account::default();
    let value = HostValue::record(original.clone());
    let first = tether::to_foreign(&realm, &value).unwrap();
    let second = tether::to_foreign(&realm, &value).unwrap();

    call(&realm, first, "deposit", &[ForeignValue::Number(3.0)]);
    let seen = call(&realm, second, "deposit", &[ForeignValue::Number(4.0)]);
    assert_eq!(seen, ForeignValue::Number(4.0));
    assert_eq!(call(&realm, first, "balance", &[]), ForeignValue::Number(3.0));
    assert_eq!(original.balance, 0);
}

#[test]
fn test_interface_exposes_declared_methods_only() {
    let realm = MemoryRealm::new();
    let account = Shared::new(Account { balance: 8, ..Default::default() });
    let iface = InterfaceValue::from_shared("Balancer", &["Balance", "Deposit"], &account);
    let obj = tether::to_foreign(&realm, &HostValue::Interface(iface)).unwrap();

    let mut keys = realm.property_keys(obj).unwrap();
    keys.sort();
    assert_eq!(keys, vec!["balance".to_string(), "deposit".to_string()]);
    call(&realm, obj, "deposit", &[ForeignValue::Number(2.0)]);
    assert_eq!(account.borrow().balance, 10);
}

#[test]
fn test_nested_record_field() {
    #[derive(Clone, Default)]
    struct Outer {
        inner: Pair,
    }

    impl Record for Outer {
        const NAME: &'static str = "Outer";

        fn record_type() -> RecordType<Self> {
            RecordType::new().field("Inner", |o: &Outer| HostValue::record(o.inner.clone()))
        }
    }

    let realm = MemoryRealm::new();
    let obj = tether::to_foreign(&realm, &HostValue::record(Outer { inner: Pair { a: 4, b: String::new() } })).unwrap();
    let inner = realm.get_property(obj, "inner").unwrap();
    assert_eq!(realm.get_property(inner, "a").unwrap(), ForeignValue::Number(4.0));
    assert_eq!(realm.get_property(inner, "b").unwrap(), ForeignValue::Undefined);
}
