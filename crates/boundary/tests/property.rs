use proptest::prelude::*;
use serde_json::json;
use shub_boundary::validator::StorageKey;
use shub_boundary::{
    Channel, CspOptions, IpcValue, ValidationError, build_content_security_policy, redact_args,
    validate,
};
use strum::IntoEnumIterator;

fn channel_names() -> Vec<String> {
    Channel::iter().map(|c| c.to_string()).collect()
}

fn arb_ipc_value() -> impl Strategy<Value = IpcValue> {
    let leaf = prop_oneof![
        Just(IpcValue::Undefined),
        Just(IpcValue::Null),
        any::<bool>().prop_map(IpcValue::Bool),
        any::<f64>().prop_map(IpcValue::Number),
        "[0-9]{1,30}".prop_map(IpcValue::BigInt),
        ".{0,400}".prop_map(IpcValue::String),
        Just(IpcValue::Symbol),
        Just(IpcValue::Function(None)),
        "[A-Z][a-z]{0,10}".prop_map(IpcValue::Foreign),
        Just(IpcValue::BackReference),
    ];
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..8).prop_map(IpcValue::Array),
            proptest::collection::vec(("[a-z]{1,8}", inner), 0..8).prop_map(IpcValue::Object),
        ]
    })
}

proptest! {
    #[test]
    fn unknown_channels_never_validate(name in "[a-z-]{1,40}") {
        prop_assume!(!channel_names().contains(&name));
        let err = validate(&name, &[]).unwrap_err();
        prop_assert_eq!(err, ValidationError::UnsupportedChannel { channel: name });
    }

    #[test]
    fn key_channels_demand_exactly_one_argument(extra in 2usize..6) {
        let args: Vec<IpcValue> = (0..extra).map(|_| IpcValue::from("k")).collect();
        for channel in ["store-get", "store-delete", "secure-store-get", "secure-store-delete"] {
            prop_assert_eq!(validate(channel, &[]).unwrap_err().kind(), "Arity");
            prop_assert_eq!(validate(channel, &args).unwrap_err().kind(), "Arity");
        }
    }

    #[test]
    fn keys_matching_the_pattern_are_accepted(key in "[a-zA-Z0-9._:-]{1,64}") {
        prop_assert!(StorageKey::parse(&key).is_ok());
        prop_assert!(validate("store-get", &[IpcValue::from(key.as_str())]).is_ok());
    }

    #[test]
    fn keys_with_other_characters_are_rejected(
        prefix in "[a-z]{0,8}",
        bad in "[ !@#$%^&*()+=/\\\\<>?,\\[\\]{}|~`'\"]",
    ) {
        let key = format!("{prefix}{bad}");
        prop_assert!(StorageKey::parse(&key).is_err());
    }

    #[test]
    fn csp_binds_exactly_the_supplied_nonce(nonce in "[A-Za-z0-9+/]{8,24}={0,2}") {
        let policy = build_content_security_policy(&CspOptions { nonce: &nonce, ..CspOptions::default() }).unwrap();
        let script = policy.split("; ").find(|d| d.starts_with("script-src ")).unwrap();
        prop_assert_eq!(script, format!("script-src 'self' 'nonce-{nonce}'"));
        prop_assert!(!policy.contains("'unsafe-inline'"));
        prop_assert!(!policy.contains("'unsafe-eval'"));
    }

    #[test]
    fn csp_requires_a_nonce(blank in "[ \t]{0,4}", development in any::<bool>()) {
        let options = CspOptions { is_development: development, nonce: &blank, style_hashes: &[] };
        prop_assert_eq!(build_content_security_policy(&options).unwrap_err().kind(), "InvalidArgument");
    }

    #[test]
    fn redaction_is_bounded_and_never_fails(args in proptest::collection::vec(arb_ipc_value(), 0..6)) {
        let preview = redact_args(&args);
        prop_assert!(preview.chars().count() <= 513);
        prop_assert!(!preview.contains('\0'));
    }

    #[test]
    fn validation_never_panics(
        index in 0usize..32,
        args in proptest::collection::vec(arb_ipc_value(), 0..3),
    ) {
        let names = channel_names();
        let _ = validate(&names[index % names.len()], &args);
    }
}

#[test]
fn every_channel_name_round_trips() {
    for channel in Channel::iter() {
        let arity_or_ok = validate(channel.as_ref(), &[]);
        if let Err(err) = arity_or_ok {
            assert_ne!(err.kind(), "UnsupportedChannel", "{channel} must be allowlisted");
        }
    }
}

#[test]
fn payloads_over_the_ceiling_are_rejected() {
    let chunk = "z".repeat(100_000);
    let over = IpcValue::from_wire(json!([chunk, chunk, chunk, chunk, chunk, chunk]));
    let under = IpcValue::from_wire(json!([chunk, chunk, chunk, chunk, chunk]));

    let err = validate("store-set", &["k".into(), over]).unwrap_err();
    assert_eq!(err.kind(), "Oversized");
    assert!(validate("store-set", &["k".into(), under]).is_ok());
}

#[test]
fn storage_key_examples() {
    assert!(StorageKey::parse("proj.cost:1").is_ok());
    assert!(StorageKey::parse("App.Theme").is_ok());
    assert_eq!(
        StorageKey::parse("bad key!").unwrap_err().to_string(),
        "storage key contains invalid characters"
    );
}
