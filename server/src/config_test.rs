use super::*;

// =============================================================================
// env_bool: uses unique env var names to avoid races with parallel tests.
// =============================================================================

#[test]
fn env_bool_true_variants() {
    for (i, val) in ["1", "true", "yes", "on"].iter().enumerate() {
        let key = format!("__TS_EB_TRUE_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(true), "expected true for {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_false_variants() {
    for (i, val) in ["0", "false", "no", "off"].iter().enumerate() {
        let key = format!("__TS_EB_FALSE_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(false), "expected false for {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_invalid_or_unset_is_none() {
    let key = "__TS_EB_INVALID_311__";
    unsafe { std::env::set_var(key, "maybe") };
    assert_eq!(env_bool(key), None);
    unsafe { std::env::remove_var(key) };
    assert_eq!(env_bool("__TS_EB_SURELY_UNSET_311__"), None);
}

// =============================================================================
// env_parse
// =============================================================================

#[test]
fn env_parse_reads_trimmed_value() {
    let key = "__TS_EP_OK_512__";
    unsafe { std::env::set_var(key, " 42 ") };
    assert_eq!(env_parse::<u16>(key).expect("parse"), Some(42));
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_unset_or_blank_is_none() {
    assert_eq!(env_parse::<u16>("__TS_EP_UNSET_512__").expect("parse"), None);
    let key = "__TS_EP_BLANK_512__";
    unsafe { std::env::set_var(key, "  ") };
    assert_eq!(env_parse::<u16>(key).expect("parse"), None);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_rejects_garbage() {
    let key = "__TS_EP_BAD_512__";
    unsafe { std::env::set_var(key, "twenty") };
    let err = env_parse::<u16>(key).expect_err("should fail");
    assert!(matches!(err, ConfigError::Invalid { key: "__TS_EP_BAD_512__", .. }));
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_decimal_rate() {
    let key = "__TS_EP_RATE_512__";
    unsafe { std::env::set_var(key, "12.5") };
    assert_eq!(env_parse::<Decimal>(key).expect("parse"), Some(Decimal::new(125, 1)));
    unsafe { std::env::remove_var(key) };
}

// =============================================================================
// URLs
// =============================================================================

#[test]
fn qr_url_with_and_without_table() {
    let config = test_helpers::test_config();
    let owner = uuid::Uuid::nil();
    assert_eq!(
        config.qr_url(owner, Some(7)),
        format!("http://localhost:3000/qr?restaurant={owner}&table=7")
    );
    assert_eq!(config.qr_url(owner, None), format!("http://localhost:3000/qr?restaurant={owner}"));
}

#[test]
fn uploads_base_url() {
    assert_eq!(test_helpers::test_config().uploads_base_url(), "http://localhost:3000/uploads");
}
