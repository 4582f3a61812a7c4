// Configuration tests
// Option defaults, builders and the `name value` text format.

use list_engine::{DB, End, Error, ListEncoding, Options};

// =============================================================================
// Test 1: Defaults
// =============================================================================
#[test]
fn defaults() {
    let options = Options::default();
    assert_eq!(options.list_limits.max_compact_entries, 128);
    assert_eq!(options.list_limits.max_compact_value, 64);
    assert_eq!(options.databases, 16);
}

// =============================================================================
// Test 2: Builders
// =============================================================================
#[test]
fn builders() {
    let options = Options::default()
        .with_max_compact_entries(8)
        .with_max_compact_value(16)
        .with_databases(2);
    assert_eq!(options.list_limits.max_compact_entries, 8);
    assert_eq!(options.list_limits.max_compact_value, 16);
    assert_eq!(options.databases, 2);
}

// =============================================================================
// Test 3: Parse a config file with comments and blank lines
// =============================================================================
#[test]
fn parse_text() {
    let text = "
        # list tuning
        list-max-ziplist-entries 512

        LIST-MAX-ZIPLIST-VALUE   32
        databases 4
    ";
    let options = Options::parse(text).unwrap();
    assert_eq!(options.list_limits.max_compact_entries, 512);
    assert_eq!(options.list_limits.max_compact_value, 32);
    assert_eq!(options.databases, 4);
}

// =============================================================================
// Test 4: Unknown names and bad values are rejected
// =============================================================================
#[test]
fn parse_errors() {
    assert!(matches!(Options::parse("maxmemory 10"), Err(Error::Config(_))));
    assert!(matches!(Options::parse("databases zero"), Err(Error::Config(_))));
    assert!(matches!(Options::parse("databases 0"), Err(Error::Config(_))));
    assert!(matches!(Options::parse("list-max-ziplist-value -1"), Err(Error::Config(_))));
    assert!(matches!(Options::parse("databases"), Err(Error::Config(_))));
    assert!(matches!(Options::parse("databases 1 2"), Err(Error::Config(_))));
}

// =============================================================================
// Test 5: set() leaves options untouched on error
// =============================================================================
#[test]
fn set_is_all_or_nothing() {
    let mut options = Options::default();
    assert!(options.set("list-max-ziplist-entries", "nope").is_err());
    assert_eq!(options, Options::default());
    options.set("list-max-ziplist-entries", "3").unwrap();
    assert_eq!(options.list_limits.max_compact_entries, 3);
}

// =============================================================================
// Test 6: Limits flow through to the store
// =============================================================================
#[test]
fn limits_apply_to_db() {
    let mut db = DB::new(Options::default().with_max_compact_entries(2).with_databases(1));
    db.push(0, b"k", &[b"a", b"b"], End::Tail).unwrap();
    assert_eq!(db.encoding_of(0, b"k").unwrap(), Some(ListEncoding::Compact));
    db.push(0, b"k", &[b"c"], End::Tail).unwrap();
    assert_eq!(db.encoding_of(0, b"k").unwrap(), Some(ListEncoding::Linked));
    assert_eq!(db.push(1, b"k", &[b"x"], End::Tail), Err(Error::InvalidDb(1)));
}
