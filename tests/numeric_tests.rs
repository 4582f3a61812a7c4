// Canonical integer detection tests
// Only text that prints back to itself may be stored as an integer entry.

use list_engine::End;
use list_engine::compact::encoding::parse_canonical_i64;
use list_engine::compact::{CompactList, Encoding, try_numeric_encode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// =============================================================================
// Test 1: Canonical forms are accepted
// =============================================================================
#[test]
fn accepts_canonical_integers() {
    assert_eq!(parse_canonical_i64(b"0"), Some(0));
    assert_eq!(parse_canonical_i64(b"7"), Some(7));
    assert_eq!(parse_canonical_i64(b"-1"), Some(-1));
    assert_eq!(parse_canonical_i64(b"123456"), Some(123_456));
    assert_eq!(parse_canonical_i64(b"9223372036854775807"), Some(i64::MAX));
    assert_eq!(parse_canonical_i64(b"-9223372036854775808"), Some(i64::MIN));
}

// =============================================================================
// Test 2: Anything that would not print back identically is rejected
// =============================================================================
#[test]
fn rejects_non_canonical_text() {
    for bad in [
        &b""[..],
        b"-",
        b"+1",
        b"01",
        b"00",
        b"-0",
        b"-01",
        b" 1",
        b"1 ",
        b"1a",
        b"0x10",
        b"1.0",
        b"1e3",
        b"9223372036854775808",
        b"-9223372036854775809",
        b"99999999999999999999",
        b"123456789012345678901234",
    ] {
        assert_eq!(
            parse_canonical_i64(bad),
            None,
            "{:?} must not parse",
            String::from_utf8_lossy(bad)
        );
    }
}

// =============================================================================
// Test 3: Every i64 printed in decimal parses back to itself
// =============================================================================
#[test]
fn decimal_text_of_any_i64_parses_back() {
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..10_000 {
        let v: i64 = rng.gen_range(i64::MIN..=i64::MAX);
        assert_eq!(parse_canonical_i64(v.to_string().as_bytes()), Some(v));
    }
}

// =============================================================================
// Test 4: Encoding widths follow the value's range
// =============================================================================
#[test]
fn numeric_encode_picks_smallest_width() {
    let cases: [(&[u8], Encoding); 12] = [
        (b"0", Encoding::Imm),
        (b"12", Encoding::Imm),
        (b"13", Encoding::Int8),
        (b"-1", Encoding::Int8),
        (b"127", Encoding::Int8),
        (b"-128", Encoding::Int8),
        (b"128", Encoding::Int16),
        (b"32768", Encoding::Int24),
        (b"-8388608", Encoding::Int24),
        (b"8388608", Encoding::Int32),
        (b"2147483648", Encoding::Int64),
        (b"-9223372036854775808", Encoding::Int64),
    ];
    for (text, expected) in cases {
        let (_, enc) = try_numeric_encode(text).unwrap();
        assert_eq!(enc, expected, "{:?}", String::from_utf8_lossy(text));
    }
    assert!(try_numeric_encode(b"012").is_none());
}

// =============================================================================
// Test 5: Stored values read back byte for byte, numeric or not
// =============================================================================
#[test]
fn stored_text_reads_back_verbatim() {
    let inputs: Vec<&[u8]> = vec![
        &b"0"[..], b"-0", b"00", b"+5", b"5", b"-5", b"12", b"13", b"255", b"-129", b"65536",
        b"-8388609", b"4294967296", b"9223372036854775807", b"9223372036854775808", b" 1",
    ];
    let mut list = CompactList::new();
    for v in &inputs {
        list.push(v, End::Tail);
    }
    let back: Vec<Vec<u8>> = list.iter().map(|v| v.to_vec()).collect();
    let expected: Vec<Vec<u8>> = inputs.iter().map(|v| v.to_vec()).collect();
    assert_eq!(back, expected);
    assert!(list.validate());
}
