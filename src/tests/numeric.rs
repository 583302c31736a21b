use crate::numeric::{format_decimal, parse_decimal};

#[test]
fn test_format_decimal() {
    let mut buf = [0u8; 12];
    assert_eq!("0", format_decimal(0, &mut buf));
    assert_eq!("7", format_decimal(7, &mut buf));
    assert_eq!("80", format_decimal(80, &mut buf));
    assert_eq!("1500", format_decimal(1500, &mut buf));
    assert_eq!("-66", format_decimal(-66, &mut buf));
    assert_eq!("2147483647", format_decimal(i32::MAX, &mut buf));
    assert_eq!("-2147483648", format_decimal(i32::MIN, &mut buf));
}

#[test]
fn test_parse_decimal() {
    assert_eq!(0, parse_decimal(""));
    assert_eq!(0, parse_decimal("x"));
    assert_eq!(0, parse_decimal("0"));
    assert_eq!(180, parse_decimal("180"));
    assert_eq!(-66, parse_decimal("-66"));
    assert_eq!(42, parse_decimal("42abc"));
    assert_eq!(i32::MAX, parse_decimal("2147483647"));
    assert_eq!(i32::MIN, parse_decimal("-2147483648"));
}

#[test]
fn test_round_trip() {
    let mut buf = [0u8; 12];
    for text in ["0", "1", "9", "42", "180", "1500", "-1", "-66", "2147483647", "-2147483648"] {
        assert_eq!(text, format_decimal(parse_decimal(text), &mut buf));
    }
}
