use indoc::indoc;
use seedling_format::SeedError;
use seedling_json::{DeserializeError, JsonErrorKind, from_str, to_string};

#[test]
fn scalars_and_sequences() -> eyre::Result<()> {
    seedling_testhelpers::setup();

    assert_eq!(from_str::<u8>("200")?, 200);
    assert_eq!(from_str::<i64>("-9000")?, -9000);
    assert_eq!(from_str::<f32>("2")?, 2.0);
    assert_eq!(from_str::<String>(r#""aé""#)?, "aé");
    assert_eq!(from_str::<Option<bool>>("null")?, None);
    assert_eq!(
        from_str::<Vec<Vec<u32>>>(indoc! {"
            [
              [1, 2],
              [],
              [3]
            ]
        "})?,
        vec![vec![1, 2], vec![], vec![3]]
    );
    Ok(())
}

#[test]
fn round_trip() -> eyre::Result<()> {
    seedling_testhelpers::setup();

    let value = vec![Some("x".to_string()), None, Some("\"y\"".to_string())];
    let json = to_string(&value)?;
    assert_eq!(json, r#"["x",null,"\"y\""]"#);
    assert_eq!(from_str::<Vec<Option<String>>>(&json)?, value);
    Ok(())
}

#[test]
fn out_of_range_numbers_are_conversion_errors() {
    seedling_testhelpers::setup();

    let err = from_str::<Vec<u8>>("[1, 300]").unwrap_err();
    assert!(matches!(err.seed_error(), Some(SeedError::Conversion(_))));
    assert_eq!(err.path().map(ToString::to_string).as_deref(), Some("$[1]"));
    insta::assert_snapshot!(err, @"cannot convert integer 300 into u8 for `Vec[1]`: out of range for u8 at $[1] (bytes 4..7)");
}

#[test]
fn syntax_errors_come_from_the_parser() {
    seedling_testhelpers::setup();

    let err = from_str::<Vec<u8>>("[1, 2").unwrap_err();
    let DeserializeError::Parser(err) = err else {
        panic!("expected a parser error, got {err}");
    };
    assert_eq!(
        err.kind,
        JsonErrorKind::UnexpectedEof {
            expected: "',' or ']'"
        }
    );
}
