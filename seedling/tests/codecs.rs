use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use seedling::json::{from_str, to_string};
use seedling::{
    CodecError, CodecRegistry, ConfigurationError, Describe, ErasedCodec, ScalarCodec,
    ScalarValue, SeedError, ValueCodec, metadata_for,
};
use time::macros::format_description;
use time::{Date, Month};

#[derive(Default)]
struct DateCodec;

impl ValueCodec for DateCodec {
    type Value = Date;

    fn to_raw(&self, value: &Date) -> Result<ScalarValue, CodecError> {
        value
            .format(format_description!("[day]-[month]-[year]"))
            .map(ScalarValue::Str)
            .map_err(|err| CodecError::new(err.to_string()))
    }

    fn from_raw(&self, raw: &ScalarValue) -> Result<Date, CodecError> {
        let text = raw
            .as_str()
            .ok_or_else(|| CodecError::new(format!("expected a date string, got {raw}")))?;
        Date::parse(text, format_description!("[day]-[month]-[year]"))
            .map_err(|_| CodecError::new(format!("`{text}` is not a day-month-year date")))
    }
}

#[derive(Describe, Debug, PartialEq)]
struct Event {
    title: String,
    #[seedling(codec = DateCodec)]
    on: Date,
}

#[test]
fn owned_codec_reads_and_writes() -> eyre::Result<()> {
    seedling_testhelpers::setup();

    let event: Event = from_str(r#"{"title": "Release", "on": "16-10-2026"}"#)?;
    assert_eq!(event.on, Date::from_calendar_date(2026, Month::October, 16)?);

    insta::assert_snapshot!(to_string(&event)?, @r#"{"title":"Release","on":"16-10-2026"}"#);
    Ok(())
}

#[test]
fn codec_errors_are_located() {
    seedling_testhelpers::setup();

    let err = from_str::<Event>(r#"{"title": "R", "on": "2026-10-16"}"#).unwrap_err();
    insta::assert_snapshot!(err, @r#"cannot convert string "2026-10-16" into Date for `Event.on`: DateCodec: `2026-10-16` is not a day-month-year date at $.on (bytes 21..33)"#);

    let err = from_str::<Event>(r#"{"title": "R", "on": 20261016}"#).unwrap_err();
    assert!(matches!(err.seed_error(), Some(SeedError::Conversion(_))));

    let err = from_str::<Event>(r#"{"title": "R", "on": ["16-10-2026"]}"#).unwrap_err();
    insta::assert_snapshot!(err, @"cannot convert an array into Date for `Event.on`: DateCodec only accepts scalars at $.on (bytes 21..22)");
}

static BUILT: AtomicUsize = AtomicUsize::new(0);

struct Counting;

impl Default for Counting {
    fn default() -> Self {
        BUILT.fetch_add(1, Ordering::SeqCst);
        Counting
    }
}

impl ValueCodec for Counting {
    type Value = u32;

    fn to_raw(&self, value: &u32) -> Result<ScalarValue, CodecError> {
        Ok(ScalarValue::U64(u64::from(*value)))
    }

    fn from_raw(&self, raw: &ScalarValue) -> Result<u32, CodecError> {
        match raw {
            ScalarValue::U64(n) => u32::try_from(*n).map_err(|err| CodecError::new(err.to_string())),
            other => Err(CodecError::new(format!("expected a count, got {other}"))),
        }
    }
}

#[derive(Describe, Debug, PartialEq)]
struct Pair {
    #[seedling(codec = Counting)]
    left: u32,
    #[seedling(codec = Counting)]
    right: u32,
}

fn custom(codec: &ScalarCodec) -> eyre::Result<&Arc<dyn ErasedCodec>> {
    match codec {
        ScalarCodec::Custom(codec) => Ok(codec),
        ScalarCodec::Default(ty) => Err(eyre::eyre!("{ty:?} has no codec attached")),
    }
}

#[test]
fn owned_codecs_are_built_once_per_field() -> eyre::Result<()> {
    seedling_testhelpers::setup();

    let meta = metadata_for::<Pair>()?;
    assert!(Arc::ptr_eq(&meta, &metadata_for::<Pair>()?));
    assert_eq!(BUILT.load(Ordering::SeqCst), 2);

    let structure = meta.as_struct().ok_or_else(|| eyre::eyre!("not a struct"))?;
    let left = custom(&structure.params()[0].codec)?;
    let right = custom(&structure.params()[1].codec)?;
    assert!(!Arc::ptr_eq(left, right));

    for _ in 0..3 {
        let pair: Pair = from_str(r#"{"left": 1, "right": 2}"#)?;
        assert_eq!(pair, Pair { left: 1, right: 2 });
    }
    assert_eq!(BUILT.load(Ordering::SeqCst), 2);
    Ok(())
}

struct Scaled {
    factor: i64,
}

impl ValueCodec for Scaled {
    type Value = i64;

    fn to_raw(&self, value: &i64) -> Result<ScalarValue, CodecError> {
        Ok(ScalarValue::I64(value / self.factor))
    }

    fn from_raw(&self, raw: &ScalarValue) -> Result<i64, CodecError> {
        let n = match raw {
            ScalarValue::I64(n) => *n,
            ScalarValue::U64(n) => i64::try_from(*n).map_err(|err| CodecError::new(err.to_string()))?,
            other => return Err(CodecError::new(format!("expected an integer, got {other}"))),
        };
        n.checked_mul(self.factor)
            .ok_or_else(|| CodecError::new("overflow"))
    }
}

#[derive(Describe, Debug, PartialEq)]
struct Reading {
    #[seedling(shared_codec = Scaled)]
    value: i64,
}

#[derive(Describe, Debug, PartialEq)]
struct Sample {
    label: String,
    #[seedling(shared_codec = Scaled)]
    value: i64,
}

#[test]
fn shared_codec_is_one_instance() -> eyre::Result<()> {
    seedling_testhelpers::setup();

    CodecRegistry::register_singleton(Scaled { factor: 10 });
    let singleton = CodecRegistry::singleton::<Scaled>().ok_or_else(|| eyre::eyre!("missing"))?;

    let reading = metadata_for::<Reading>()?;
    let sample = metadata_for::<Sample>()?;
    let reading = reading.as_struct().ok_or_else(|| eyre::eyre!("not a struct"))?;
    let sample = sample.as_struct().ok_or_else(|| eyre::eyre!("not a struct"))?;
    assert!(Arc::ptr_eq(custom(&reading.params()[0].codec)?, &singleton));
    assert!(Arc::ptr_eq(custom(&sample.params()[1].codec)?, &singleton));

    let value: Reading = from_str(r#"{"value": 3}"#)?;
    assert_eq!(value, Reading { value: 30 });
    let value: Sample = from_str(r#"{"label": "t", "value": -2}"#)?;
    assert_eq!(value.value, -20);
    assert_eq!(to_string(&value)?, r#"{"label":"t","value":-2}"#);
    Ok(())
}

#[derive(Default)]
struct Unregistered;

impl ValueCodec for Unregistered {
    type Value = String;

    fn to_raw(&self, value: &String) -> Result<ScalarValue, CodecError> {
        Ok(ScalarValue::Str(value.clone()))
    }

    fn from_raw(&self, raw: &ScalarValue) -> Result<String, CodecError> {
        Ok(raw.to_string())
    }
}

#[derive(Describe, Debug)]
struct Orphan {
    #[seedling(shared_codec = Unregistered)]
    value: String,
}

#[test]
fn unregistered_shared_codec_is_a_configuration_error() {
    seedling_testhelpers::setup();

    let err = from_str::<Orphan>(r#"{"value": "x"}"#).unwrap_err();
    assert!(matches!(
        err.seed_error(),
        Some(SeedError::Configuration(ConfigurationError::UnresolvedCodec {
            type_name: "Orphan",
            field: "value",
            ..
        }))
    ));

    // cached: registering afterwards does not repair the type
    CodecRegistry::register_singleton(Unregistered);
    assert!(metadata_for::<Orphan>().is_err());
}

static TAGGED_BUILT: AtomicUsize = AtomicUsize::new(0);

struct Tagged {
    prefix: &'static str,
}

impl Default for Tagged {
    fn default() -> Self {
        TAGGED_BUILT.fetch_add(1, Ordering::SeqCst);
        Tagged { prefix: "default" }
    }
}

impl ValueCodec for Tagged {
    type Value = String;

    fn to_raw(&self, value: &String) -> Result<ScalarValue, CodecError> {
        value
            .strip_prefix(self.prefix)
            .and_then(|rest| rest.strip_prefix(':'))
            .map(|rest| ScalarValue::Str(rest.to_owned()))
            .ok_or_else(|| CodecError::new(format!("`{value}` is not tagged {}", self.prefix)))
    }

    fn from_raw(&self, raw: &ScalarValue) -> Result<String, CodecError> {
        let text = raw
            .as_str()
            .ok_or_else(|| CodecError::new(format!("expected a string, got {raw}")))?;
        Ok(format!("{}:{text}", self.prefix))
    }
}

#[derive(Describe, Debug, PartialEq)]
struct Label {
    #[seedling(codec = Tagged)]
    text: String,
}

#[test]
fn registered_singleton_replaces_construction() -> eyre::Result<()> {
    seedling_testhelpers::setup();

    CodecRegistry::register_singleton(Tagged { prefix: "shared" });
    let singleton = CodecRegistry::singleton::<Tagged>().ok_or_else(|| eyre::eyre!("missing"))?;

    let meta = metadata_for::<Label>()?;
    let structure = meta.as_struct().ok_or_else(|| eyre::eyre!("not a struct"))?;
    assert!(Arc::ptr_eq(custom(&structure.params()[0].codec)?, &singleton));
    assert_eq!(TAGGED_BUILT.load(Ordering::SeqCst), 0);

    let label: Label = from_str(r#"{"text": "x"}"#)?;
    assert_eq!(label.text, "shared:x");
    assert_eq!(to_string(&label)?, r#"{"text":"x"}"#);
    assert_eq!(TAGGED_BUILT.load(Ordering::SeqCst), 0);
    Ok(())
}

#[derive(Default)]
struct Nickname;

impl ValueCodec for Nickname {
    type Value = Option<String>;

    fn to_raw(&self, value: &Option<String>) -> Result<ScalarValue, CodecError> {
        Ok(match value {
            Some(nick) => ScalarValue::Str(nick.to_uppercase()),
            None => ScalarValue::Null,
        })
    }

    fn from_raw(&self, raw: &ScalarValue) -> Result<Option<String>, CodecError> {
        match raw {
            ScalarValue::Null => Ok(None),
            ScalarValue::Str(nick) => Ok(Some(nick.to_lowercase())),
            other => Err(CodecError::new(format!("expected a nickname, got {other}"))),
        }
    }
}

#[derive(Describe, Debug, PartialEq)]
struct Member {
    name: String,
    #[seedling(codec = Nickname)]
    nick: Option<String>,
}

#[test]
fn optional_codec_fields_default_to_none() -> eyre::Result<()> {
    seedling_testhelpers::setup();

    let member: Member = from_str(r#"{"name": "a"}"#)?;
    assert_eq!(
        member,
        Member {
            name: "a".into(),
            nick: None
        }
    );

    let member: Member = from_str(r#"{"name": "a", "nick": "ACE"}"#)?;
    assert_eq!(member.nick.as_deref(), Some("ace"));

    let member: Member = from_str(r#"{"name": "a", "nick": null}"#)?;
    assert_eq!(member.nick, None);

    let meta = metadata_for::<Member>()?;
    let structure = meta.as_struct().ok_or_else(|| eyre::eyre!("not a struct"))?;
    assert!(structure.params()[1].has_default());
    Ok(())
}
