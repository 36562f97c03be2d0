//! Blank-as-absent normalization at the form boundary.
//!
//! Form controls report an untouched select or input as `""`. These helpers
//! turn that into `None` once, when input is deserialized or when a DTO is
//! produced, so the rest of the crate only sees `Option`s.

use chrono::{DateTime, NaiveDate};
use serde::{de::Error as _, Deserialize, Deserializer};

/// `""` becomes `None`, anything else is kept verbatim.
pub fn non_blank(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Same as [`non_blank`] for an already optional value.
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntInput {
    Int(i64),
    Text(String),
}

/// Integer field input: a number, a numeric string, `""` or `null`.
pub fn blank_as_none_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<IntInput>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IntInput::Int(value)) => Ok(Some(value)),
        Some(IntInput::Text(text)) if text.is_empty() => Ok(None),
        Some(IntInput::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected an integer, got {text:?}"))),
    }
}

/// String field input where `null` is accepted and kept as `""`.
pub fn null_as_blank<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Date field input: `YYYY-MM-DD` or an RFC 3339 timestamp, `""` or `null`.
pub fn blank_as_none_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match blank_to_none(Option::<String>::deserialize(deserializer)?) {
        None => Ok(None),
        Some(text) => parse_date(&text)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid date {text:?}"))),
    }
}

/// Like [`blank_as_none_date`] but an unparsable date is dropped instead of
/// failing the whole record. Used for records coming from the user API.
pub fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = blank_to_none(Option::<String>::deserialize(deserializer)?);
    Ok(raw.and_then(|text| {
        let parsed = parse_date(&text);
        if parsed.is_none() {
            tracing::warn!(value = %text, "Ignoring unparsable birthday in user record");
        }
        parsed
    }))
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Input {
        #[serde(default, deserialize_with = "blank_as_none_i64")]
        region: Option<i64>,
        #[serde(default, deserialize_with = "blank_as_none_date")]
        birthday: Option<NaiveDate>,
    }

    fn parse(json: &str) -> Result<Input, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn empty_string_is_absent_not_zero() {
        let input = parse(r#"{"region": ""}"#).unwrap();
        assert_eq!(input.region, None);

        let input = parse(r#"{"region": 0}"#).unwrap();
        assert_eq!(input.region, Some(0));
    }

    #[test]
    fn numeric_strings_and_nulls_are_accepted() {
        assert_eq!(parse(r#"{"region": "12"}"#).unwrap().region, Some(12));
        assert_eq!(parse(r#"{"region": null}"#).unwrap().region, None);
        assert_eq!(parse("{}").unwrap().region, None);
    }

    #[test]
    fn non_numeric_text_is_rejected() {
        assert!(parse(r#"{"region": "kyiv"}"#).is_err());
    }

    #[test]
    fn dates_accept_plain_and_timestamp_forms() {
        let expected = NaiveDate::from_ymd_opt(1990, 5, 1);
        assert_eq!(parse(r#"{"birthday": "1990-05-01"}"#).unwrap().birthday, expected);
        assert_eq!(
            parse(r#"{"birthday": "1990-05-01T10:00:00+02:00"}"#).unwrap().birthday,
            expected
        );
        assert_eq!(parse(r#"{"birthday": ""}"#).unwrap().birthday, None);
        assert!(parse(r#"{"birthday": "01/05/1990"}"#).is_err());
    }

    #[test]
    fn blank_helpers() {
        assert_eq!(non_blank(""), None);
        assert_eq!(non_blank(" "), Some(" ".to_string()));
        assert_eq!(blank_to_none(Some(String::new())), None);
    }
}
