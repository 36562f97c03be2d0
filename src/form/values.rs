//! Working state of the general profile form.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::avatar::StagedAvatar;
use super::normalize;

/// Number of phone rows the form always shows.
pub const PHONE_SLOT_COUNT: usize = 3;

/// Dialing code of an empty phone row.
pub const DEFAULT_DIALING_CODE: &str = "380";

/// Values bound to the form controls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFormValues {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub lang_key: String,
    pub birthday: Option<NaiveDate>,
    pub region: Option<i64>,
    pub town: Option<i64>,
    pub avatar: Option<AvatarValue>,
    pub sex: Option<i64>,
    pub phone_numbers: Vec<PhoneSlot>,
    pub about: String,
}

/// One phone row: dialing code picker plus subscriber number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneSlot {
    pub phone_code: String,
    pub number: String,
}

impl PhoneSlot {
    pub fn new(phone_code: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            phone_code: phone_code.into(),
            number: number.into(),
        }
    }

    /// Row shown when nothing is stored for it.
    pub fn placeholder() -> Self {
        Self::new(DEFAULT_DIALING_CODE, "")
    }

    /// Splits a stored `"<code> <number>"` string on its first space.
    pub fn parse(stored: &str) -> Self {
        match stored.split_once(' ') {
            Some((code, number)) => Self::new(code, number),
            None => Self::new(stored, ""),
        }
    }

    /// Joins the row back into its stored form. Missing parts stay empty, so
    /// a fully empty row becomes a single space.
    pub fn to_stored(&self) -> String {
        format!("{} {}", self.phone_code, self.number)
    }
}

/// Avatar control value: either the persisted URL or a freshly dropped file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AvatarValue {
    Url(String),
    Staged(StagedAvatar),
}

impl AvatarValue {
    /// What the avatar control displays.
    pub fn display_url(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Staged(staged) => &staged.preview,
        }
    }
}

/// A change to one of the plain form fields.
///
/// Region, language, phone rows and the avatar have dedicated operations
/// because they trigger effects beyond storing the value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum FieldChange {
    UserId(#[serde(deserialize_with = "normalize::null_as_blank")] String),
    FirstName(#[serde(deserialize_with = "normalize::null_as_blank")] String),
    LastName(#[serde(deserialize_with = "normalize::null_as_blank")] String),
    Email(#[serde(deserialize_with = "normalize::null_as_blank")] String),
    Birthday(#[serde(deserialize_with = "normalize::blank_as_none_date")] Option<NaiveDate>),
    Town(#[serde(deserialize_with = "normalize::blank_as_none_i64")] Option<i64>),
    Sex(#[serde(deserialize_with = "normalize::blank_as_none_i64")] Option<i64>),
    About(#[serde(deserialize_with = "normalize::null_as_blank")] String),
}

impl FieldChange {
    /// Path of the field the change targets.
    pub fn path(&self) -> &'static str {
        match self {
            Self::UserId(_) => "userId",
            Self::FirstName(_) => "firstName",
            Self::LastName(_) => "lastName",
            Self::Email(_) => "email",
            Self::Birthday(_) => "birthday",
            Self::Town(_) => "town",
            Self::Sex(_) => "sex",
            Self::About(_) => "about",
        }
    }

    /// Stores the new value.
    pub fn apply(self, values: &mut ProfileFormValues) {
        match self {
            Self::UserId(v) => values.user_id = v,
            Self::FirstName(v) => values.first_name = v,
            Self::LastName(v) => values.last_name = v,
            Self::Email(v) => values.email = v,
            Self::Birthday(v) => values.birthday = v,
            Self::Town(v) => values.town = v,
            Self::Sex(v) => values.sex = v,
            Self::About(v) => values.about = v,
        }
    }
}

/// Path of a phone row's number input.
pub fn phone_number_path(slot: usize) -> String {
    format!("phoneNumbers[{slot}].number")
}

/// Path of a phone row's dialing code picker.
pub fn phone_code_path(slot: usize) -> String {
    format!("phoneNumbers[{slot}].phoneCode")
}
