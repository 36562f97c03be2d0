//! Validation schema of the general profile form.
//!
//! The schema is built from localized messages and checked synchronously
//! against the whole form on submit, or filtered to one field on change.
//! Each field reports at most its first failing rule.

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use super::values::{phone_number_path, ProfileFormValues, PHONE_SLOT_COUNT};
use crate::i18n::Translator;

pub const USER_ID_MAX_LENGTH: usize = 191;
pub const NAME_MAX_LENGTH: usize = 50;
pub const EMAIL_MAX_LENGTH: usize = 191;
pub const ABOUT_MAX_LENGTH: usize = 1000;

/// Subscriber number: no leading zero, 2 to 15 digits in total.
static PHONE_NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[1-9][0-9]{1,14}$").expect("PHONE_NUMBER_REGEX is a valid regex pattern")
});

/// Same acceptance as the browser-side email check the form used.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("EMAIL_REGEX is a valid regex pattern")
});

/// A single validation failure bound to a form field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field path, e.g. `email` or `phoneNumbers[1].number`.
    pub field: String,
    /// Error code for programmatic handling.
    pub code: String,
    /// Localized message shown under the field.
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether this error belongs to `path` or to one of its children.
    pub fn belongs_to(&self, path: &str) -> bool {
        match self.field.strip_prefix(path) {
            Some(rest) => rest.is_empty() || rest.starts_with('[') || rest.starts_with('.'),
            None => false,
        }
    }
}

/// Localized messages used by the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationMessages {
    pub user_id_required: String,
    pub user_id_max_length: String,
    pub first_name_max_length: String,
    pub last_name_max_length: String,
    pub email_required: String,
    pub email_invalid: String,
    pub email_max_length: String,
    pub birthday_future_not_allowed: String,
    pub town_when_region_not_set: String,
    pub sex_invalid: String,
    pub phone_number_invalid_format: String,
    pub phone_numbers_max_length: String,
    pub about_max_length: String,
}

impl ValidationMessages {
    pub fn from_translator(translator: &Translator) -> Self {
        let t = |name: &str| translator.t(&format!("dashboard.account.form.validation.{name}"));

        Self {
            user_id_required: t("userIdRequired"),
            user_id_max_length: t("userIdMaxLength"),
            first_name_max_length: t("firstNameMaxLength"),
            last_name_max_length: t("lastNameMaxLength"),
            email_required: t("emailRequired"),
            email_invalid: t("emailInvalid"),
            email_max_length: t("emailMaxLength"),
            birthday_future_not_allowed: t("birthdayFutureNotAllowed"),
            town_when_region_not_set: t("townWhenRegionNotSet"),
            sex_invalid: t("sexInvalid"),
            phone_number_invalid_format: t("phoneNumberInvalidFormat"),
            phone_numbers_max_length: t("phoneNumbersMaxLength"),
            about_max_length: t("aboutMaxLength"),
        }
    }
}

/// Validation schema for [`ProfileFormValues`].
#[derive(Debug, Clone)]
pub struct ProfileSchema {
    messages: ValidationMessages,
}

impl ProfileSchema {
    pub fn new(messages: ValidationMessages) -> Self {
        Self { messages }
    }

    pub fn for_translator(translator: &Translator) -> Self {
        Self::new(ValidationMessages::from_translator(translator))
    }

    /// Checks the whole form. `today` bounds the birthday.
    pub fn validate(&self, values: &ProfileFormValues, today: NaiveDate) -> Result<(), Vec<FieldError>> {
        let errors = self.collect(values, today);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Errors of one field (and its children, for `phoneNumbers`).
    pub fn validate_field(&self, values: &ProfileFormValues, path: &str, today: NaiveDate) -> Vec<FieldError> {
        self.collect(values, today)
            .into_iter()
            .filter(|error| error.belongs_to(path))
            .collect()
    }

    fn collect(&self, values: &ProfileFormValues, today: NaiveDate) -> Vec<FieldError> {
        let m = &self.messages;
        let mut errors = Vec::new();

        if values.user_id.is_empty() {
            errors.push(FieldError::new("userId", "required", &m.user_id_required));
        } else if too_long(&values.user_id, USER_ID_MAX_LENGTH) {
            errors.push(FieldError::new("userId", "max_length", &m.user_id_max_length));
        }

        if too_long(&values.first_name, NAME_MAX_LENGTH) {
            errors.push(FieldError::new("firstName", "max_length", &m.first_name_max_length));
        }
        if too_long(&values.last_name, NAME_MAX_LENGTH) {
            errors.push(FieldError::new("lastName", "max_length", &m.last_name_max_length));
        }

        if values.email.is_empty() {
            errors.push(FieldError::new("email", "required", &m.email_required));
        } else if !EMAIL_REGEX.is_match(&values.email) {
            errors.push(FieldError::new("email", "email", &m.email_invalid));
        } else if too_long(&values.email, EMAIL_MAX_LENGTH) {
            errors.push(FieldError::new("email", "max_length", &m.email_max_length));
        }

        if values.birthday.is_some_and(|birthday| birthday > today) {
            errors.push(FieldError::new("birthday", "max_date", &m.birthday_future_not_allowed));
        }

        // Membership of the town in the region is not checked here
        if values.town.is_some() && values.region.is_none() {
            errors.push(FieldError::new("town", "town_without_region", &m.town_when_region_not_set));
        }

        if values.sex.is_some_and(|sex| sex != 0 && sex != 1) {
            errors.push(FieldError::new("sex", "one_of", &m.sex_invalid));
        }

        if values.phone_numbers.len() > PHONE_SLOT_COUNT {
            errors.push(FieldError::new("phoneNumbers", "max_items", &m.phone_numbers_max_length));
        }
        for (slot, phone) in values.phone_numbers.iter().enumerate() {
            if !phone.number.is_empty() && !PHONE_NUMBER_REGEX.is_match(&phone.number) {
                errors.push(FieldError::new(
                    phone_number_path(slot),
                    "pattern",
                    &m.phone_number_invalid_format,
                ));
            }
        }

        if too_long(&values.about, ABOUT_MAX_LENGTH) {
            errors.push(FieldError::new("about", "max_length", &m.about_max_length));
        }

        errors
    }
}

fn too_long(value: &str, max: usize) -> bool {
    value.chars().count() > max
}
