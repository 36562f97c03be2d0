//! Profile domain types
//!
//! The full user record exchanged with the user API, and the editable
//! "general" subset the profile form is allowed to change.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::form::normalize;

/// Full user record as exchanged with the user API.
///
/// Every field is nullable on the wire. Fields the general form never edits
/// (credentials, activation keys, roles, ...) are carried as `null` on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserDto {
    pub user_id: Option<String>,
    pub password: Option<String>,
    pub new_password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub lang_key: Option<String>,
    #[serde(deserialize_with = "normalize::lenient_date")]
    pub birthday: Option<NaiveDate>,
    pub region: Option<i64>,
    pub town: Option<i64>,
    pub activation_key: Option<String>,
    pub reset_key: Option<String>,
    pub delete_key: Option<String>,
    pub avatar: Option<String>,
    pub activated: Option<bool>,
    pub sex: Option<i64>,
    pub user_dealers_member: Option<serde_json::Value>,
    pub remember_me: Option<bool>,
    pub phone_numbers: Option<Vec<String>>,
    pub about: Option<String>,
    pub roles: Option<Vec<String>>,
}

/// The subset of [`UserDto`] edited by the general profile form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneralProfileUpdate {
    pub user_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub lang_key: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub region: Option<i64>,
    pub town: Option<i64>,
    pub avatar: Option<String>,
    pub sex: Option<i64>,
    pub phone_numbers: Vec<String>,
    pub about: Option<String>,
}

impl From<GeneralProfileUpdate> for UserDto {
    fn from(update: GeneralProfileUpdate) -> Self {
        Self {
            user_id: update.user_id,
            first_name: update.first_name,
            last_name: update.last_name,
            email: update.email,
            lang_key: update.lang_key,
            birthday: update.birthday,
            region: update.region,
            town: update.town,
            avatar: update.avatar,
            sex: update.sex,
            phone_numbers: Some(update.phone_numbers),
            about: update.about,
            // Not editable here
            password: None,
            new_password: None,
            activation_key: None,
            reset_key: None,
            delete_key: None,
            activated: None,
            user_dealers_member: None,
            remember_me: None,
            roles: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_carries_non_editable_fields_as_null() {
        let dto: UserDto = GeneralProfileUpdate {
            user_id: Some("jdoe".into()),
            email: Some("jdoe@example.com".into()),
            phone_numbers: vec!["380 501234567".into()],
            ..Default::default()
        }
        .into();

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["userId"], "jdoe");
        assert_eq!(json["phoneNumbers"][0], "380 501234567");
        for field in [
            "password",
            "newPassword",
            "activationKey",
            "resetKey",
            "deleteKey",
            "activated",
            "userDealersMember",
            "rememberMe",
            "roles",
        ] {
            assert!(json[field].is_null(), "{field} should be null");
        }
    }

    #[test]
    fn user_record_tolerates_missing_and_odd_fields() {
        let dto: UserDto = serde_json::from_str(
            r#"{"userId":"jdoe","birthday":"1990-05-01T00:00:00Z","phoneNumbers":null}"#,
        )
        .unwrap();
        assert_eq!(dto.user_id.as_deref(), Some("jdoe"));
        assert_eq!(dto.birthday, NaiveDate::from_ymd_opt(1990, 5, 1));
        assert!(dto.phone_numbers.is_none());
        assert!(dto.email.is_none());
    }
}
