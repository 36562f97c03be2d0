//! Mapping between the user record and the form values.
//!
//! Both directions are total: a missing record, a short or missing phone list
//! or blank values never fail, they fall back to empty defaults.

use super::normalize::non_blank;
use super::values::{AvatarValue, PhoneSlot, ProfileFormValues, PHONE_SLOT_COUNT};
use crate::domain::{GeneralProfileUpdate, UserDto};

/// Initial form values for the current user.
pub fn hydrate(user: Option<&UserDto>) -> ProfileFormValues {
    let Some(user) = user else {
        return ProfileFormValues {
            phone_numbers: hydrate_phone_numbers(None),
            ..Default::default()
        };
    };

    let text = |value: &Option<String>| value.clone().unwrap_or_default();

    ProfileFormValues {
        user_id: text(&user.user_id),
        first_name: text(&user.first_name),
        last_name: text(&user.last_name),
        email: text(&user.email),
        lang_key: text(&user.lang_key),
        birthday: user.birthday,
        region: user.region,
        town: user.town,
        avatar: user
            .avatar
            .as_deref()
            .and_then(non_blank)
            .map(AvatarValue::Url),
        sex: user.sex,
        phone_numbers: hydrate_phone_numbers(user.phone_numbers.as_deref()),
        about: text(&user.about),
    }
}

/// Exactly [`PHONE_SLOT_COUNT`] rows; blank or missing entries get the
/// placeholder row.
fn hydrate_phone_numbers(stored: Option<&[String]>) -> Vec<PhoneSlot> {
    let stored = stored.unwrap_or_default();
    (0..PHONE_SLOT_COUNT)
        .map(|index| match stored.get(index) {
            Some(phone) if !phone.is_empty() => PhoneSlot::parse(phone),
            _ => PhoneSlot::placeholder(),
        })
        .collect()
}

/// Editable subset of the record, with blank values as `None`.
pub fn to_update(values: &ProfileFormValues) -> GeneralProfileUpdate {
    GeneralProfileUpdate {
        user_id: non_blank(&values.user_id),
        first_name: non_blank(&values.first_name),
        last_name: non_blank(&values.last_name),
        email: non_blank(&values.email),
        lang_key: non_blank(&values.lang_key),
        birthday: values.birthday,
        region: values.region,
        town: values.town,
        avatar: serialize_avatar(values.avatar.as_ref()),
        sex: values.sex,
        phone_numbers: values.phone_numbers.iter().map(PhoneSlot::to_stored).collect(),
        about: non_blank(&values.about),
    }
}

/// Record sent to the user API on submit.
pub fn serialize(values: &ProfileFormValues) -> UserDto {
    to_update(values).into()
}

fn serialize_avatar(avatar: Option<&AvatarValue>) -> Option<String> {
    match avatar {
        Some(AvatarValue::Url(url)) => non_blank(url),
        // Only persisted URLs are sent; a dropped file has no URL yet
        Some(AvatarValue::Staged(staged)) => {
            tracing::warn!(
                file_name = %staged.file_name,
                size = staged.size,
                "Staged avatar is not uploaded; it is left out of the submission"
            );
            None
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::avatar::{AvatarDrop, DroppedFile};
    use chrono::NaiveDate;

    fn user(phone_numbers: Option<Vec<&str>>) -> UserDto {
        UserDto {
            user_id: Some("jdoe".into()),
            first_name: Some("John".into()),
            last_name: Some("Doe".into()),
            email: Some("jdoe@example.com".into()),
            lang_key: Some("uk".into()),
            birthday: NaiveDate::from_ymd_opt(1990, 5, 1),
            region: Some(3),
            town: Some(31),
            avatar: Some("https://cdn.example.com/a.png".into()),
            sex: Some(1),
            phone_numbers: phone_numbers.map(|p| p.into_iter().map(String::from).collect()),
            about: Some("Hi".into()),
            ..Default::default()
        }
    }

    #[test]
    fn hydrate_always_yields_three_phone_rows() {
        for stored in [None, Some(vec![]), Some(vec!["44 7911123456"]), Some(vec!["1 2", "1 3", "1 4"])] {
            let values = hydrate(Some(&user(stored)));
            assert_eq!(values.phone_numbers.len(), PHONE_SLOT_COUNT);
        }
        assert_eq!(hydrate(None).phone_numbers, vec![PhoneSlot::placeholder(); PHONE_SLOT_COUNT]);
    }

    #[test]
    fn hydrate_ignores_entries_beyond_three_and_blank_entries() {
        let values = hydrate(Some(&user(Some(vec!["", "1 2", "1 3", "1 4"]))));
        assert_eq!(
            values.phone_numbers,
            vec![PhoneSlot::placeholder(), PhoneSlot::new("1", "2"), PhoneSlot::new("1", "3")]
        );
    }

    #[test]
    fn hydrate_copies_scalars_with_blank_fallback() {
        let values = hydrate(Some(&UserDto {
            user_id: Some("jdoe".into()),
            ..Default::default()
        }));
        assert_eq!(values.user_id, "jdoe");
        assert_eq!(values.email, "");
        assert_eq!(values.region, None);
        assert_eq!(values.avatar, None);

        let values = hydrate(Some(&UserDto {
            avatar: Some(String::new()),
            ..Default::default()
        }));
        assert_eq!(values.avatar, None);
    }

    #[test]
    fn serialize_of_hydrate_round_trips_canonical_records() {
        let original = user(Some(vec!["380 501234567", "44 7911123456", "1 2025550123"]));
        let dto = serialize(&hydrate(Some(&original)));

        assert_eq!(dto.user_id, original.user_id);
        assert_eq!(dto.first_name, original.first_name);
        assert_eq!(dto.last_name, original.last_name);
        assert_eq!(dto.email, original.email);
        assert_eq!(dto.lang_key, original.lang_key);
        assert_eq!(dto.birthday, original.birthday);
        assert_eq!(dto.region, original.region);
        assert_eq!(dto.town, original.town);
        assert_eq!(dto.avatar, original.avatar);
        assert_eq!(dto.sex, original.sex);
        assert_eq!(dto.phone_numbers, original.phone_numbers);
        assert_eq!(dto.about, original.about);
    }

    #[test]
    fn untouched_rows_serialize_as_default_code_and_space() {
        let dto = serialize(&hydrate(Some(&user(Some(vec!["44 7911123456"])))));
        assert_eq!(
            dto.phone_numbers,
            Some(vec!["44 7911123456".to_string(), "380 ".to_string(), "380 ".to_string()])
        );
    }

    #[test]
    fn fully_empty_row_serializes_to_single_space() {
        let mut values = hydrate(None);
        values.phone_numbers[0] = PhoneSlot::default();
        let dto = serialize(&values);
        assert_eq!(dto.phone_numbers.unwrap()[0], " ");
    }

    #[test]
    fn blank_scalars_become_null_but_zero_survives() {
        let mut values = hydrate(None);
        values.region = Some(0);
        values.town = Some(0);
        values.sex = Some(0);

        let dto = serialize(&values);
        assert_eq!(dto.user_id, None);
        assert_eq!(dto.about, None);
        assert_eq!(dto.region, Some(0));
        assert_eq!(dto.town, Some(0));
        assert_eq!(dto.sex, Some(0));
        assert_eq!(dto.password, None);
        assert_eq!(dto.roles, None);
    }

    #[test]
    fn staged_avatar_is_left_out() {
        let mut values = hydrate(Some(&user(None)));
        let staged = AvatarDrop::accept(vec![DroppedFile::new(
            "me.png",
            Some("image/png".into()),
            vec![1u8, 2, 3].into(),
        )])
        .unwrap();
        values.avatar = Some(AvatarValue::Staged(staged));

        assert_eq!(serialize(&values).avatar, None);
    }
}
