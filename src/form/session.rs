//! Per-user form session.
//!
//! A session is opened once from the current user record, then mutated by
//! user interactions. Each interaction re-validates the touched field only;
//! submission validates the whole form and yields the record to send.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use super::adapter;
use super::avatar::{AvatarDrop, AvatarRejection, DroppedFile, StagedAvatar, AVATAR_MAX_BYTES};
use super::cascade::TownCascade;
use super::countries;
use super::schema::{FieldError, ProfileSchema};
use super::values::{phone_code_path, phone_number_path, AvatarValue, FieldChange, ProfileFormValues};
use crate::domain::{Region, Town, UserDto};
use crate::i18n::{format_bytes, Translator};

/// Reference data the form is built from, fetched once by the caller.
#[derive(Debug, Clone, Default)]
pub struct FormContext {
    pub regions: Arc<Vec<Region>>,
    pub towns: Arc<Vec<Town>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("phone row {0} does not exist")]
    NoSuchPhoneSlot(usize),

    #[error("unknown dialing code {0}")]
    UnknownDialingCode(String),

    #[error("a submission is already in progress")]
    SubmissionInProgress,

    #[error("{} field(s) failed validation", .0.len())]
    Invalid(Vec<FieldError>),
}

#[derive(Debug, Clone)]
pub struct FormSession {
    id: Uuid,
    touched_at: DateTime<Utc>,
    source: Option<UserDto>,
    values: ProfileFormValues,
    cascade: TownCascade,
    errors: BTreeMap<String, FieldError>,
    context: FormContext,
    translator: Translator,
    schema: ProfileSchema,
    avatar_rejection: Option<AvatarRejection>,
    submitting: bool,
}

impl FormSession {
    /// Hydrates the form from `user` and sets up the town cascade.
    pub fn open(user: Option<UserDto>, context: FormContext, translator: Translator) -> Self {
        let values = adapter::hydrate(user.as_ref());
        let cascade = TownCascade::new(values.region, &context.towns);
        let schema = ProfileSchema::for_translator(&translator);

        Self {
            id: Uuid::new_v4(),
            touched_at: Utc::now(),
            source: user,
            values,
            cascade,
            errors: BTreeMap::new(),
            context,
            translator,
            schema,
            avatar_rejection: None,
            submitting: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Last time the user interacted with the form.
    pub fn touched_at(&self) -> DateTime<Utc> {
        self.touched_at
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.touched_at = now;
    }

    /// Untouched for longer than `timeout` at `now`.
    pub fn is_idle(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - self.touched_at > timeout
    }

    /// The values differ from the last stored record.
    pub fn has_unsaved_changes(&self) -> bool {
        self.values != adapter::hydrate(self.source.as_ref())
    }

    pub fn values(&self) -> &ProfileFormValues {
        &self.values
    }

    pub fn cascade(&self) -> &TownCascade {
        &self.cascade
    }

    pub fn context(&self) -> &FormContext {
        &self.context
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Current field errors, ordered by path.
    pub fn errors(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.values()
    }

    /// Error shown under `path`, if any.
    pub fn error_for(&self, path: &str) -> Option<&FieldError> {
        self.errors.get(path)
    }

    pub fn staged_avatar(&self) -> Option<&StagedAvatar> {
        match &self.values.avatar {
            Some(AvatarValue::Staged(staged)) => Some(staged),
            _ => None,
        }
    }

    pub fn set_field(&mut self, change: FieldChange, today: NaiveDate) {
        let path = change.path();
        change.apply(&mut self.values);
        self.revalidate(path, today);
    }

    /// Stores the region and recomputes the offered towns.
    pub fn select_region(&mut self, region: Option<i64>, today: NaiveDate) {
        self.values.region = region;
        self.cascade.select_region(region, &self.context.towns);
        self.revalidate("region", today);
    }

    /// Stores the language and switches the session's display language.
    pub fn change_language(&mut self, lang_key: String, translator: Translator, today: NaiveDate) {
        self.values.lang_key = lang_key;
        self.schema = ProfileSchema::for_translator(&translator);
        self.translator = translator;

        // Messages already shown follow the new language
        let paths: Vec<String> = self
            .errors
            .keys()
            .filter(|path| path.as_str() != "avatar")
            .cloned()
            .collect();
        for path in paths {
            self.revalidate(&path, today);
        }
        if let Some(rejection) = self.avatar_rejection.clone() {
            self.show_avatar_rejection(&rejection);
        }
    }

    /// Picker selection for a phone row. `None` or `""` clears the code.
    pub fn select_phone_code(
        &mut self,
        slot: usize,
        dialing_code: Option<&str>,
        today: NaiveDate,
    ) -> Result<(), SessionError> {
        let country = match dialing_code.filter(|code| !code.is_empty()) {
            Some(code) => Some(
                countries::find_by_dialing_code(code)
                    .ok_or_else(|| SessionError::UnknownDialingCode(code.to_string()))?,
            ),
            None => None,
        };

        let row = self
            .values
            .phone_numbers
            .get_mut(slot)
            .ok_or(SessionError::NoSuchPhoneSlot(slot))?;
        countries::apply_selection(row, country);
        self.revalidate(&phone_code_path(slot), today);
        Ok(())
    }

    pub fn set_phone_number(&mut self, slot: usize, number: Option<String>, today: NaiveDate) -> Result<(), SessionError> {
        let row = self
            .values
            .phone_numbers
            .get_mut(slot)
            .ok_or(SessionError::NoSuchPhoneSlot(slot))?;
        row.number = number.unwrap_or_default();
        self.revalidate(&phone_number_path(slot), today);
        Ok(())
    }

    /// Stages a dropped avatar. A rejection is shown under the avatar and the
    /// previous value is kept.
    pub fn drop_avatar(&mut self, files: Vec<DroppedFile>) -> Result<StagedAvatar, AvatarRejection> {
        match AvatarDrop::accept(files) {
            Ok(staged) => {
                self.errors.remove("avatar");
                self.avatar_rejection = None;
                self.values.avatar = Some(AvatarValue::Staged(staged.clone()));
                Ok(staged)
            }
            Err(rejection) => {
                self.show_avatar_rejection(&rejection);
                self.avatar_rejection = Some(rejection.clone());
                Err(rejection)
            }
        }
    }

    fn show_avatar_rejection(&mut self, rejection: &AvatarRejection) {
        let max_size = format_bytes(AVATAR_MAX_BYTES as u64);
        let message = self.translator.t_with(
            &format!("dashboard.account.form.avatar.rejected.{}", rejection.code()),
            &[("maxSize", &max_size)],
        );
        self.errors.insert(
            "avatar".to_string(),
            FieldError::new("avatar", rejection.code(), message),
        );
    }

    /// Validates the whole form. On success the session is marked as
    /// submitting and the record to send is returned; on failure every error
    /// is shown and submission is blocked.
    pub fn prepare_submission(&mut self, today: NaiveDate) -> Result<UserDto, SessionError> {
        if self.submitting {
            return Err(SessionError::SubmissionInProgress);
        }

        if let Err(errors) = self.schema.validate(&self.values, today) {
            self.errors = errors
                .iter()
                .map(|error| (error.field.clone(), error.clone()))
                .collect();
            if let Some(rejection) = self.avatar_rejection.clone() {
                self.show_avatar_rejection(&rejection);
            }
            return Err(SessionError::Invalid(errors));
        }

        self.errors.clear();
        self.avatar_rejection = None;
        self.submitting = true;
        Ok(adapter::serialize(&self.values))
    }

    /// Ends a submission. On success the refreshed record becomes the source.
    pub fn finish_submission(&mut self, refreshed: Option<UserDto>) {
        self.submitting = false;
        if let Some(user) = refreshed {
            self.source = Some(user);
        }
    }

    fn revalidate(&mut self, path: &str, today: NaiveDate) {
        self.errors.retain(|_, error| !error.belongs_to(path));
        for error in self.schema.validate_field(&self.values, path, today) {
            self.errors.insert(error.field.clone(), error);
        }
    }
}
