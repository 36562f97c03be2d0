//! Profile form service: one form session per authenticated user.

use axum::body::Bytes;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::account::AccountDirectory;
use super::gateways::ReferenceSource;
use crate::auth::AuthContext;
use crate::domain::{Town, UserDto};
use crate::error::ApiError;
use crate::form::cascade::towns_of;
use crate::form::{DroppedFile, FieldChange, FieldError, FormContext, FormSession, FormView, SessionError};
use crate::i18n::Locales;

const UPDATE_SUCCESS_KEY: &str = "dashboard.account.snackbar.updateSuccess";
const UPDATE_FAILED_KEY: &str = "dashboard.account.snackbar.updateFailed";

/// Minutes an untouched session is kept by default.
pub const DEFAULT_IDLE_MINUTES: i64 = 30;

/// Open sessions keyed by user.
///
/// A session whose submission is in flight is never replaced, removed or
/// evicted; the submitting request owns it until it settles.
#[derive(Clone)]
pub struct FormSessions {
    inner: Arc<RwLock<HashMap<Uuid, FormSession>>>,
    idle_timeout: Duration,
}

impl Default for FormSessions {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_IDLE_MINUTES))
    }
}

impl FormSessions {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    pub fn insert(&self, user_id: Uuid, session: FormSession) -> Result<(), SessionError> {
        let mut sessions = self.inner.write();
        if sessions.get(&user_id).is_some_and(FormSession::is_submitting) {
            return Err(SessionError::SubmissionInProgress);
        }
        sessions.insert(user_id, session);
        Ok(())
    }

    pub fn remove(&self, user_id: Uuid) -> Result<Option<FormSession>, SessionError> {
        let mut sessions = self.inner.write();
        if sessions.get(&user_id).is_some_and(FormSession::is_submitting) {
            return Err(SessionError::SubmissionInProgress);
        }
        Ok(sessions.remove(&user_id))
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Runs `f` on the user's session under the write lock.
    pub fn with<R>(&self, user_id: Uuid, f: impl FnOnce(&mut FormSession) -> R) -> Option<R> {
        self.with_at(user_id, Utc::now(), f)
    }

    /// Like [`with`](Self::with) at `now`. A session idle past the timeout is
    /// evicted instead of being handed to `f`.
    fn with_at<R>(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut FormSession) -> R,
    ) -> Option<R> {
        let mut sessions = self.inner.write();
        if self.is_evictable(sessions.get(&user_id)?, now) {
            sessions.remove(&user_id);
            debug!(%user_id, "Idle profile form evicted");
            return None;
        }

        let session = sessions.get_mut(&user_id)?;
        session.touch(now);
        Some(f(session))
    }

    /// Drops every session idle at `now`. Returns how many were dropped.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.inner.write();
        let before = sessions.len();
        sessions.retain(|_, session| !self.is_evictable(session, now));
        before - sessions.len()
    }

    fn is_evictable(&self, session: &FormSession, now: DateTime<Utc>) -> bool {
        !session.is_submitting() && session.is_idle(now, self.idle_timeout)
    }

    /// Evicts idle sessions every `period` until the runtime shuts down.
    pub fn spawn_sweeper(&self, period: std::time::Duration) -> JoinHandle<()> {
        let sessions = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = sessions.evict_idle(Utc::now());
                if evicted > 0 {
                    info!(evicted, open = sessions.len(), "Idle profile forms evicted");
                }
            }
        })
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    /// Transient notification to show.
    pub message: String,
    pub user: UserDto,
    /// Refreshed form, absent when the session closed meanwhile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<FormView>,
}

/// Staged avatar content for preview.
#[derive(Debug, Clone)]
pub struct AvatarPreview {
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Clone)]
pub struct ProfileFormService {
    reference: Arc<dyn ReferenceSource>,
    accounts: AccountDirectory,
    locales: Arc<Locales>,
    sessions: FormSessions,
    clock: fn() -> NaiveDate,
}

fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

fn no_session() -> ApiError {
    ApiError::not_found("No open profile form")
}

impl ProfileFormService {
    pub fn new(reference: Arc<dyn ReferenceSource>, accounts: AccountDirectory, locales: Locales) -> Self {
        Self {
            reference,
            accounts,
            locales: Arc::new(locales),
            sessions: FormSessions::default(),
            clock: utc_today,
        }
    }

    /// Sessions untouched for `timeout` are evicted.
    pub fn with_session_idle_timeout(mut self, timeout: Duration) -> Self {
        self.sessions = FormSessions::new(timeout);
        self
    }

    /// Replaces the source of "today" used to bound the birthday.
    pub fn with_clock(mut self, clock: fn() -> NaiveDate) -> Self {
        self.clock = clock;
        self
    }

    pub fn reference(&self) -> &Arc<dyn ReferenceSource> {
        &self.reference
    }

    pub fn accounts(&self) -> &AccountDirectory {
        &self.accounts
    }

    pub fn locales(&self) -> &Locales {
        &self.locales
    }

    pub fn sessions(&self) -> &FormSessions {
        &self.sessions
    }

    fn render(&self, session: &FormSession) -> FormView {
        FormView::render(session, session.translator(), &self.locales.languages())
    }

    /// Applies `f` to the caller's session and renders the result.
    fn update<F>(&self, auth: &AuthContext, f: F) -> Result<FormView, ApiError>
    where
        F: FnOnce(&mut FormSession, NaiveDate) -> Result<(), ApiError>,
    {
        let today = (self.clock)();
        self.sessions
            .with(auth.user_id, |session| -> Result<FormView, ApiError> {
                f(session, today)?;
                Ok(self.render(session))
            })
            .ok_or_else(no_session)?
    }

    /// The caller's record, or `None` when the user API has none.
    async fn load_user(&self, auth: &AuthContext) -> Result<Option<UserDto>, ApiError> {
        match self.accounts.current_user(auth).await {
            Ok(user) => Ok(Some(user)),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Opens a fresh session for the caller, replacing any previous one
    /// unless it is being submitted. Missing reference tables leave the
    /// region and town selects empty.
    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    pub async fn open(&self, auth: &AuthContext) -> Result<FormView, ApiError> {
        let (user, regions, towns) = futures::join!(
            self.load_user(auth),
            self.reference.regions(),
            self.reference.towns(),
        );
        let user = user?;
        let regions = regions.unwrap_or_else(|e| {
            warn!(error = %e, "Regions unavailable, opening the form without them");
            Vec::new()
        });
        let towns = towns.unwrap_or_else(|e| {
            warn!(error = %e, "Towns unavailable, opening the form without them");
            Vec::new()
        });

        let lang = self
            .locales
            .resolve(user.as_ref().and_then(|u| u.lang_key.as_deref()))
            .to_string();
        let context = FormContext {
            regions: Arc::new(regions),
            towns: Arc::new(towns),
        };
        let session = FormSession::open(user, context, self.locales.translator(&lang));
        let view = self.render(&session);

        let session_id = session.id();
        self.sessions.insert(auth.user_id, session)?;
        info!(%session_id, lang = %lang, "Profile form opened");
        Ok(view)
    }

    pub fn view(&self, auth: &AuthContext) -> Result<FormView, ApiError> {
        self.update(auth, |_, _| Ok(()))
    }

    pub fn discard(&self, auth: &AuthContext) -> Result<(), ApiError> {
        self.sessions
            .remove(auth.user_id)?
            .map(|_| ())
            .ok_or_else(no_session)
    }

    pub fn set_field(&self, auth: &AuthContext, change: FieldChange) -> Result<FormView, ApiError> {
        self.update(auth, |session, today| {
            session.set_field(change, today);
            Ok(())
        })
    }

    pub fn select_region(&self, auth: &AuthContext, region: Option<i64>) -> Result<FormView, ApiError> {
        self.update(auth, |session, today| {
            session.select_region(region, today);
            Ok(())
        })
    }

    pub fn change_language(&self, auth: &AuthContext, lang_key: String) -> Result<FormView, ApiError> {
        if !self.locales.supports(&lang_key) {
            return Err(ApiError::BadRequest(format!("Unsupported language: {lang_key}")));
        }
        let translator = self.locales.translator(&lang_key);

        self.update(auth, |session, today| {
            session.change_language(lang_key, translator, today);
            Ok(())
        })
    }

    pub fn select_phone_code(
        &self,
        auth: &AuthContext,
        slot: usize,
        dialing_code: Option<String>,
    ) -> Result<FormView, ApiError> {
        self.update(auth, |session, today| {
            session.select_phone_code(slot, dialing_code.as_deref(), today)?;
            Ok(())
        })
    }

    pub fn set_phone_number(
        &self,
        auth: &AuthContext,
        slot: usize,
        number: Option<String>,
    ) -> Result<FormView, ApiError> {
        self.update(auth, |session, today| {
            session.set_phone_number(slot, number, today)?;
            Ok(())
        })
    }

    /// Stages a dropped avatar. A rejection is reported as a validation
    /// error on `avatar` and also kept on the session.
    pub fn drop_avatar(&self, auth: &AuthContext, files: Vec<DroppedFile>) -> Result<FormView, ApiError> {
        self.update(auth, |session, _| match session.drop_avatar(files) {
            Ok(staged) => {
                info!(file_name = %staged.file_name, size = staged.size, "Avatar staged");
                Ok(())
            }
            Err(rejection) => {
                let error = session
                    .error_for("avatar")
                    .cloned()
                    .unwrap_or_else(|| FieldError::new("avatar", rejection.code(), rejection.to_string()));
                Err(ApiError::Validation(vec![error]))
            }
        })
    }

    pub fn avatar_preview(&self, auth: &AuthContext) -> Result<AvatarPreview, ApiError> {
        self.sessions
            .with(auth.user_id, |session| {
                session.staged_avatar().map(|staged| AvatarPreview {
                    content_type: staged.content_type.clone(),
                    bytes: staged.bytes.clone(),
                })
            })
            .ok_or_else(no_session)?
            .ok_or_else(|| ApiError::not_found("No avatar has been dropped"))
    }

    /// Validates, sends the general section to the user API, then reloads
    /// the caller's record.
    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    pub async fn submit(&self, auth: &AuthContext) -> Result<SubmitOutcome, ApiError> {
        let today = (self.clock)();
        let (dto, translator) = self
            .sessions
            .with(auth.user_id, |session| {
                let dto = session.prepare_submission(today)?;
                Ok::<_, ApiError>((dto, session.translator().clone()))
            })
            .ok_or_else(no_session)??;

        let result = async {
            self.accounts.update_general(auth, &dto).await?;
            self.accounts.refresh(auth).await
        }
        .await;

        match result {
            Ok(user) => {
                let view = self.sessions.with(auth.user_id, |session| {
                    session.finish_submission(Some(user.clone()));
                    self.render(session)
                });
                if view.is_none() {
                    warn!("Profile form closed before the submission settled");
                }

                info!("Profile general section updated");
                Ok(SubmitOutcome {
                    message: translator.t(UPDATE_SUCCESS_KEY),
                    user,
                    view,
                })
            }
            Err(e) => {
                error!(error = %e, "Profile submission failed");
                self.sessions
                    .with(auth.user_id, |session| session.finish_submission(None));

                Err(match e {
                    ApiError::Upstream(_) => ApiError::Upstream(translator.t(UPDATE_FAILED_KEY)),
                    other => other,
                })
            }
        }
    }

    /// Towns of one region, for the town select.
    pub async fn towns_of_region(&self, region_id: i64) -> Result<Vec<Town>, ApiError> {
        let towns = self.reference.towns().await?;
        Ok(towns_of(region_id, &towns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> FormSession {
        let locales = Locales::bundled("en").unwrap();
        FormSession::open(None, FormContext::default(), locales.translator("en"))
    }

    #[test]
    fn sessions_registry_is_keyed_by_user() {
        let sessions = FormSessions::default();
        let user = Uuid::new_v4();
        assert!(sessions.with(user, |_| ()).is_none());

        let session = session();
        let id = session.id();
        sessions.insert(user, session).unwrap();

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions.with(user, |s| s.id()), Some(id));
        assert!(sessions.with(Uuid::new_v4(), |s| s.id()).is_none());
        assert!(sessions.remove(user).unwrap().is_some());
        assert!(sessions.is_empty());
    }

    #[test]
    fn submitting_session_is_neither_replaced_nor_removed() {
        let sessions = FormSessions::default();
        let user = Uuid::new_v4();
        let first = session();
        let id = first.id();
        sessions.insert(user, first).unwrap();
        sessions
            .with(user, |s| s.prepare_submission(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()))
            .unwrap()
            .unwrap();

        assert!(matches!(
            sessions.insert(user, session()),
            Err(SessionError::SubmissionInProgress)
        ));
        assert!(matches!(sessions.remove(user), Err(SessionError::SubmissionInProgress)));
        assert_eq!(sessions.with(user, |s| s.id()), Some(id));

        sessions.with(user, |s| s.finish_submission(None));
        assert!(sessions.remove(user).unwrap().is_some());
    }

    #[test]
    fn idle_sessions_are_evicted_on_access() {
        let sessions = FormSessions::new(Duration::minutes(30));
        let user = Uuid::new_v4();
        let session = session();
        let opened = session.touched_at();
        sessions.insert(user, session).unwrap();

        // Each access restarts the idle clock
        assert!(sessions.with_at(user, opened + Duration::minutes(20), |_| ()).is_some());
        assert!(sessions.with_at(user, opened + Duration::minutes(45), |_| ()).is_some());

        let later = opened + Duration::minutes(76);
        assert!(sessions.with_at(user, later, |_| ()).is_none());
        assert!(sessions.is_empty());
    }

    #[test]
    fn sweep_drops_idle_sessions_but_not_submitting_ones() {
        let sessions = FormSessions::new(Duration::minutes(30));
        let idle = Uuid::new_v4();
        let submitting = Uuid::new_v4();
        let fresh = Uuid::new_v4();
        sessions.insert(idle, session()).unwrap();
        sessions.insert(submitting, session()).unwrap();
        sessions
            .with(submitting, |s| s.prepare_submission(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()))
            .unwrap()
            .unwrap();

        let now = Utc::now() + Duration::minutes(31);
        sessions.insert(fresh, session()).unwrap();
        sessions.with_at(fresh, now, |_| ());

        assert_eq!(sessions.evict_idle(Utc::now()), 0);
        assert_eq!(sessions.evict_idle(now), 1);
        assert!(sessions.with_at(idle, now, |_| ()).is_none());
        assert!(sessions.with_at(submitting, now, |_| ()).is_some());
        assert!(sessions.with_at(fresh, now, |_| ()).is_some());
        assert_eq!(sessions.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_runs_on_its_period() {
        let sessions = FormSessions::new(Duration::minutes(30));
        let mut stale = session();
        stale.touch(Utc::now() - Duration::hours(1));
        sessions.insert(Uuid::new_v4(), stale).unwrap();
        sessions.insert(Uuid::new_v4(), session()).unwrap();

        let sweeper = sessions.spawn_sweeper(std::time::Duration::from_secs(60));
        tokio::time::sleep(std::time::Duration::from_secs(61)).await;

        assert_eq!(sessions.len(), 1);
        sweeper.abort();
    }
}
