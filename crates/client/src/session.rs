//! Session and authentication facade.
//!
//! Wraps the auth protocol with state management: the current user and
//! profile, persistence through the token store, and a listener registry
//! notified on every auth transition.
//!
//! # States
//!
//! The facade moves between `signed_out`, `signed_in`, and `signed_up`:
//!
//! - sign-in success -> `signed_in` (token and user persisted, profile
//!   fetched, missing profile auto-provisioned with the vendor role)
//! - sign-up success -> `signed_up`; when the backend issues a token
//!   immediately the session is persisted too, and the user profile is
//!   created with the new user's id
//! - sign-out or a failed token verification -> `signed_out`; local state is
//!   cleared unconditionally even when the remote logout call fails
//!
//! # Listeners
//!
//! Subscribing invokes the callback synchronously and immediately with the
//! *current* state, then again on every transition, in subscription order.
//! This replay-on-subscribe is part of the contract, not incidental. The
//! listener list is snapshotted before dispatch, so subscribing or
//! unsubscribing from within a callback is safe; no ordering guarantee is
//! given for such re-entrant changes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use secrecy::SecretString;
use serde_json::Value;
use thiserror::Error;
use tracing::{instrument, warn};
use vendor_connect_core::validate::{is_valid_email, is_valid_password, is_valid_phone};
use vendor_connect_core::{UserId, UserType};

use crate::backend::auth::{SignUpMetadata, SignUpResponse};
use crate::backend::query::first_row;
use crate::backend::{BackendClient, BackendError};
use crate::types::{NewProfile, Profile, ProfileUpdate, Session, User};

/// Remote table holding user profiles.
const PROFILE_TABLE: &str = "user_profiles";

/// Errors surfaced by the session facade.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The email failed local validation.
    #[error("Please enter a valid email address")]
    InvalidEmail,

    /// The password failed local validation.
    #[error("Password must be at least 6 characters")]
    InvalidPassword,

    /// The phone number failed local validation.
    #[error("Please enter a valid 10-digit phone number")]
    InvalidPhone,

    /// The operation needs a signed-in session.
    #[error("no active session")]
    NotSignedIn,

    /// Session refresh was requested without a stored refresh token.
    #[error("no refresh token available")]
    MissingRefreshToken,
}

/// Nominal auth states reported to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthState {
    SignedOut,
    SignedIn,
    SignedUp,
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SignedOut => "signed_out",
            Self::SignedIn => "signed_in",
            Self::SignedUp => "signed_up",
        };
        write!(f, "{s}")
    }
}

/// Handle returned by [`SessionManager::subscribe`]; unsubscribes by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type AuthListener = Arc<dyn Fn(AuthState, Option<&User>, Option<&Profile>) + Send + Sync>;

/// Registration input for [`SessionManager::sign_up`].
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub user_type: UserType,
    pub phone: String,
    pub business_name: Option<String>,
    pub address_street: Option<String>,
    pub address_city: Option<String>,
    pub address_state: Option<String>,
    pub address_pincode: Option<String>,
}

impl std::fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("name", &self.name)
            .field("user_type", &self.user_type)
            .field("phone", &self.phone)
            .finish_non_exhaustive()
    }
}

/// What a completed sign-up produced.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    /// The newly registered user.
    pub user: User,
    /// The created profile row.
    pub profile: Profile,
    /// Whether the backend issued a token immediately (no email
    /// confirmation step); when false the user must sign in after
    /// confirming.
    pub authenticated: bool,
}

#[derive(Default)]
struct AuthCache {
    user: Option<User>,
    profile: Option<Profile>,
}

struct SessionInner {
    backend: BackendClient,
    cache: Mutex<AuthCache>,
    listeners: Mutex<Vec<(u64, AuthListener)>>,
    next_listener_id: AtomicU64,
}

/// Session and authentication facade.
///
/// Cheaply cloneable; all clones share state and listeners.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

impl SessionManager {
    /// Create a facade, restoring any session persisted in the token store.
    ///
    /// A stored token with an unparseable user is treated as signed out and
    /// the stale keys are cleared.
    #[must_use]
    pub fn new(backend: BackendClient) -> Self {
        let mut cache = AuthCache::default();

        if backend.tokens().access_token().is_some() {
            if let Some(user) = backend.tokens().user() {
                cache.profile = backend.tokens().profile();
                cache.user = Some(user);
            } else {
                backend.tokens().clear();
            }
        }

        Self {
            inner: Arc::new(SessionInner {
                backend,
                cache: Mutex::new(cache),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(0),
            }),
        }
    }

    fn cache(&self) -> MutexGuard<'_, AuthCache> {
        self.inner.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The signed-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.cache().user.clone()
    }

    /// The signed-in user's profile, if fetched.
    #[must_use]
    pub fn current_profile(&self) -> Option<Profile> {
        self.cache().profile.clone()
    }

    /// The current access token, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.backend().tokens().access_token()
    }

    /// Whether a user is signed in with a stored token.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.cache().user.is_some() && self.access_token().is_some()
    }

    /// Whether the signed-in user's profile has the vendor role.
    #[must_use]
    pub fn is_vendor(&self) -> bool {
        self.current_profile()
            .is_some_and(|p| p.user_type == UserType::Vendor)
    }

    /// Whether the signed-in user's profile has the supplier role.
    #[must_use]
    pub fn is_supplier(&self) -> bool {
        self.current_profile()
            .is_some_and(|p| p.user_type == UserType::Supplier)
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Register a listener for auth transitions.
    ///
    /// The listener is invoked synchronously right now with the current
    /// state (`signed_in` with user and profile when authenticated,
    /// `signed_out` otherwise), then on every future transition, in
    /// subscription order.
    pub fn subscribe(
        &self,
        listener: impl Fn(AuthState, Option<&User>, Option<&Profile>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let listener: AuthListener = Arc::new(listener);

        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener.clone()));

        // Replay the current state to the new subscriber only.
        let (state, user, profile) = if self.is_authenticated() {
            let cache = self.cache();
            (AuthState::SignedIn, cache.user.clone(), cache.profile.clone())
        } else {
            (AuthState::SignedOut, None, None)
        };
        listener(state, user.as_ref(), profile.as_ref());

        SubscriptionId(id)
    }

    /// Remove a listener. Returns whether it was still registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id.0);
        listeners.len() < before
    }

    /// Invoke every listener with `state` and the current user/profile.
    fn notify(&self, state: AuthState) {
        let (user, profile) = {
            let cache = self.cache();
            (cache.user.clone(), cache.profile.clone())
        };

        // Snapshot so re-entrant subscribe/unsubscribe cannot deadlock.
        let listeners: Vec<AuthListener> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener(state, user.as_ref(), profile.as_ref());
        }
    }

    // =========================================================================
    // Sign-in / sign-up / sign-out
    // =========================================================================

    /// Sign in with email and password.
    ///
    /// On success the session is persisted, the profile fetched (or
    /// auto-provisioned, see [`Self::ensure_profile`]), and listeners move
    /// to `signed_in`.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any network call when the inputs
    /// are malformed, `BackendError::Api` on rejected credentials, and other
    /// `BackendError`s on protocol failures.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if !is_valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        if !is_valid_password(password) {
            return Err(AuthError::InvalidPassword);
        }

        let password = SecretString::from(password.to_owned());
        let grant = self.backend().password_grant(email, &password).await?;
        let session: Session = grant.into();

        self.backend().tokens().save_session(&session);
        self.cache().user = Some(session.user.clone());

        self.ensure_profile(&session.user).await?;

        self.notify(AuthState::SignedIn);
        Ok(session)
    }

    /// Register a new user and create their profile.
    ///
    /// When the backend issues a token immediately the session is persisted
    /// and listeners move to `signed_up` before the profile insert runs; the
    /// profile row is created with the new user's id either way.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any network call when the inputs
    /// are malformed, `BackendError::Api` on backend-reported failures (e.g.
    /// already-registered email), and other `BackendError`s on protocol
    /// failures.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, AuthError> {
        if !is_valid_email(&request.email) {
            return Err(AuthError::InvalidEmail);
        }
        if !is_valid_password(&request.password) {
            return Err(AuthError::InvalidPassword);
        }
        if !is_valid_phone(&request.phone) {
            return Err(AuthError::InvalidPhone);
        }

        let password = SecretString::from(request.password.clone());
        let metadata = SignUpMetadata {
            name: request.name.clone(),
            user_type: request.user_type,
        };
        let response: SignUpResponse = self
            .backend()
            .sign_up_request(&request.email, &password, &metadata)
            .await?;

        let user = response
            .user
            .ok_or_else(|| BackendError::Api("sign-up returned no user".to_string()))?;
        self.cache().user = Some(user.clone());

        let authenticated = match response.access_token {
            Some(access_token) => {
                let session = Session {
                    access_token,
                    refresh_token: response.refresh_token,
                    user: user.clone(),
                };
                self.backend().tokens().save_session(&session);
                self.notify(AuthState::SignedUp);
                true
            }
            None => false,
        };

        let profile = self
            .create_profile(NewProfile {
                id: user.id.clone(),
                name: request.name,
                user_type: request.user_type,
                phone: Some(request.phone),
                business_name: request.business_name,
                address_street: request.address_street,
                address_city: request.address_city,
                address_state: request.address_state,
                address_pincode: request.address_pincode,
            })
            .await?;

        Ok(SignUpOutcome {
            user,
            profile,
            authenticated,
        })
    }

    /// Sign out, clearing local state unconditionally.
    ///
    /// The remote invalidation call is best-effort: a failure is logged and
    /// the session still ends locally (fail open to signed out).
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        if let Some(token) = self.access_token()
            && let Err(error) = self.backend().logout(&token).await
        {
            warn!(%error, "remote sign-out failed; clearing local session anyway");
        }

        self.backend().tokens().clear();
        {
            let mut cache = self.cache();
            cache.user = None;
            cache.profile = None;
        }

        self.notify(AuthState::SignedOut);
    }

    // =========================================================================
    // Token lifecycle
    // =========================================================================

    /// Check the stored token against the backend.
    ///
    /// On success the stored user is refreshed and `true` returned. A
    /// missing token returns `false`; a rejected token or transport failure
    /// signs out and returns `false`.
    #[instrument(skip(self))]
    pub async fn verify_token(&self) -> bool {
        let Some(token) = self.access_token() else {
            return false;
        };

        match self.backend().fetch_user(&token).await {
            Ok(user) => {
                self.backend().tokens().save_user(&user);
                self.cache().user = Some(user);
                true
            }
            Err(error) => {
                warn!(%error, "token verification failed; signing out");
                self.sign_out().await;
                false
            }
        }
    }

    /// Exchange the stored refresh token for a fresh session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingRefreshToken` when no refresh token is
    /// stored, or the backend error when the grant is rejected; either way
    /// the session is signed out first.
    #[instrument(skip(self))]
    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        let Some(refresh_token) = self.backend().tokens().refresh_token() else {
            self.sign_out().await;
            return Err(AuthError::MissingRefreshToken);
        };

        match self.backend().refresh_grant(&refresh_token).await {
            Ok(grant) => {
                let session: Session = grant.into();
                self.backend().tokens().save_session(&session);
                self.cache().user = Some(session.user.clone());
                Ok(session)
            }
            Err(error) => {
                warn!(%error, "session refresh failed; signing out");
                self.sign_out().await;
                Err(error.into())
            }
        }
    }

    /// Request a password-recovery email.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the request fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        self.backend().recover_password(email).await?;
        Ok(())
    }

    /// Set a new password for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidPassword` before any network call when the
    /// password is too short, `AuthError::NotSignedIn` without a session,
    /// and the backend error when the update is rejected.
    #[instrument(skip(self, new_password))]
    pub async fn update_password(&self, new_password: &str) -> Result<(), AuthError> {
        if !is_valid_password(new_password) {
            return Err(AuthError::InvalidPassword);
        }
        let token = self.access_token().ok_or(AuthError::NotSignedIn)?;

        let new_password = SecretString::from(new_password.to_owned());
        let user = self
            .backend()
            .update_user_password(&token, &new_password)
            .await?;

        self.backend().tokens().save_user(&user);
        self.cache().user = Some(user);
        Ok(())
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    /// Fetch the profile row for `user_id`, if one exists.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the query fails.
    pub async fn fetch_profile(&self, user_id: &UserId) -> Result<Option<Profile>, AuthError> {
        let rows: Vec<Profile> = self
            .backend()
            .table(PROFILE_TABLE)
            .eq("id", user_id)
            .execute()
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Insert a profile row and cache it.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the insert fails.
    pub async fn create_profile(&self, profile: NewProfile) -> Result<Profile, AuthError> {
        let rows: Vec<Profile> = self
            .backend()
            .table(PROFILE_TABLE)
            .insert(&profile)
            .await?;
        let created = first_row(rows)?;

        self.backend().tokens().save_profile(&created);
        self.cache().profile = Some(created.clone());
        Ok(created)
    }

    /// Apply a partial update to the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotSignedIn` without a session, and the backend
    /// error when the update fails.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, AuthError> {
        let user = self.current_user().ok_or(AuthError::NotSignedIn)?;

        let rows: Vec<Profile> = self
            .backend()
            .table(PROFILE_TABLE)
            .eq("id", &user.id)
            .update(update)
            .await?;
        let updated = first_row(rows)?;

        self.backend().tokens().save_profile(&updated);
        self.cache().profile = Some(updated.clone());
        Ok(updated)
    }

    /// Load the user's profile into the cache, provisioning a default when
    /// none exists.
    ///
    /// A user without a profile row gets a minimal one written back: the
    /// vendor role, named from the signup metadata or the email local part.
    async fn ensure_profile(&self, user: &User) -> Result<Profile, AuthError> {
        if let Some(profile) = self.fetch_profile(&user.id).await? {
            self.backend().tokens().save_profile(&profile);
            self.cache().profile = Some(profile.clone());
            return Ok(profile);
        }

        self.create_profile(NewProfile {
            id: user.id.clone(),
            name: default_display_name(user),
            user_type: UserType::Vendor,
            phone: None,
            business_name: None,
            address_street: None,
            address_city: None,
            address_state: None,
            address_pincode: None,
        })
        .await
    }
}

/// Display name for a user without a profile: signup metadata name, else the
/// email local part, else a generic fallback.
fn default_display_name(user: &User) -> String {
    if let Some(name) = user
        .extra
        .get("user_metadata")
        .and_then(|m| m.get("name"))
        .and_then(Value::as_str)
    {
        return name.to_owned();
    }

    user.email
        .as_deref()
        .and_then(|email| email.split('@').next())
        .filter(|local| !local.is_empty())
        .map_or_else(|| "Vendor".to_owned(), str::to_owned)
}
