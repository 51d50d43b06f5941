#![forbid(unsafe_code)]

//! Emulated authentication with a subscribe/unsubscribe event bus.
//!
//! Every sign-in succeeds for one fixed identity. Sessions live only as long as
//! the caller holds them; nothing about a session is persisted, so
//! [`SessionBus::get_session`] always reports none.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::query::Response;
use crate::storage::seed::DEMO_USER_ID;
use crate::storage::table::{Table, TableKind, PROFILES};
use crate::storage::RecordStore;
use crate::types::{Record, Value};

mod listeners;

use listeners::ListenerRegistry;
pub use listeners::{Listener, Subscription};

/// Email reported when the caller supplies none.
pub const DEFAULT_EMAIL: &str = "demo@example.com";
/// Token carried by every emulated session.
pub const DEMO_ACCESS_TOKEN: &str = "demo-token";
const DEFAULT_FULL_NAME: &str = "Demo User";

/// Auth-state transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    /// A user signed in.
    SignedIn,
    /// A user registered.
    SignedUp,
    /// The active user signed out.
    SignedOut,
}

impl AuthEvent {
    /// Wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthEvent::SignedIn => "SIGNED_IN",
            AuthEvent::SignedUp => "SIGNED_UP",
            AuthEvent::SignedOut => "SIGNED_OUT",
        }
    }
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application role stored on a profile.
///
/// Roles other than the two the application knows are carried through as
/// stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Consumes content.
    #[default]
    Learner,
    /// Publishes content.
    Creator,
    /// Any other stored value.
    Other(String),
}

impl Role {
    /// Stored form of the role.
    pub fn as_str(&self) -> &str {
        match self {
            Role::Learner => "learner",
            Role::Creator => "creator",
            Role::Other(value) => value,
        }
    }

    /// Parses a stored role.
    pub fn parse(value: &str) -> Self {
        match value {
            "learner" => Role::Learner,
            "creator" => Role::Creator,
            other => Role::Other(other.to_string()),
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::parse(&value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// Metadata attached to an emulated user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Role at sign-in time.
    pub role: Role,
}

/// Authenticated identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier; always the demo identity here.
    pub id: String,
    /// Address used to sign in, if known.
    pub email: Option<String>,
    /// Profile-derived metadata, if known.
    pub user_metadata: Option<UserMetadata>,
}

/// Identity plus access token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Signed-in user.
    pub user: User,
    /// Bearer token.
    pub access_token: String,
}

/// Payload of auth responses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthData {
    /// Affected user, if any.
    pub user: Option<User>,
    /// Resulting session, if any.
    pub session: Option<Session>,
}

/// Response of every auth call.
pub type AuthResponse = Response<AuthData>;

/// Password sign-in request. The password is never checked.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    /// Email address; defaults to [`DEFAULT_EMAIL`].
    pub email: Option<String>,
    /// Ignored.
    pub password: String,
}

/// Profile fields supplied at registration.
#[derive(Clone, Debug, Default)]
pub struct SignUpData {
    /// Display name; defaults to "Demo User".
    pub full_name: Option<String>,
    /// Role; defaults to learner.
    pub role: Option<Role>,
}

/// Registration options.
#[derive(Clone, Debug, Default)]
pub struct SignUpOptions {
    /// Profile data.
    pub data: SignUpData,
}

/// Registration request.
#[derive(Clone, Debug, Default)]
pub struct SignUpRequest {
    /// Email address; defaults to [`DEFAULT_EMAIL`].
    pub email: Option<String>,
    /// Ignored.
    pub password: String,
    /// Profile data.
    pub options: SignUpOptions,
}

/// Attributes accepted by `update_user`.
#[derive(Clone, Debug, Default)]
pub struct UserAttributes {
    /// New password; accepted and discarded.
    pub password: Option<String>,
}

/// Auth surface of the emulator. Listeners are scoped to this instance.
#[derive(Clone)]
pub struct SessionBus {
    store: Arc<RecordStore>,
    registry: Arc<ListenerRegistry>,
}

impl SessionBus {
    /// Binds a bus to the store holding `profiles`.
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self {
            store,
            registry: Arc::new(ListenerRegistry::default()),
        }
    }

    /// Registers `listener` for every subsequent transition.
    pub fn on_auth_state_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(AuthEvent, Option<&Session>) + Send + Sync + 'static,
    {
        let id = self.registry.subscribe(listener);
        debug!(id, listeners = self.registry.len(), "session.subscribe");
        Subscription::new(id, &self.registry)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.registry.len()
    }

    /// Always reports no active session.
    pub async fn get_session(&self) -> Response<Option<Session>> {
        Response::ok(None)
    }

    /// Signs in as the demo identity; the password is not checked.
    pub async fn sign_in_with_password(&self, credentials: Credentials) -> AuthResponse {
        let role = self
            .store
            .lookup(PROFILES, DEMO_USER_ID)
            .and_then(|profile| profile.get("role").and_then(Value::as_str).map(Role::parse))
            .unwrap_or_default();
        let user = demo_user(credentials.email, role);
        let session = self.emit(AuthEvent::SignedIn, Some(user.clone()));
        Response::ok(AuthData {
            user: Some(user),
            session,
        })
    }

    /// Creates or overwrites the demo profile, persists it and signs in.
    pub async fn sign_up(&self, request: SignUpRequest) -> AuthResponse {
        let role = request.options.data.role.unwrap_or_default();
        let full_name = request
            .options
            .data
            .full_name
            .unwrap_or_else(|| DEFAULT_FULL_NAME.to_string());
        let mut profile = Record::new();
        profile.insert("full_name".into(), json!(full_name));
        profile.insert("role".into(), json!(role.as_str()));
        self.store.mutate(|tables| {
            tables
                .entry(PROFILES.to_string())
                .or_insert_with(|| Table::empty(TableKind::Map))
                .insert_front(DEMO_USER_ID, profile);
        });
        let user = demo_user(request.email, role);
        let session = self.emit(AuthEvent::SignedUp, Some(user.clone()));
        Response::ok(AuthData {
            user: Some(user),
            session,
        })
    }

    /// Notifies listeners of sign-out. The stored profile is kept.
    pub async fn sign_out(&self) -> Response<()> {
        self.emit(AuthEvent::SignedOut, None);
        Response::ok(())
    }

    /// Accepts a password change without storing anything.
    pub async fn update_user(&self, attributes: UserAttributes) -> AuthResponse {
        debug!(password_supplied = attributes.password.is_some(), "session.update_user.ignored");
        Response::ok(AuthData {
            user: Some(User {
                id: DEMO_USER_ID.to_string(),
                email: None,
                user_metadata: None,
            }),
            session: None,
        })
    }

    fn emit(&self, event: AuthEvent, user: Option<User>) -> Option<Session> {
        let session = user.map(|user| Session {
            user,
            access_token: DEMO_ACCESS_TOKEN.to_string(),
        });
        let delivered = self.registry.emit(event, session.as_ref());
        info!(%event, delivered, "session.emit");
        session
    }
}

fn demo_user(email: Option<String>, role: Role) -> User {
    User {
        id: DEMO_USER_ID.to_string(),
        email: Some(email.unwrap_or_else(|| DEFAULT_EMAIL.to_string())),
        user_metadata: Some(UserMetadata { role }),
    }
}
