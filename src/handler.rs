//! Error policy: classifying faults into recovery actions.
//!
//! The transports never consult this module. The layer that owns
//! reconnection feeds every fault it collects - together with the client
//! kind and the location it surfaced at - through an [`ErrorHandler`] and
//! acts on the returned [`Action`].

use std::error::Error;

use crate::error::HmacValidationError;

/// The kind of client experiencing the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientType {
    /// Companion client paired over the stream transport.
    Web,
    /// Primary device client on the raw transport.
    Mobile,
}

/// Where in the protocol stack an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Origin unknown.
    Unknown,
    /// Thrown while logging in.
    Login,
    /// Cryptographic failure.
    Cryptography,
    /// The media connection could not be renewed.
    MediaConnection,
    /// Error arriving from the stream itself.
    Stream,
    /// Thrown while pulling app state.
    PullAppState,
    /// Thrown while pushing app state.
    PushAppState,
    /// Thrown during the initial app state sync.
    InitialAppStateSync,
    /// Thrown while decoding or encoding a message.
    Message,
    /// Thrown while syncing history after first pairing.
    HistorySync,
}

/// What the session owner should do about a classified fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Ignore the failure.
    Discard,
    /// Delete the current session and create a new one instantly.
    Restore,
    /// Disconnect without deleting the session.
    Disconnect,
    /// Disconnect and reconnect to the same session.
    Reconnect,
    /// Delete the current session.
    LogOut,
}

/// Maps a classified fault to a recovery action.
///
/// Implementations must be pure apart from logging; the transports never
/// call them, so any custom policy (including ones producing
/// [`Action::Disconnect`] or [`Action::LogOut`]) is acceptable.
pub trait ErrorHandler: Send + Sync {
    /// Classify one fault.
    fn handle_error(
        &self,
        client: ClientType,
        location: Location,
        error: &(dyn Error + 'static),
    ) -> Action;
}

impl<F> ErrorHandler for F
where
    F: Fn(ClientType, Location, &(dyn Error + 'static)) -> Action + Send + Sync,
{
    fn handle_error(
        &self,
        client: ClientType,
        location: Location,
        error: &(dyn Error + 'static),
    ) -> Action {
        self(client, location, error)
    }
}

/// The default policy.
///
/// Decision table, evaluated in order:
/// 1. cryptography on a mobile client -> [`Action::Reconnect`]
/// 2. initial app state sync or cryptography -> [`Action::Restore`]
/// 3. message failing HMAC validation -> [`Action::Restore`]
/// 4. anything else -> [`Action::Discard`]
pub fn default_handler() -> impl ErrorHandler {
    |client: ClientType, location: Location, error: &(dyn Error + 'static)| {
        tracing::error!(?location, %error, "socket failure");

        if location == Location::Cryptography && client == ClientType::Mobile {
            tracing::warn!("reconnecting");
            return Action::Reconnect;
        }

        if location == Location::InitialAppStateSync
            || location == Location::Cryptography
            || (location == Location::Message && error.is::<HmacValidationError>())
        {
            tracing::warn!(?location, "restoring session");
            return Action::Restore;
        }

        tracing::warn!("ignored failure");
        Action::Discard
    }
}
