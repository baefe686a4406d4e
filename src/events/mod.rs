use serde::{Deserialize, Serialize};

pub mod streams;
pub use streams::{EventStream, Subscriber};

use crate::session::SessionSnapshot;

// Capacity of the session event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Why a session was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignOutReason {
    /// The user asked to sign out.
    Logout,
    /// The backend rejected the session token.
    Expired,
}

/// Events describing the session lifecycle.
///
/// `StateChanged` fires on every committed store transition, in
/// generation order. `SignedOut` fires exactly once per sign-out and is
/// the cue for consumers to navigate back to the login view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// The session store committed a new snapshot.
    StateChanged(SessionSnapshot),

    /// The session ended; consumers should return to the login view.
    SignedOut { reason: SignOutReason },
}
