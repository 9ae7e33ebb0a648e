//! Identifier authorizations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::challenges::{Challenge, ChallengeKind};
use super::identifier::Identifier;

/// The provider's record that an account may (or may not yet) request
/// certificates for one identifier.
///
/// Wildcard orders produce an authorization for the base domain with
/// `wildcard` set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authorization {
    /// Identifier being authorized.
    pub identifier: Identifier,

    /// Current state.
    pub status: AuthorizationStatus,

    /// Expiry of the authorization, required once it is valid.
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,

    /// Challenges on offer while pending. Once settled, only the challenge
    /// which passed or failed remains.
    #[serde(default)]
    pub challenges: Vec<Challenge>,

    /// Set when the order asked for `*.` plus this identifier.
    #[serde(skip_serializing, default)]
    pub wildcard: bool,
}

impl Authorization {
    /// The first offered challenge of `kind`.
    pub fn challenge(&self, kind: &ChallengeKind) -> Option<&Challenge> {
        self.challenges.iter().find(|challenge| challenge.kind() == kind)
    }
}

/// Lifecycle of an [`Authorization`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationStatus {
    /// No challenge has passed yet.
    Pending,

    /// A challenge passed.
    Valid,

    /// A challenge failed. This is terminal.
    Invalid,

    /// Deactivated by the client.
    Deactivated,

    /// Past its `expires` timestamp.
    Expired,

    /// Revoked by the provider.
    Revoked,
}
