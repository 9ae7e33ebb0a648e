//! The request and response data structures for interacting with an ACME server.

#![deny(unsafe_code)]
#![deny(missing_docs)]

use serde::Serialize;

pub mod account;
pub mod authorizations;
pub mod challenges;
pub mod directory;
pub mod identifier;
pub mod orders;
pub mod revocation;

pub use account::Account;
pub use authorizations::Authorization;
pub use challenges::Challenge;
pub use directory::Directory;
pub use identifier::Identifier;
pub use orders::Order;

/// Payload which moves an account or authorization to `deactivated`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Deactivate {
    status: DeactivatedStatus,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "lowercase")]
enum DeactivatedStatus {
    #[default]
    Deactivated,
}
