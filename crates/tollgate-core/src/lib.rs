//! Tollgate Core Business Logic
//!
//! This crate ties credential hashing, token issuance and the revocation
//! cache together into login and validation, and enforces per-account
//! ownership on every guarded resource.

pub mod accounts;
pub mod directory;
pub mod error;
pub mod guard;
pub mod policy;
pub mod session;
pub mod validation;

pub use accounts::AccountService;
pub use directory::{Account, AccountDirectory, AddressOwners, DirectoryError, OwnerDirectory};
pub use error::{CoreError, TokenFault};
pub use guard::{AccessPolicy, AuthorizationGuard, Decision, OwnerOnly};
pub use policy::{LivenessCheck, SessionPolicy, UnavailablePolicy};
pub use session::{LoginOutcome, RecordOutcome, SessionManager};
