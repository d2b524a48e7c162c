//! The credential engine: authenticates a user and carries their account's
//! provider-managed session lifecycle (opening and closing credentials,
//! environment contributed by the provider) on behalf of the authenticator
//! helper process.
//!
//! Two backends implement the same [`CredentialEngine`] method surface:
//! PAM (the default, via [`pam`]) and a direct shadow-password fallback
//! (via [`shadow`], built with `--no-default-features`). Exactly one is
//! re-exported as `CredentialEngine` depending on the `pam` feature, so
//! callers never branch on which backend is in use.

pub mod action;
pub mod converse;
pub mod error;
pub mod state;

#[cfg(feature = "pam")]
pub mod pam;
#[cfg(feature = "pam")]
mod engine;

#[cfg(not(feature = "pam"))]
mod shadow;

pub use action::{CredAction, Item};
pub use converse::{Converse, ConverseError, LoginConverse};
pub use error::AuthError;
pub use state::CredState;

#[cfg(feature = "pam")]
pub use engine::CredentialEngine;

#[cfg(not(feature = "pam"))]
pub use shadow::CredentialEngine;
