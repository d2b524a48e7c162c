//! Resolves an authenticated `(user, sessionDescriptor)` pair into a
//! running, privilege-dropped process: passwd lookup, session-descriptor
//! parsing, environment composition, and the fork/drop-privileges/exec
//! sequence.

mod broker_handle;
mod descriptor;
mod environment;
mod error;
mod identity;
mod launcher;

pub use broker_handle::BrokerHandle;
pub use descriptor::SessionDescriptor;
pub use error::LaunchError;
pub use identity::UserIdentity;
pub use launcher::{LaunchConfig, LaunchedSession, PreparedLaunch, SessionLauncher};
