//! Provider-independent vocabulary shared by the PAM backend and the
//! shadow-password fallback, so `CredentialEngine`'s two implementations
//! expose the identical method surface regardless of which one a build
//! selects.

/// Which item a caller wants to set or read back on the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item {
    Tty,
    XDisplay,
    User,
}

/// Which credential lifecycle transition to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredAction {
    Establish,
    Reinitialize,
    Delete,
}
