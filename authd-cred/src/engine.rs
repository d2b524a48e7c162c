//! The credential engine's public contract, backed by PAM.
//!
//! Ordering contract, enforced by construction rather than by a runtime
//! assertion: `begin` returns a `CredentialEngine` in `Started` state;
//! `open_session` is the only thing that can move it to `SessionOpened`;
//! `end`/`Drop` always walk the state back down through [`cleanup`].

use crate::converse::LoginConverse;
use crate::error::AuthError;
use crate::pam::{CredAction, Item, PamSession};
use crate::state::{cleanup, CredState, Teardown};

/// An open credential transaction for one login attempt.
pub struct CredentialEngine<'a> {
    session: PamSession<'a>,
    state: CredState,
}

impl<'a> CredentialEngine<'a> {
    /// `begin`: opens a PAM transaction for `service_name`, with a
    /// conversation bound to `user`/`password`. Advances `Clean -> Started`.
    pub fn begin(
        service_name: &str,
        user: &str,
        password: &str,
        passwordless: bool,
    ) -> Result<Self, AuthError> {
        let converse = LoginConverse::new(user, password, passwordless);
        let session = PamSession::start(service_name, None, converse)?;
        Ok(CredentialEngine {
            session,
            state: CredState::Started,
        })
    }

    /// `setItem`: attaches the TTY name, X display name, or candidate user
    /// name to the transaction.
    pub fn set_tty(&mut self, tty: &str) -> Result<(), AuthError> {
        self.session.set_item(Item::Tty, tty)
    }

    pub fn set_x_display(&mut self, display: &str) -> Result<(), AuthError> {
        self.session.set_item(Item::XDisplay, display)
    }

    pub fn set_user(&mut self, user: &str) -> Result<(), AuthError> {
        self.session.set_item(Item::User, user)
    }

    /// `authenticate`: runs the provider's challenge loop via the bound
    /// conversation.
    pub fn authenticate(&mut self) -> Result<(), AuthError> {
        self.session.authenticate().map_err(|_| AuthError::AuthRejected)
    }

    /// `acctMgmt`: validates account policy, transparently handling a
    /// required password change.
    pub fn acct_mgmt(&mut self) -> Result<(), AuthError> {
        self.session.acct_mgmt()
    }

    /// `setCred`: establish/reinitialize/delete credentials.
    pub fn set_cred(&mut self, action: CredAction) -> Result<(), AuthError> {
        self.session.set_cred(action)
    }

    /// `openSession`: advances `Started -> SessionOpened`.
    pub fn open_session(&mut self) -> Result<(), AuthError> {
        self.session.open_session()?;
        self.state = CredState::SessionOpened;
        Ok(())
    }

    /// `closeSession`: part of teardown; does not itself change `state` —
    /// callers go through [`CredentialEngine::end`] or [`Drop`] so the
    /// inverse of every state above the target always runs.
    pub fn close_session(&mut self) -> Result<(), AuthError> {
        self.session.close_session()
    }

    /// `getItem`: reads back a provider-rewritten value, used to recover
    /// the canonical user name PAM may have remapped.
    pub fn get_user(&mut self) -> Result<Option<String>, AuthError> {
        self.session.get_item(Item::User)
    }

    /// `env`: the environment the provider wants exposed to the session.
    pub fn env(&mut self) -> Vec<(String, String)> {
        self.session
            .getenvlist()
            .into_iter()
            .filter_map(|entry| {
                let eq = entry.find('=')?;
                Some((entry[..eq].to_string(), entry[eq + 1..].to_string()))
            })
            .collect()
    }

    /// `putEnv`: merges caller-provided variables back into the provider's
    /// environment table.
    pub fn put_env(&mut self, vars: &[(String, String)]) -> Result<(), AuthError> {
        for (k, v) in vars {
            self.session.putenv(&format!("{}={}", k, v))?;
        }
        Ok(())
    }

    /// `end`: terminates the transaction, walking state back to `Clean`.
    pub fn end(&mut self) {
        let target = CredState::Clean;
        let mut state = self.state;
        cleanup(self, &mut state, target);
        self.state = state;
    }
}

impl<'a> Teardown for CredentialEngine<'a> {
    type Err = AuthError;

    fn close_session_and_delete_cred(&mut self) -> Result<(), Self::Err> {
        self.session.close_session()?;
        self.session.set_cred(CredAction::Delete)
    }

    fn end_transaction(&mut self) -> Result<(), Self::Err> {
        self.session.end()
    }
}

impl<'a> Drop for CredentialEngine<'a> {
    fn drop(&mut self) {
        self.end();
    }
}
