//! The shadow-password fallback provider, used when the engine is built
//! without PAM support (`--no-default-features`). `authenticate` resolves
//! the passwd and shadow records directly and compares a crypt(3) hash;
//! every other lifecycle step is a no-op, and the provider never remaps the
//! user name — it is returned to the caller verbatim, the same contract the
//! original source's non-PAM branch has.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_long, c_ulong};

use subtle::ConstantTimeEq;

use crate::action::CredAction;
use crate::error::AuthError;

#[repr(C)]
struct Spwd {
    sp_namp: *mut c_char,
    sp_pwdp: *mut c_char,
    sp_lstchg: c_long,
    sp_min: c_long,
    sp_max: c_long,
    sp_warn: c_long,
    sp_inact: c_long,
    sp_expire: c_long,
    sp_flag: c_ulong,
}

extern "C" {
    fn getspnam(name: *const c_char) -> *mut Spwd;
    fn crypt(key: *const c_char, salt: *const c_char) -> *mut c_char;
}

/// Constant-time byte compare of two crypt(3) hashes. Hash length depends
/// only on the algorithm and salt, not the submitted password, so the
/// length check up front leaks nothing a short-circuiting `==` wouldn't;
/// once lengths match the byte comparison itself takes the same time
/// regardless of where the hashes first diverge.
fn hashes_match(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.ct_eq(b).into()
}

pub struct CredentialEngine {
    user: String,
    password: Option<String>,
    passwordless: bool,
}

impl CredentialEngine {
    pub fn begin(
        _service_name: &str,
        user: &str,
        password: &str,
        passwordless: bool,
    ) -> Result<Self, AuthError> {
        Ok(CredentialEngine {
            user: user.to_string(),
            password: if passwordless { None } else { Some(password.to_string()) },
            passwordless,
        })
    }

    pub fn set_tty(&mut self, _tty: &str) -> Result<(), AuthError> {
        Ok(())
    }

    pub fn set_x_display(&mut self, _display: &str) -> Result<(), AuthError> {
        Ok(())
    }

    pub fn set_user(&mut self, _user: &str) -> Result<(), AuthError> {
        Ok(())
    }

    /// Resolves the passwd and shadow records for the user, crypts the
    /// submitted password with the stored salt, and compares against the
    /// stored hash. An empty stored hash means the account has no password
    /// and any submitted password (or none, under `passwordless`) succeeds.
    pub fn authenticate(&mut self) -> Result<(), AuthError> {
        if self.passwordless {
            if users::get_user_by_name(&self.user).is_none() {
                return Err(AuthError::UserUnknown);
            }
            return Ok(());
        }

        let password = self.password.take().unwrap_or_default();

        if users::get_user_by_name(&self.user).is_none() {
            return Err(AuthError::UserUnknown);
        }

        let name_c = CString::new(self.user.as_str())?;
        let sp = unsafe { getspnam(name_c.as_ptr()) };
        if sp.is_null() {
            return Err(AuthError::Provider("no shadow entry for user".into()));
        }
        let stored = unsafe { CStr::from_ptr((*sp).sp_pwdp) }.to_string_lossy().into_owned();

        if stored.is_empty() {
            return Ok(());
        }

        let stored_c = CString::new(stored.as_str())?;
        let password_c = CString::new(password)?;
        let encrypted = unsafe { crypt(password_c.as_ptr(), stored_c.as_ptr()) };
        if encrypted.is_null() {
            return Err(AuthError::Provider("crypt(3) failed".into()));
        }
        let encrypted = unsafe { CStr::from_ptr(encrypted) }.to_string_lossy().into_owned();

        if hashes_match(encrypted.as_bytes(), stored.as_bytes()) {
            Ok(())
        } else {
            Err(AuthError::AuthRejected)
        }
    }

    pub fn acct_mgmt(&mut self) -> Result<(), AuthError> {
        Ok(())
    }

    pub fn set_cred(&mut self, _action: CredAction) -> Result<(), AuthError> {
        Ok(())
    }

    pub fn open_session(&mut self) -> Result<(), AuthError> {
        Ok(())
    }

    pub fn close_session(&mut self) -> Result<(), AuthError> {
        Ok(())
    }

    /// The fallback provider has no concept of a provider-mapped user name;
    /// the input name is returned verbatim.
    pub fn get_user(&mut self) -> Result<Option<String>, AuthError> {
        Ok(Some(self.user.clone()))
    }

    pub fn env(&mut self) -> Vec<(String, String)> {
        Vec::new()
    }

    pub fn put_env(&mut self, _vars: &[(String, String)]) -> Result<(), AuthError> {
        Ok(())
    }

    pub fn end(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_user_is_rejected() {
        let mut engine =
            CredentialEngine::begin("login", "no-such-user-xyz", "whatever", false).unwrap();
        assert!(matches!(engine.authenticate(), Err(AuthError::UserUnknown)));
    }

    #[test]
    fn get_user_never_remaps() {
        let mut engine = CredentialEngine::begin("login", "someone", "x", true).unwrap();
        assert_eq!(engine.get_user().unwrap(), Some("someone".to_string()));
    }

    #[test]
    fn env_is_always_empty() {
        let mut engine = CredentialEngine::begin("login", "someone", "x", true).unwrap();
        assert!(engine.env().is_empty());
    }

    #[test]
    fn hashes_match_requires_exact_equality() {
        assert!(hashes_match(b"$6$abc$hash", b"$6$abc$hash"));
        assert!(!hashes_match(b"$6$abc$hash", b"$6$abc$other"));
        assert!(!hashes_match(b"$6$abc$hash", b"$6$abc$hash-longer"));
    }
}
