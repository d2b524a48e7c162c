//! A thin, safe-ish wrapper around the raw libpam entry points, covering
//! the credential engine's public contract: `begin`, `setItem`,
//! `authenticate`, `acctMgmt`, `setCred`, `openSession`, `closeSession`,
//! `getItem`, `env`, `putEnv`, `end`.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::pin::Pin;
use std::ptr;

use pam_sys::{PamConversation, PamFlag, PamHandle, PamItemType, PamReturnCode};

use super::ffi::{make_conversation, PamConvHandlerWrapper};
use crate::action::{CredAction, Item};
use crate::converse::Converse;
use crate::error::AuthError;

// libpam's ABI is part of the platform's C library contract; pam-sys gives
// us the types (`PamHandle`, `PamReturnCode`, `PamFlag`, `PamItemType`,
// `PamConversation`) but not a safe call surface, so we bind the handful of
// entry points we need directly, the way the source this is grounded on
// (`PAM.cpp`) calls `pam_*` directly.
#[link(name = "pam")]
extern "C" {
    fn pam_start(
        service_name: *const c_char,
        user: *const c_char,
        pam_conversation: *const PamConversation,
        pamh: *mut *mut PamHandle,
    ) -> c_int;
    fn pam_end(pamh: *mut PamHandle, pam_status: c_int) -> c_int;
    fn pam_authenticate(pamh: *mut PamHandle, flags: c_int) -> c_int;
    fn pam_acct_mgmt(pamh: *mut PamHandle, flags: c_int) -> c_int;
    fn pam_setcred(pamh: *mut PamHandle, flags: c_int) -> c_int;
    fn pam_open_session(pamh: *mut PamHandle, flags: c_int) -> c_int;
    fn pam_close_session(pamh: *mut PamHandle, flags: c_int) -> c_int;
    fn pam_chauthtok(pamh: *mut PamHandle, flags: c_int) -> c_int;
    fn pam_set_item(pamh: *mut PamHandle, item_type: c_int, item: *const c_void) -> c_int;
    fn pam_get_item(pamh: *const PamHandle, item_type: c_int, item: *mut *const c_void) -> c_int;
    fn pam_putenv(pamh: *mut PamHandle, name_value: *const c_char) -> c_int;
    fn pam_getenvlist(pamh: *mut PamHandle) -> *mut *mut c_char;
    fn pam_strerror(pamh: *mut PamHandle, errnum: c_int) -> *const c_char;
}

fn item_to_pam(item: Item) -> PamItemType {
    match item {
        Item::Tty => PamItemType::TTY,
        Item::XDisplay => PamItemType::XDISPLAY,
        Item::User => PamItemType::USER,
    }
}

fn action_to_flag(action: CredAction) -> PamFlag {
    match action {
        CredAction::Establish => PamFlag::ESTABLISH_CRED,
        CredAction::Reinitialize => PamFlag::REINITIALIZE_CRED,
        CredAction::Delete => PamFlag::DELETE_CRED,
    }
}

pub struct PamSession<'a> {
    handle: *mut PamHandle,
    // Keeps the conversation context (and therefore the stable address
    // behind PAM's `data_ptr`) alive for as long as the transaction lasts.
    _conv_wrapper: Box<PamConvHandlerWrapper<'a>>,
    last_status: c_int,
    ended: bool,
}

// The raw handle is only ever touched from the single thread that owns the
// credential engine; nothing here is `Sync`, and nothing needs to be.
unsafe impl<'a> Send for PamSession<'a> {}

impl<'a> PamSession<'a> {
    pub fn start(
        service_name: &str,
        user: Option<&str>,
        converse: impl Converse + 'a,
    ) -> Result<Self, AuthError> {
        let mut wrapper = Box::new(PamConvHandlerWrapper {
            handler: Pin::new(Box::new(converse)),
        });
        let conv = make_conversation(&mut wrapper);

        let service_c = CString::new(service_name)?;
        let user_c = user.map(CString::new).transpose()?;

        let mut handle: *mut PamHandle = ptr::null_mut();
        let rc = unsafe {
            pam_start(
                service_c.as_ptr(),
                user_c.as_ref().map_or(ptr::null(), |c| c.as_ptr()),
                &conv,
                &mut handle,
            )
        };
        if rc != PamReturnCode::SUCCESS as c_int {
            return Err(AuthError::Provider(format!("pam_start: {}", rc)));
        }

        Ok(PamSession {
            handle,
            _conv_wrapper: wrapper,
            last_status: PamReturnCode::SUCCESS as c_int,
            ended: false,
        })
    }

    fn strerror(&mut self, code: c_int) -> String {
        let msg = unsafe { pam_strerror(self.handle, code) };
        if msg.is_null() {
            format!("pam error {}", code)
        } else {
            unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
        }
    }

    fn check(&mut self, what: &str, rc: c_int) -> Result<(), AuthError> {
        self.last_status = rc;
        if rc == PamReturnCode::SUCCESS as c_int {
            Ok(())
        } else {
            let text = self.strerror(rc);
            Err(AuthError::Provider(format!("{}: {}", what, text)))
        }
    }

    pub fn set_item(&mut self, item: Item, value: &str) -> Result<(), AuthError> {
        let c_value = CString::new(value)?;
        let rc = unsafe {
            pam_set_item(
                self.handle,
                item_to_pam(item) as c_int,
                c_value.as_ptr() as *const c_void,
            )
        };
        self.check("pam_set_item", rc)
    }

    pub fn get_item(&mut self, item: Item) -> Result<Option<String>, AuthError> {
        let mut out: *const c_void = ptr::null();
        let rc = unsafe { pam_get_item(self.handle, item_to_pam(item) as c_int, &mut out) };
        self.check("pam_get_item", rc)?;
        if out.is_null() {
            return Ok(None);
        }
        let s = unsafe { CStr::from_ptr(out as *const c_char) }
            .to_string_lossy()
            .into_owned();
        Ok(Some(s))
    }

    pub fn authenticate(&mut self) -> Result<(), AuthError> {
        let rc = unsafe { pam_authenticate(self.handle, PamFlag::NONE as c_int) };
        self.check("pam_authenticate", rc)
    }

    /// Validates account policy. On `PAM_NEW_AUTHTOK_REQD`, transparently
    /// forces a password change via `pam_chauthtok` and returns *that*
    /// call's outcome, matching the credential engine's account-management
    /// contract.
    pub fn acct_mgmt(&mut self) -> Result<(), AuthError> {
        let rc = unsafe { pam_acct_mgmt(self.handle, PamFlag::NONE as c_int) };
        if rc == PamReturnCode::NEW_AUTHTOK_REQD as c_int {
            let rc = unsafe { pam_chauthtok(self.handle, PamFlag::CHANGE_EXPIRED_AUTHTOK as c_int) };
            return self.check("pam_chauthtok", rc);
        }
        self.check("pam_acct_mgmt", rc)
    }

    pub fn set_cred(&mut self, action: CredAction) -> Result<(), AuthError> {
        let rc = unsafe { pam_setcred(self.handle, action_to_flag(action) as c_int) };
        self.check("pam_setcred", rc)
    }

    pub fn open_session(&mut self) -> Result<(), AuthError> {
        let rc = unsafe { pam_open_session(self.handle, PamFlag::NONE as c_int) };
        self.check("pam_open_session", rc)
    }

    pub fn close_session(&mut self) -> Result<(), AuthError> {
        let rc = unsafe { pam_close_session(self.handle, PamFlag::NONE as c_int) };
        self.check("pam_close_session", rc)
    }

    pub fn putenv(&mut self, name_value: &str) -> Result<(), AuthError> {
        let c = CString::new(name_value)?;
        let rc = unsafe { pam_putenv(self.handle, c.as_ptr()) };
        self.check("pam_putenv", rc)
    }

    /// Returns PAM's environment table as `NAME=VALUE` strings, freeing the
    /// C-allocated list PAM handed back.
    pub fn getenvlist(&mut self) -> Vec<String> {
        let raw = unsafe { pam_getenvlist(self.handle) };
        if raw.is_null() {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut i = 0isize;
        loop {
            let entry = unsafe { *raw.offset(i) };
            if entry.is_null() {
                break;
            }
            let s = unsafe { CStr::from_ptr(entry) }.to_string_lossy().into_owned();
            out.push(s);
            unsafe { libc::free(entry as *mut c_void) };
            i += 1;
        }
        unsafe { libc::free(raw as *mut c_void) };
        out
    }

    /// `pam_end`. Idempotent: a second call is a no-op, since ending an
    /// already-ended transaction is undefined in libpam.
    pub fn end(&mut self) -> Result<(), AuthError> {
        if self.ended {
            return Ok(());
        }
        self.ended = true;
        let rc = unsafe { pam_end(self.handle, self.last_status) };
        self.check("pam_end", rc)
    }
}

impl<'a> Drop for PamSession<'a> {
    fn drop(&mut self) {
        let _ = self.end();
    }
}
