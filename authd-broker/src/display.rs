//! The broker's one Display context: its name (used to answer
//! `RequestDisplay`), the session environment it hands out on
//! `RequestEnv`, and magic-cookie materialization for `RequestCookieLink`.

use std::fs::OpenOptions;
use std::io;

use crate::error::BrokerError;

#[derive(Debug, Clone)]
pub struct DisplayContext {
    pub name: String,
    /// The base environment every session on this display starts from,
    /// before the launcher's own overrides (`HOME`, `SHELL`, ...) apply.
    pub session_env: Vec<(String, String)>,
}

impl DisplayContext {
    pub fn new(name: impl Into<String>) -> Self {
        DisplayContext {
            name: name.into(),
            session_env: Vec::new(),
        }
    }

    /// `NAME=VALUE` strings, the wire shape `Env`/`RequestEnv` use.
    pub fn session_env_lines(&self) -> Vec<String> {
        self.session_env
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect()
    }

    /// Creates (or truncates) the cookie file at `path` and chowns it to
    /// `(uid, gid)`. The broker writes it before replying `CookieLink` and
    /// never touches it again — ownership of the file passes to the
    /// session from that point on.
    pub fn materialize_cookie(&self, path: &str, uid: u32, gid: u32) -> Result<(), BrokerError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e: io::Error| BrokerError::Io(e))?;
        drop(file);

        nix::unistd::chown(
            path,
            Some(nix::unistd::Uid::from_raw(uid)),
            Some(nix::unistd::Gid::from_raw(gid)),
        )
        .map_err(|e| BrokerError::Config(format!("chown {}: {}", path, e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_env_lines_are_name_equals_value() {
        let mut ctx = DisplayContext::new(":0");
        ctx.session_env.push(("XDG_SEAT".to_string(), "seat0".to_string()));
        assert_eq!(ctx.session_env_lines(), vec!["XDG_SEAT=seat0".to_string()]);
    }
}
