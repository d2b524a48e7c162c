//! Resolves a user name into the passwd-record facts the launcher needs,
//! captured in full before any privilege change.

use std::io::BufRead;

use users::os::unix::UserExt;

use crate::error::LaunchError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home_dir: String,
    pub shell: String,
}

impl UserIdentity {
    pub fn resolve(user: &str) -> Result<UserIdentity, LaunchError> {
        let pw = users::get_user_by_name(user).ok_or(LaunchError::UserUnknown)?;

        let shell = pw
            .shell()
            .to_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(default_shell);

        Ok(UserIdentity {
            name: pw.name().to_str().unwrap_or(user).to_string(),
            uid: pw.uid(),
            gid: pw.primary_group_id(),
            home_dir: pw.home_dir().to_str().unwrap_or("/").to_string(),
            shell,
        })
    }
}

/// The system default login shell: the last entry of `/etc/shells`, the
/// same source `getusershell()` reads from. Falls back to `/bin/sh` if the
/// file is missing, empty, or unreadable.
fn default_shell() -> String {
    let file = match std::fs::File::open("/etc/shells") {
        Ok(f) => f,
        Err(_) => return "/bin/sh".to_string(),
    };
    let reader = std::io::BufReader::new(file);
    let mut last = None;
    for line in reader.lines().flatten() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        last = Some(line.to_string());
    }
    last.unwrap_or_else(|| "/bin/sh".to_string())
}
