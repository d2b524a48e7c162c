//! Turns the `session` field of a login request into a runnable command.
//! A `.desktop` suffix names a file under the configured sessions
//! directory whose first `Exec=` line supplies the command; anything else
//! is the command verbatim.

use std::path::Path;

use crate::error::LaunchError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescriptor {
    /// The program to execute, resolved from `Exec=` for `.desktop`
    /// descriptors, or the raw descriptor otherwise.
    pub command: String,
    /// The display name used for `SessionN` naming and for
    /// `DESKTOP_SESSION`/`GDMSESSION`: the descriptor with any `.desktop`
    /// suffix stripped.
    pub name: String,
}

impl SessionDescriptor {
    pub fn parse(session: &str, sessions_dir: &Path) -> Result<SessionDescriptor, LaunchError> {
        let descriptor = if let Some(stem) = session.strip_suffix(".desktop") {
            let path = sessions_dir.join(session);
            let contents = std::fs::read_to_string(&path).map_err(|e| {
                log::warn!("unable to read session file {}: {}", path.display(), e);
                LaunchError::ConfigMissing
            })?;
            let doc = inish::Document::parse(&contents).map_err(|e| {
                log::warn!("unable to parse session file {}: {}", path.display(), e);
                LaunchError::ConfigMissing
            })?;
            let command = doc.first("Exec").unwrap_or_default().to_string();
            SessionDescriptor {
                command,
                name: stem.to_string(),
            }
        } else {
            SessionDescriptor {
                command: session.to_string(),
                name: session.to_string(),
            }
        };

        if descriptor.command.is_empty() {
            return Err(LaunchError::ConfigMissing);
        }
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_desktop_file(dir: &Path, name: &str, body: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    }

    #[test]
    fn bare_command_is_used_verbatim() {
        let dir = std::env::temp_dir();
        let d = SessionDescriptor::parse("xterm", &dir).unwrap();
        assert_eq!(d.command, "xterm");
        assert_eq!(d.name, "xterm");
    }

    #[test]
    fn desktop_file_exec_line_is_extracted_and_suffix_stripped() {
        let dir = std::env::temp_dir().join(format!("authd-launch-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        write_desktop_file(
            &dir,
            "plasma.desktop",
            "[Desktop Entry]\nName=Plasma\nExec=startplasma\n",
        );
        let d = SessionDescriptor::parse("plasma.desktop", &dir).unwrap();
        assert_eq!(d.command, "startplasma");
        assert_eq!(d.name, "plasma");
    }

    #[test]
    fn desktop_file_without_exec_line_is_config_missing() {
        let dir = std::env::temp_dir().join(format!("authd-launch-test-noexec-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        write_desktop_file(&dir, "broken.desktop", "[Desktop Entry]\nName=Broken\n");
        assert!(matches!(
            SessionDescriptor::parse("broken.desktop", &dir),
            Err(LaunchError::ConfigMissing)
        ));
    }

    #[test]
    fn missing_desktop_file_is_config_missing() {
        let dir = std::env::temp_dir().join("authd-launch-test-does-not-exist");
        assert!(matches!(
            SessionDescriptor::parse("nope.desktop", &dir),
            Err(LaunchError::ConfigMissing)
        ));
    }
}
