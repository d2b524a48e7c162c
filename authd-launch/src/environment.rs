//! Composes the session process's environment: the provider's view, the
//! broker's view, then the launcher's own overrides, last-write-wins.

use crate::descriptor::SessionDescriptor;
use crate::identity::UserIdentity;

/// Sets `key` to `value`, replacing any existing entry so overrides applied
/// later always win — matching step 5's "seed ... overwrite/append" order.
fn set(env: &mut Vec<(String, String)>, key: &str, value: impl Into<String>) {
    env.retain(|(k, _)| k != key);
    env.push((key.to_string(), value.into()));
}

#[allow(clippy::too_many_arguments)]
pub fn compose(
    provider_env: Vec<(String, String)>,
    broker_env: Vec<(String, String)>,
    identity: &UserIdentity,
    descriptor: &SessionDescriptor,
    display: &str,
    default_path: &str,
    seat: &str,
    vtnr: Option<&str>,
) -> Vec<(String, String)> {
    let mut env = provider_env;
    for (k, v) in broker_env {
        set(&mut env, &k, v);
    }

    set(&mut env, "HOME", identity.home_dir.clone());
    set(&mut env, "PWD", identity.home_dir.clone());
    set(&mut env, "SHELL", identity.shell.clone());
    set(&mut env, "USER", identity.name.clone());
    set(&mut env, "LOGNAME", identity.name.clone());
    set(&mut env, "PATH", default_path.to_string());
    set(&mut env, "DISPLAY", display.to_string());
    set(
        &mut env,
        "XAUTHORITY",
        format!("{}/.Xauthority", identity.home_dir),
    );
    set(&mut env, "XDG_SEAT", seat.to_string());
    set(&mut env, "XDG_SEAT_PATH", format!("/org/freedesktop/DisplayManager/{}", seat));
    set(
        &mut env,
        "XDG_SESSION_PATH",
        format!("/org/freedesktop/DisplayManager/{}", descriptor.name),
    );
    if let Some(vt) = vtnr {
        set(&mut env, "XDG_VTNR", vt.to_string());
    }
    set(&mut env, "DESKTOP_SESSION", descriptor.name.clone());
    set(&mut env, "GDMSESSION", descriptor.name.clone());

    env
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> UserIdentity {
        UserIdentity {
            name: "alice".to_string(),
            uid: 1000,
            gid: 1000,
            home_dir: "/home/alice".to_string(),
            shell: "/bin/bash".to_string(),
        }
    }

    fn descriptor() -> SessionDescriptor {
        SessionDescriptor {
            command: "startplasma".to_string(),
            name: "plasma".to_string(),
        }
    }

    #[test]
    fn overrides_win_over_provider_and_broker_env() {
        let provider_env = vec![("HOME".to_string(), "/wrong".to_string())];
        let broker_env = vec![("SOME_DISPLAY_VAR".to_string(), "1".to_string())];
        let env = compose(
            provider_env,
            broker_env,
            &identity(),
            &descriptor(),
            ":0",
            "/usr/bin:/bin",
            "seat0",
            None,
        );
        let get = |k: &str| env.iter().find(|(key, _)| key == k).map(|(_, v)| v.clone());
        assert_eq!(get("HOME"), Some("/home/alice".to_string()));
        assert_eq!(get("SOME_DISPLAY_VAR"), Some("1".to_string()));
        assert_eq!(get("DESKTOP_SESSION"), Some("plasma".to_string()));
        assert_eq!(get("GDMSESSION"), Some("plasma".to_string()));
        assert_eq!(get("DISPLAY"), Some(":0".to_string()));
        assert_eq!(get("XAUTHORITY"), Some("/home/alice/.Xauthority".to_string()));
    }

    #[test]
    fn no_duplicate_keys_after_override() {
        let env = compose(
            vec![("HOME".to_string(), "/wrong".to_string())],
            vec![],
            &identity(),
            &descriptor(),
            ":0",
            "/usr/bin",
            "seat0",
            Some("1"),
        );
        assert_eq!(env.iter().filter(|(k, _)| k == "HOME").count(), 1);
    }
}
