//! Command-line flags layered over an optional `inish`-parsed config file,
//! in the same `getopts`-over-config-file shape used across this daemon's
//! binaries.

use std::path::PathBuf;

use crate::error::BrokerError;

#[derive(Debug, Clone)]
pub struct Config {
    pub sessions_dir: PathBuf,
    pub session_command: String,
    pub default_path: String,
    pub seat: String,
    pub helper_path: PathBuf,
    /// When true, passed through to the helper's `Start` handling so the
    /// privilege-transition step is skipped. For tests only.
    pub testing_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sessions_dir: PathBuf::from("/usr/share/xsessions"),
            session_command: "/usr/bin/xsession".to_string(),
            default_path: "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin".to_string(),
            seat: "seat0".to_string(),
            helper_path: PathBuf::from("/usr/bin/authenticator-helper"),
            testing_mode: false,
        }
    }
}

impl Config {
    pub fn load(args: &[String]) -> Result<Config, BrokerError> {
        let mut opts = getopts::Options::new();
        opts.optopt("c", "config", "path to the config file", "FILE");
        opts.optopt("s", "sessions-dir", "directory holding .desktop session files", "DIR");
        opts.optopt("b", "session-command", "program used to launch sessions", "PATH");
        opts.optflag("t", "testing-mode", "skip privilege transitions (tests only)");
        opts.optflag("h", "help", "print this help menu");

        let matches = opts
            .parse(args)
            .map_err(|e| BrokerError::Config(e.to_string()))?;

        let mut config = if let Some(path) = matches.opt_str("c") {
            Config::from_file(&path)?
        } else {
            Config::default()
        };

        if let Some(dir) = matches.opt_str("s") {
            config.sessions_dir = PathBuf::from(dir);
        }
        if let Some(cmd) = matches.opt_str("b") {
            config.session_command = cmd;
        }
        if matches.opt_present("t") {
            config.testing_mode = true;
        }

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Config, BrokerError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BrokerError::Config(format!("unable to read {}: {}", path, e))
        })?;
        let doc = inish::Document::parse(&contents)
            .map_err(|e| BrokerError::Config(format!("{}: {}", path, e)))?;

        let mut config = Config::default();
        if let Some(v) = doc.last("sessions_dir") {
            config.sessions_dir = PathBuf::from(v);
        }
        if let Some(v) = doc.last("session_command") {
            config.session_command = v.to_string();
        }
        if let Some(v) = doc.last("default_path") {
            config.default_path = v.to_string();
        }
        if let Some(v) = doc.last("seat") {
            config.seat = v.to_string();
        }
        if let Some(v) = doc.last("helper_path") {
            config.helper_path = PathBuf::from(v);
        }
        if let Some(v) = doc.last("testing_mode") {
            config.testing_mode = v == "true" || v == "1";
        }
        Ok(config)
    }
}
