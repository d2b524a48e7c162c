//! Flags and config-file keys the helper needs to mirror the broker's own
//! `sessionsDir`/`sessionCommand`/`defaultPath`/`testingMode`, plus the
//! PAM service name the credential engine opens its transaction under.

use std::path::PathBuf;

use crate::error::HelperError;

#[derive(Debug, Clone)]
pub struct Config {
    pub sessions_dir: PathBuf,
    pub session_command: String,
    pub default_path: String,
    pub seat: String,
    pub service_name: String,
    pub testing_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sessions_dir: PathBuf::from("/usr/share/xsessions"),
            session_command: "/usr/bin/xsession".to_string(),
            default_path: "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin".to_string(),
            seat: "seat0".to_string(),
            service_name: "login".to_string(),
            testing_mode: false,
        }
    }
}

impl Config {
    pub fn load(args: &[String]) -> Result<Config, HelperError> {
        let mut opts = getopts::Options::new();
        opts.optopt("c", "config", "path to the config file", "FILE");
        opts.optflag("t", "testing-mode", "skip privilege transitions (tests only)");
        opts.optflag("h", "help", "print this help menu");

        let matches = opts
            .parse(args)
            .map_err(|e| HelperError::Config(e.to_string()))?;

        let mut config = if let Some(path) = matches.opt_str("c") {
            Config::from_file(&path)?
        } else {
            Config::default()
        };

        if matches.opt_present("t") {
            config.testing_mode = true;
        }

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Config, HelperError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| HelperError::Config(format!("unable to read {}: {}", path, e)))?;
        let doc = inish::Document::parse(&contents)
            .map_err(|e| HelperError::Config(format!("{}: {}", path, e)))?;

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
        if let Some(v) = doc.last("service_name") {
            config.service_name = v.to_string();
        }
        if let Some(v) = doc.last("testing_mode") {
            config.testing_mode = v == "true" || v == "1";
        }
        Ok(config)
    }
}
