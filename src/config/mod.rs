//! Process configuration.
//!
//! All values are read once at startup, either from the process environment
//! ([`Config::from_env`]) or from an arbitrary lookup function
//! ([`Config::from_lookup`]). Unset or empty variables fall back to their defaults.
//! The resulting [`Config`] is immutable and handed to the components that need it.
mod error;

use std::path::{Path, PathBuf};

pub use error::{Error, Result};

use crate::sampler::Interval;

pub const APP_LABEL_KEY: &str = "APP_LABEL_KEY";
pub const APP_ENV_KEY: &str = "APP_ENV_KEY";
pub const TASK_LABEL_KEY: &str = "TASK_LABEL_KEY";
pub const TASK_ENV_KEY: &str = "TASK_ENV_KEY";
pub const STATS_INTERVAL: &str = "STATS_INTERVAL";
pub const DOCKER_SOCKET_PATH: &str = "DOCKER_SOCKET_PATH";
pub const OUTPUT_CAPACITY: &str = "OUTPUT_CAPACITY";

const DEFAULT_APP_LABEL: &str = "app_id";
const DEFAULT_APP_ENV: &str = "MARATHON_APP_ID";
const DEFAULT_TASK_LABEL: &str = "collectd_docker_task";
const DEFAULT_TASK_ENV: &str = "MESOS_TASK_ID";
const DEFAULT_DOCKER_SOCKET: &str = "/var/run/docker.sock";
const DEFAULT_OUTPUT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    app_label: String,
    app_env: String,
    task_label: String,
    task_env: String,
    interval: Interval,
    docker_socket: PathBuf,
    output_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_label: DEFAULT_APP_LABEL.to_owned(),
            app_env: DEFAULT_APP_ENV.to_owned(),
            task_label: DEFAULT_TASK_LABEL.to_owned(),
            task_env: DEFAULT_TASK_ENV.to_owned(),
            interval: Interval::default(),
            docker_socket: PathBuf::from(DEFAULT_DOCKER_SOCKET),
            output_capacity: DEFAULT_OUTPUT_CAPACITY,
        }
    }
}

impl Config {
    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if a numeric variable is set but not a positive integer.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration using `lookup` to resolve variable names.
    ///
    /// # Examples
    ///
    /// ```
    /// # use creo_tagger::config::Config;
    /// let config = Config::from_lookup(|key| match key {
    ///     "APP_LABEL_KEY" => Some("service".to_owned()),
    ///     "STATS_INTERVAL" => Some("5".to_owned()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.app_label(), "service");
    /// assert_eq!(config.interval().get(), 5);
    /// assert_eq!(config.task_env(), "MESOS_TASK_ID");
    /// ```
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let defaults = Self::default();

        let interval = match lookup(STATS_INTERVAL) {
            Some(raw) => {
                let n = parse_positive(STATS_INTERVAL, &raw)?;
                Interval::new(n).map_err(|err| Error::InvalidValue {
                    variable: STATS_INTERVAL,
                    value: raw,
                    reason: err.to_string(),
                })?
            }
            None => defaults.interval,
        };
        let output_capacity = match lookup(OUTPUT_CAPACITY) {
            Some(raw) => parse_positive(OUTPUT_CAPACITY, &raw)?,
            None => defaults.output_capacity,
        };

        Ok(Self {
            app_label: lookup(APP_LABEL_KEY).unwrap_or(defaults.app_label),
            app_env: lookup(APP_ENV_KEY).unwrap_or(defaults.app_env),
            task_label: lookup(TASK_LABEL_KEY).unwrap_or(defaults.task_label),
            task_env: lookup(TASK_ENV_KEY).unwrap_or(defaults.task_env),
            interval,
            docker_socket: lookup(DOCKER_SOCKET_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.docker_socket),
            output_capacity,
        })
    }

    /// Label holding the application identity.
    pub fn app_label(&self) -> &str {
        &self.app_label
    }

    /// Environment variable holding the application identity.
    pub fn app_env(&self) -> &str {
        &self.app_env
    }

    /// Label holding the task identity.
    pub fn task_label(&self) -> &str {
        &self.task_label
    }

    /// Environment variable holding the task identity.
    pub fn task_env(&self) -> &str {
        &self.task_env
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn docker_socket(&self) -> &Path {
        &self.docker_socket
    }

    pub fn output_capacity(&self) -> usize {
        self.output_capacity
    }
}

fn parse_positive(variable: &'static str, raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(Error::InvalidValue {
            variable,
            value: raw.to_owned(),
            reason: "must be greater than zero".to_owned(),
        }),
        Ok(n) => Ok(n),
        Err(err) => Err(Error::InvalidValue {
            variable,
            value: raw.to_owned(),
            reason: err.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.app_label(), "app_id");
        assert_eq!(config.app_env(), "MARATHON_APP_ID");
        assert_eq!(config.task_label(), "collectd_docker_task");
        assert_eq!(config.task_env(), "MESOS_TASK_ID");
        assert_eq!(config.interval().get(), 1);
        assert_eq!(config.docker_socket(), Path::new("/var/run/docker.sock"));
        assert_eq!(config.output_capacity(), 64);
    }

    #[test]
    fn test_empty_values_fall_back_to_defaults() {
        let config =
            Config::from_lookup(lookup_from(&[(APP_LABEL_KEY, ""), (STATS_INTERVAL, "")]))
                .unwrap();
        assert_eq!(config.app_label(), "app_id");
        assert_eq!(config.interval().get(), 1);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            (APP_LABEL_KEY, "service"),
            (APP_ENV_KEY, "SERVICE_NAME"),
            (TASK_LABEL_KEY, "instance"),
            (TASK_ENV_KEY, "INSTANCE_ID"),
            (STATS_INTERVAL, "10"),
            (DOCKER_SOCKET_PATH, "/run/docker.sock"),
            (OUTPUT_CAPACITY, "8"),
        ]))
        .unwrap();
        assert_eq!(config.app_label(), "service");
        assert_eq!(config.app_env(), "SERVICE_NAME");
        assert_eq!(config.task_label(), "instance");
        assert_eq!(config.task_env(), "INSTANCE_ID");
        assert_eq!(config.interval().get(), 10);
        assert_eq!(config.docker_socket(), Path::new("/run/docker.sock"));
        assert_eq!(config.output_capacity(), 8);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = Config::from_lookup(lookup_from(&[(STATS_INTERVAL, "0")])).unwrap_err();
        match err {
            Error::InvalidValue {
                variable, value, ..
            } => {
                assert_eq!(variable, STATS_INTERVAL);
                assert_eq!(value, "0");
            }
        }
    }

    #[test]
    fn test_rejects_negative_and_garbage() {
        assert!(Config::from_lookup(lookup_from(&[(STATS_INTERVAL, "-3")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[(STATS_INTERVAL, "often")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[(OUTPUT_CAPACITY, "0")])).is_err());
    }
}
