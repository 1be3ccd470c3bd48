use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

mod error;
mod utils;

pub use error::{Error, Result};

/// The maximum allowed length for a [`ContainerID`].
const CONTAINER_ID_MAX_LEN: usize = 255;

/// A validated container identifier.
///
/// Both full ids and container names are accepted, as long as they only consist of
/// ASCII alphanumerics, `_`, `.` and `-`.
///
/// # Examples
///
/// ```
/// # use creo_tagger::container::{ContainerID, Error};
/// let raw_id = "abc123abc123abc123abc123abc123abc123abc123abc123abc123abc123abcd";
/// let container_id = ContainerID::new(raw_id).unwrap();
/// assert_eq!(container_id.as_ref(), "abc123abc123abc123abc123abc123abc123abc123abc123abc123abc123abcd");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerID(Arc<str>);

impl ContainerID {
    /// Creates a new `ContainerID` from the given raw id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerID`] if the input is empty, exceeds
    /// [`CONTAINER_ID_MAX_LEN`] or contains characters outside of `[A-Za-z0-9_.-]`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use creo_tagger::container::ContainerID;
    /// assert!(ContainerID::new("web-1").is_ok());
    /// assert!(ContainerID::new("../images").is_err());
    /// assert!(ContainerID::new("").is_err());
    /// ```
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        if src.is_empty()
            || src.len() > CONTAINER_ID_MAX_LEN
            || !utils::is_container_id_charset(src.as_bytes())
        {
            return Err(Error::InvalidContainerID(src.to_owned()));
        }

        Ok(Self(src.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ContainerID {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ContainerID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContainerID {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only view of an inspected container: its labels and its environment.
///
/// Environment entries are kept in container order as raw `KEY=VALUE` strings,
/// lookups always return the first matching entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerMetadata {
    name: String,
    labels: HashMap<String, String>,
    env: Vec<String>,
}

impl ContainerMetadata {
    pub fn new(name: impl Into<String>, labels: HashMap<String, String>, env: Vec<String>) -> Self {
        Self {
            name: name.into(),
            labels,
            env,
        }
    }

    /// Human readable container name, as reported by the runtime.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value of the label `key`, if set.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Returns the value of the first environment entry `key=...`, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// # use creo_tagger::container::ContainerMetadata;
    /// let md = ContainerMetadata::new(
    ///     "web",
    ///     Default::default(),
    ///     vec!["MESOS_TASK_ID=web.1".to_owned(), "MESOS_TASK_ID=web.2".to_owned()],
    /// );
    /// assert_eq!(md.env_var("MESOS_TASK_ID"), Some("web.1"));
    /// assert_eq!(md.env_var("MESOS_TASK"), None);
    /// ```
    pub fn env_var(&self, key: &str) -> Option<&str> {
        utils::find_env(&self.env, key)
    }

    pub fn labels(&self) -> &HashMap<String, String> {
        &self.labels
    }

    pub fn env(&self) -> &[String] {
        self.env.as_slice()
    }
}
