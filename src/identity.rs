//! Resolution of the application and task identity of a container.
//!
//! Each identity is looked up through the same fallback chain, with a distinct set
//! of keys for `app` and `task`:
//!
//! 1. location label: its value names another label, whose value is used
//! 2. location environment variable: its value names another variable, whose value is used
//! 3. direct label
//! 4. direct environment variable
//!
//! The first step producing a non-empty value wins. Afterwards an optional prefix,
//! read from a dedicated environment variable, is stripped from the result.
//!
//! An unresolved `app` means the container is not monitored, an unresolved `task`
//! becomes [`DEFAULT_TASK`].
use crate::config::Config;
use crate::container::ContainerMetadata;

pub const APP_LOCATION_LABEL: &str = "collectd_docker_app_label";
pub const APP_LOCATION_ENV: &str = "COLLECTD_DOCKER_APP_ENV";
pub const APP_TRIM_PREFIX_ENV: &str = "COLLECTD_DOCKER_APP_ENV_TRIM_PREFIX";
pub const TASK_LOCATION_LABEL: &str = "collectd_docker_task_label";
pub const TASK_LOCATION_ENV: &str = "COLLECTD_DOCKER_TASK_ENV";
pub const TASK_TRIM_PREFIX_ENV: &str = "COLLECTD_DOCKER_TASK_ENV_TRIM_PREFIX";

/// Task identity used when none of the task keys resolve.
pub const DEFAULT_TASK: &str = "default";

/// Resolved identity of a monitored container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    app: String,
    task: String,
}

impl Identity {
    pub fn new(app: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            task: task.into(),
        }
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn task(&self) -> &str {
        &self.task
    }
}

/// The keys consulted to resolve one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKeys {
    location_label: String,
    location_env: String,
    label: String,
    env: String,
    trim_prefix_env: String,
}

impl IdentityKeys {
    pub fn new(
        location_label: impl Into<String>,
        location_env: impl Into<String>,
        label: impl Into<String>,
        env: impl Into<String>,
        trim_prefix_env: impl Into<String>,
    ) -> Self {
        Self {
            location_label: location_label.into(),
            location_env: location_env.into(),
            label: label.into(),
            env: env.into(),
            trim_prefix_env: trim_prefix_env.into(),
        }
    }

    /// Walks the fallback chain and returns the first non-empty value, untrimmed.
    fn lookup<'a>(&self, container: &'a ContainerMetadata) -> Option<&'a str> {
        let non_empty = |value: &&str| !value.is_empty();

        container
            .label(&self.location_label)
            .and_then(|location| container.label(location))
            .filter(non_empty)
            .or_else(|| {
                container
                    .env_var(&self.location_env)
                    .filter(non_empty)
                    .and_then(|location| container.env_var(location))
                    .filter(non_empty)
            })
            .or_else(|| container.label(&self.label).filter(non_empty))
            .or_else(|| container.env_var(&self.env).filter(non_empty))
    }

    fn trim<'a>(&self, container: &ContainerMetadata, value: &'a str) -> &'a str {
        match container.env_var(&self.trim_prefix_env) {
            Some(prefix) if !prefix.is_empty() => value.strip_prefix(prefix).unwrap_or(value),
            _ => value,
        }
    }
}

/// Resolves [`Identity`] values from container metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityResolver {
    app: IdentityKeys,
    task: IdentityKeys,
}

impl IdentityResolver {
    pub fn new(app: IdentityKeys, task: IdentityKeys) -> Self {
        Self { app, task }
    }

    /// Builds a resolver from the configured direct keys and the fixed location
    /// and trim-prefix keys.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            IdentityKeys::new(
                APP_LOCATION_LABEL,
                APP_LOCATION_ENV,
                config.app_label(),
                config.app_env(),
                APP_TRIM_PREFIX_ENV,
            ),
            IdentityKeys::new(
                TASK_LOCATION_LABEL,
                TASK_LOCATION_ENV,
                config.task_label(),
                config.task_env(),
                TASK_TRIM_PREFIX_ENV,
            ),
        )
    }

    /// Resolves the application identity.
    ///
    /// Returns `None` if no key resolves, or if nothing is left after trimming.
    pub fn resolve_app(&self, container: &ContainerMetadata) -> Option<String> {
        let app = self.app.lookup(container).unwrap_or_default();
        let app = self.app.trim(container, app);
        (!app.is_empty()).then(|| app.to_owned())
    }

    /// Resolves the task identity, falling back to [`DEFAULT_TASK`].
    pub fn resolve_task(&self, container: &ContainerMetadata) -> String {
        let task = self.task.lookup(container).unwrap_or(DEFAULT_TASK);
        self.task.trim(container, task).to_owned()
    }

    /// Resolves both identities, `None` meaning the container is not to be monitored.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::collections::HashMap;
    /// # use creo_tagger::config::Config;
    /// # use creo_tagger::container::ContainerMetadata;
    /// # use creo_tagger::identity::IdentityResolver;
    /// let resolver = IdentityResolver::from_config(&Config::default());
    /// let container = ContainerMetadata::new(
    ///     "api",
    ///     HashMap::from([("app_id".to_owned(), "/infra/web/api".to_owned())]),
    ///     vec!["MESOS_TASK_ID=api.7".to_owned()],
    /// );
    /// let identity = resolver.resolve(&container).unwrap();
    /// assert_eq!(identity.app(), "/infra/web/api");
    /// assert_eq!(identity.task(), "api.7");
    ///
    /// assert!(resolver.resolve(&ContainerMetadata::default()).is_none());
    /// ```
    pub fn resolve(&self, container: &ContainerMetadata) -> Option<Identity> {
        let app = self.resolve_app(container)?;
        let task = self.resolve_task(container);
        Some(Identity { app, task })
    }
}
