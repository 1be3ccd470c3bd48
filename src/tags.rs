//! Expansion of resolved identities into hierarchical tags.
//!
//! An application identity such as `infra/web/api` is decomposed into its final
//! segment (`app`), the group path (`group`) and every intermediate group prefix
//! (`group1`, `group2`, ...). A task identity such as `worker-7.canary` is split at
//! `-` and `.` into `task1`, `task2`, ... while `task` keeps the full value.
use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::identity::Identity;

/// Value of the `group` tag for applications without a group path.
pub const ROOT_GROUP: &str = "/";

const TASK_SEPARATORS: [char; 2] = ['-', '.'];

/// Immutable mapping of tag keys to values, iterated in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct TagSet {
    tags: BTreeMap<String, String>,
}

impl TagSet {
    /// Expands both identities into a single tag set.
    ///
    /// # Examples
    ///
    /// ```
    /// # use creo_tagger::identity::Identity;
    /// # use creo_tagger::tags::TagSet;
    /// let tags = TagSet::from_identity(&Identity::new("/infra/web/api", "api.1"));
    /// assert_eq!(tags.get("app"), Some("api"));
    /// assert_eq!(tags.get("group"), Some("infra/web"));
    /// assert_eq!(tags.get("task2"), Some("1"));
    /// ```
    pub fn from_identity(identity: &Identity) -> Self {
        let mut builder = TagSetBuilder::default();
        builder.add_app(identity.app()).add_task(identity.task());
        builder.build()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Accumulates tags before freezing them into a [`TagSet`].
///
/// Inserting a key twice keeps the last value.
#[derive(Debug, Default)]
pub struct TagSetBuilder {
    tags: BTreeMap<String, String>,
}

impl TagSetBuilder {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Adds `app_id`, `app`, `group` and the `group{i}` prefixes for `app`.
    ///
    /// A single leading `/` does not count as a path segment, so `/infra/web/api`
    /// and `infra/web/api` produce the same `app` and `group` tags. `app_id` always
    /// holds `app` unchanged.
    pub fn add_app(&mut self, app: &str) -> &mut Self {
        self.insert("app_id", app);

        let path = app.strip_prefix('/').unwrap_or(app);
        let mut segments: Vec<&str> = path.split('/').collect();
        // split always yields at least one item
        let name = segments.pop().unwrap_or_default();
        self.insert("app", name);

        if segments.len() <= 1 {
            self.insert("group", ROOT_GROUP);
        } else {
            self.insert("group", segments.join("/"));
            for i in 1..segments.len() {
                self.insert(format!("group{i}"), segments[..=i].join("/"));
            }
        }
        self
    }

    /// Adds `task` and one `task{i}` per `-`/`.` separated segment of `task`.
    pub fn add_task(&mut self, task: &str) -> &mut Self {
        self.insert("task", task);
        for (i, segment) in task.split(TASK_SEPARATORS).enumerate() {
            self.insert(format!("task{}", i + 1), segment);
        }
        self
    }

    pub fn build(self) -> TagSet {
        TagSet { tags: self.tags }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_tags(app: &str) -> TagSet {
        let mut builder = TagSetBuilder::default();
        builder.add_app(app);
        builder.build()
    }

    fn task_tags(task: &str) -> TagSet {
        let mut builder = TagSetBuilder::default();
        builder.add_task(task);
        builder.build()
    }

    fn pairs(tags: &TagSet) -> Vec<(&str, &str)> {
        tags.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }

    #[test]
    fn test_app_without_group() {
        let tags = app_tags("x");
        assert_eq!(pairs(&tags), vec![("app", "x"), ("app_id", "x"), ("group", "/")]);
    }

    #[test]
    fn test_app_with_single_group_segment_uses_root_group() {
        let tags = app_tags("a/b");
        assert_eq!(tags.get("app"), Some("b"));
        assert_eq!(tags.get("group"), Some("/"));
        assert_eq!(tags.get("group1"), None);
        assert_eq!(tags.len(), 3);
    }

    #[test]
    fn test_app_with_group_path() {
        let tags = app_tags("a/b/c");
        assert_eq!(tags.get("app"), Some("c"));
        assert_eq!(tags.get("group"), Some("a/b"));
        assert_eq!(tags.get("group1"), Some("a/b"));
        assert_eq!(tags.get("group2"), None);

        let tags = app_tags("a/b/c/d");
        assert_eq!(tags.get("app"), Some("d"));
        assert_eq!(tags.get("group"), Some("a/b/c"));
        assert_eq!(tags.get("group1"), Some("a/b"));
        assert_eq!(tags.get("group2"), Some("a/b/c"));
        assert_eq!(tags.get("group3"), None);
        assert_eq!(tags.get("app_id"), Some("a/b/c/d"));
    }

    #[test]
    fn test_app_with_leading_slash() {
        let tags = app_tags("/infra/web/api");
        assert_eq!(
            pairs(&tags),
            vec![
                ("app", "api"),
                ("app_id", "/infra/web/api"),
                ("group", "infra/web"),
                ("group1", "infra/web"),
            ]
        );

        let tags = app_tags("/api");
        assert_eq!(tags.get("app"), Some("api"));
        assert_eq!(tags.get("group"), Some("/"));
    }

    #[test]
    fn test_app_last_segment_and_id_for_many_inputs() {
        for app in ["", "/", "a", "a/", "a/b/c", "deep/er/and/deeper/path", "/x/y"] {
            let tags = app_tags(app);
            let last = app.rsplit('/').next().unwrap();
            assert_eq!(tags.get("app"), Some(last), "app for {app:?}");
            assert_eq!(tags.get("app_id"), Some(app), "app_id for {app:?}");
        }
    }

    #[test]
    fn test_task_segments() {
        let tags = task_tags("worker-7.canary");
        assert_eq!(
            pairs(&tags),
            vec![
                ("task", "worker-7.canary"),
                ("task1", "worker"),
                ("task2", "7"),
                ("task3", "canary"),
            ]
        );
    }

    #[test]
    fn test_task_without_separator() {
        let tags = task_tags("default");
        assert_eq!(pairs(&tags), vec![("task", "default"), ("task1", "default")]);
    }

    #[test]
    fn test_task_keeps_empty_segments() {
        let tags = task_tags("a--b.");
        assert_eq!(tags.get("task1"), Some("a"));
        assert_eq!(tags.get("task2"), Some(""));
        assert_eq!(tags.get("task3"), Some("b"));
        assert_eq!(tags.get("task4"), Some(""));
        assert_eq!(tags.get("task5"), None);
    }

    #[test]
    fn test_from_identity_combines_both() {
        let tags = TagSet::from_identity(&Identity::new("team/svc/api", "api.3"));
        assert_eq!(tags.get("app_id"), Some("team/svc/api"));
        assert_eq!(tags.get("group1"), Some("team/svc"));
        assert_eq!(tags.get("task"), Some("api.3"));
        assert_eq!(tags.get("task2"), Some("3"));
        assert_eq!(tags.len(), 7);
    }

    #[test]
    fn test_serializes_as_flat_map() {
        let tags = TagSet::from_identity(&Identity::new("svc", "t"));
        let json = serde_json::to_string(&tags).unwrap();
        assert_eq!(
            json,
            r#"{"app":"svc","app_id":"svc","group":"/","task":"t","task1":"t"}"#
        );
    }
}
