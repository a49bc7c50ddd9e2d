use std::collections::BTreeMap;

/// Flat string-to-string map serialized into the environment of the deployed
/// workloads. Keys are unique; writing an existing key overwrites the
/// previous value (intentional, not an error).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ScenarioConfiguration {
    entries: BTreeMap<String, String>,
}

impl ScenarioConfiguration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge `other` into this map, `other` winning on key collisions.
    pub fn extend(&mut self, other: impl IntoIterator<Item = (String, String)>) {
        self.entries.extend(other);
    }
}

impl FromIterator<(String, String)> for ScenarioConfiguration {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let mut configuration = ScenarioConfiguration::new();
        configuration.set("KIE_SERVER_ID", "first");
        configuration.set("KIE_SERVER_ID", "second");
        assert_eq!(configuration.get("KIE_SERVER_ID"), Some("second"));
        assert_eq!(configuration.len(), 1);
    }

    #[test]
    fn extend_overrides_existing_keys() {
        let mut configuration = ScenarioConfiguration::new();
        configuration.set("MAVEN_REPO_URL", "http://internal");
        configuration.extend([("MAVEN_REPO_URL".to_owned(), "http://nexus".to_owned())]);
        assert_eq!(configuration.get("MAVEN_REPO_URL"), Some("http://nexus"));
    }
}
