//! Bibliographic entry model.

use indexmap::IndexMap;

/// One bibliographic record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Entry type, lower-case (e.g. `article`)
    pub entry_type: String,
    /// Citation key
    pub key: String,
    /// Fields in source order
    pub fields: Fields,
}

impl Entry {
    /// Create an entry with no fields.
    pub fn new(entry_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            entry_type: entry_type.into().to_lowercase(),
            key: key.into(),
            fields: Fields::new(),
        }
    }

    /// Add a field, builder style.
    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.insert(name, value);
        self
    }

    /// Get a field value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name)
    }

    /// Whether the entry has a field.
    pub fn has(&self, name: &str) -> bool {
        self.fields.contains(name)
    }

    /// Whether the entry type matches `entry_type`, ignoring case.
    pub fn is_type(&self, entry_type: &str) -> bool {
        self.entry_type.eq_ignore_ascii_case(entry_type)
    }
}

/// Ordered field map with case-insensitive names.
///
/// Names are stored lower-case; every lookup folds case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    inner: IndexMap<String, String>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a field. Overwriting keeps the field's position.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) -> Option<String> {
        self.inner.insert(name.to_lowercase(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut String> {
        self.inner.get_mut(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(&name.to_lowercase())
    }

    /// Remove a field, keeping the order of the others.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.inner.shift_remove(&name.to_lowercase())
    }

    /// Rename a field in place.
    ///
    /// Returns false when `from` does not exist. An existing `to` field is
    /// replaced and the renamed field takes `from`'s position.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        let from = from.to_lowercase();
        let to = to.to_lowercase();
        let Some(index) = self.inner.get_index_of(&from) else {
            return false;
        };
        if from == to {
            return true;
        }
        self.inner.shift_remove(&to);
        // Removing `to` may have shifted `from` down by one.
        let index = self.inner.get_index_of(&from).unwrap_or(index);
        if let Some(value) = self.inner.shift_remove(&from) {
            self.inner.shift_insert(index, to, value);
        }
        true
    }

    /// Field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keep only the fields for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.inner.retain(|k, v| keep(k, v));
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, String)> for Fields {
    fn from_iter<T: IntoIterator<Item = (&'a str, String)>>(iter: T) -> Self {
        let mut fields = Fields::new();
        for (name, value) in iter {
            fields.insert(name, value);
        }
        fields
    }
}
