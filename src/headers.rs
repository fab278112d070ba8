use crate::HeaderName;

/// Ordered multi-map of header fields.
///
/// Each distinct name (compared case-insensitively) owns one entry holding its
/// values in insertion order. Entries themselves keep the order in which their
/// name was first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(HeaderName, Vec<String>)>,
}

impl Headers {
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends `value` to the sequence stored for `name`, whatever its casing.
    pub fn insert<N: AsRef<str>, V: Into<String>>(&mut self, name: N, value: V) {
        let name = HeaderName::from_str(name.as_ref());
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => values.push(value.into()),
            None => self.entries.push((name, vec![value.into()])),
        }
    }

    /// All values for `name` in insertion order, empty when absent.
    pub fn values<N: AsRef<str>>(&self, name: N) -> &[String] {
        self.entry(name.as_ref()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The effective value of `name`: the first one inserted.
    pub fn first<N: AsRef<str>>(&self, name: N) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }

    pub fn contains<N: AsRef<str>>(&self, name: N) -> bool {
        self.entry(name.as_ref()).is_some()
    }

    /// Takes every value of `name` out of the table.
    pub fn remove<N: AsRef<str>>(&mut self, name: N) -> Vec<String> {
        let name = HeaderName::from_str(name.as_ref());
        match self.entries.iter().position(|(n, _)| *n == name) {
            Some(idx) => self.entries.remove(idx).1,
            None => Vec::new(),
        }
    }

    /// Number of distinct field names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &[String])> {
        self.entries.iter().map(|(n, v)| (n, v.as_slice()))
    }

    fn entry(&self, name: &str) -> Option<&Vec<String>> {
        let name = HeaderName::from_str(name);
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}
