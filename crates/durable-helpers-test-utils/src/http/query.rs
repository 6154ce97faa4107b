use reqwest::Url;
use std::ops::Index;

const QUERY_BASE: &str = "http://localhost/";

/// Ordered query string parameters; a key may carry several values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryCollection {
    entries: Vec<(String, Vec<String>)>,
}

impl QueryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to `key`, keeping any values it already has.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(i) => self.entries[i].1.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// Replace all values of `key`.
    pub fn insert(&mut self, key: impl Into<String>, values: Vec<String>) {
        let key = key.into();
        match self.position(&key) {
            Some(i) => self.entries[i].1 = values,
            None => self.entries.push((key, values)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.position(key).map(|i| self.entries[i].1.as_slice())
    }

    /// First value of `key`
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    /// Form-urlencoded rendering without the leading `?`; spaces become `+`.
    pub fn to_query_string(&self) -> String {
        let Ok(mut url) = Url::parse(QUERY_BASE) else {
            return String::new();
        };
        {
            let mut pairs = url.query_pairs_mut();
            for (key, values) in self.iter() {
                for value in values {
                    pairs.append_pair(key, value);
                }
            }
        }
        url.query().unwrap_or_default().to_string()
    }

    /// Parse a query string as produced by [`to_query_string`](Self::to_query_string).
    pub fn parse(query: &str) -> Self {
        match Url::parse(QUERY_BASE) {
            Ok(mut url) => {
                url.set_query(Some(query.trim_start_matches('?')));
                url.query_pairs()
                    .map(|(key, value)| (key.into_owned(), value.into_owned()))
                    .collect()
            }
            Err(_) => Self::new(),
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }
}

impl Index<&str> for QueryCollection {
    type Output = [String];

    /// Panics if `key` is absent, like indexing a map.
    fn index(&self, key: &str) -> &Self::Output {
        match self.get(key) {
            Some(values) => values,
            None => panic!("no query parameter named '{}'", key),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryCollection {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut collection = Self::new();
        for (key, value) in iter {
            collection.add(key, value);
        }
        collection
    }
}
