use std::collections::HashMap;

/// A single URL path parameter, e.g. `userId` from `/users/:userId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct URLParam {
    /// Parameter name
    pub key: String,
    /// Parameter value
    pub value: String,
}

/// Ordered URL path parameters as produced by the router.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct URLParams(Vec<URLParam>);

impl URLParams {
    /// Creates an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push(URLParam {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Returns the value of the first parameter named `key`, or `""`.
    pub fn get(&self, key: &str) -> &str {
        self.0
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
            .unwrap_or("")
    }

    /// Converts the parameters into a map.
    ///
    /// For duplicated keys the first occurrence wins, so `to_map()[k]`
    /// always agrees with [`get`](Self::get).
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::with_capacity(self.0.len());
        for p in &self.0 {
            map.entry(p.key.clone()).or_insert_with(|| p.value.clone());
        }
        map
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates parameters in order.
    pub fn iter(&self) -> impl Iterator<Item = &URLParam> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for URLParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = URLParams::new();
        for (k, v) in iter {
            params.push(k, v);
        }
        params
    }
}
