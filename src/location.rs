use std::sync::Mutex;

use anyhow::{Context, Result};
use url::Url;

/// Query-string port of the navigable URL.
pub trait QueryLocation: Send + Sync {
    fn get_param(&self, name: &str) -> Option<String>;
    /// Replaces the parameter in place. Navigation is a replace, never a push,
    /// and must not reset the scroll position.
    fn set_param(&self, name: &str, value: &str);
}

/// A navigable URL held in memory. Its `href` is the shareable link for the
/// current query.
pub struct SharedLocation {
    url: Mutex<Url>,
}

impl SharedLocation {
    pub fn new(url: Url) -> Self {
        Self {
            url: Mutex::new(url),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).with_context(|| format!("invalid URL: {}", raw))?;
        Ok(Self::new(url))
    }

    pub fn href(&self) -> String {
        self.url
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .to_string()
    }
}

impl QueryLocation for SharedLocation {
    fn get_param(&self, name: &str) -> Option<String> {
        let url = self.url.lock().unwrap_or_else(|p| p.into_inner());
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    fn set_param(&self, name: &str, value: &str) {
        let mut url = self.url.lock().unwrap_or_else(|p| p.into_inner());
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != name)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            for (key, value) in &kept {
                pairs.append_pair(key, value);
            }
            pairs.append_pair(name, value);
        }
    }
}

/// Encodes `pairs` as a relative `/?a=b` link.
pub fn relative_link(pairs: &[(&str, &str)]) -> String {
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    if encoded.is_empty() {
        "/".to_string()
    } else {
        format!("/?{}", encoded)
    }
}
