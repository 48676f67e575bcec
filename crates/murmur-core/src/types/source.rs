//! Mapping logical ambient keys to playable paths.

/// Resolves a logical ambient key (e.g. `amb-forest`) into a playable path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceResolver {
    base: String,
}

impl SourceResolver {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        let base = base.trim_end_matches('/').to_string();
        Self { base }
    }

    /// `<base>/<key>.mp3`, or the key itself if it is already an absolute path or a URL.
    pub fn resolve(&self, key: &str) -> String {
        if Self::is_absolute(key) {
            key.to_string()
        } else {
            format!("{}/{key}.mp3", self.base)
        }
    }

    fn is_absolute(key: &str) -> bool {
        key.starts_with('/') || key.contains("://")
    }
}
