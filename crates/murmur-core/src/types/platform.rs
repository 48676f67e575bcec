//! Platform classification.

use serde::{Deserialize, Serialize};

/// How the host platform treats audio output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Per-element volume works directly; no unlock is needed.
    #[default]
    Direct,
    /// Volume control only works through the graph backend, which must be unlocked by a
    /// user gesture and wired per sound (mobile Safari and friends).
    GestureGated,
}

impl Platform {
    /// Classify a browser from its user agent, `navigator.platform`, and
    /// `navigator.maxTouchPoints`.
    ///
    /// iPadOS reports itself as `MacIntel`, so a touch-capable Mac is treated as an iPad.
    pub fn detect(user_agent: &str, platform: &str, max_touch_points: u32) -> Self {
        let ios_agent = ["iPad", "iPhone", "iPod"]
            .iter()
            .any(|device| user_agent.contains(device));
        let ipad_as_mac = platform == "MacIntel" && max_touch_points > 1;

        if ios_agent || ipad_as_mac {
            Self::GestureGated
        } else {
            Self::Direct
        }
    }

    pub const fn is_gesture_gated(self) -> bool {
        matches!(self, Self::GestureGated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPHONE_UA: &str =
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148";
    const DESKTOP_UA: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/135.0.0.0 Safari/537.36";

    #[test]
    fn test_detect_ios() {
        assert_eq!(Platform::detect(IPHONE_UA, "iPhone", 5), Platform::GestureGated);
    }

    #[test]
    fn test_detect_ipad_reporting_as_mac() {
        assert_eq!(
            Platform::detect("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)", "MacIntel", 5),
            Platform::GestureGated
        );
        assert_eq!(
            Platform::detect("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)", "MacIntel", 0),
            Platform::Direct
        );
    }

    #[test]
    fn test_detect_desktop() {
        assert_eq!(Platform::detect(DESKTOP_UA, "Win32", 0), Platform::Direct);
    }
}
