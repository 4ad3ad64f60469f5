//! Stream targets and pipeline mode selection.
//!
//! A [`StreamTarget`] is derived once per play/record action from raw
//! operator input. The presence of a non-empty decryption key fully
//! determines which pipeline is legal for that action; the arbiter then
//! binds the target to the session until the next explicit stop.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Extension identifying a manifest-style (adaptive bitrate) URL.
const MANIFEST_EXTENSION: &str = ".mpd";

/// Which pipeline a target is played or recorded through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineMode {
    /// In-process decode/render pipeline for unencrypted sources.
    InProcess,
    /// Externally launched decrypting player/encoder.
    ExternalDecrypting,
}

/// A media source plus the optional key that unlocks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTarget {
    pub url: String,
    pub decryption_key: Option<String>,
}

impl StreamTarget {
    /// Build a target from raw operator input.
    ///
    /// `kid_key` is the raw `KID:KEY` field; everything after the first
    /// colon, trimmed, is the key. No colon, or nothing after it, means
    /// no key.
    pub fn from_input(url: &str, kid_key: &str) -> Self {
        Self {
            url: url.trim().to_string(),
            decryption_key: extract_key(kid_key),
        }
    }

    /// The pipeline this target must use.
    pub fn mode(&self) -> PipelineMode {
        if self.decryption_key.is_some() {
            PipelineMode::ExternalDecrypting
        } else {
            PipelineMode::InProcess
        }
    }

    /// Whether the URL points at a segmented-streaming manifest.
    pub fn is_manifest_url(&self) -> bool {
        self.url.contains(MANIFEST_EXTENSION)
    }
}

/// Extract the key portion of a raw `KID:KEY` string.
///
/// Splits on the FIRST colon only, so keys containing colons survive
/// intact. Returns `None` when there is no colon or the remainder trims
/// to nothing.
pub fn extract_key(kid_key: &str) -> Option<String> {
    let (_, rest) = kid_key.split_once(':')?;
    let key = rest.trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// Resolve a caller-supplied output path against a default extension,
/// or generate a timestamped name when the caller supplied none.
pub fn resolve_output_path(requested: Option<PathBuf>, prefix: &str, extension: &str) -> PathBuf {
    match requested {
        Some(path) => {
            if path.extension().is_some() {
                path
            } else {
                path.with_extension(extension)
            }
        }
        None => {
            let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
            PathBuf::from(format!("{prefix}-{stamp}.{extension}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn key_after_first_colon() {
        assert_eq!(extract_key("KID:KEY"), Some("KEY".to_string()));
        assert_eq!(extract_key("KID:KEY:extra"), Some("KEY:extra".to_string()));
        assert_eq!(extract_key("KID: KEY "), Some("KEY".to_string()));
    }

    #[test]
    fn missing_or_empty_key() {
        assert_eq!(extract_key(""), None);
        assert_eq!(extract_key("KID"), None);
        assert_eq!(extract_key("KID:"), None);
        assert_eq!(extract_key("KID:   "), None);
    }

    proptest! {
        #[test]
        fn no_colon_never_yields_a_key(s in "[^:]*") {
            prop_assert!(extract_key(&s).is_none());
        }

        #[test]
        fn key_round_trips_through_kid_prefix(key in "[^:\\s][^:]*") {
            let input = format!("KID:{key}");
            prop_assert_eq!(extract_key(&input), Some(key.trim().to_string()));
        }
    }

    #[test]
    fn mode_follows_key_presence() {
        let plain = StreamTarget::from_input("https://x/manifest.mpd", "");
        assert_eq!(plain.mode(), PipelineMode::InProcess);

        let keyed = StreamTarget::from_input("https://x/manifest.mpd", "KID:ABCDEF");
        assert_eq!(keyed.mode(), PipelineMode::ExternalDecrypting);
        assert_eq!(keyed.decryption_key.as_deref(), Some("ABCDEF"));
    }

    #[test]
    fn manifest_url_detection() {
        let target = StreamTarget::from_input("https://x/manifest.mpd?token=1", "");
        assert!(target.is_manifest_url());

        let other = StreamTarget::from_input("https://x/video.m3u8", "");
        assert!(!other.is_manifest_url());
    }

    #[test]
    fn output_path_defaults() {
        let explicit = resolve_output_path(Some(PathBuf::from("out.ts")), "rec", "ts");
        assert_eq!(explicit, PathBuf::from("out.ts"));

        let extended = resolve_output_path(Some(PathBuf::from("capture")), "rec", "mp4");
        assert_eq!(extended, PathBuf::from("capture.mp4"));

        let generated = resolve_output_path(None, "rec", "ts");
        let name = generated.to_string_lossy().into_owned();
        assert!(name.starts_with("rec-"));
        assert!(name.ends_with(".ts"));
    }
}
