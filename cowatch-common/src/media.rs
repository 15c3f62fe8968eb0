//! Media source resolution
//!
//! Turns a user-supplied URL into a [`SourceDescriptor`]. A `list=` query
//! parameter wins over a video id, so a "watch inside playlist" link starts
//! the playlist.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::snapshot::{PlayMode, SourceDescriptor, SourceKind};
use crate::{Error, Result};

static PLAYLIST_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]list=([^#&?]+)").expect("static playlist pattern"));

static VIDEO_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?|shorts|live)/|.*[?&]v=)|youtu\.be/)([^"&?/\s]{11})"#,
    )
    .expect("static video pattern")
});

/// Resolve `url` into a source descriptor carrying `quality` and `mode`
///
/// Unrecognized URLs are rejected with [`Error::InvalidMediaUrl`].
pub fn resolve_media_url(url: &str, quality: &str, mode: PlayMode) -> Result<SourceDescriptor> {
    let url = url.trim();
    if url.is_empty() {
        return Err(Error::InvalidMediaUrl("empty URL".to_string()));
    }

    let (kind, id) = if let Some(caps) = PLAYLIST_PATTERN.captures(url) {
        (SourceKind::Playlist, caps[1].to_string())
    } else if let Some(caps) = VIDEO_PATTERN.captures(url) {
        (SourceKind::Single, caps[1].to_string())
    } else {
        return Err(Error::InvalidMediaUrl(url.to_string()));
    };

    Ok(SourceDescriptor::new(kind, id)
        .with_quality(quality)
        .with_mode(mode))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(url: &str) -> Result<SourceDescriptor> {
        resolve_media_url(url, "auto", PlayMode::Resume)
    }

    #[test]
    fn test_watch_url() {
        let source = resolve("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        assert_eq!(source.kind, SourceKind::Single);
        assert_eq!(source.media_id, "dQw4w9WgXcQ");
    }

    #[test]
    fn test_short_link_and_embed() {
        assert_eq!(resolve("https://youtu.be/dQw4w9WgXcQ?t=42").unwrap().media_id, "dQw4w9WgXcQ");
        assert_eq!(
            resolve("https://www.youtube.com/embed/dQw4w9WgXcQ").unwrap().media_id,
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            resolve("https://youtube.com/shorts/dQw4w9WgXcQ").unwrap().media_id,
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_video_id_after_other_params() {
        let source = resolve("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ").unwrap();
        assert_eq!(source.media_id, "dQw4w9WgXcQ");
    }

    #[test]
    fn test_playlist_wins_over_video() {
        let source = resolve(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PLx0sYbCqOb8TBPRdmBHs5Iftvv9TPboYG#frag",
        )
        .unwrap();
        assert_eq!(source.kind, SourceKind::Playlist);
        assert_eq!(source.media_id, "PLx0sYbCqOb8TBPRdmBHs5Iftvv9TPboYG");
    }

    #[test]
    fn test_quality_and_mode_carried() {
        let source = resolve_media_url("https://youtu.be/dQw4w9WgXcQ", "hd1080", PlayMode::Live).unwrap();
        assert_eq!(source.requested_quality, "hd1080");
        assert_eq!(source.mode, PlayMode::Live);
    }

    #[test]
    fn test_unrecognized_urls_rejected() {
        for url in ["", "   ", "https://vimeo.com/12345", "https://youtu.be/short", "not a url"] {
            assert!(
                matches!(resolve(url), Err(Error::InvalidMediaUrl(_))),
                "expected rejection for {:?}",
                url
            );
        }
    }
}
