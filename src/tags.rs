use std::path::Path;

use anyhow::Context as _;
use id3::{Tag, TagLike as _, Version};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTags {
    pub artist: String,
    pub title: String,
    pub album: String,
    pub track: u32,
}

/// Replaces the ID3v2 tag of `path` with `tags`, written as ID3v2.3.
pub fn write_tags(path: &Path, tags: &TrackTags) -> anyhow::Result<()> {
    let mut tag = Tag::new();
    tag.set_artist(tags.artist.as_str());
    tag.set_title(tags.title.as_str());
    tag.set_album(tags.album.as_str());
    tag.set_track(tags.track);

    tag.write_to_path(path, Version::Id3v23)
        .with_context(|| format!("write id3 tag: {}", path.display()))
}

pub fn read_tags(path: &Path) -> anyhow::Result<TrackTags> {
    let tag =
        Tag::read_from_path(path).with_context(|| format!("read id3 tag: {}", path.display()))?;
    Ok(TrackTags {
        artist: tag.artist().unwrap_or_default().to_owned(),
        title: tag.title().unwrap_or_default().to_owned(),
        album: tag.album().unwrap_or_default().to_owned(),
        track: tag.track().unwrap_or_default(),
    })
}
