use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use epub::doc::EpubDoc;
use percent_encoding::percent_decode_str;
use quick_xml::Reader;
use quick_xml::events::Event;

const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// An XHTML content document that carries readable text.
    Document,
    /// The EPUB 3 table-of-contents nav document or an EPUB 2 NCX.
    Navigation,
    /// Stylesheets, images, fonts and everything else.
    Other,
}

impl ItemKind {
    /// Media type decides, except that XHTML holding a `<nav epub:type="toc">`
    /// is navigation.
    pub fn classify(media_type: &str, bytes: &[u8]) -> Self {
        match media_type {
            NCX_MEDIA_TYPE => ItemKind::Navigation,
            "application/xhtml+xml" | "text/html" if has_toc_nav(bytes) => ItemKind::Navigation,
            "application/xhtml+xml" | "text/html" => ItemKind::Document,
            _ => ItemKind::Other,
        }
    }
}

/// A spine entry resolved against the manifest. Content stays in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineEntry {
    pub id: String,
    /// Path of the entry inside the archive.
    pub path: PathBuf,
    pub media_type: String,
}

#[derive(Debug, Clone)]
pub struct EpubItem {
    pub id: String,
    pub path: PathBuf,
    pub kind: ItemKind,
    pub bytes: Vec<u8>,
}

/// An opened EPUB. Package metadata is parsed up front; item bytes are read
/// from the archive one at a time.
pub struct Ebook {
    doc: EpubDoc<BufReader<File>>,
    spine: Vec<SpineEntry>,
}

impl Ebook {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let doc = EpubDoc::new(path)
            .map_err(|err| anyhow::anyhow!("{err}"))
            .with_context(|| format!("open epub: {}", path.display()))?;
        let spine = spine_entries(&doc)?;

        tracing::debug!(
            path = %path.display(),
            resources = doc.resources.len(),
            spine = spine.len(),
            "opened epub"
        );
        Ok(Self { doc, spine })
    }

    /// Reading order.
    pub fn spine(&self) -> &[SpineEntry] {
        &self.spine
    }

    /// Dublin Core values for `key` (`title`, `creator`, `language`, ...).
    pub fn metadata(&self, key: &str) -> &[String] {
        self.doc.metadata.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Spine items in reading order. A spine entry whose file is absent from
    /// the archive is an error; resources outside the spine are never read.
    pub fn items(&mut self) -> impl Iterator<Item = anyhow::Result<EpubItem>> + '_ {
        let spine = self.spine.clone();
        spine.into_iter().map(move |entry| self.read(&entry))
    }

    pub fn read(&mut self, entry: &SpineEntry) -> anyhow::Result<EpubItem> {
        let bytes = match self.doc.get_resource_by_path(&entry.path) {
            Some(bytes) => bytes,
            None => {
                let decoded = decode_path(&entry.path);
                self.doc.get_resource_by_path(&decoded).with_context(|| {
                    format!(
                        "spine item {} missing from archive: {}",
                        entry.id,
                        entry.path.display()
                    )
                })?
            }
        };

        Ok(EpubItem {
            id: entry.id.clone(),
            path: entry.path.clone(),
            kind: ItemKind::classify(&entry.media_type, &bytes),
            bytes,
        })
    }
}

fn spine_entries(doc: &EpubDoc<BufReader<File>>) -> anyhow::Result<Vec<SpineEntry>> {
    doc.spine
        .iter()
        .map(|id| {
            let (path, media_type) = doc
                .resources
                .get(id)
                .with_context(|| format!("spine item {id} is not in the manifest"))?;
            Ok(SpineEntry {
                id: id.clone(),
                path: path.clone(),
                media_type: media_type.clone(),
            })
        })
        .collect()
}

/// Manifest hrefs are URLs; archive entries are stored unescaped.
fn decode_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(percent_decode_str(&raw).decode_utf8_lossy().into_owned())
}

fn has_toc_nav(bytes: &[u8]) -> bool {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == b"nav" => {
                let is_toc = e.attributes().flatten().any(|attr| {
                    attr.key.local_name().as_ref() == b"type"
                        && attr
                            .value
                            .split(|b: &u8| b.is_ascii_whitespace())
                            .any(|token| token == b"toc")
                });
                if is_toc {
                    return true;
                }
            }
            Ok(Event::Eof) => return false,
            Err(err) => {
                tracing::debug!(?err, "nav scan stopped");
                return false;
            }
            _ => {}
        }
        buf.clear();
    }
}
