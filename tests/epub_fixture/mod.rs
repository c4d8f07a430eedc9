use std::fs::File;
use std::io::{Read as _, Write as _};
use std::path::Path;

use anyhow::Context as _;
use zip::write::SimpleFileOptions;

#[derive(Debug, Clone)]
pub struct FixtureChapter {
    /// Written as the document `<title>` when present.
    pub title: Option<String>,
    pub paragraphs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FixtureBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub chapters: Vec<FixtureChapter>,
}

/// `count` chapters titled `Chapter N: Part N!` with a couple of paragraphs each.
#[allow(dead_code)]
pub fn numbered_book(count: usize) -> FixtureBook {
    FixtureBook {
        title: Some("The Quiet Harbor".to_owned()),
        author: Some("Jane Doe".to_owned()),
        chapters: (1..=count)
            .map(|n| FixtureChapter {
                title: Some(format!("Chapter {n}: Part {n}!")),
                paragraphs: vec![
                    format!("Body of chapter number {n}."),
                    "The   boats\n  rocked gently in the harbor.".to_owned(),
                ],
            })
            .collect(),
    }
}

/// File name the pipeline produces for chapter `n` of [`numbered_book`].
#[allow(dead_code)]
pub fn numbered_file_name(n: usize, width: usize) -> String {
    format!("{n:0width$}_Chapter_{n}_Part_{n}.mp3")
}

pub fn write_epub(path: &Path, book: &FixtureBook) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("create epub: {}", path.display()))?;
    let mut zip = zip::ZipWriter::new(file);

    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let deflated =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("mimetype", stored)?;
    zip.write_all(b"application/epub+zip")?;

    zip.start_file("META-INF/container.xml", deflated)?;
    zip.write_all(CONTAINER_XML.as_bytes())?;

    zip.start_file("OEBPS/content.opf", deflated)?;
    zip.write_all(render_opf(book).as_bytes())?;

    zip.start_file("OEBPS/nav.xhtml", deflated)?;
    zip.write_all(render_nav(book).as_bytes())?;

    zip.start_file("OEBPS/toc.ncx", deflated)?;
    zip.write_all(render_ncx(book).as_bytes())?;

    zip.start_file("OEBPS/style.css", deflated)?;
    zip.write_all(b"body { font-family: serif; }\n")?;

    for (idx, chapter) in book.chapters.iter().enumerate() {
        zip.start_file(format!("OEBPS/text/ch{:03}.xhtml", idx + 1), deflated)?;
        zip.write_all(render_chapter(chapter).as_bytes())?;
    }

    zip.finish().context("finish epub zip")?;
    Ok(())
}

/// Rewrites the archive at `path` without the entry `name`.
#[allow(dead_code)]
pub fn drop_entry(path: &Path, name: &str) -> anyhow::Result<()> {
    let mut entries = Vec::new();
    {
        let mut archive = zip::ZipArchive::new(File::open(path)?)?;
        for idx in 0..archive.len() {
            let mut file = archive.by_index(idx)?;
            let entry_name = file.name().to_owned();
            if entry_name == name {
                continue;
            }
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)?;
            entries.push((entry_name, bytes));
        }
    }

    let mut zip = zip::ZipWriter::new(File::create(path)?);
    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (entry_name, bytes) in entries {
        zip.start_file(entry_name, stored)?;
        zip.write_all(&bytes)?;
    }
    zip.finish().context("finish epub zip")?;
    Ok(())
}

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

fn render_opf(book: &FixtureBook) -> String {
    let mut metadata = String::new();
    if let Some(title) = &book.title {
        metadata.push_str(&format!("    <dc:title>{}</dc:title>\n", xml_escape(title)));
    }
    if let Some(author) = &book.author {
        metadata.push_str(&format!(
            "    <dc:creator>{}</dc:creator>\n",
            xml_escape(author)
        ));
    }

    let mut manifest = String::new();
    let mut spine = String::new();
    manifest.push_str(
        "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
    );
    manifest.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );
    manifest.push_str("    <item id=\"css\" href=\"style.css\" media-type=\"text/css\"/>\n");
    for idx in 1..=book.chapters.len() {
        manifest.push_str(&format!(
            "    <item id=\"ch{idx:03}\" href=\"text/ch{idx:03}.xhtml\" media-type=\"application/xhtml+xml\"/>\n"
        ));
        spine.push_str(&format!("    <itemref idref=\"ch{idx:03}\"/>\n"));
    }

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="bookid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="bookid">urn:uuid:00000000-0000-0000-0000-000000000000</dc:identifier>
{metadata}  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine toc="ncx">
{spine}  </spine>
</package>
"#
    )
}

fn render_nav(book: &FixtureBook) -> String {
    let mut items = String::new();
    for (idx, chapter) in book.chapters.iter().enumerate() {
        let label = chapter.title.as_deref().unwrap_or("Untitled");
        items.push_str(&format!(
            "      <li><a href=\"text/ch{:03}.xhtml\">{}</a></li>\n",
            idx + 1,
            xml_escape(label)
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>Contents</title></head>
<body>
  <nav epub:type="toc">
    <ol>
{items}    </ol>
  </nav>
</body>
</html>
"#
    )
}

fn render_ncx(book: &FixtureBook) -> String {
    let mut points = String::new();
    for (idx, chapter) in book.chapters.iter().enumerate() {
        let n = idx + 1;
        let label = chapter.title.as_deref().unwrap_or("Untitled");
        points.push_str(&format!(
            "    <navPoint id=\"p{n}\" playOrder=\"{n}\"><navLabel><text>{}</text></navLabel><content src=\"text/ch{n:03}.xhtml\"/></navPoint>\n",
            xml_escape(label)
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="urn:uuid:00000000-0000-0000-0000-000000000000"/></head>
  <docTitle><text>Contents</text></docTitle>
  <navMap>
{points}  </navMap>
</ncx>
"#
    )
}

fn render_chapter(chapter: &FixtureChapter) -> String {
    let head_title = match &chapter.title {
        Some(title) => format!("<title>{}</title>", xml_escape(title)),
        None => String::new(),
    };
    let body = chapter
        .paragraphs
        .iter()
        .map(|p| format!("  <p>{}</p>\n", xml_escape(p)))
        .collect::<String>();
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>{head_title}<link rel="stylesheet" type="text/css" href="../style.css"/></head>
<body>
{body}</body>
</html>
"#
    )
}

fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
