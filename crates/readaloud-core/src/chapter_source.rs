//! Chapter text for the player.
//!
//! The `epub` crate does the container work; this module only walks the
//! spine once, keeps each chapter's raw XHTML, and turns one chapter into
//! speakable prose when asked. Markup that is never read aloud (scripts,
//! styles, navigation chrome, the document head) is cut out before the
//! `html2text` pass.

use crate::error::ChapterError;
use epub::doc::EpubDoc;
use html2text::render::TrivialDecorator;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

static RE_NON_PROSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<nav\b[^>]*>.*?</nav\s*>|<head\b[^>]*>.*?</head\s*>",
    )
    .unwrap()
});
static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<h[1-3]\b[^>]*>(.*?)</h[1-3]\s*>").unwrap());
static RE_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").unwrap());
static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static RE_HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{00A0}]+").unwrap());
static RE_LINK_FOOTNOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d+\]").unwrap());
static RE_FOOTNOTE_TARGET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[\d+\]:\s").unwrap());
static RE_HEADING_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6}\s+").unwrap());

const UNKNOWN_TITLE: &str = "Unknown Title";

/// One entry of the book's reading order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterInfo {
    /// 0-based spine position.
    pub index: usize,
    /// Identifier accepted by [`ChapterSource::load_chapter_text`].
    pub id: String,
    pub title: String,
}

pub trait ChapterSource {
    fn title(&self) -> &str;

    fn chapters(&self) -> &[ChapterInfo];

    /// Plain prose for the chapter, with non-prose markup removed.
    fn load_chapter_text(&mut self, chapter_id: &str) -> Result<String, ChapterError>;

    /// Look a chapter up by its id.
    fn resolve(&self, chapter_id: &str) -> Option<&ChapterInfo> {
        let wanted = chapter_id.trim();
        self.chapters().iter().find(|chapter| chapter.id == wanted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Markup,
    Plain,
}

/// Chapter source backed by an EPUB spine (or a plain `.txt` file treated as
/// a single chapter).
#[derive(Debug, Clone)]
pub struct EpubChapterSource {
    title: String,
    chapters: Vec<ChapterInfo>,
    documents: Vec<String>,
    kind: DocumentKind,
}

impl EpubChapterSource {
    pub fn open(path: &Path) -> Result<Self, ChapterError> {
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.trim().is_empty())
            .map(str::to_string);

        if is_text_file(path) {
            info!(path = %path.display(), "Loading plain text as a single chapter");
            let text = fs::read_to_string(path).map_err(|err| ChapterError::Open {
                path: path.display().to_string(),
                message: err.to_string(),
            })?;
            let title = stem.unwrap_or_else(|| UNKNOWN_TITLE.to_string());
            return Ok(Self {
                chapters: vec![chapter_info(0, title.clone())],
                title,
                documents: vec![text],
                kind: DocumentKind::Plain,
            });
        }

        info!(path = %path.display(), "Loading EPUB spine");
        let mut doc = EpubDoc::new(path).map_err(|err| ChapterError::Open {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        let title = book_title(doc.get_title(), stem);

        let mut documents = Vec::new();
        while let Some((chapter, _mime)) = doc.get_current_str() {
            debug!(
                chapter = documents.len() + 1,
                bytes = chapter.len(),
                "Read spine document"
            );
            documents.push(chapter);
            if !doc.go_next() {
                break;
            }
        }

        if documents.is_empty() {
            return Err(ChapterError::Open {
                path: path.display().to_string(),
                message: "No chapters found in EPUB.".to_string(),
            });
        }

        let source = Self::from_documents(title, documents);
        info!(
            title = %source.title,
            chapters = source.chapters.len(),
            "Loaded {} chapters. Select one to play.",
            source.chapters.len()
        );
        Ok(source)
    }

    /// Build a source from already-extracted XHTML documents in reading order.
    pub fn from_documents(title: impl Into<String>, documents: Vec<String>) -> Self {
        let chapters = documents
            .iter()
            .enumerate()
            .map(|(index, markup)| {
                let title = extract_title(markup).unwrap_or_else(|| format!("Chapter {}", index + 1));
                chapter_info(index, title)
            })
            .collect();
        Self {
            title: title.into(),
            chapters,
            documents,
            kind: DocumentKind::Markup,
        }
    }
}

impl ChapterSource for EpubChapterSource {
    fn title(&self) -> &str {
        &self.title
    }

    fn chapters(&self) -> &[ChapterInfo] {
        &self.chapters
    }

    fn load_chapter_text(&mut self, chapter_id: &str) -> Result<String, ChapterError> {
        let index = self
            .resolve(chapter_id)
            .map(|chapter| chapter.index)
            .ok_or_else(|| ChapterError::NotFound(chapter_id.to_string()))?;
        let document = &self.documents[index];

        let text = match self.kind {
            DocumentKind::Plain => tidy_prose(document),
            DocumentKind::Markup => {
                markup_to_prose(document).map_err(|message| ChapterError::Parse {
                    chapter: chapter_id.to_string(),
                    message,
                })?
            }
        };
        debug!(
            chapter = chapter_id,
            chars = text.len(),
            "Extracted chapter text"
        );
        Ok(text)
    }
}

/// Convert chapter XHTML into plain prose.
pub fn markup_to_prose(markup: &str) -> Result<String, String> {
    let stripped = RE_NON_PROSE.replace_all(markup, " ");
    // The trivial decorator drops link brackets, quote prefixes and emphasis
    // marks; a very wide column keeps html2text from baking in hard line breaks.
    let plain = html2text::config::with_decorator(TrivialDecorator::new())
        .no_table_borders()
        .string_from_read(stripped.as_bytes(), 10_000)
        .map_err(|err| {
            warn!("html2text failed: {err}");
            err.to_string()
        })?;
    Ok(tidy_prose(&plain))
}

fn tidy_prose(text: &str) -> String {
    let normalized: String = text.nfc().collect();
    let mut lines: Vec<String> = Vec::new();
    for line in normalized.lines() {
        if RE_FOOTNOTE_TARGET.is_match(line.trim_start()) {
            continue;
        }
        let line = RE_HEADING_MARKER.replace(line.trim_start(), "");
        let line = RE_LINK_FOOTNOTE.replace_all(&line, "").replace('*', "");
        let line = RE_HORIZONTAL_WS.replace_all(&line, " ");
        let line = line.trim();
        if line.is_empty() {
            if lines.last().is_some_and(|last| !last.is_empty()) {
                lines.push(String::new());
            }
            continue;
        }
        lines.push(line.to_string());
    }
    lines.join("\n").trim().to_string()
}

fn extract_title(markup: &str) -> Option<String> {
    let body = RE_NON_PROSE.replace_all(markup, " ");
    let candidate = RE_HEADING
        .captures(&body)
        .or_else(|| RE_TITLE.captures(markup))
        .and_then(|captures| captures.get(1))
        .map(|inner| RE_TAG.replace_all(inner.as_str(), " ").to_string())?;
    let title = RE_HORIZONTAL_WS
        .replace_all(candidate.replace(['\n', '\r'], " ").trim(), " ")
        .to_string();
    if title.is_empty() { None } else { Some(title) }
}

/// Metadata title when present, else the file stem.
fn book_title(metadata_title: Option<String>, stem: Option<String>) -> String {
    metadata_title
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .or(stem)
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
}

fn chapter_info(index: usize, title: String) -> ChapterInfo {
    ChapterInfo {
        index,
        id: (index + 1).to_string(),
        title,
    }
}

fn is_text_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase()),
        Some(ext) if ext == "txt"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    const CHAPTER_ONE: &str = r#"<?xml version="1.0"?>
<html><head><title>Ignored head title</title><style>p { color: red; }</style></head>
<body>
<nav><ol><li>Contents</li></ol></nav>
<h1>The <em>First</em> Chapter</h1>
<p>It was a dark night.  The wind howled!</p>
<script>console.log("never spoken");</script>
<p>Was anyone awake?</p>
</body></html>"#;

    const CHAPTER_UNTITLED: &str = "<html><body><p>Just prose here.</p></body></html>";

    fn sample_source() -> EpubChapterSource {
        EpubChapterSource::from_documents(
            "Sample",
            vec![
                CHAPTER_ONE.to_string(),
                CHAPTER_UNTITLED.to_string(),
                "<html><body><div>   </div></body></html>".to_string(),
            ],
        )
    }

    #[test]
    fn lists_spine_with_heading_titles_and_fallbacks() {
        let source = sample_source();
        let titles: Vec<&str> = source.chapters().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["The First Chapter", "Chapter 2", "Chapter 3"]);
        assert_eq!(source.chapters()[1].id, "2");
        assert_eq!(source.title(), "Sample");
    }

    #[test]
    fn strips_scripts_styles_and_navigation() {
        let mut source = sample_source();
        let text = source.load_chapter_text("1").expect("chapter should load");

        assert!(text.contains("It was a dark night. The wind howled!"));
        assert!(text.contains("Was anyone awake?"));
        assert!(!text.contains("never spoken"));
        assert!(!text.contains("color: red"));
        assert!(!text.contains("Contents"));
        assert!(!text.contains("Ignored head title"));
    }

    #[test]
    fn unknown_chapter_is_not_found() {
        let mut source = sample_source();
        assert_eq!(
            source.load_chapter_text("42"),
            Err(ChapterError::NotFound("42".to_string()))
        );
    }

    #[test]
    fn blank_chapter_loads_as_empty_text() {
        let mut source = sample_source();
        let text = source.load_chapter_text("3").expect("blank chapter still loads");
        assert!(text.trim().is_empty());
    }

    #[test]
    fn tidy_prose_collapses_spacing_and_footnote_markers() {
        let raw = "# Heading\n\nSome\u{00A0}\u{00A0}text[1] here.\n\n\n\nNext   para.\n[1]: https://example.com";
        assert_eq!(tidy_prose(raw), "Heading\n\nSome text here.\n\nNext para.");
    }

    #[test]
    fn links_quotes_images_and_tables_read_as_plain_prose() {
        let markup = r#"<html><body>
<p>See <a href="https://example.com">the site</a> now.</p>
<blockquote><p>Quoted wisdom here.</p></blockquote>
<p><img src="map.png" alt="A map"/></p>
<table><tr><td>Cell a.</td><td>Cell b.</td></tr></table>
</body></html>"#;
        let text = markup_to_prose(markup).expect("markup converts");

        assert!(text.contains("See the site now."));
        assert!(text.contains("Quoted wisdom here."));
        assert!(!text.contains('>'));
        assert!(!text.contains('['));
        assert!(!text.contains(']'));
        assert!(!text.contains(['─', '│', '┬', '┼']));
        let units = crate::segmenter::segment(&text);
        assert!(units.iter().any(|unit| unit == "Quoted wisdom here."));
        assert!(units.iter().any(|unit| unit.starts_with("Cell a.")));
    }

    #[test]
    fn book_title_prefers_metadata_then_file_stem() {
        assert_eq!(
            book_title(Some(" Moby Dick ".to_string()), Some("md_123".to_string())),
            "Moby Dick"
        );
        assert_eq!(
            book_title(Some("   ".to_string()), Some("md_123".to_string())),
            "md_123"
        );
        assert_eq!(book_title(None, None), "Unknown Title");
    }

    #[test]
    fn missing_book_reports_open_error() {
        let err = EpubChapterSource::open(Path::new("/definitely/not/here.epub"))
            .expect_err("missing file must fail");
        assert!(matches!(err, ChapterError::Open { .. }));
    }

    #[test]
    fn plain_text_file_is_a_single_chapter() {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be after epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("readaloud-source-{nonce}.txt"));
        fs::write(&path, "Hello there.   General Kenobi!\n").expect("write temp text");

        let mut source = EpubChapterSource::open(&path).expect("text file should open");
        assert_eq!(source.chapters().len(), 1);
        assert_eq!(
            source.load_chapter_text("1").expect("chapter should load"),
            "Hello there. General Kenobi!"
        );

        let _ = fs::remove_file(&path);
    }
}
