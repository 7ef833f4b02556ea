//! Demo content source
//!
//! Serves two built-in pages so the whole add/reload/study flow can be tried
//! without a Notion account. Credentials are ignored.

use crate::domain::result::{Error, Result};
use crate::domain::{Block, NotionCredential};
use crate::ports::ContentSource;

/// Cell biology demo page
pub const DEMO_BIOLOGY_PAGE: &str = "d0000000000000000000000000000001";

/// Spanish vocabulary demo page
pub const DEMO_SPANISH_PAGE: &str = "d0000000000000000000000000000002";

struct DemoPage {
    id: &'static str,
    title: &'static str,
    blocks: &'static [(&'static str, Option<&'static str>)],
}

/// `(block id, bullet text)`; `None` marks a paragraph block
const PAGES: &[DemoPage] = &[
    DemoPage {
        id: DEMO_BIOLOGY_PAGE,
        title: "Cell Biology",
        blocks: &[
            ("bio-01", None),
            ("bio-02", Some("🧩 Powerhouse of the cell::Mitochondria")),
            ("bio-03", Some("🧩 Site of protein synthesis::Ribosome")),
            ("bio-04", Some("Cells were first described by Robert Hooke")),
            ("bio-05", Some("🧩 Organelle containing chlorophyll::Chloroplast")),
            ("bio-06", Some("🧩 Controls what enters and leaves the cell")),
            ("bio-07", Some("🧩 Stores genetic material::Nucleus")),
        ],
    },
    DemoPage {
        id: DEMO_SPANISH_PAGE,
        title: "Spanish Basics",
        blocks: &[
            ("es-01", Some("🧩 hello::hola")),
            ("es-02", Some("🧩 thank you::gracias")),
            ("es-03", Some("🧩 good night::buenas noches")),
            ("es-04", None),
            ("es-05", Some("🧩 the library::la biblioteca")),
            ("es-06", Some("🧩 to learn::aprender")),
        ],
    },
];

/// Built-in demo pages
pub fn demo_page_ids() -> Vec<&'static str> {
    PAGES.iter().map(|p| p.id).collect()
}

fn find_page(page_id: &str) -> Result<&'static DemoPage> {
    PAGES
        .iter()
        .find(|p| p.id == page_id)
        .ok_or_else(|| Error::not_found(format!("demo page {}", page_id)))
}

/// Content source that serves the built-in demo pages
#[derive(Debug, Default)]
pub struct DemoContentSource;

impl DemoContentSource {
    pub fn new() -> Self {
        Self
    }
}

impl ContentSource for DemoContentSource {
    fn name(&self) -> &str {
        "demo"
    }

    fn fetch_blocks(&self, _credential: &NotionCredential, page_id: &str) -> Result<Vec<Block>> {
        let page = find_page(page_id)?;
        Ok(page
            .blocks
            .iter()
            .map(|(id, text)| match text {
                Some(text) => Block::bulleted(*id, *text),
                None => Block::unsupported(*id, "paragraph"),
            })
            .collect())
    }

    fn fetch_title(&self, _credential: &NotionCredential, page_id: &str) -> Result<String> {
        Ok(find_page(page_id)?.title.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BlockKind;

    #[test]
    fn test_demo_pages_resolve() {
        let source = DemoContentSource::new();
        let credential = NotionCredential::from_token("");

        for id in demo_page_ids() {
            assert!(!source.fetch_title(&credential, id).unwrap().is_empty());
            assert!(!source.fetch_blocks(&credential, id).unwrap().is_empty());
        }
    }

    #[test]
    fn test_demo_page_mixes_block_types() {
        let source = DemoContentSource::new();
        let blocks = source
            .fetch_blocks(&NotionCredential::from_token(""), DEMO_BIOLOGY_PAGE)
            .unwrap();

        assert!(blocks
            .iter()
            .any(|b| matches!(b.kind, BlockKind::Unsupported { .. })));
        assert!(blocks
            .iter()
            .any(|b| matches!(b.kind, BlockKind::BulletedListItem { .. })));
    }

    #[test]
    fn test_unknown_page_not_found() {
        let source = DemoContentSource::new();
        let err = source
            .fetch_title(&NotionCredential::from_token(""), "ffffffffffffffffffffffffffffffff")
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
