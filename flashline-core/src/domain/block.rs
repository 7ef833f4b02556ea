//! Content blocks as returned by the Notion blocks API
//!
//! Only the block types the parser understands get a dedicated variant.
//! Everything else deserializes into [`BlockKind::Unsupported`] so a page
//! with images, headings or toggles still loads.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One rich-text run; only the plain text matters for flashcards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    BulletedListItem { rich_text: Vec<RichText> },
    Unsupported { type_name: String },
}

/// A single Notion block
///
/// Serializes to the same wire shape it is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawBlock", into = "RawBlock")]
pub struct Block {
    pub id: String,
    pub kind: BlockKind,
}

impl Block {
    /// Convenience constructor for a bulleted list item with a single text run
    pub fn bulleted(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: BlockKind::BulletedListItem {
                rich_text: vec![RichText {
                    plain_text: text.into(),
                }],
            },
        }
    }

    pub fn unsupported(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: BlockKind::Unsupported {
                type_name: type_name.into(),
            },
        }
    }

    /// Block type as Notion names it
    pub fn type_name(&self) -> &str {
        match &self.kind {
            BlockKind::BulletedListItem { .. } => "bulleted_list_item",
            BlockKind::Unsupported { type_name } => type_name,
        }
    }
}

/// Wire shape: `{"id": .., "type": "bulleted_list_item", "bulleted_list_item": {"rich_text": [..]}}`
///
/// API versions before 2022-02-22 call the runs `text` instead of `rich_text`.
#[derive(Serialize, Deserialize)]
struct RawBlock {
    id: String,
    #[serde(rename = "type")]
    block_type: String,
    #[serde(flatten)]
    payloads: serde_json::Map<String, JsonValue>,
}

#[derive(Serialize, Deserialize)]
struct RawTextPayload {
    #[serde(default, alias = "text")]
    rich_text: Vec<RichText>,
}

impl From<RawBlock> for Block {
    fn from(raw: RawBlock) -> Self {
        let kind = match raw.block_type.as_str() {
            "bulleted_list_item" => {
                let payload = raw
                    .payloads
                    .get("bulleted_list_item")
                    .cloned()
                    .and_then(|v| serde_json::from_value::<RawTextPayload>(v).ok());
                BlockKind::BulletedListItem {
                    rich_text: payload.map(|p| p.rich_text).unwrap_or_default(),
                }
            }
            other => BlockKind::Unsupported {
                type_name: other.to_string(),
            },
        };

        Block { id: raw.id, kind }
    }
}

impl From<Block> for RawBlock {
    fn from(block: Block) -> Self {
        let mut payloads = serde_json::Map::new();
        let block_type = match block.kind {
            BlockKind::BulletedListItem { rich_text } => {
                let payload = serde_json::to_value(RawTextPayload { rich_text })
                    .unwrap_or(JsonValue::Null);
                payloads.insert("bulleted_list_item".to_string(), payload);
                "bulleted_list_item".to_string()
            }
            BlockKind::Unsupported { type_name } => type_name,
        };

        RawBlock {
            id: block.id,
            block_type,
            payloads,
        }
    }
}
