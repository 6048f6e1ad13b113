use serde::{Deserialize, Serialize};

/// A protocol content block. Used both for incoming prompt fragments and for
/// outgoing message chunks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Audio {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    ResourceLink {
        uri: String,
        name: String,
    },
    Resource {
        resource: serde_json::Value,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Flatten a prompt into the single string handed to the run engine.
///
/// Every text fragment is followed by one space, the last one included.
/// Non-text fragments are dropped.
pub fn join_prompt_text(prompt: &[ContentBlock]) -> String {
    let mut joined = String::new();
    for text in prompt.iter().filter_map(ContentBlock::as_text) {
        joined.push_str(text);
        joined.push(' ');
    }
    joined
}
