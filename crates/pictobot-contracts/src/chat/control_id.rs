/// Platform limit on interactive component ids.
pub const CONTROL_ID_MAX_CHARS: usize = 100;

const SEPARATOR: char = '_';
const GENERATE: &str = "generate";
const STORED: &str = "stored";

/// Custom id carried by the generate and regenerate buttons.
///
/// Prompts that fit travel inline as `generate_<prompt>`. Longer prompts
/// are kept by the bot and the id carries a lookup key, `stored_<key>`, so
/// a click never re-runs a cut prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlId {
    Generate { prompt: String },
    Stored { key: String },
}

impl ControlId {
    /// Inline id for `prompt`, or `None` when it would exceed the limit.
    pub fn inline(prompt: &str) -> Option<Self> {
        let prompt = prompt.trim();
        let budget = CONTROL_ID_MAX_CHARS - GENERATE.len() - SEPARATOR.len_utf8();
        if prompt.is_empty() || prompt.chars().count() > budget {
            return None;
        }
        Some(ControlId::Generate {
            prompt: prompt.to_string(),
        })
    }

    pub fn stored(key: impl Into<String>) -> Self {
        ControlId::Stored { key: key.into() }
    }

    pub fn encode(&self) -> String {
        match self {
            ControlId::Generate { prompt } => format!("{GENERATE}{SEPARATOR}{prompt}"),
            ControlId::Stored { key } => format!("{STORED}{SEPARATOR}{key}"),
        }
    }

    /// Splits on the first separator only; prompts may contain underscores.
    pub fn parse(raw: &str) -> Option<Self> {
        let (head, tail) = raw.split_once(SEPARATOR)?;
        let tail = tail.trim();
        if tail.is_empty() {
            return None;
        }
        match head {
            GENERATE => Some(ControlId::Generate {
                prompt: tail.to_string(),
            }),
            STORED => Some(ControlId::stored(tail)),
            _ => None,
        }
    }
}
