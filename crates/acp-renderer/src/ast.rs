//! Block structure produced by the parser.
//!
//! Text fields hold inline markup with attribute references already
//! substituted. Verbatim content (listing, literal, passthrough) is kept as
//! written.

/// A block with its optional anchor id and `.Title`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Block {
    pub id: Option<String>,
    pub title: Option<String>,
    pub kind: BlockKind,
}

impl Block {
    pub(crate) fn new(kind: BlockKind) -> Self {
        Self {
            id: None,
            title: None,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BlockKind {
    /// Section heading; level 1 for `==`.
    Section { level: u8, text: String },
    Paragraph(String),
    Listing {
        language: Option<String>,
        content: String,
        linenums: bool,
    },
    Literal(String),
    Passthrough(String),
    Admonition {
        kind: AdmonitionKind,
        blocks: Vec<Block>,
    },
    Quote {
        blocks: Vec<Block>,
        attribution: Option<String>,
        citetitle: Option<String>,
    },
    Example(Vec<Block>),
    Sidebar(Vec<Block>),
    Open(Vec<Block>),
    List {
        ordered: bool,
        items: Vec<ListItem>,
    },
    Table {
        rows: Vec<Vec<String>>,
        header: bool,
    },
    Image {
        target: String,
        alt: Option<String>,
        width: Option<String>,
        height: Option<String>,
    },
    ThematicBreak,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListItem {
    pub text: String,
    /// Attached blocks and nested lists.
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AdmonitionKind {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl AdmonitionKind {
    pub(crate) fn from_label(label: &str) -> Option<Self> {
        match label {
            "NOTE" => Some(Self::Note),
            "TIP" => Some(Self::Tip),
            "IMPORTANT" => Some(Self::Important),
            "WARNING" => Some(Self::Warning),
            "CAUTION" => Some(Self::Caution),
            _ => None,
        }
    }

    /// Name of the Confluence macro rendering this admonition.
    pub(crate) fn macro_name(self) -> &'static str {
        match self {
            Self::Note => "info",
            Self::Tip => "tip",
            Self::Important => "warning",
            Self::Warning | Self::Caution => "note",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admonition_macro_names() {
        let names: Vec<_> = ["NOTE", "TIP", "IMPORTANT", "WARNING", "CAUTION"]
            .into_iter()
            .filter_map(AdmonitionKind::from_label)
            .map(AdmonitionKind::macro_name)
            .collect();
        assert_eq!(names, vec!["info", "tip", "warning", "note", "note"]);
    }

    #[test]
    fn test_unknown_label() {
        assert_eq!(AdmonitionKind::from_label("note"), None);
    }
}
