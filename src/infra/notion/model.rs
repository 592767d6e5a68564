//! Wire types for the subset of the Notion REST API this crate reads.

use std::{fmt, marker::PhantomData};

use serde::{
    Deserialize, Deserializer,
    de::{MapAccess, Visitor},
};

/// JSON object kept in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(pub Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> OrderedMap<V> {
    pub fn get(&self, key: &str) -> Option<&V> {
        self.0
            .iter()
            .find_map(|(name, value)| (name == key).then_some(value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    entries.push((key, value));
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<Page>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub properties: OrderedMap<PropertyValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Title {
        title: Vec<RichText>,
    },
    RichText {
        rich_text: Vec<RichText>,
    },
    Date {
        date: Option<DateValue>,
    },
    Files {
        files: Vec<FileReference>,
    },
    MultiSelect {
        multi_select: Vec<SelectOption>,
    },
    People {
        people: Vec<User>,
    },
    CreatedBy {
        created_by: User,
    },
    Status {
        status: Option<SelectOption>,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RichText {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub plain_text: String,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub annotations: Annotations,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateValue {
    pub start: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileReference {
    #[serde(default)]
    pub external: Option<HostedUrl>,
    #[serde(default)]
    pub file: Option<HostedUrl>,
}

impl FileReference {
    /// External link first, then the uploaded-file URL.
    pub fn url(&self) -> Option<&str> {
        self.external
            .as_ref()
            .or(self.file.as_ref())
            .map(|hosted| hosted.url.as_str())
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostedUrl {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectOption {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockList {
    pub results: Vec<Block>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(default)]
    pub has_children: bool,
    #[serde(flatten)]
    pub content: BlockContent,
    #[serde(skip)]
    pub children: Vec<Block>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockContent {
    Paragraph {
        paragraph: TextBlock,
    },
    #[serde(rename = "heading_1")]
    Heading1 {
        heading_1: TextBlock,
    },
    #[serde(rename = "heading_2")]
    Heading2 {
        heading_2: TextBlock,
    },
    #[serde(rename = "heading_3")]
    Heading3 {
        heading_3: TextBlock,
    },
    BulletedListItem {
        bulleted_list_item: TextBlock,
    },
    NumberedListItem {
        numbered_list_item: TextBlock,
    },
    ToDo {
        to_do: ToDoBlock,
    },
    Quote {
        quote: TextBlock,
    },
    Callout {
        callout: CalloutBlock,
    },
    Toggle {
        toggle: TextBlock,
    },
    Code {
        code: CodeBlock,
    },
    Image {
        image: MediaBlock,
    },
    Divider,
    Bookmark {
        bookmark: LinkBlock,
    },
    Embed {
        embed: LinkBlock,
    },
    LinkPreview {
        link_preview: LinkBlock,
    },
    Equation {
        equation: EquationBlock,
    },
    ChildPage {
        child_page: ChildPageBlock,
    },
    #[serde(other)]
    Unsupported,
}

impl BlockContent {
    pub fn is_list_item(&self) -> bool {
        matches!(
            self,
            Self::BulletedListItem { .. } | Self::NumberedListItem { .. } | Self::ToDo { .. }
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToDoBlock {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
    #[serde(default)]
    pub checked: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalloutBlock {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
    #[serde(default)]
    pub icon: Option<Icon>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Icon {
    #[serde(default)]
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodeBlock {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaBlock {
    #[serde(default)]
    pub external: Option<HostedUrl>,
    #[serde(default)]
    pub file: Option<HostedUrl>,
    #[serde(default)]
    pub caption: Vec<RichText>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkBlock {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EquationBlock {
    #[serde(default)]
    pub expression: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChildPageBlock {
    #[serde(default)]
    pub title: String,
}

/// `{object: "error", status, code, message}` body returned on failures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub title: Vec<RichText>,
    #[serde(default)]
    pub properties: OrderedMap<PropertySchema>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: String,
}

pub fn plain_text(fragments: &[RichText]) -> String {
    fragments.iter().map(|f| f.plain_text.as_str()).collect()
}
