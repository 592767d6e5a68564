//! Block tree to markdown-like text.

use super::model::{Block, BlockContent, RichText, plain_text};

/// Render a block tree. Blocks are separated by blank lines, except runs
/// of list items which stay on consecutive lines.
pub fn render_blocks(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut previous_was_list = false;

    for block in blocks {
        let Some(rendered) = render_block(block) else {
            continue;
        };
        let is_list = block.content.is_list_item();
        if !out.is_empty() {
            out.push_str(if is_list && previous_was_list { "\n" } else { "\n\n" });
        }
        out.push_str(&rendered);
        previous_was_list = is_list;
    }

    out
}

fn render_block(block: &Block) -> Option<String> {
    let head = match &block.content {
        BlockContent::Paragraph { paragraph } => rich_text(&paragraph.rich_text),
        BlockContent::Heading1 { heading_1 } => format!("# {}", rich_text(&heading_1.rich_text)),
        BlockContent::Heading2 { heading_2 } => format!("## {}", rich_text(&heading_2.rich_text)),
        BlockContent::Heading3 { heading_3 } => format!("### {}", rich_text(&heading_3.rich_text)),
        BlockContent::BulletedListItem { bulleted_list_item } => {
            format!("- {}", rich_text(&bulleted_list_item.rich_text))
        }
        BlockContent::NumberedListItem { numbered_list_item } => {
            format!("1. {}", rich_text(&numbered_list_item.rich_text))
        }
        BlockContent::ToDo { to_do } => {
            let mark = if to_do.checked { "x" } else { " " };
            format!("- [{mark}] {}", rich_text(&to_do.rich_text))
        }
        BlockContent::Quote { quote } => prefix_lines(&rich_text(&quote.rich_text), "> "),
        BlockContent::Callout { callout } => {
            let text = rich_text(&callout.rich_text);
            let text = match callout.icon.as_ref().and_then(|icon| icon.emoji.as_deref()) {
                Some(emoji) => format!("{emoji} {text}"),
                None => text,
            };
            prefix_lines(&text, "> ")
        }
        BlockContent::Toggle { toggle } => rich_text(&toggle.rich_text),
        BlockContent::Code { code } => format!(
            "```{}\n{}\n```",
            code.language.as_deref().unwrap_or_default(),
            plain_text(&code.rich_text)
        ),
        BlockContent::Image { image } => {
            let url = image.external.as_ref().or(image.file.as_ref())?.url.as_str();
            format!("![{}]({url})", plain_text(&image.caption))
        }
        BlockContent::Divider => "---".to_string(),
        BlockContent::Bookmark { bookmark: link }
        | BlockContent::Embed { embed: link }
        | BlockContent::LinkPreview { link_preview: link } => {
            if link.url.is_empty() {
                return None;
            }
            format!("[{url}]({url})", url = link.url)
        }
        BlockContent::Equation { equation } => format!("$$\n{}\n$$", equation.expression),
        BlockContent::ChildPage { child_page } => child_page.title.clone(),
        BlockContent::Unsupported => return None,
    };

    let children = render_blocks(&block.children);
    if children.is_empty() {
        Some(head)
    } else {
        Some(format!("{head}\n{}", prefix_lines(&children, "  ")))
    }
}

fn rich_text(fragments: &[RichText]) -> String {
    fragments.iter().map(render_fragment).collect()
}

fn render_fragment(fragment: &RichText) -> String {
    let text = fragment.plain_text.as_str();
    if text.trim().is_empty() {
        return text.to_string();
    }

    let mut out = if fragment.kind == "equation" {
        format!("${text}$")
    } else if fragment.annotations.code {
        format!("`{text}`")
    } else {
        text.to_string()
    };

    let annotations = fragment.annotations;
    if annotations.bold {
        out = format!("**{out}**");
    }
    if annotations.italic {
        out = format!("_{out}_");
    }
    if annotations.strikethrough {
        out = format!("~~{out}~~");
    }
    if let Some(href) = fragment.href.as_deref() {
        out = format!("[{out}]({href})");
    }
    out
}

fn prefix_lines(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                line.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
