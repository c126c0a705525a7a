use std::fmt::Write;

use super::markup::{Markup, Segment};
use crate::model::ArchiveDocument;

/// Message text as Markdown. Emphasis markers are already Markdown and pass through.
pub fn format_text(markup: &Markup, text: &str) -> String {
    markup
        .segments(text)
        .into_iter()
        .map(|segment| match segment {
            Segment::Link { url, label } => format!("[{}]({})", label.unwrap_or(url), url),
            other => other.plain(),
        })
        .collect()
}

pub fn render(doc: &ArchiveDocument, markup: &Markup) -> String {
    let meta = &doc.metadata;
    let mut out = String::new();

    let _ = write!(
        out,
        "# #{}\n\n\
         **Archive info:**\n\
         - Archived at: {}\n\
         - Channel ID: {}\n\
         - Messages: {}\n\
         - Private channel: {}\n\n\
         ---\n\n",
        meta.channel_name,
        meta.archived_at,
        meta.channel_id,
        doc.messages.len(),
        if meta.is_private { "yes" } else { "no" },
    );

    for message in &doc.messages {
        let text = format_text(markup, message.text());

        if message.is_system_notice() {
            let _ = write!(out, "*{}* - _{}_\n\n", message.when(), text);
        } else {
            let _ = write!(out, "**{}** _{}_\n\n{}\n\n", message.author(), message.when(), text);

            let replies = message.replies();
            if !replies.is_empty() {
                out.push_str("**Thread replies:**\n\n");
                for reply in replies {
                    let quoted = format_text(markup, reply.text()).replace('\n', "\n> ");
                    let _ = write!(
                        out,
                        "> **{}** _{}_\n> \n> {}\n\n",
                        reply.author(),
                        reply.when(),
                        quoted
                    );
                }
            }
        }
        out.push_str("---\n\n");
    }
    out
}
