use std::fmt::Write;

use super::markup::Markup;
use crate::model::ArchiveDocument;

const RULE_WIDTH: usize = 60;

pub fn render(doc: &ArchiveDocument, markup: &Markup) -> String {
    let meta = &doc.metadata;
    let mut out = String::new();

    let _ = write!(
        out,
        "Slack Archive - #{}\n\
         Archived at: {}\n\
         Channel ID: {}\n\
         Messages: {}\n\n\
         {}\n\n",
        meta.channel_name,
        meta.archived_at,
        meta.channel_id,
        doc.messages.len(),
        "=".repeat(RULE_WIDTH),
    );

    // System notices carry their author like any other line.
    for message in &doc.messages {
        let _ = writeln!(
            out,
            "[{}] {}: {}",
            message.when(),
            message.author(),
            markup.plain(message.text())
        );
        for reply in message.replies() {
            let _ = writeln!(
                out,
                "    └─ [{}] {}: {}",
                reply.when(),
                reply.author(),
                markup.plain(reply.text())
            );
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArchivedMessage, Message};

    fn archived(ts: &str, author: &str, text: &str) -> ArchivedMessage {
        ArchivedMessage {
            message: Message {
                ts: ts.into(),
                text: text.into(),
                ..Default::default()
            },
            user_name: author.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_render_keeps_order_and_names() {
        let mut parent = archived("2.0", "김철수", "see <https://x.com|docs>");
        parent.thread_messages = Some(vec![archived("2.5", "Bob", "thanks <@U1>")]);
        let doc = ArchiveDocument {
            messages: vec![
                archived("1.0", "Alice", "first"),
                parent,
                archived("3.0", "Carol", "last"),
            ],
            message_count: 3,
            ..Default::default()
        };

        let text = render(&doc, &Markup::new().unwrap());

        let lines: Vec<&str> = text
            .lines()
            .filter(|line| line.starts_with('[') || line.starts_with("    └─"))
            .collect();
        assert_eq!(
            lines,
            vec![
                "[1.0] Alice: first",
                "[2.0] 김철수: see https://x.com",
                "    └─ [2.5] Bob: thanks @U1",
                "[3.0] Carol: last",
            ]
        );
    }

    #[test]
    fn test_render_system_message_keeps_author() {
        let mut join = archived("1.0", "Alice", "has joined the channel");
        join.is_system = true;
        let doc = ArchiveDocument {
            messages: vec![join],
            ..Default::default()
        };

        let text = render(&doc, &Markup::new().unwrap());

        assert!(text.contains("[1.0] Alice: has joined the channel\n"));
    }
}
