use std::fmt::Write;

use super::markup::{Markup, Segment, escape_html};
use crate::model::{ArchiveDocument, ArchivedMessage};

const STYLE: &str = r#"        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto,
                "Helvetica Neue", Arial, sans-serif;
            max-width: 1000px;
            margin: 0 auto;
            padding: 20px;
            background-color: #f8f9fa;
        }
        .header, .message {
            background: white;
            border-radius: 8px;
            box-shadow: 0 1px 3px rgba(0,0,0,0.1);
        }
        .header { padding: 20px; margin-bottom: 20px; }
        .message { margin: 10px 0; padding: 15px; }
        .message-header { display: flex; align-items: center; margin-bottom: 5px; }
        .username { font-weight: bold; color: #1264a3; margin-right: 10px; }
        .timestamp { color: #616061; font-size: 12px; }
        .message-text { line-height: 1.4; white-space: pre-wrap; }
        .system-message { background: #f1f2f3; font-style: italic; color: #616061; }
        .thread-reply {
            margin-left: 20px; margin-top: 10px;
            border-left: 3px solid #1264a3; padding-left: 15px;
        }
"#;

/// Message text as HTML: literal text escaped, tokens turned into mentions and anchors.
pub fn format_text(markup: &Markup, text: &str) -> String {
    let mut html = String::with_capacity(text.len());
    for segment in markup.segments(text) {
        match segment {
            Segment::Text(literal) => html.push_str(&markup.emphasize_html(&escape_html(literal))),
            Segment::User(_) | Segment::Channel(_) => html.push_str(&escape_html(&segment.plain())),
            Segment::Link { url, label } => {
                let _ = write!(
                    html,
                    r#"<a href="{}" target="_blank">{}</a>"#,
                    escape_html(url),
                    escape_html(label.unwrap_or(url))
                );
            }
        }
    }
    html
}

pub fn render(doc: &ArchiveDocument, markup: &Markup) -> String {
    let meta = &doc.metadata;
    let channel = escape_html(&meta.channel_name);
    let mut out = String::new();

    let _ = write!(
        out,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>#{channel} - Slack Archive</title>
    <style>
{STYLE}    </style>
</head>
<body>
    <div class="header">
        <h1>#{channel}</h1>
        <p><strong>Archived at:</strong> {}</p>
        <p><strong>Channel ID:</strong> {}</p>
        <p><strong>Messages:</strong> {}</p>
"#,
        escape_html(&meta.archived_at),
        escape_html(&meta.channel_id),
        doc.messages.len(),
    );
    if !meta.channel_topic.is_empty() {
        let _ = writeln!(
            out,
            "        <p><strong>Topic:</strong> {}</p>",
            escape_html(&meta.channel_topic)
        );
    }
    out.push_str("    </div>\n");

    for message in &doc.messages {
        let class = if message.is_system_notice() {
            "message system-message"
        } else {
            "message"
        };
        let _ = writeln!(out, "    <div class=\"{}\">", class);
        write_body(&mut out, markup, message, "        ");

        for reply in message.replies() {
            out.push_str("        <div class=\"thread-reply\">\n");
            write_body(&mut out, markup, reply, "            ");
            out.push_str("        </div>\n");
        }
        out.push_str("    </div>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn write_body(out: &mut String, markup: &Markup, message: &ArchivedMessage, indent: &str) {
    let _ = write!(
        out,
        "{indent}<div class=\"message-header\">\n\
         {indent}    <span class=\"username\">{}</span>\n\
         {indent}    <span class=\"timestamp\">{}</span>\n\
         {indent}</div>\n\
         {indent}<div class=\"message-text\">{}</div>\n",
        escape_html(message.author()),
        escape_html(message.when()),
        format_text(markup, message.text()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Message;

    fn markup() -> Markup {
        Markup::new().unwrap()
    }

    #[test]
    fn test_format_text_escapes_before_links() {
        assert_eq!(
            format_text(&markup(), "<@U123> check <https://x.com|this>"),
            r#"@U123 check <a href="https://x.com" target="_blank">this</a>"#
        );
    }

    #[test]
    fn test_format_text_escapes_literal_markup() {
        assert_eq!(
            format_text(&markup(), "1 < 2 & <script>"),
            "1 &lt; 2 &amp; &lt;script&gt;"
        );
        assert_eq!(
            format_text(&markup(), "<https://a.b/?q=1&r=2>"),
            r#"<a href="https://a.b/?q=1&amp;r=2" target="_blank">https://a.b/?q=1&amp;r=2</a>"#
        );
    }

    #[test]
    fn test_format_text_emphasis() {
        assert_eq!(
            format_text(&markup(), "*done* in `main`"),
            "<strong>done</strong> in <code>main</code>"
        );
    }

    #[test]
    fn test_render_nests_replies_and_marks_system() {
        let doc = ArchiveDocument {
            messages: vec![
                ArchivedMessage {
                    message: Message {
                        ts: "1.0".into(),
                        text: "joined".into(),
                        subtype: Some("channel_join".into()),
                        ..Default::default()
                    },
                    user_name: "Alice".into(),
                    is_system: true,
                    ..Default::default()
                },
                ArchivedMessage {
                    message: Message {
                        ts: "2.0".into(),
                        text: "question".into(),
                        ..Default::default()
                    },
                    user_name: "Bob".into(),
                    thread_messages: Some(vec![ArchivedMessage {
                        message: Message {
                            ts: "2.5".into(),
                            text: "answer".into(),
                            ..Default::default()
                        },
                        user_name: "Carol".into(),
                        ..Default::default()
                    }]),
                    ..Default::default()
                },
            ],
            message_count: 2,
            ..Default::default()
        };

        let html = render(&doc, &markup());

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<div class="message system-message">"#));
        assert!(html.contains(r#"<div class="thread-reply">"#));
        assert!(html.find("question").unwrap() < html.find("answer").unwrap());
        assert!(html.contains(r#"<span class="username">Carol</span>"#));
        assert!(html.trim_end().ends_with("</html>"));
    }
}
