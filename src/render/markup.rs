//! Workspace message markup: angle-bracket tokens and inline emphasis.

use regex::Regex;

use crate::Result;

/// A piece of message text, split at `<...>` tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'t> {
    Text(&'t str),
    User(&'t str),
    Channel(&'t str),
    Link { url: &'t str, label: Option<&'t str> },
}

impl<'t> Segment<'t> {
    /// What a reader sees for this segment in plain text.
    pub fn plain(&self) -> String {
        match self {
            Segment::Text(text) => text.to_string(),
            Segment::User(id) => format!("@{}", id),
            Segment::Channel(id) => format!("#{}", id),
            Segment::Link { url, .. } => url.to_string(),
        }
    }
}

/// Compiled patterns shared by the renderers.
#[derive(Debug, Clone)]
pub struct Markup {
    token: Regex,
    bold: Regex,
    italic: Regex,
    code: Regex,
}

impl Markup {
    pub fn new() -> Result<Self> {
        Ok(Self {
            token: Regex::new(concat!(
                r"<(?:@(?P<user>[A-Z0-9]+)|#(?P<channel>[A-Z0-9]+)|(?P<url>https?://[^|>]+))",
                r"(?:\|(?P<label>[^>]+))?>",
            ))?,
            bold: Regex::new(r"\*([^*]+)\*")?,
            italic: Regex::new(r"_([^_]+)_")?,
            code: Regex::new(r"`([^`]+)`")?,
        })
    }

    /// Split `text` into literal runs and recognized tokens, in order.
    ///
    /// Anything in angle brackets that is not a user, channel or http(s) link stays literal.
    pub fn segments<'t>(&self, text: &'t str) -> Vec<Segment<'t>> {
        let mut segments = Vec::new();
        let mut rest = 0;

        for caps in self.token.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if let Some(literal) = text.get(rest..whole.start()).filter(|s| !s.is_empty()) {
                segments.push(Segment::Text(literal));
            }
            rest = whole.end();

            let segment = if let Some(user) = caps.name("user") {
                Segment::User(user.as_str())
            } else if let Some(channel) = caps.name("channel") {
                Segment::Channel(channel.as_str())
            } else if let Some(url) = caps.name("url") {
                Segment::Link {
                    url: url.as_str(),
                    label: caps.name("label").map(|l| l.as_str()),
                }
            } else {
                Segment::Text(whole.as_str())
            };
            segments.push(segment);
        }

        if let Some(literal) = text.get(rest..).filter(|s| !s.is_empty()) {
            segments.push(Segment::Text(literal));
        }
        segments
    }

    /// Tokens resolved to their plain form, everything else untouched.
    pub fn plain(&self, text: &str) -> String {
        self.segments(text).iter().map(Segment::plain).collect()
    }

    /// `*bold*`, `_italic_` and `` `code` `` as HTML elements. Expects escaped input.
    pub fn emphasize_html(&self, escaped: &str) -> String {
        let text = self.bold.replace_all(escaped, "<strong>$1</strong>");
        let text = self.italic.replace_all(&text, "<em>$1</em>");
        self.code.replace_all(&text, "<code>$1</code>").into_owned()
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}
