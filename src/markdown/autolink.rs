//! Bare URL and e-mail autolinking.
//!
//! pulldown-cmark only links `<https://…>` angle-bracket autolinks. Authors
//! also paste bare URLs and addresses, so text events outside of links and
//! images are scanned and split into link events here.

use pulldown_cmark::{CowStr, Event, LinkType, Tag, TagEnd};
use regex::Regex;
use std::sync::LazyLock;

static LINKABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?P<url>\b(?:https?://|www\.)[^\s<>]+)|(?P<email>\b[a-z0-9._%+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,}\b)",
    )
    .expect("autolink pattern is valid")
});

/// Characters that end a sentence rather than a URL.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ':', ';', '!', '?', '\'', '"', '*', '_', '~'];

/// Wrap bare URLs and e-mail addresses found in text events in link events.
///
/// E-mail links carry the bare address; the HTML writer adds `mailto:`.
///
/// Text inside existing links and images is left alone, including links
/// written as raw inline `<a>` tags.
pub(crate) fn autolink<'a>(events: Vec<Event<'a>>) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    let mut link_depth = 0usize;

    for event in events {
        match event {
            Event::Start(tag @ (Tag::Link { .. } | Tag::Image { .. })) => {
                link_depth += 1;
                out.push(Event::Start(tag));
            }
            Event::End(end @ (TagEnd::Link | TagEnd::Image)) => {
                link_depth = link_depth.saturating_sub(1);
                out.push(Event::End(end));
            }
            Event::InlineHtml(html) => {
                if is_anchor_tag(&html, "<a") {
                    link_depth += 1;
                } else if is_anchor_tag(&html, "</a") {
                    link_depth = link_depth.saturating_sub(1);
                }
                out.push(Event::InlineHtml(html));
            }
            Event::Text(text) if link_depth == 0 && LINKABLE.is_match(&text) => {
                split_links(&text, &mut out);
            }
            other => out.push(other),
        }
    }
    out
}

/// Whether a raw HTML fragment is an opening (`<a`) or closing (`</a`)
/// anchor tag, matched case-insensitively and not confused with `<abbr>`.
fn is_anchor_tag(html: &str, prefix: &str) -> bool {
    let html = html.trim_start();
    html.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        && html[prefix.len()..]
            .chars()
            .next()
            .is_some_and(|c| c == '>' || c == '/' || c.is_ascii_whitespace())
}

fn split_links<'a>(text: &str, out: &mut Vec<Event<'a>>) {
    let mut cursor = 0;
    for caps in LINKABLE.captures_iter(text) {
        let (m, is_email) = match (caps.name("url"), caps.name("email")) {
            (Some(m), _) => (m, false),
            (None, Some(m)) => (m, true),
            (None, None) => continue,
        };
        let matched = if is_email {
            m.as_str()
        } else {
            trim_url(m.as_str())
        };
        if matched.is_empty() {
            continue;
        }

        if m.start() > cursor {
            out.push(Event::Text(text[cursor..m.start()].to_string().into()));
        }

        let (link_type, dest) = if is_email {
            (LinkType::Email, matched.to_string())
        } else if matched.len() >= 4 && matched[..4].eq_ignore_ascii_case("www.") {
            (LinkType::Autolink, format!("http://{matched}"))
        } else {
            (LinkType::Autolink, matched.to_string())
        };

        out.push(Event::Start(Tag::Link {
            link_type,
            dest_url: dest.into(),
            title: CowStr::Borrowed(""),
            id: CowStr::Borrowed(""),
        }));
        out.push(Event::Text(matched.to_string().into()));
        out.push(Event::End(TagEnd::Link));
        cursor = m.start() + matched.len();
    }
    if cursor < text.len() {
        out.push(Event::Text(text[cursor..].to_string().into()));
    }
}

/// Drop trailing punctuation and unbalanced closing parens from a URL match.
fn trim_url(url: &str) -> &str {
    let mut end = url.len();
    loop {
        let candidate = &url[..end];
        let Some(last) = candidate.chars().last() else {
            return candidate;
        };
        if TRAILING_PUNCTUATION.contains(&last) {
            end -= last.len_utf8();
            continue;
        }
        if last == ')' {
            let opens = candidate.matches('(').count();
            let closes = candidate.matches(')').count();
            if closes > opens {
                end -= 1;
                continue;
            }
        }
        return candidate;
    }
}
