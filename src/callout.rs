//! Callout boxes.
//!
//! A callout is a styled notice embedded in a post body:
//!
//! ```text
//! {% callout "warn", "md" %}Back up your data **first**.{% endcallout %}
//! ```
//!
//! Both arguments are optional. The first is the level (`info` when omitted,
//! anything unrecognized renders neutral), the second the body format (`html`
//! when omitted, `md` renders the body through
//! [`render_inline`](crate::markdown::render_inline)).
//!
//! Callouts do not nest: a callout body ends at the first `{% endcallout %}`.
//! An opening tag with no closing tag is left as literal text.

use crate::markdown::render_inline;
use crate::shortcode;
use maud::{PreEscaped, html};

/// Shortcode name that opens a callout.
pub const OPEN_TAG: &str = "callout";
/// Shortcode name that closes a callout.
pub const CLOSE_TAG: &str = "endcallout";

const INFO_ICON: &str = r#"<svg class="w-6 h-6 stroke-current text-sky-600 dark:text-sky-300" fill="none" stroke="currentColor" viewBox="0 0 24 24" xmlns="http://www.w3.org/2000/svg"><path stroke-linecap="round" stroke-linejoin="round" stroke-width="2" d="M13 16h-1v-4h-1m1-4h.01M21 12a9 9 0 11-18 0 9 9 0 0118 0z"></path></svg>"#;

const WARN_ICON: &str = r#"<svg class="w-6 h-6 stroke-current text-yellow-600 dark:text-yellow-300" fill="none" stroke="currentColor" viewBox="0 0 24 24" xmlns="http://www.w3.org/2000/svg"><path stroke-linecap="round" stroke-linejoin="round" stroke-width="2" d="M12 9v2m0 4h.01m-6.938 4h13.856c1.54 0 2.502-1.667 1.732-3L13.732 4c-.77-1.333-2.694-1.333-3.464 0L3.34 16c-.77 1.333.192 3 1.732 3z"></path></svg>"#;

/// Visual severity of a callout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalloutLevel {
    #[default]
    Info,
    Warn,
    /// Fallback for unrecognized level names: no icon, plain background.
    Neutral,
}

impl CalloutLevel {
    pub fn from_name(name: &str) -> Self {
        match name {
            "info" => Self::Info,
            "warn" => Self::Warn,
            _ => Self::Neutral,
        }
    }

    /// Background color classes (light and dark).
    pub fn background(self) -> &'static str {
        match self {
            Self::Info => "bg-blueGray-100 dark:bg-blueGray-700",
            Self::Warn => "bg-orange-100 dark:bg-orange-700",
            Self::Neutral => "bg-white",
        }
    }

    /// Inline SVG icon markup.
    pub fn icon(self) -> Option<&'static str> {
        match self {
            Self::Info => Some(INFO_ICON),
            Self::Warn => Some(WARN_ICON),
            Self::Neutral => None,
        }
    }
}

/// How a callout body is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalloutFormat {
    /// Embedded verbatim.
    #[default]
    Html,
    /// Trimmed, then rendered as inline Markdown.
    Markdown,
}

impl CalloutFormat {
    pub fn from_name(name: &str) -> Self {
        match name {
            "md" => Self::Markdown,
            _ => Self::Html,
        }
    }
}

fn container_class(level: CalloutLevel) -> String {
    format!(
        "p-4 my-5 {} bg-opacity-100 dark:bg-opacity-30 rounded shadow-sm text-sm text-gray-600 dark:text-gray-400 flex items-center",
        level.background()
    )
}

/// Render one callout box.
pub fn expand_callout(content: &str, level: CalloutLevel, format: CalloutFormat) -> String {
    let body = match format {
        CalloutFormat::Markdown => render_inline(content.trim()),
        CalloutFormat::Html => content.to_string(),
    };
    let markup = html! {
        div class=(container_class(level)) {
            @if let Some(icon) = level.icon() {
                (PreEscaped(icon))
            }
            div class="unprose ml-4" {
                (PreEscaped(body))
            }
        }
    };
    markup.into_string().trim().to_string()
}

/// Expand every `{% callout %}…{% endcallout %}` pair in a document body.
///
/// Unpaired tags and all other shortcodes are left untouched.
pub fn expand_callouts(source: &str) -> String {
    let tags = shortcode::scan(source);
    let mut replacements = Vec::new();
    let mut i = 0;

    while i < tags.len() {
        let open = &tags[i];
        if open.name != OPEN_TAG {
            i += 1;
            continue;
        }
        let Some(offset) = tags[i + 1..].iter().position(|t| t.name == CLOSE_TAG) else {
            break;
        };
        let close = &tags[i + 1 + offset];
        let level = open.arg(0).map(CalloutLevel::from_name).unwrap_or_default();
        let format = open.arg(1).map(CalloutFormat::from_name).unwrap_or_default();
        let content = &source[open.span.end..close.span.start];
        replacements.push((
            open.span.start..close.span.end,
            expand_callout(content, level, format),
        ));
        i += offset + 2;
    }

    if replacements.is_empty() {
        return source.to_string();
    }
    shortcode::replace(source, &replacements)
}
