//! Markdown rendering with heading anchors and a table of contents.
//!
//! Rendering is a chain of passes over pulldown-cmark events, followed by
//! `pulldown_cmark::html::push_html`:
//!
//! ```text
//! parse → code blocks → soft breaks → autolink → headings → [[toc]] → HTML
//! ```
//!
//! | Pass | Behavior |
//! |---|---|
//! | **Code blocks** | Indented code is not a block: its lines render as literal paragraph text. Fenced code goes to the [`FenceRenderer`]. |
//! | **Soft breaks** | A single newline becomes `<br />`. |
//! | **Autolink** | Bare `https://…`, `www.…` and e-mail addresses become links. |
//! | **Headings** | Levels 1–4 get a unique slug, `id`, `tabindex="-1"` and a leading `aria-hidden` `#` permalink. |
//! | **`[[toc]]`** | A paragraph holding only `[[toc]]` becomes the table of contents. |
//!
//! Raw HTML in the source passes through untouched. Content authors are
//! trusted: nothing is sanitized, so embedded `<script>`/`<style>` is the
//! author's responsibility.
//!
//! Rendering never fails. Constructs pulldown-cmark cannot parse come out as
//! literal text, so one sloppy document can't abort a build.

mod autolink;
pub mod toc;

pub use toc::TableOfContents;

use crate::slug::{SlugRegistry, slugify};
use maud::{PreEscaped, html};
use pulldown_cmark::{
    CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, TextMergeStream,
    html as md_html,
};

/// Heading levels that receive an id and a permalink anchor.
pub const ANCHOR_LEVELS: std::ops::RangeInclusive<u8> = 1..=4;

/// Paragraph text replaced by the rendered table of contents.
const TOC_MARKER: &str = "[[toc]]";

/// A heading extracted while rendering.
///
/// For anchored levels (1–4) `slug` is unique within the document. Deeper
/// headings carry the plain [`slugify`] result and get no anchor.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub slug: String,
}

/// Output of a full render.
#[derive(Debug, Clone)]
pub struct RenderedMarkdown {
    pub html: String,
    /// Every heading in document order.
    pub headings: Vec<Heading>,
}

impl RenderedMarkdown {
    pub fn toc(&self) -> TableOfContents {
        TableOfContents::from_headings(&self.headings)
    }
}

/// Renders fenced code blocks.
///
/// Highlighting is a separate concern; the renderer only hands over the info
/// string and the raw code.
pub trait FenceRenderer: Send + Sync {
    fn render(&self, info: &str, code: &str) -> String;
}

/// Default fence handling: the fence is emitted as escaped literal text.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiteralFences;

impl FenceRenderer for LiteralFences {
    fn render(&self, info: &str, code: &str) -> String {
        let mut lines = vec![format!("```{info}")];
        lines.extend(code.lines().map(str::to_string));
        lines.push("```".to_string());
        html! {
            p {
                @for (i, line) in lines.iter().enumerate() {
                    @if i > 0 { (PreEscaped("<br />\n")) }
                    (line)
                }
            }
        }
        .into_string()
    }
}

/// Markdown renderer configured the way the blog expects.
pub struct MarkdownRenderer {
    options: Options,
    fences: Box<dyn FenceRenderer>,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        Self {
            options,
            fences: Box::new(LiteralFences),
        }
    }

    /// Replace the fenced code block handler (e.g. with a syntax highlighter).
    pub fn with_fence_renderer(mut self, fences: impl FenceRenderer + 'static) -> Self {
        self.fences = Box::new(fences);
        self
    }

    /// Render a document body to HTML.
    pub fn render(&self, source: &str) -> RenderedMarkdown {
        let events = self.parse(source);
        let events = self.replace_code_blocks(events, false);
        let events = hard_breaks(events);
        let events = autolink::autolink(events);
        let headings = collect_headings(&events);
        let events = decorate_headings(events, &headings);
        let events = insert_toc(events, &headings);

        let mut html = String::with_capacity(source.len() * 3 / 2);
        md_html::push_html(&mut html, events.into_iter());
        RenderedMarkdown { html, headings }
    }

    /// Render Markdown without block-level markup.
    ///
    /// Only inline constructs (emphasis, links, code spans, raw inline HTML)
    /// produce tags. Block syntax is not recognised: list numbers, bullets,
    /// `#` and `>` markers stay in the output as text. Lines are separated by
    /// `<br />`.
    pub fn render_inline(&self, source: &str) -> String {
        let mut options = self.options;
        options.remove(Options::ENABLE_TABLES);
        let escaped = escape_block_starts(source);
        let events: Vec<Event<'_>> =
            TextMergeStream::new(Parser::new_ext(&escaped, options)).collect();
        let events = hard_breaks(events);
        let events = autolink::autolink(events);
        let events = flatten_blocks(events);

        let mut html = String::with_capacity(source.len());
        md_html::push_html(&mut html, events.into_iter());
        html.trim_end().to_string()
    }

    /// Headings of a document with their resolved slugs, without rendering.
    pub fn extract_headings(&self, source: &str) -> Vec<Heading> {
        let events = self.parse(source);
        let events = self.replace_code_blocks(events, true);
        collect_headings(&events)
    }

    fn parse<'a>(&self, source: &'a str) -> Vec<Event<'a>> {
        TextMergeStream::new(Parser::new_ext(source, self.options)).collect()
    }

    /// Swap code block events for literal text (or the fence renderer's HTML).
    fn replace_code_blocks<'a>(&self, events: Vec<Event<'a>>, literal_only: bool) -> Vec<Event<'a>> {
        let mut out = Vec::with_capacity(events.len());
        let mut block: Option<(CodeBlockKind<'a>, String)> = None;

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => block = Some((kind, String::new())),
                Event::End(TagEnd::CodeBlock) => {
                    let Some((kind, code)) = block.take() else {
                        continue;
                    };
                    match kind {
                        CodeBlockKind::Fenced(info) if !literal_only => {
                            out.push(Event::Html(self.fences.render(&info, &code).into()));
                        }
                        CodeBlockKind::Fenced(info) => {
                            let fenced = format!("```{info}\n{code}```");
                            push_literal_paragraph(&fenced, false, &mut out);
                        }
                        CodeBlockKind::Indented => {
                            push_literal_paragraph(&code, true, &mut out);
                        }
                    }
                }
                Event::Text(text) if block.is_some() => {
                    if let Some((_, code)) = block.as_mut() {
                        code.push_str(&text);
                    }
                }
                _ if block.is_some() => {}
                event => out.push(event),
            }
        }
        out
    }
}

/// Render with the default configuration.
pub fn render(source: &str) -> String {
    MarkdownRenderer::new().render(source).html
}

/// Inline-only render with the default configuration.
pub fn render_inline(source: &str) -> String {
    MarkdownRenderer::new().render_inline(source)
}

/// Headings with resolved slugs using the default configuration.
pub fn extract_headings(source: &str) -> Vec<Heading> {
    MarkdownRenderer::new().extract_headings(source)
}

fn push_literal_paragraph<'a>(text: &str, trim_indent: bool, out: &mut Vec<Event<'a>>) {
    out.push(Event::Start(Tag::Paragraph));
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            out.push(Event::HardBreak);
        }
        let line = if trim_indent { line.trim_start() } else { line };
        out.push(Event::Text(line.to_string().into()));
    }
    out.push(Event::End(TagEnd::Paragraph));
}

fn hard_breaks(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    events
        .into_iter()
        .map(|e| match e {
            Event::SoftBreak => Event::HardBreak,
            other => other,
        })
        .collect()
}

fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Walk heading events, collecting display text and assigning slugs.
fn collect_headings(events: &[Event<'_>]) -> Vec<Heading> {
    let mut registry = SlugRegistry::new();
    let mut headings = Vec::new();
    let mut current: Option<(u8, String)> = None;

    for event in events {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current = Some((heading_level_to_num(*level), String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, buf)) = current.as_mut() {
                    buf.push_str(text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some((_, buf)) = current.as_mut() {
                    buf.push(' ');
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, raw)) = current.take() {
                    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
                    let base = slugify(&text);
                    let slug = if ANCHOR_LEVELS.contains(&level) {
                        registry.claim(&base)
                    } else {
                        base
                    };
                    headings.push(Heading { level, text, slug });
                }
            }
            _ => {}
        }
    }
    headings
}

/// Give anchored headings their id and a leading permalink.
fn decorate_headings<'a>(events: Vec<Event<'a>>, headings: &[Heading]) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len() + headings.len() * 2);
    let mut remaining = headings.iter();

    for event in events {
        let Event::Start(Tag::Heading {
            level,
            id,
            classes,
            mut attrs,
        }) = event
        else {
            out.push(event);
            continue;
        };

        let heading = remaining.next();
        match heading {
            Some(h) if ANCHOR_LEVELS.contains(&h.level) => {
                attrs.push((CowStr::Borrowed("tabindex"), Some(CowStr::Borrowed("-1"))));
                out.push(Event::Start(Tag::Heading {
                    level,
                    id: Some(h.slug.clone().into()),
                    classes,
                    attrs,
                }));
                let anchor = html! {
                    a.header-anchor href=(format!("#{}", h.slug)) aria-hidden="true" { "#" }
                };
                out.push(Event::InlineHtml(format!("{} ", anchor.into_string()).into()));
            }
            _ => out.push(Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            })),
        }
    }
    out
}

/// Replace `[[toc]]` paragraphs with the rendered table of contents.
fn insert_toc<'a>(events: Vec<Event<'a>>, headings: &[Heading]) -> Vec<Event<'a>> {
    if !events.windows(3).any(is_toc_marker) {
        return events;
    }

    let toc_html = TableOfContents::from_headings(headings).to_html();
    let mut out = Vec::with_capacity(events.len());
    let mut i = 0;
    while i < events.len() {
        if i + 3 <= events.len() && is_toc_marker(&events[i..i + 3]) {
            out.push(Event::Html(format!("{toc_html}\n").into()));
            i += 3;
        } else {
            out.push(events[i].clone());
            i += 1;
        }
    }
    out
}

fn is_toc_marker(window: &[Event<'_>]) -> bool {
    matches!(
        window,
        [
            Event::Start(Tag::Paragraph),
            Event::Text(text),
            Event::End(TagEnd::Paragraph),
        ] if text.trim().eq_ignore_ascii_case(TOC_MARKER)
    )
}

fn is_inline_tag(tag: &Tag<'_>) -> bool {
    matches!(
        tag,
        Tag::Emphasis
            | Tag::Strong
            | Tag::Strikethrough
            | Tag::Link { .. }
            | Tag::Image { .. }
    )
}

fn is_inline_end(end: &TagEnd) -> bool {
    matches!(
        end,
        TagEnd::Emphasis
            | TagEnd::Strong
            | TagEnd::Strikethrough
            | TagEnd::Link
            | TagEnd::Image
    )
}

/// Backslash-escape whatever would open a block at the start of each line,
/// so the parser sees nothing but paragraph text.
///
/// Leading indentation is dropped; it would otherwise start indented code.
fn escape_block_starts(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + 16);
    for (i, line) in source.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let line = line.trim_start();
        let digits = line.bytes().take_while(u8::is_ascii_digit).count();
        let first = line.chars().next();
        match first {
            // Ordered list marker: escape the delimiter after the number.
            Some(_) if digits > 0 && matches!(line[digits..].chars().next(), Some('.' | ')')) => {
                out.push_str(&line[..digits]);
                out.push('\\');
                out.push_str(&line[digits..]);
            }
            // Fences: escape the whole run so no code span pairs up with it.
            Some(c @ ('`' | '~')) => {
                let run = line.chars().take_while(|&ch| ch == c).count();
                for _ in 0..run {
                    out.push('\\');
                    out.push(c);
                }
                out.push_str(&line[run..]);
            }
            Some('#' | '>' | '-' | '+' | '=' | '|') => {
                out.push('\\');
                out.push_str(line);
            }
            // `*`/`_` open emphasis too; only bullets and rules are escaped.
            Some(c @ ('*' | '_')) if is_bullet_or_rule(line, c) => {
                out.push('\\');
                out.push_str(line);
            }
            _ => out.push_str(line),
        }
    }
    out
}

fn is_bullet_or_rule(line: &str, marker: char) -> bool {
    let rest = &line[marker.len_utf8()..];
    rest.is_empty()
        || rest.starts_with(char::is_whitespace)
        || rest.chars().all(|c| c == marker || c.is_whitespace())
}

/// Strip block-level events, separating the blocks' content with hard breaks.
fn flatten_blocks(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len());
    let mut emitted = false;
    let mut pending_break = false;

    for event in events {
        match &event {
            Event::Start(tag) if !is_inline_tag(tag) => {
                if emitted {
                    pending_break = true;
                }
                continue;
            }
            Event::End(end) if !is_inline_end(end) => {
                if emitted {
                    pending_break = true;
                }
                continue;
            }
            Event::Rule => {
                if emitted {
                    pending_break = true;
                }
                continue;
            }
            _ => {}
        }
        if pending_break {
            out.push(Event::HardBreak);
            pending_break = false;
        }
        emitted = true;
        out.push(event);
    }
    out
}
