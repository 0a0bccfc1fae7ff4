//! Deterministic HTML serialization of a rendered tree
//!
//! Attributes and style declarations are written in sorted order and every
//! text or attribute value is escaped, so equal trees always serialize to
//! byte-identical HTML.

use crate::node::RenderNode;
use crate::styles::{inline_css, to_css};
use stencil_model::{PageSettings, Styles};

const VOID_TAGS: &[&str] = &["br", "hr", "img"];

const BLOCK_TAGS: &[&str] = &[
    "div", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "li", "ol", "p", "table",
    "tbody", "td", "th", "thead", "tr", "ul",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlOptions {
    /// One block-level element per line, indented
    pub pretty: bool,
    pub indent: String,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            indent: "  ".to_string(),
        }
    }
}

struct Context<'a> {
    options: &'a HtmlOptions,
    depth: usize,
    buffer: String,
}

impl<'a> Context<'a> {
    fn new(options: &'a HtmlOptions) -> Self {
        Self {
            options,
            depth: 0,
            buffer: String::new(),
        }
    }

    fn add(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn add_line(&mut self, text: &str) {
        if self.options.pretty {
            self.add_indent();
        }
        self.add(text);
        if self.options.pretty {
            self.add("\n");
        }
    }

    fn add_indent(&mut self) {
        for _ in 0..self.depth {
            self.buffer.push_str(&self.options.indent);
        }
    }

    fn indent(&mut self) {
        self.depth += 1;
    }

    fn dedent(&mut self) {
        if self.depth > 0 {
            self.depth -= 1;
        }
    }

    fn get_output(self) -> String {
        self.buffer
    }
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

/// Serialize a list of nodes
pub fn to_html(nodes: &[RenderNode], options: &HtmlOptions) -> String {
    let mut ctx = Context::new(options);
    for node in nodes {
        write_block(node, &mut ctx);
    }
    ctx.get_output()
}

/// Serialize one node without line breaks
pub fn node_to_html(node: &RenderNode) -> String {
    let mut out = String::new();
    write_inline(node, &mut out);
    out
}

/// Wrap serialized body content in a printable page document
pub fn full_page(
    title: &str,
    body: &[RenderNode],
    page_settings: &PageSettings,
    document_styles: &Styles,
    options: &HtmlOptions,
) -> String {
    let mut ctx = Context::new(options);
    let margins = &page_settings.margins;

    ctx.add_line("<!DOCTYPE html>");
    ctx.add_line("<html>");
    ctx.indent();

    ctx.add_line("<head>");
    ctx.indent();
    ctx.add_line("<meta charset=\"utf-8\">");
    ctx.add_line(&format!("<title>{}</title>", escape_text(title)));
    ctx.add_line("<style>");
    ctx.indent();
    ctx.add_line(&format!(
        "@page {{ size: {} {}; margin: {}mm {}mm {}mm {}mm; }}",
        page_settings.format.css_name(),
        page_settings.orientation.as_str(),
        margins.top,
        margins.right,
        margins.bottom,
        margins.left
    ));
    ctx.add_line(".stencil-error { color: #b00020; background: #fde7e9; }");
    ctx.dedent();
    ctx.add_line("</style>");
    ctx.dedent();
    ctx.add_line("</head>");

    let css = inline_css(&to_css(document_styles));
    if css.is_empty() {
        ctx.add_line("<body>");
    } else {
        ctx.add_line(&format!("<body style=\"{}\">", escape_attr(&css)));
    }
    ctx.indent();
    for node in body {
        write_block(node, &mut ctx);
    }
    ctx.dedent();
    ctx.add_line("</body>");

    ctx.dedent();
    ctx.add_line("</html>");
    ctx.get_output()
}

fn is_block_element(node: &RenderNode) -> bool {
    node.tag().is_some_and(|tag| BLOCK_TAGS.contains(&tag))
}

fn write_block(node: &RenderNode, ctx: &mut Context<'_>) {
    let breaks = ctx.options.pretty && node.children().iter().any(is_block_element);
    match node {
        RenderNode::Element { tag, children, .. } if breaks => {
            ctx.add_line(&open_tag(node));
            ctx.indent();
            for child in children {
                write_block(child, ctx);
            }
            ctx.dedent();
            ctx.add_line(&format!("</{}>", tag));
        }
        _ => ctx.add_line(&node_to_html(node)),
    }
}

fn open_tag(node: &RenderNode) -> String {
    let RenderNode::Element {
        tag,
        attributes,
        styles,
        ..
    } = node
    else {
        return String::new();
    };

    let mut out = format!("<{}", tag);
    for (key, value) in attributes {
        out.push_str(&format!(" {}=\"{}\"", key, escape_attr(value)));
    }
    if !styles.is_empty() {
        out.push_str(&format!(" style=\"{}\"", escape_attr(&inline_css(styles))));
    }
    out.push('>');
    out
}

fn write_inline(node: &RenderNode, out: &mut String) {
    match node {
        RenderNode::Text { content } => out.push_str(&escape_text(content)),
        RenderNode::Error {
            message,
            block_id,
            expression,
        } => {
            out.push_str(&format!(
                "<span class=\"stencil-error\" data-block-id=\"{}\" data-expression=\"{}\" title=\"{}\">{{{{{}}}}}</span>",
                escape_attr(block_id),
                escape_attr(expression),
                escape_attr(message),
                escape_text(expression)
            ));
        }
        RenderNode::Element { tag, children, .. } => {
            out.push_str(&open_tag(node));
            if VOID_TAGS.contains(&tag.as_str()) {
                return;
            }
            for child in children {
                write_inline(child, out);
            }
            out.push_str(&format!("</{}>", tag));
        }
    }
}
