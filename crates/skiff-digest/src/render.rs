//! Markdown rendering for the digest body.

use pulldown_cmark::{Options, Parser, html};

/// Render markdown to a plain HTML fragment.
///
/// No scripting, no embedded styles; headings, lists, and emphasis
/// come through as-is for the mail body.
pub fn render_markdown(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let parser = Parser::new_ext(content, options);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);

    html_output
}
