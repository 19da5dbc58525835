use anyhow::{Context, Result};
use pulldown_cmark::{html, Options as CmarkOptions, Parser};

// the conversion is a pure bytes -> bytes function; the trait seam exists so
// the gate can be exercised with counting/failing stubs in tests
pub trait Renderer: Send + Sync {
    fn render(&self, source: &[u8]) -> Result<Vec<u8>>;
}

/// Markdown to HTML via pulldown-cmark.
pub struct MarkdownRenderer {
    options: CmarkOptions,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut options = CmarkOptions::empty();
        options.insert(CmarkOptions::ENABLE_STRIKETHROUGH);
        options.insert(CmarkOptions::ENABLE_TABLES);
        Self { options }
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, source: &[u8]) -> Result<Vec<u8>> {
        let markdown = std::str::from_utf8(source).context("markdown source is not valid utf-8")?;

        let parser = Parser::new_ext(markdown, self.options);
        let mut html_content = String::new();
        html::push_html(&mut html_content, parser);

        Ok(html_content.into_bytes())
    }
}
