//! HTML span document built from lexed source.

use super::lexer::{lex_java, Span};

/// Escapes text for inclusion in an HTML body or attribute.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Highlighted source as a list of classed spans
///
/// The rasterizer consumes the spans directly; [`HtmlDocument::to_html`]
/// serializes the same document for inspection or external styling.
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    spans: Vec<Span>,
}

impl HtmlDocument {
    pub fn from_source(source: &str) -> Self {
        Self {
            spans: lex_java(source),
        }
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn to_html(&self) -> String {
        let mut html = String::from("<div class=\"highlight\"><pre>");
        for span in &self.spans {
            match span.kind.css_class() {
                Some(class) => {
                    html.push_str(&format!(
                        "<span class=\"{class}\">{}</span>",
                        escape(&span.text)
                    ));
                }
                None => html.push_str(&escape(&span.text)),
            }
        }
        html.push_str("</pre></div>\n");
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_covers_markup_characters() {
        assert_eq!(escape("a < b && c > 'd'"), "a &lt; b &amp;&amp; c &gt; &#39;d&#39;");
        assert_eq!(escape(r#"s = "x""#), "s = &quot;x&quot;");
    }

    #[test]
    fn test_document_wraps_spans() {
        let html = HtmlDocument::from_source("if (x) {}").to_html();
        assert!(html.starts_with("<div class=\"highlight\"><pre>"));
        assert!(html.contains("<span class=\"k\">if</span>"));
        assert!(html.ends_with("</pre></div>\n"));
    }

    #[test]
    fn test_identifiers_stay_unwrapped() {
        let html = HtmlDocument::from_source("foo").to_html();
        assert!(html.contains(">foo<"));
        assert!(!html.contains("<span>foo"));
    }

    #[test]
    fn test_string_content_is_escaped() {
        let html = HtmlDocument::from_source(r#"s = "<b>";"#).to_html();
        assert!(html.contains("&lt;b&gt;"));
        assert!(!html.contains("<b>"));
    }
}
