//! Output rendering (spec.md §6): a small tag-bracketed intermediate
//! representation, rendered either as plain text with UTF-8 symbols
//! substituted, or as HTML with structural tags. Citations are collected
//! per method and expanded once at the end rather than inlined, so the
//! same justification reads the same whether or not HTML output is on.

/// One node of a justification document.
#[derive(Debug, Clone)]
pub enum Doc {
    /// The rewrite arrow between a rule's two sides.
    RuleArrow,
    /// A bound variable's display name.
    BoundVar(String),
    /// The lowercase-pi symbol used for product sums in polynomial proofs.
    Pi,
    /// Literal text, copied through verbatim.
    Text(String),
    /// A reference to a numbered citation, expanded at the end of the
    /// document rather than inline.
    Citation(String),
    /// A sequence of sub-documents, concatenated.
    Seq(Vec<Doc>),
}

impl Doc {
    pub fn text(s: impl Into<String>) -> Doc {
        Doc::Text(s.into())
    }

    pub fn seq(docs: Vec<Doc>) -> Doc {
        Doc::Seq(docs)
    }
}

/// Accumulates citation text per rendering pass, assigning each distinct
/// citation a stable number in first-seen order.
#[derive(Debug, Default)]
pub struct Citations {
    order: Vec<String>,
}

impl Citations {
    pub fn new() -> Self {
        Citations::default()
    }

    /// Records `text`, returning its 1-based citation number (reusing the
    /// existing number if this exact citation was already recorded).
    pub fn record(&mut self, text: impl Into<String>) -> usize {
        let text = text.into();
        if let Some(pos) = self.order.iter().position(|t| *t == text) {
            return pos + 1;
        }
        self.order.push(text);
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.order.iter().enumerate().map(|(i, t)| (i + 1, t.as_str()))
    }
}

/// Renders `doc` as plain text, substituting UTF-8 symbols for the
/// structural tags (`=>` for the rule arrow, `λ` is left to the caller's
/// text, `Π` for [`Doc::Pi`]) and appending any citations gathered along
/// the way, numbered.
pub fn render_plain(doc: &Doc, citations: &mut Citations) -> String {
    let mut out = String::new();
    render_plain_into(doc, citations, &mut out);
    out
}

fn render_plain_into(doc: &Doc, citations: &mut Citations, out: &mut String) {
    match doc {
        Doc::RuleArrow => out.push_str(" => "),
        Doc::BoundVar(name) => out.push_str(name),
        Doc::Pi => out.push('Π'),
        Doc::Text(s) => out.push_str(s),
        Doc::Citation(text) => {
            let n = citations.record(text.clone());
            out.push_str(&format!("[{n}]"));
        }
        Doc::Seq(docs) => {
            for d in docs {
                render_plain_into(d, citations, out);
            }
        }
    }
}

/// Renders `doc` as HTML, wrapping each structural tag in its matching
/// element (`<span class="rulearrow">...`, `<var>...</var>`, `<pi/>`) and
/// escaping literal text.
pub fn render_html(doc: &Doc, citations: &mut Citations) -> String {
    let mut out = String::new();
    render_html_into(doc, citations, &mut out);
    out
}

fn render_html_into(doc: &Doc, citations: &mut Citations, out: &mut String) {
    match doc {
        Doc::RuleArrow => out.push_str("<span class=\"rulearrow\">&rArr;</span>"),
        Doc::BoundVar(name) => {
            out.push_str("<var>");
            out.push_str(&escape_html(name));
            out.push_str("</var>");
        }
        Doc::Pi => out.push_str("<pi/>"),
        Doc::Text(s) => out.push_str(&escape_html(s)),
        Doc::Citation(text) => {
            let n = citations.record(text.clone());
            out.push_str(&format!("<a href=\"#cite-{n}\">[{n}]</a>"));
        }
        Doc::Seq(docs) => {
            for d in docs {
                render_html_into(d, citations, out);
            }
        }
    }
}

/// Renders the trailing citation list, numbered to match the references
/// expanded inline during rendering.
pub fn render_citations_plain(citations: &Citations) -> String {
    citations.iter().map(|(n, text)| format!("[{n}] {text}")).collect::<Vec<_>>().join("\n")
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_render_substitutes_arrow() {
        let doc = Doc::seq(vec![Doc::text("f(x)"), Doc::RuleArrow, Doc::text("g(x)")]);
        let mut citations = Citations::new();
        assert_eq!(render_plain(&doc, &mut citations), "f(x) => g(x)");
    }

    #[test]
    fn citations_are_numbered_in_first_seen_order_and_deduplicated() {
        let doc = Doc::seq(vec![
            Doc::Citation("HORPO precedence".to_string()),
            Doc::Citation("polynomial interpretation".to_string()),
            Doc::Citation("HORPO precedence".to_string()),
        ]);
        let mut citations = Citations::new();
        let rendered = render_plain(&doc, &mut citations);
        assert_eq!(rendered, "[1][2][1]");
    }

    #[test]
    fn html_render_escapes_text() {
        let doc = Doc::text("a < b & c");
        let mut citations = Citations::new();
        assert_eq!(render_html(&doc, &mut citations), "a &lt; b &amp; c");
    }
}
