use std::sync::LazyLock;

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use super::text::collapse_ws;

const DROPPED_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "iframe", "svg", "head", "meta", "link", "form",
    "noscript",
];
const DROPPED_IDS: &[&str] = &["cookie-law-info-bar"];
const DROPPED_CLASSES: &[&str] = &["cookie-banner"];

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

/// Strip non-content markup and return the collapsed body text.
pub fn reduce(html: &str) -> String {
    let doc = Html::parse_document(html);
    reduce_document(&doc)
}

pub fn reduce_document(doc: &Html) -> String {
    let mut parts = Vec::new();
    match doc.select(&BODY).next() {
        Some(body) => collect_text(body, &mut parts),
        None => collect_text(doc.root_element(), &mut parts),
    }
    collapse_ws(&parts.join(" "))
}

fn collect_text<'a>(el: ElementRef<'a>, out: &mut Vec<&'a str>) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push(text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if !is_dropped(child_el) {
                        collect_text(child_el, out);
                    }
                }
            }
            _ => {}
        }
    }
}

fn is_dropped(el: ElementRef) -> bool {
    let value = el.value();
    DROPPED_TAGS.contains(&value.name())
        || value.id().is_some_and(|id| DROPPED_IDS.contains(&id))
        || value.classes().any(|c| DROPPED_CLASSES.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_noise_elements() {
        let html = r#"<html><head><title>Obědy</title><style>p{}</style></head><body>
            <nav>Domů | Kontakt</nav>
            <script>var x = "tracking";</script>
            <div class="cookie-banner modal">Používáme cookies</div>
            <div id="cookie-law-info-bar">Souhlasím</div>
            <main><h1>Polední menu</h1><p>Guláš   s knedlíkem</p></main>
            <form><input value="x">Hledat</form>
            <footer>© 2026</footer></body></html>"#;
        assert_eq!(reduce(html), "Polední menu Guláš s knedlíkem");
    }

    #[test]
    fn table_cells_stay_separate() {
        let html = "<body><table><tr><td>1</td><td>Guláš</td><td>120&nbsp;Kč</td></tr></table></body>";
        assert_eq!(reduce(html), "1 Guláš 120 Kč");
    }

    #[test]
    fn deterministic() {
        let html = "<body><p>a</p><iframe src=x>b</iframe><svg><text>c</text></svg><p>d</p></body>";
        assert_eq!(reduce(html), reduce(html));
        assert_eq!(reduce(html), "a d");
    }
}
