// src/extract/dom.rs
//
// Small DOM helpers shared by the panel, pager and record logic. Everything
// here works on a parsed snapshot; the bridge back to the live page is
// `css_path`, which names an element by a structural selector the browser
// can resolve.
use scraper::ElementRef;

/// Visible text of an element's subtree with whitespace collapsed, close to
/// what the browser reports as innerText for the markup we deal with.
pub fn collect_text(el: ElementRef) -> String {
    let raw: String = el.text().collect::<Vec<_>>().join(" ");
    normalize_ws(&raw)
}

pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Elements under `root` in document order, excluding `root` itself.
pub fn descendant_elements<'a>(root: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    root.descendants().skip(1).filter_map(ElementRef::wrap)
}

/// Closest ancestor whose tag is one of `tags`.
pub fn nearest_ancestor<'a>(el: ElementRef<'a>, tags: &[&str]) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| tags.contains(&a.value().name()))
}

/// Static visibility check: an element counts as hidden when it or any
/// ancestor carries `hidden`, `aria-hidden="true"`, or an inline style with
/// `display:none` / `visibility:hidden`. Computed styles are out of reach in
/// a snapshot, but the dashboard hides things through exactly these attrs.
pub fn is_visible(el: ElementRef) -> bool {
    if element_hidden(el) {
        return false;
    }
    !el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(element_hidden)
}

fn element_hidden(el: ElementRef) -> bool {
    let v = el.value();
    if v.attr("hidden").is_some() {
        return true;
    }
    if v.attr("aria-hidden") == Some("true") {
        return true;
    }
    if let Some(style) = v.attr("style") {
        let compact: String = style.chars().filter(|c| !c.is_whitespace()).collect();
        let compact = compact.to_ascii_lowercase();
        if compact.contains("display:none") || compact.contains("visibility:hidden") {
            return true;
        }
    }
    false
}

/// True when `el` is the last element child of its parent.
pub fn is_last_element_child(el: ElementRef) -> bool {
    match el.parent().and_then(ElementRef::wrap) {
        Some(parent) => parent
            .children()
            .filter_map(ElementRef::wrap)
            .last()
            .map(|last| last.id() == el.id())
            .unwrap_or(false),
        None => false,
    }
}

/// True when the subtree contains an element with the given tag name.
pub fn has_descendant_tag(el: ElementRef, tag: &str) -> bool {
    descendant_elements(el).any(|d| d.value().name() == tag)
}

/// Builds a structural selector ("html > body > div:nth-child(2) > ...")
/// that uniquely names `el`, so an element found in a snapshot can be
/// clicked on the live page. Only tag names and child positions go into the
/// path; the dashboard's class names are generated and unstable.
pub fn css_path(el: ElementRef) -> String {
    let mut segments = Vec::new();
    let mut current = el;
    loop {
        let name = current.value().name().to_string();
        match current.parent().and_then(ElementRef::wrap) {
            Some(parent) => {
                let position = parent
                    .children()
                    .filter_map(ElementRef::wrap)
                    .position(|c| c.id() == current.id())
                    .unwrap_or(0);
                segments.push(format!("{}:nth-child({})", name, position + 1));
                current = parent;
            }
            None => {
                segments.push(name);
                break;
            }
        }
    }
    segments.reverse();
    segments.join(" > ")
}
