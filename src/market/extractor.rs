// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTML to text for ingested documents
//!
//! Filings are long HTML documents. They are split into sections at heading
//! elements, then packed into chunks of bounded size that never cross a heading
//! unless a single section is itself too long.

use scraper::{ElementRef, Html, Selector};

/// Text under one heading
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub heading: Option<String>,
    pub text: String,
}

/// Flatten an HTML fragment or document to whitespace-normalized text
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    clean_text(&fragment.root_element().text().collect::<String>())
}

/// Split a document body into heading-delimited sections
///
/// Block-level elements are visited in document order. Headings (`h1`-`h6`) open
/// a new section; text of other blocks is appended to the current one. A block
/// with block children contributes only its own inline text, so nothing is
/// collected twice.
pub fn extract_sections(html: &str) -> Vec<Section> {
    let document = Html::parse_document(html);
    let Ok(blocks) = Selector::parse("h1, h2, h3, h4, h5, h6, p, li, td, div") else {
        return Vec::new();
    };

    let mut sections = Vec::new();
    let mut current = Section {
        heading: None,
        text: String::new(),
    };

    for element in document.select(&blocks) {
        let name = element.value().name();
        let is_heading = matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6");

        if is_noise(&element) {
            continue;
        }

        let text = if !is_heading && has_block_child(&element) {
            inline_text(&element)
        } else {
            clean_text(&element.text().collect::<String>())
        };
        if text.is_empty() {
            continue;
        }

        if is_heading {
            if !current.text.is_empty() || current.heading.is_some() {
                sections.push(current);
            }
            current = Section {
                heading: Some(text),
                text: String::new(),
            };
        } else {
            if !current.text.is_empty() {
                current.text.push(' ');
            }
            current.text.push_str(&text);
        }
    }

    if !current.text.is_empty() || current.heading.is_some() {
        sections.push(current);
    }

    sections.retain(|s| !s.text.is_empty());
    sections
}

/// Pack sections into chunks of at most `max_chars`
///
/// Sections are merged while they fit. Each chunk starts with the heading of its
/// first section. A section longer than the limit is split at word boundaries.
pub fn chunk_by_title(sections: &[Section], max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for section in sections {
        let rendered = match &section.heading {
            Some(heading) => format!("{}\n{}", heading, section.text),
            None => section.text.clone(),
        };

        if rendered.len() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            chunks.extend(split_words(&rendered, max_chars));
            continue;
        }

        if !current.is_empty() && current.len() + 2 + rendered.len() > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(&rendered);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "div" | "li" | "td" | "table" | "ul" | "ol" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
    )
}

fn has_block_child(element: &ElementRef) -> bool {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .any(|child| is_block(child.value().name()))
}

/// Direct text nodes and inline children, leaving block children to be visited
fn inline_text(element: &ElementRef) -> String {
    let mut text = String::new();
    for child in element.children() {
        if let Some(node) = child.value().as_text() {
            text.push_str(node);
            text.push(' ');
        } else if let Some(inline) = ElementRef::wrap(child) {
            if !is_block(inline.value().name()) {
                text.extend(inline.text());
                text.push(' ');
            }
        }
    }
    clean_text(&text)
}

fn is_noise(element: &ElementRef) -> bool {
    element.ancestors().filter_map(ElementRef::wrap).any(|a| {
        matches!(
            a.value().name(),
            "script" | "style" | "nav" | "footer" | "header"
        )
    })
}

fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn split_words(text: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > max_chars {
            pieces.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
