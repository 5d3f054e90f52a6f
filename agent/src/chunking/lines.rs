//! Line-oriented page splitting.

use super::Page;

/// Splits `text` into pages of whole lines, each at most `page_size` characters.
///
/// Lines keep their terminators, so concatenating the pages in order gives back
/// `text` exactly. A line longer than `page_size` becomes a page of its own and is
/// marked truncated instead of being cut.
#[must_use]
pub fn split_lines(text: &str, page_size: usize) -> Vec<Page> {
    let page_size = page_size.max(1);
    if text.is_empty() {
        return Vec::new();
    }
    if text.chars().count() <= page_size {
        return vec![Page {
            ordinal: 0,
            content: text.to_owned(),
            truncated: false,
        }];
    }

    let mut pages = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > page_size && !current.is_empty() {
            push_page(&mut pages, std::mem::take(&mut current), false);
            current_len = 0;
        }
        if line_len > page_size {
            push_page(&mut pages, line.to_owned(), true);
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        push_page(&mut pages, current, false);
    }
    pages
}

fn push_page(pages: &mut Vec<Page>, content: String, truncated: bool) {
    pages.push(Page {
        ordinal: pages.len(),
        content,
        truncated,
    });
}
