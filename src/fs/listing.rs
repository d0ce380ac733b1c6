//! HTML directory listings.

use std::path::Path;

use crate::fs::{is_hidden, is_readable};
use crate::fs::validate::INSECURE_CHARS;

/// Leading characters that keep an entry out of the listing.
const DISALLOWED_LEADING: [char; 3] = ['-', '.', '_'];

/// Whether an entry name may appear in a listing.
pub fn is_allowed_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with(DISALLOWED_LEADING) && !name.contains(INSECURE_CHARS)
}

/// Renders the visible entries of `dir` as an HTML page titled with `display`.
///
/// Entries are sorted by name. Only regular files and directories are shown.
/// Hidden, unreadable and disallowed names are skipped, as are names that are
/// not valid UTF-8. A directory that cannot be read renders with only the
/// parent link.
pub async fn render_listing(dir: &Path, display: &str) -> String {
    let names = visible_entries(dir).await;
    let title = escape_html(display);

    let mut page = String::with_capacity(256 + names.len() * 64);
    page.push_str("<!DOCTYPE html>\r\n");
    page.push_str(&format!(
        "<html><head><meta charset='utf-8' /><title>Listing of: {title}</title></head><body>\r\n"
    ));
    page.push_str(&format!("<h3>Listing of: {title}</h3>\r\n"));
    page.push_str("<ul><li><a href=\"../\">..</a></li>\r\n");

    for name in &names {
        let name = escape_html(name);
        page.push_str(&format!("<li><a href=\"{name}\">{name}</a></li>\r\n"));
    }

    page.push_str("</ul></body></html>\r\n");
    page
}

async fn visible_entries(dir: &Path) -> Vec<String> {
    let mut names = Vec::new();

    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return names;
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let Ok(meta) = tokio::fs::metadata(&path).await else {
            continue;
        };
        // Sockets, FIFOs and devices are never served, so never listed.
        if !(meta.is_file() || meta.is_dir()) {
            continue;
        }
        if is_hidden(&path, &meta) || !is_readable(&path).await {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if is_allowed_name(&name) {
            names.push(name);
        }
    }

    names.sort();
    names
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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
