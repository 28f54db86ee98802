//! URL cleanup for captured image links.
//!
//! Storefront and tag payloads carry full URLs with a resize directive
//! (`@300w_300h_1e_1c`) appended; item-group payloads carry an opaque content
//! hash that has to be expanded into a CDN URL.

use once_cell::sync::Lazy;
use regex::Regex;

static SIZE_PARAMS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@\d+w_\d+h_\d+e_\d+c").expect("valid resize pattern"));

/// Minimum hash length: one directory char, two directory chars, a filename
const MIN_HASH_LEN: usize = 6;

/// Remove every resize directive from an image URL to get the original image
pub fn remove_size_params(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    SIZE_PARAMS.replace_all(url, "").into_owned()
}

/// Drop the query string (everything from the first `?`)
pub fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// Expand a content hash into `https://{host}/{d1}/{d2}/{file}.{ext}`.
///
/// Returns an empty string for hashes shorter than six characters.
pub fn hash_to_url(hash: &str, cdn_host: &str) -> String {
    let chars: Vec<char> = hash.chars().collect();
    if chars.len() < MIN_HASH_LEN {
        return String::new();
    }

    let dir1: String = chars[..1].iter().collect();
    let dir2: String = chars[1..3].iter().collect();
    let file_name: String = chars[3..].iter().collect();

    format!(
        "https://{}/{}/{}/{}.{}",
        cdn_host,
        dir1,
        dir2,
        file_name,
        sniff_extension(&file_name)
    )
}

/// `jpeg` is deliberately not recognised; it falls through to `jpg`.
fn sniff_extension(file_name: &str) -> &'static str {
    let lower = file_name.to_lowercase();
    ["png", "gif", "webp"]
        .into_iter()
        .find(|ext| lower.contains(ext))
        .unwrap_or("jpg")
}

/// Replace characters that are not allowed in file names with `_`
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect()
}
