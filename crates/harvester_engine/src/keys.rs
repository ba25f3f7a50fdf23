use harvester_core::simplified_hostname_without_tld;
use sha2::{Digest, Sha256};

use crate::resource::Resource;

const MAX_SLUG_LEN: usize = 80;
const MAX_ID_TRIES: u32 = 16;

/// Stable identity of a resource for serialization: a readable slug and a
/// numeric id derived from the final URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKeys {
    slug: String,
    unique_id: u32,
    final_url: String,
}

impl ResourceKeys {
    /// `is_taken(id, try)` is asked about each candidate id in turn; the
    /// first one it rejects is used. After a bounded number of tries the last
    /// candidate is kept regardless.
    pub fn new(resource: &Resource, mut is_taken: impl FnMut(u32, u32) -> bool) -> Self {
        let final_url = resource
            .final_url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| resource.original_text().to_string());

        let mut attempt = 0;
        let mut unique_id = hashed_id(&final_url, attempt);
        while attempt + 1 < MAX_ID_TRIES && is_taken(unique_id, attempt) {
            attempt += 1;
            unique_id = hashed_id(&final_url, attempt);
        }

        Self {
            slug: slugify(&slug_source(resource)),
            unique_id,
            final_url,
        }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn unique_id(&self) -> u32 {
        self.unique_id
    }

    pub fn final_url(&self) -> &str {
        &self.final_url
    }
}

/// Page title from Open Graph, Twitter card or `<title>`, falling back to
/// the host and path of the final URL.
fn slug_source(resource: &Resource) -> String {
    let title = resource.content().and_then(|content| {
        content
            .open_graph_tag("title")
            .or_else(|| content.twitter_tag("title"))
            .or_else(|| content.title())
            .map(str::to_owned)
    });
    if let Some(title) = title {
        return title;
    }
    match resource.final_url() {
        Some(url) => format!("{} {}", simplified_hostname_without_tld(url), url.path()),
        None => resource.original_text().to_string(),
    }
}

/// Lower-case ASCII alphanumerics joined by single dashes.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len().min(MAX_SLUG_LEN));
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }
    slug.truncate(MAX_SLUG_LEN);
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

fn hashed_id(input: &str, attempt: u32) -> u32 {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    if attempt > 0 {
        hasher.update(attempt.to_be_bytes());
    }
    let digest = hasher.finalize();
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}
