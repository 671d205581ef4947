/// Locale every chain ends with.
pub const ROOT_LOCALE: &str = "en";

/// Fallback chain for a locale, most specific first, always ending in
/// [`ROOT_LOCALE`]. `es-AR` resolves to `["es-ar", "es", "en"]`.
pub fn resolve_locale_chain(locale: &str) -> Vec<String> {
    let mut chain = subtag_chain(locale);
    if !chain.iter().any(|l| l == ROOT_LOCALE) {
        chain.push(ROOT_LOCALE.to_string());
    }
    chain
}

fn subtag_chain(locale: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = locale.trim().to_lowercase().replace('_', "-");
    while !current.is_empty() {
        chain.push(current.clone());
        match current.rfind('-') {
            Some(pos) => current.truncate(pos),
            None => break,
        }
    }
    chain
}

/// Choose a locale from an `Accept-Language` header value.
///
/// Language ranges are tried by descending quality; each range walks its own
/// fallback chain (excluding the root) before the next range is considered.
/// Returns `None` when nothing matches, leaving the default to the caller.
pub fn negotiate_locale<'a, I>(accept_language: &str, available: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let available: Vec<String> = available.into_iter().map(str::to_lowercase).collect();

    let mut ranges: Vec<(String, f32)> = accept_language
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.trim().split(';');
            let tag = pieces.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }
            let quality = pieces
                .find_map(|p| p.trim().strip_prefix("q="))
                .and_then(|q| q.parse::<f32>().ok())
                .unwrap_or(1.0);
            (quality > 0.0).then(|| (tag.to_string(), quality))
        })
        .collect();
    // stable sort keeps header order among equal weights
    ranges.sort_by(|a, b| b.1.total_cmp(&a.1));

    ranges.iter().find_map(|(tag, _)| {
        subtag_chain(tag)
            .into_iter()
            .find(|candidate| available.contains(candidate))
    })
}
