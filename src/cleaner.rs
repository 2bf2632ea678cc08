const ROLE_MARKERS: [&str; 2] = ["Human:", "Assistant:"];

/// Tidies a complete (non-streamed) completion: trims every line, drops blank
/// lines and leaked role markers, and separates the rest with blank lines.
pub fn clean_article(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !ROLE_MARKERS.iter().any(|marker| line.starts_with(marker)))
        .collect::<Vec<_>>()
        .join("\n\n")
}
