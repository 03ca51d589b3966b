use url::Url;

/// One page to visit: a URL plus the filename its snapshot should be saved
/// under. Identity is the item's position in the run's ordered list, not its
/// content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub url: String,
    pub filename: String,
}

/// Parse user-supplied text into work items, one per non-empty line.
///
/// A line is either `<filename> <url>` (two whitespace-separated fields) or a
/// bare URL, in which case the filename is inferred from the URL's host.
pub fn parse_work_items(raw: &str) -> Vec<WorkItem> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> WorkItem {
    let mut fields = line.split_whitespace();
    let first = fields.next().unwrap_or(line);
    match fields.next() {
        Some(url) => WorkItem {
            url: url.to_string(),
            filename: first.to_string(),
        },
        None => WorkItem {
            url: first.to_string(),
            filename: filename_for_url(first),
        },
    }
}

/// Windows-safe filename inferred from a URL's host: `{host}.html`.
///
/// Falls back to sanitizing the whole input when the URL does not parse or
/// has no host, so every item always carries a usable filename.
pub fn filename_for_url(url: &str) -> String {
    let stem = match Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => sanitize_component(host),
            None => sanitize_component(url),
        },
        Err(_) => sanitize_component(url),
    };
    format!("{stem}.html")
}

fn sanitize_component(input: &str) -> String {
    let mut cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]).to_string();
    if cleaned.is_empty() {
        cleaned = "untitled".to_string();
    }
    // Collapse multiple underscores
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }
    let mut final_name = compacted;
    if final_name.len() > 80 {
        final_name.truncate(80);
    }
    if is_reserved_windows_name(&final_name) {
        final_name.push('_');
    }
    final_name
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
