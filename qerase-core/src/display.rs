use std::path::Path;

pub const DISPLAY_WIDTH: usize = 40;

/// Shorten `text` to at most `max` characters by cutting out its middle.
pub fn truncate_middle(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_string();
    }
    let part = max.saturating_sub(3) / 2;
    let head: String = text.chars().take(part).collect();
    let tail: String = text.chars().skip(count - part).collect();
    format!("{}...{}", head, tail)
}

/// Path as shown in status and error events.
pub fn short_path(path: &Path) -> String {
    truncate_middle(&path.to_string_lossy(), DISPLAY_WIDTH)
}

pub fn human_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if size < 1024.0 {
            return format!("{:.2} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.2} PB", size)
}
