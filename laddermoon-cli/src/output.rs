//! User-facing messages

const PREFIX: &str = "[LadderMoon]";

pub fn print_info(msg: &str) {
    println!("{} {}", PREFIX, msg);
}

pub fn print_success(msg: &str) {
    println!("{} {}", PREFIX, msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} Error: {}", PREFIX, msg);
}

/// First seven characters of a commit id
pub fn short_commit(commit: &str) -> &str {
    commit.get(..7).unwrap_or(commit)
}

/// Shorten `s` to at most `max` characters, marking the cut with `...`
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
