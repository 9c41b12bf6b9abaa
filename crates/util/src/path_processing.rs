use std::path::PathBuf;

use dirs_next::home_dir;

/// Resolves a user-supplied path, expanding a leading `~` to the home directory.
///
/// Only a bare `~` or a `~/` (`~\` on Windows) prefix is expanded; `~user`
/// forms are taken literally. Without a home directory the trimmed input is
/// returned as is.
pub fn expand_tilde(path: &str) -> PathBuf {
    let path = path.trim();
    let Some(after_tilde) = path.strip_prefix('~') else {
        return PathBuf::from(path);
    };
    let relative = match after_tilde.chars().next() {
        None => "",
        Some('/' | '\\') => &after_tilde[1..],
        Some(_) => return PathBuf::from(path),
    };

    match home_dir() {
        Some(home) if relative.is_empty() => home,
        Some(home) => home.join(relative),
        None => PathBuf::from(path),
    }
}
