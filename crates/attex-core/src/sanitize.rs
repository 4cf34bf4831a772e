//! Filesystem-safe filename derivation.
//!
//! Attachment names come straight from user input on the remote side and can
//! contain anything. The rules differ by target filesystem, so the strategy
//! is picked once at startup and threaded through the download tasks.

/// Filename sanitation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeMode {
    /// Windows-style rules: whitelist alphabet, no reserved device names.
    Restrictive,
    /// Unix-style rules: drop a small denylist of shell/path characters.
    Permissive,
}

/// Reserved device names that shadow real files on Windows, bare or with
/// any extension (`con`, `con.txt`, ...).
fn is_reserved(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name).to_ascii_lowercase();
    match stem.as_str() {
        "aux" | "con" | "prn" => true,
        _ => {
            stem.len() == 4
                && (stem.starts_with("com") || stem.starts_with("lpt"))
                && matches!(stem.as_bytes()[3], b'1'..=b'9')
        }
    }
}

impl SanitizeMode {
    /// Pick the strategy for the filesystem this process writes to.
    pub fn for_platform() -> Self {
        if cfg!(windows) {
            Self::Restrictive
        } else {
            Self::Permissive
        }
    }

    /// Turn a raw attachment name into a safe filename.
    ///
    /// Never returns an empty string, never lets a path separator or a
    /// dot-only name through, and is idempotent.
    pub fn sanitize(self, raw: &str) -> String {
        match self {
            Self::Restrictive => sanitize_restrictive(raw),
            Self::Permissive => sanitize_permissive(raw),
        }
    }
}

/// Collapse every run of disallowed characters to a single `_`, trim
/// leading/trailing dots and spaces, then guard reserved device names.
fn sanitize_restrictive(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    let mut in_bad_run = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ' ') {
            cleaned.push(c);
            in_bad_run = false;
        } else if !in_bad_run {
            cleaned.push('_');
            in_bad_run = true;
        }
    }

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == ' ');
    let mut name = if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    };
    if is_reserved(&name) {
        name.insert(0, '_');
    }
    name
}

/// Drop the denylisted characters without substitution. `/` and `\` are in
/// the denylist, so no path separator survives.
fn sanitize_permissive(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ';' | ':' | '!' | '*' | '/' | '\\'))
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        return "_".to_string();
    }
    cleaned
}
