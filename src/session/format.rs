//! Content normalization applied before generated text reaches the editor.

/// Normalize accumulated file content for editor display.
///
/// All line terminators become `\n`, trailing whitespace is stripped from
/// every line, and non-empty output ends with exactly one newline.
/// Idempotent; never touches anything but line-end whitespace and
/// terminator style.
pub fn normalize_content(content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }

    let unified = content.replace("\r\n", "\n").replace('\r', "\n");
    let mut normalized = unified
        .split('\n')
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");

    while normalized.ends_with('\n') {
        normalized.pop();
    }
    if normalized.is_empty() {
        return String::new();
    }
    normalized.push('\n');
    normalized
}
