//! Node description extractor — SPEC_FULL §6.4.
//!
//! Scoped narrowly per SPEC_FULL §1/§9: the *interface* is in scope, the
//! general doc-comment-extraction feature is a named Non-goal. This covers
//! only a leading `/** ... */` or `//` block, optionally keyed by one of the
//! caller's tags (`@module`, `@packageDocumentation`).

const ELLIPSIS: &str = "...";

/// `(sourceText, limit, tags) -> description | None`, SPEC_FULL §6.4.
///
/// `limit == 0` disables descriptions entirely.
pub fn extract_description(source_text: &str, limit: usize, tags: &[String]) -> Option<String> {
    if limit == 0 {
        return None;
    }

    let block = leading_comment_block(source_text)?;
    let lines: Vec<&str> = block.lines().map(strip_comment_decoration).collect();

    let tagged = tags.iter().find_map(|tag| tagged_text(&lines, tag));
    let raw = tagged.unwrap_or_else(|| lines.join(" "));
    let raw = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    if raw.is_empty() {
        return None;
    }
    Some(truncate(&raw, limit))
}

/// The file's leading contiguous `/** ... */` block or `//` run, before the
/// first non-comment, non-blank line.
fn leading_comment_block(source_text: &str) -> Option<String> {
    let trimmed = source_text.trim_start();
    if let Some(rest) = trimmed.strip_prefix("/**") {
        let end = rest.find("*/")?;
        return Some(rest[..end].to_string());
    }
    if trimmed.starts_with("//") {
        let mut collected = Vec::new();
        for line in trimmed.lines() {
            let line = line.trim();
            if line.starts_with("//") {
                collected.push(line.trim_start_matches('/').trim());
            } else if line.is_empty() {
                continue;
            } else {
                break;
            }
        }
        if collected.is_empty() {
            return None;
        }
        return Some(collected.join("\n"));
    }
    None
}

fn strip_comment_decoration(line: &str) -> &str {
    line.trim().trim_start_matches('*').trim()
}

/// Find a tag line (`@module some text` or bare `@module`) and return the text
/// that follows it, continuing through subsequent non-empty, non-`@`-prefixed lines.
fn tagged_text(lines: &[&str], tag: &str) -> Option<String> {
    let idx = lines.iter().position(|line| line.starts_with(tag))?;
    let mut parts = Vec::new();
    let first_rest = lines[idx][tag.len()..].trim();
    if !first_rest.is_empty() {
        parts.push(first_rest.to_string());
    }
    for line in &lines[idx + 1..] {
        if line.is_empty() || line.starts_with('@') {
            break;
        }
        parts.push(line.to_string());
    }
    let joined = parts.join(" ");
    (!joined.is_empty()).then_some(joined)
}

/// Truncates to `limit` characters total, ending in the literal `"..."`
/// sentinel per SPEC_FULL §3 when truncation occurs.
fn truncate(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        return s.to_string();
    }
    let content_len = limit.saturating_sub(ELLIPSIS.len());
    let mut out: String = s.chars().take(content_len).collect();
    out.push_str(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_zero_disables_descriptions() {
        assert_eq!(extract_description("/** hello */", 0, &[]), None);
    }

    #[test]
    fn block_comment_without_tags_uses_whole_text() {
        let source = "/**\n * A tiny helper module.\n */\nexport const x = 1;";
        assert_eq!(extract_description(source, 160, &[]).as_deref(), Some("A tiny helper module."));
    }

    #[test]
    fn tagged_line_takes_priority() {
        let source = "/**\n * Some preamble.\n * @module widgets\n * Builds UI widgets.\n */\n";
        let tags = vec!["@module".to_string()];
        let desc = extract_description(source, 160, &tags).unwrap();
        assert!(desc.contains("widgets"));
        assert!(desc.contains("Builds UI widgets"));
    }

    #[test]
    fn long_description_is_truncated_with_ellipsis() {
        let long = "x".repeat(200);
        let source = format!("/** {long} */");
        let desc = extract_description(&source, 20, &[]).unwrap();
        assert_eq!(desc.chars().count(), 20);
        assert!(desc.ends_with("..."));
    }

    #[test]
    fn no_leading_comment_yields_none() {
        assert_eq!(extract_description("export const x = 1;", 160, &[]), None);
    }
}
