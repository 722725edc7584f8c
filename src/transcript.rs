use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Speaker, Utterance};

static ROLE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"role:").expect("valid regex"));
static ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^role:\s*(bot|user)\s*message:\s*(.*)$").expect("valid regex")
});

/// Parse a flat transcript blob of the form
/// `role: bot message: ... role: user message: ...` into ordered utterances.
///
/// The blob has no delimiter other than the next `role:` token, so the text
/// is split immediately before each occurrence. Chunks that do not carry
/// both a known speaker and a message are dropped silently; a malformed
/// transcript degrades to fewer entries, never to an error.
pub fn parse(blob: &str) -> Vec<Utterance> {
    let starts: Vec<usize> = ROLE_TOKEN.find_iter(blob).map(|m| m.start()).collect();

    let mut utterances = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(blob.len());
        let chunk = &blob[start..end];

        let Some(captures) = ENTRY.captures(chunk) else {
            continue;
        };
        let speaker = match &captures[1] {
            "bot" => Speaker::Bot,
            _ => Speaker::User,
        };
        utterances.push(Utterance {
            speaker,
            content: captures[2].trim().to_string(),
        });
    }
    utterances
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_alternating_speakers() {
        let entries = parse("role: bot message: Hi. role: user message: Hello.");
        assert_eq!(
            entries,
            vec![
                Utterance {
                    speaker: Speaker::Bot,
                    content: "Hi.".to_string()
                },
                Utterance {
                    speaker: Speaker::User,
                    content: "Hello.".to_string()
                },
            ]
        );
    }

    #[test]
    fn no_role_token_means_no_entries() {
        assert!(parse("just some free text").is_empty());
        assert!(parse("").is_empty());
    }

    #[test]
    fn malformed_chunks_are_dropped() {
        // Missing message, unknown speaker, then a valid entry.
        let blob = "role: bot role: agent message: skipped role: user message: Still here.";
        let entries = parse(blob);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].speaker, Speaker::User);
        assert_eq!(entries[0].content, "Still here.");
    }

    #[test]
    fn multiline_messages_keep_inner_whitespace() {
        let blob = "role: bot message: First line.\nSecond line.  role: user message: Ok";
        let entries = parse(blob);
        assert_eq!(entries[0].content, "First line.\nSecond line.");
        assert_eq!(entries[1].content, "Ok");
    }

    #[test]
    fn leading_noise_before_first_role_is_ignored() {
        let entries = parse("transcript v2\nrole: bot message: Hi.");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content, "Hi.");
    }
}
