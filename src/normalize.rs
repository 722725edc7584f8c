use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::{CallRecord, CallStatus, LanguageMetrics, ScoreNarratives, Scores};

/// Display format of persisted call timestamps ("Jan 8, 2025, 6:33 PM").
const CALL_DATE_FORMAT: &str = "%b %d, %Y, %I:%M %p";

const DEFAULT_BOT_NAME: &str = "Real Estate Coach";
const DEFAULT_AVATAR: &str = "/placeholder.svg";
const DEFAULT_USER_NAME: &str = "You";
const DEFAULT_USER_TALK_PERCENTAGE: f64 = 46.0;
const DEFAULT_BOT_TALK_PERCENTAGE: f64 = 54.0;
const PENDING_DURATION_LABEL: &str = "Pending...";

/// A raw persisted row, as it comes back from the store or an upstream JSON
/// payload. Everything is optional; numeric fields tolerate numeric strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCallRow {
    pub id: Option<i64>,
    pub call_number: Option<i64>,
    pub member_id: Option<String>,
    pub team_id: Option<String>,
    pub session_id: Option<String>,
    pub status: Option<String>,

    pub bot_name: Option<String>,
    pub bot_picture: Option<String>,
    pub user_name: Option<String>,
    pub user_picture: Option<String>,

    #[serde(deserialize_with = "lenient_f64")]
    pub average_score: Option<f64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub engagement_score: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub objection_handling_score: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub information_gathering_score: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub program_explanation_score: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub closing_skills_score: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub effectiveness_score: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub notes_score: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub listening_skills_score: Option<i64>,

    pub call_date: Option<String>,
    pub call_length: Option<String>,

    pub engagement_text: Option<String>,
    pub objection_handling_text: Option<String>,
    pub information_gathering_text: Option<String>,
    pub program_explanation_text: Option<String>,
    pub closing_skills_text: Option<String>,
    pub effectiveness_text: Option<String>,

    pub power_moment: Option<String>,
    pub key_wins: Option<String>,
    pub areas_for_growth: Option<String>,
    pub call_notes: Option<String>,
    pub managers_feedback: Option<String>,
    pub call_recording: Option<String>,
    pub call_transcript: Option<String>,

    #[serde(deserialize_with = "lenient_f64")]
    pub user_talk_percentage: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub bot_talk_percentage: Option<f64>,
    pub monologues_time: Option<String>,
    pub response_time: Option<String>,
    #[serde(deserialize_with = "lenient_i64")]
    pub turn_switches: Option<i64>,
    pub most_used_phrases: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub speaking_pace: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub average_sentence_length: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub filler_words_percentage: Option<f64>,
    pub filler_words_used: Option<String>,
    pub listening_skills_analysis: Option<String>,
}

/// Convert a raw row into the canonical record shape. Pure and infallible:
/// anything malformed falls back to its documented default so that partially
/// populated pending rows still render.
pub fn normalize(raw: RawCallRow) -> CallRecord {
    let timestamp = raw.call_date.as_deref().and_then(parse_call_date);
    let date_label = match raw.call_date {
        Some(ref label) if !label.trim().is_empty() => label.clone(),
        _ => Utc::now().format(CALL_DATE_FORMAT).to_string(),
    };

    let duration_seconds = raw.call_length.as_deref().and_then(leading_f64);
    let duration_label = match raw.call_length {
        Some(ref label) if !label.trim().is_empty() => label.clone(),
        _ => PENDING_DURATION_LABEL.to_string(),
    };

    let status = match raw.status.as_deref() {
        Some("completed") => CallStatus::Completed,
        Some("pending") => CallStatus::Pending,
        _ => CallStatus::Empty,
    };

    CallRecord {
        id: raw.id.unwrap_or(0),
        call_number: raw.call_number.unwrap_or(0),
        member_id: raw.member_id.unwrap_or_default(),
        team_id: raw.team_id.unwrap_or_default(),
        session_id: raw.session_id.unwrap_or_default(),
        bot_name: non_empty_or(raw.bot_name, DEFAULT_BOT_NAME),
        bot_picture: non_empty_or(raw.bot_picture, DEFAULT_AVATAR),
        user_name: non_empty_or(raw.user_name, DEFAULT_USER_NAME),
        user_picture: non_empty_or(raw.user_picture, DEFAULT_AVATAR),
        timestamp,
        date_label,
        duration_label,
        duration_seconds,
        status,
        scores: Scores {
            engagement: clamp_score(raw.engagement_score),
            objection_handling: clamp_score(raw.objection_handling_score),
            information_gathering: clamp_score(raw.information_gathering_score),
            program_explanation: clamp_score(raw.program_explanation_score),
            closing_skills: clamp_score(raw.closing_skills_score),
            effectiveness: clamp_score(raw.effectiveness_score),
        },
        stored_average: raw.average_score,
        narratives: ScoreNarratives {
            engagement_text: raw.engagement_text,
            objection_handling_text: raw.objection_handling_text,
            information_gathering_text: raw.information_gathering_text,
            program_explanation_text: raw.program_explanation_text,
            closing_skills_text: raw.closing_skills_text,
            effectiveness_text: raw.effectiveness_text,
        },
        power_moment: raw.power_moment,
        key_wins: raw.key_wins,
        areas_for_growth: raw.areas_for_growth,
        call_notes: raw.call_notes,
        managers_feedback: raw.managers_feedback,
        call_recording: raw.call_recording,
        call_transcript: raw.call_transcript,
        notes_score: raw.notes_score.unwrap_or(0),
        language: LanguageMetrics {
            user_talk_percentage: raw
                .user_talk_percentage
                .unwrap_or(DEFAULT_USER_TALK_PERCENTAGE),
            bot_talk_percentage: raw
                .bot_talk_percentage
                .unwrap_or(DEFAULT_BOT_TALK_PERCENTAGE),
            monologues_time: non_empty_or(raw.monologues_time, "0s"),
            response_time: non_empty_or(raw.response_time, "0s"),
            turn_switches: raw.turn_switches.unwrap_or(0),
            speaking_pace: raw.speaking_pace.unwrap_or(0.0),
            average_sentence_length: raw.average_sentence_length.unwrap_or(0.0),
            filler_words_percentage: raw.filler_words_percentage.unwrap_or(0.0),
            filler_words_used: raw.filler_words_used.unwrap_or_default(),
            most_used_phrases: raw.most_used_phrases.unwrap_or_default(),
            listening_skills_score: raw.listening_skills_score.unwrap_or(0),
            listening_skills_analysis: raw.listening_skills_analysis.unwrap_or_default(),
        },
    }
}

/// Parse the persisted locale timestamp format. Anything that does not match
/// exactly is treated as missing rather than guessed at.
pub fn parse_call_date(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), CALL_DATE_FORMAT).ok()
}

/// Longest numeric prefix of a string, e.g. "11 seconds" -> 11.0. Mirrors
/// the leniency of JavaScript's parseFloat on labels like call lengths.
pub fn leading_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    let mut end = 0;
    for (idx, ch) in trimmed.char_indices() {
        let ok = ch.is_ascii_digit()
            || ch == '.'
            || (idx == 0 && (ch == '-' || ch == '+'));
        if !ok {
            break;
        }
        end = idx + ch.len_utf8();
    }
    trimmed[..end].parse::<f64>().ok()
}

fn non_empty_or(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => fallback.to_string(),
    }
}

fn clamp_score(value: Option<i64>) -> i64 {
    value.unwrap_or(0).clamp(0, 100)
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_f64))
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_f64).map(|v| v.round() as i64))
}

fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_f64(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_locale_timestamps() {
        let ts = parse_call_date("Jan 8, 2025, 6:33 PM").unwrap();
        assert_eq!(ts.format("%Y-%m-%d %H:%M").to_string(), "2025-01-08 18:33");

        let padded = parse_call_date("Dec 27, 2024, 10:45 AM").unwrap();
        assert_eq!(
            padded.format("%Y-%m-%d %H:%M").to_string(),
            "2024-12-27 10:45"
        );
    }

    #[test]
    fn rejects_unparseable_timestamps() {
        assert!(parse_call_date("2025-01-08T18:33:00Z").is_none());
        assert!(parse_call_date("tomorrow").is_none());
        assert!(parse_call_date("").is_none());
    }

    #[test]
    fn defaults_identity_fields() {
        let record = normalize(RawCallRow::default());
        assert_eq!(record.bot_name, "Real Estate Coach");
        assert_eq!(record.bot_picture, "/placeholder.svg");
        assert_eq!(record.user_name, "You");
        assert_eq!(record.duration_label, "Pending...");
        assert_eq!(record.status, CallStatus::Empty);
        assert_eq!(record.scores.total(), 0);
        assert_eq!(record.language.user_talk_percentage, 46.0);
        assert_eq!(record.language.bot_talk_percentage, 54.0);
    }

    #[test]
    fn coerces_numeric_strings() {
        let raw: RawCallRow = serde_json::from_value(json!({
            "session_id": "s-1",
            "status": "completed",
            "engagement_score": "88",
            "user_talk_percentage": "46.5",
            "turn_switches": 12,
            "speaking_pace": "not a number"
        }))
        .unwrap();

        let record = normalize(raw);
        assert_eq!(record.scores.engagement, 88);
        assert_eq!(record.language.user_talk_percentage, 46.5);
        assert_eq!(record.language.turn_switches, 12);
        assert_eq!(record.language.speaking_pace, 0.0);
    }

    #[test]
    fn missing_timestamp_still_normalizes() {
        let raw: RawCallRow = serde_json::from_value(serde_json::json!({
            "session_id": "s-2",
            "status": "pending"
        }))
        .unwrap();

        let record = normalize(raw);
        assert!(record.timestamp.is_none());
        assert!(!record.date_label.is_empty());
        assert_eq!(record.status, CallStatus::Pending);
    }

    #[test]
    fn duration_prefix_parsing() {
        assert_eq!(leading_f64("11 seconds"), Some(11.0));
        assert_eq!(leading_f64("3.5 minutes"), Some(3.5));
        assert_eq!(leading_f64("Pending..."), None);
    }

    #[test]
    fn scores_clamp_to_valid_range() {
        let raw: RawCallRow = serde_json::from_value(json!({
            "engagement_score": 250,
            "effectiveness_score": -5
        }))
        .unwrap();

        let record = normalize(raw);
        assert_eq!(record.scores.engagement, 100);
        assert_eq!(record.scores.effectiveness, 0);
    }
}
