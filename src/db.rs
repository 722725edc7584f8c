use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::normalize::RawCallRow;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Fetch the raw rows for one member, newest call first. Optional filters
/// narrow by team, status, or a single session.
pub async fn fetch_records(
    pool: &PgPool,
    member_id: &str,
    team_id: Option<&str>,
    status: Option<&str>,
    session_id: Option<&str>,
) -> anyhow::Result<Vec<RawCallRow>> {
    let query = records_query(team_id, status, session_id);

    let mut rows = sqlx::query(&query).bind(member_id);
    if let Some(value) = team_id {
        rows = rows.bind(value);
    }
    if let Some(value) = status {
        rows = rows.bind(value);
    }
    if let Some(value) = session_id {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    Ok(records.iter().map(row_to_raw).collect())
}

fn records_query(
    team_id: Option<&str>,
    status: Option<&str>,
    session_id: Option<&str>,
) -> String {
    let mut query = String::from(
        "SELECT * FROM call_analytics.call_records WHERE member_id = $1",
    );

    let mut next_param = 2;
    let conditions = [
        (team_id.is_some(), "team_id"),
        (status.is_some(), "status"),
        (session_id.is_some(), "session_id"),
    ];
    for (present, column) in conditions {
        if present {
            query.push_str(&format!(" AND {column} = ${next_param}"));
            next_param += 1;
        }
    }
    query.push_str(" ORDER BY call_number DESC NULLS LAST");
    query
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingCall {
    pub call_number: i64,
    pub session_id: String,
    pub status: String,
}

/// Phase-1 registration: a pending placeholder keyed by the session
/// identifier. Re-posting the same session resets it to pending instead of
/// duplicating; the next per-member call number is assigned on first insert.
pub async fn create_pending(
    pool: &PgPool,
    member_id: &str,
    team_id: &str,
    session_id: &str,
) -> anyhow::Result<PendingCall> {
    let row = sqlx::query(
        r#"
        INSERT INTO call_analytics.call_records (member_id, team_id, session_id, status, call_number)
        VALUES ($1, $2, $3, 'pending',
            (SELECT COALESCE(MAX(call_number), 0) + 1
             FROM call_analytics.call_records WHERE member_id = $1))
        ON CONFLICT (session_id) DO UPDATE
        SET status = 'pending', updated_at = CURRENT_TIMESTAMP
        RETURNING call_number, session_id, status
        "#,
    )
    .bind(member_id)
    .bind(team_id)
    .bind(session_id)
    .fetch_one(pool)
    .await?;

    Ok(PendingCall {
        call_number: row.get::<Option<i32>, _>("call_number").unwrap_or(0) as i64,
        session_id: row.get("session_id"),
        status: row.get("status"),
    })
}

/// Phase-2 payload: every field optional, only supplied fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CallUpdate {
    pub bot_name: Option<String>,
    pub bot_picture: Option<String>,
    pub user_name: Option<String>,
    pub user_picture: Option<String>,

    pub average_score: Option<f64>,
    pub engagement_score: Option<i64>,
    pub objection_handling_score: Option<i64>,
    pub information_gathering_score: Option<i64>,
    pub program_explanation_score: Option<i64>,
    pub closing_skills_score: Option<i64>,
    pub effectiveness_score: Option<i64>,
    pub notes_score: Option<i64>,
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

    pub user_talk_percentage: Option<f64>,
    pub bot_talk_percentage: Option<f64>,
    pub monologues_time: Option<String>,
    pub response_time: Option<String>,
    pub turn_switches: Option<i64>,
    pub most_used_phrases: Option<String>,
    pub speaking_pace: Option<f64>,
    pub average_sentence_length: Option<f64>,
    pub filler_words_percentage: Option<f64>,
    pub filler_words_used: Option<String>,
    pub listening_skills_analysis: Option<String>,

    pub status: Option<String>,
}

/// Partial update keyed by session identifier. Returns the number of rows
/// touched; 0 means the session is unknown.
pub async fn update_record(
    pool: &PgPool,
    session_id: &str,
    update: &CallUpdate,
) -> anyhow::Result<u64> {
    let Value::Object(fields) = serde_json::to_value(update)? else {
        anyhow::bail!("call update did not serialize to an object");
    };

    let entries: Vec<(String, Value)> = fields
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .collect();
    if entries.is_empty() {
        return Ok(0);
    }

    let set_clauses: Vec<String> = entries
        .iter()
        .enumerate()
        .map(|(index, (column, _))| format!("{column} = ${}", index + 1))
        .collect();
    let query = format!(
        "UPDATE call_analytics.call_records SET {}, updated_at = CURRENT_TIMESTAMP \
         WHERE session_id = ${}",
        set_clauses.join(", "),
        entries.len() + 1
    );

    let mut statement = sqlx::query(&query);
    for (_, value) in &entries {
        statement = match value {
            Value::String(text) => statement.bind(text.clone()),
            Value::Number(number) => match number.as_i64() {
                Some(integer) => statement.bind(integer),
                None => statement.bind(number.as_f64().unwrap_or(0.0)),
            },
            other => statement.bind(other.to_string()),
        };
    }

    let result = statement.bind(session_id).execute(pool).await?;
    Ok(result.rows_affected())
}

pub async fn update_notes(
    pool: &PgPool,
    member_id: &str,
    session_id: &str,
    call_notes: &str,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        "UPDATE call_analytics.call_records \
         SET call_notes = $1, updated_at = CURRENT_TIMESTAMP \
         WHERE member_id = $2 AND session_id = $3",
    )
    .bind(call_notes)
    .bind(member_id)
    .bind(session_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn update_feedback(
    pool: &PgPool,
    member_id: &str,
    session_id: &str,
    managers_feedback: &str,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        "UPDATE call_analytics.call_records \
         SET managers_feedback = $1, updated_at = CURRENT_TIMESTAMP \
         WHERE member_id = $2 AND session_id = $3",
    )
    .bind(managers_feedback)
    .bind(member_id)
    .bind(session_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let calls: Vec<(&str, i64, &str, &str, &str, [i64; 6])> = vec![
        ("seed-011", 11, "Jessica", "Jan 8, 2025, 06:33 PM", "11 seconds", [98, 95, 96, 97, 95, 98]),
        ("seed-010", 10, "Linda", "Jan 5, 2025, 12:44 AM", "3 seconds", [85, 82, 88, 80, 85, 84]),
        ("seed-009", 9, "Michael", "Jan 4, 2025, 03:15 PM", "5 seconds", [55, 45, 50, 60, 48, 52]),
        ("seed-008", 8, "Sarah", "Jan 3, 2025, 11:20 AM", "8 seconds", [25, 30, 15, 20, 35, 25]),
        ("seed-007", 7, "Robert", "Jan 2, 2025, 10:15 AM", "7 seconds", [92, 88, 90, 95, 89, 91]),
        ("seed-006", 6, "Emily", "Jan 1, 2025, 09:30 AM", "6 seconds", [78, 75, 80, 82, 77, 78]),
        ("seed-005", 5, "David", "Dec 31, 2024, 02:45 PM", "9 seconds", [88, 85, 87, 89, 86, 87]),
        ("seed-004", 4, "Amanda", "Dec 30, 2024, 11:20 AM", "4 seconds", [95, 92, 93, 94, 91, 93]),
        ("seed-003", 3, "James", "Dec 29, 2024, 03:15 PM", "10 seconds", [72, 70, 75, 73, 71, 72]),
        ("seed-002", 2, "Sophie", "Dec 28, 2024, 01:30 PM", "6 seconds", [83, 80, 85, 82, 81, 82]),
        ("seed-001", 1, "William", "Dec 27, 2024, 10:45 AM", "7 seconds", [68, 65, 70, 67, 66, 67]),
    ];

    for (session_id, call_number, bot_name, call_date, call_length, scores) in calls {
        let average = scores.iter().sum::<i64>() as f64 / scores.len() as f64;
        sqlx::query(
            r#"
            INSERT INTO call_analytics.call_records (
                member_id, team_id, session_id, status, call_number,
                bot_name, call_date, call_length, average_score,
                engagement_score, objection_handling_score,
                information_gathering_score, program_explanation_score,
                closing_skills_score, effectiveness_score
            ) VALUES (
                'demo-member', 'demo-team', $1, 'completed', $2,
                $3, $4, $5, $6, $7, $8, $9, $10, $11, $12
            )
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(session_id)
        .bind(call_number)
        .bind(bot_name)
        .bind(call_date)
        .bind(call_length)
        .bind(average)
        .bind(scores[0])
        .bind(scores[1])
        .bind(scores[2])
        .bind(scores[3])
        .bind(scores[4])
        .bind(scores[5])
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(Deserialize)]
    struct CsvRow {
        member_id: String,
        #[serde(default)]
        team_id: String,
        session_id: Option<String>,
        call_date: String,
        call_length: String,
        engagement_score: i64,
        objection_handling_score: i64,
        information_gathering_score: i64,
        program_explanation_score: i64,
        closing_skills_score: i64,
        effectiveness_score: i64,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let session_id = row
            .session_id
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO call_analytics.call_records (
                member_id, team_id, session_id, status, call_number,
                call_date, call_length,
                engagement_score, objection_handling_score,
                information_gathering_score, program_explanation_score,
                closing_skills_score, effectiveness_score
            ) VALUES (
                $1, $2, $3, 'completed',
                (SELECT COALESCE(MAX(call_number), 0) + 1
                 FROM call_analytics.call_records WHERE member_id = $1),
                $4, $5, $6, $7, $8, $9, $10, $11
            )
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(&row.member_id)
        .bind(&row.team_id)
        .bind(&session_id)
        .bind(&row.call_date)
        .bind(&row.call_length)
        .bind(row.engagement_score)
        .bind(row.objection_handling_score)
        .bind(row.information_gathering_score)
        .bind(row.program_explanation_score)
        .bind(row.closing_skills_score)
        .bind(row.effectiveness_score)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}

fn row_to_raw(row: &PgRow) -> RawCallRow {
    RawCallRow {
        id: opt(row, "id"),
        call_number: opt::<i32>(row, "call_number").map(i64::from),
        member_id: opt(row, "member_id"),
        team_id: opt(row, "team_id"),
        session_id: opt(row, "session_id"),
        status: opt(row, "status"),
        bot_name: opt(row, "bot_name"),
        bot_picture: opt(row, "bot_picture"),
        user_name: opt(row, "user_name"),
        user_picture: opt(row, "user_picture"),
        average_score: opt(row, "average_score"),
        engagement_score: opt::<i32>(row, "engagement_score").map(i64::from),
        objection_handling_score: opt::<i32>(row, "objection_handling_score").map(i64::from),
        information_gathering_score: opt::<i32>(row, "information_gathering_score").map(i64::from),
        program_explanation_score: opt::<i32>(row, "program_explanation_score").map(i64::from),
        closing_skills_score: opt::<i32>(row, "closing_skills_score").map(i64::from),
        effectiveness_score: opt::<i32>(row, "effectiveness_score").map(i64::from),
        notes_score: opt::<i32>(row, "notes_score").map(i64::from),
        listening_skills_score: opt::<i32>(row, "listening_skills_score").map(i64::from),
        call_date: opt(row, "call_date"),
        call_length: opt(row, "call_length"),
        engagement_text: opt(row, "engagement_text"),
        objection_handling_text: opt(row, "objection_handling_text"),
        information_gathering_text: opt(row, "information_gathering_text"),
        program_explanation_text: opt(row, "program_explanation_text"),
        closing_skills_text: opt(row, "closing_skills_text"),
        effectiveness_text: opt(row, "effectiveness_text"),
        power_moment: opt(row, "power_moment"),
        key_wins: opt(row, "key_wins"),
        areas_for_growth: opt(row, "areas_for_growth"),
        call_notes: opt(row, "call_notes"),
        managers_feedback: opt(row, "managers_feedback"),
        call_recording: opt(row, "call_recording"),
        call_transcript: opt(row, "call_transcript"),
        user_talk_percentage: opt(row, "user_talk_percentage"),
        bot_talk_percentage: opt(row, "bot_talk_percentage"),
        monologues_time: opt(row, "monologues_time"),
        response_time: opt(row, "response_time"),
        turn_switches: opt::<i32>(row, "turn_switches").map(i64::from),
        most_used_phrases: opt(row, "most_used_phrases"),
        speaking_pace: opt(row, "speaking_pace"),
        average_sentence_length: opt(row, "average_sentence_length"),
        filler_words_percentage: opt(row, "filler_words_percentage"),
        filler_words_used: opt(row, "filler_words_used"),
        listening_skills_analysis: opt(row, "listening_skills_analysis"),
    }
}

fn opt<'r, T>(row: &'r PgRow, column: &str) -> Option<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get::<Option<T>, _>(column).ok().flatten()
}
