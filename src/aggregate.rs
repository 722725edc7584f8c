use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::models::{
    CallRecord, CallStatus, Category, ChartPoint, ChartSeries, Metric, Scores,
};

/// Derived per-call score: mean of the six category scores, rounded half-up.
/// Always recomputed; the stored average column is never trusted here.
pub fn overall_score(scores: &Scores) -> i64 {
    round_half_up(scores.total() as f64 / Category::ALL.len() as f64)
}

/// Mean of one category across the completed records. An empty input yields
/// 0.0, never NaN.
pub fn category_average(records: &[CallRecord], category: Category) -> f64 {
    let mut sum = 0i64;
    let mut count = 0usize;
    for record in completed(records) {
        sum += record.scores.get(category);
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    sum as f64 / count as f64
}

pub fn overall_average(records: &[CallRecord]) -> i64 {
    let mut sum = 0i64;
    let mut count = 0usize;
    for record in completed(records) {
        sum += overall_score(&record.scores);
        count += 1;
    }
    if count == 0 {
        return 0;
    }
    round_half_up(sum as f64 / count as f64)
}

/// Category with the highest average; ties go to the first-declared one.
pub fn best_category(records: &[CallRecord]) -> Category {
    rank_categories(records, |candidate, best| candidate > best)
}

pub fn worst_category(records: &[CallRecord]) -> Category {
    rank_categories(records, |candidate, worst| candidate < worst)
}

fn rank_categories(records: &[CallRecord], beats: impl Fn(f64, f64) -> bool) -> Category {
    let mut winner = Category::ALL[0];
    let mut winner_avg = category_average(records, winner);
    for category in Category::ALL.iter().skip(1) {
        let avg = category_average(records, *category);
        if beats(avg, winner_avg) {
            winner = *category;
            winner_avg = avg;
        }
    }
    winner
}

/// Chart series for one metric. The input is assumed newest-first (the
/// display order); points come out oldest-first for charting.
pub fn series(records: &[CallRecord], metric: Metric) -> ChartSeries {
    let points = completed(records)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .map(|record| ChartPoint {
            label: format!("Call {}", record.call_number),
            value: match metric {
                Metric::Overall => overall_score(&record.scores),
                Metric::Category(category) => record.scores.get(category),
            },
        })
        .collect();

    ChartSeries {
        metric: metric.label().to_string(),
        points,
    }
}

pub fn all_series(records: &[CallRecord]) -> Vec<ChartSeries> {
    Metric::ALL
        .iter()
        .map(|metric| series(records, *metric))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryAverage {
    pub category: String,
    pub average: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total_calls: usize,
    pub overall_average: i64,
    pub category_averages: Vec<CategoryAverage>,
    pub best_category: String,
    pub needs_improvement: String,
}

pub fn aggregate(records: &[CallRecord]) -> Summary {
    Summary {
        total_calls: completed(records).count(),
        overall_average: overall_average(records),
        category_averages: Category::ALL
            .iter()
            .map(|category| CategoryAverage {
                category: category.label().to_string(),
                average: category_average(records, *category),
            })
            .collect(),
        best_category: best_category(records).label().to_string(),
        needs_improvement: worst_category(records).label().to_string(),
    }
}

/// Memoized chart data, keyed by an explicit generation token supplied by
/// the owner. Replaces ambient module-level caching: the caller decides when
/// two inputs are the same.
#[derive(Debug, Default)]
pub struct ChartCache {
    generation: Option<u64>,
    charts: Vec<ChartSeries>,
}

impl ChartCache {
    pub fn charts(&mut self, generation: u64, records: &[CallRecord]) -> &[ChartSeries] {
        if self.generation != Some(generation) {
            self.charts = all_series(records);
            self.generation = Some(generation);
        }
        &self.charts
    }
}

/// Content-derived generation token for a record list.
pub fn generation_of(records: &[CallRecord]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for record in records {
        record.session_id.hash(&mut hasher);
        record.call_number.hash(&mut hasher);
        (record.status as u8).hash(&mut hasher);
        for category in Category::ALL {
            record.scores.get(category).hash(&mut hasher);
        }
    }
    hasher.finish()
}

fn completed(records: &[CallRecord]) -> impl Iterator<Item = &CallRecord> {
    records.iter().filter(|record| match record.status {
        CallStatus::Completed => true,
        CallStatus::Pending | CallStatus::Empty => false,
    })
}

fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daterange::filter_by_date_range;
    use crate::models::{LanguageMetrics, ScoreNarratives};
    use crate::normalize::parse_call_date;
    use crate::paginate::paginate;
    use chrono::NaiveDate;

    fn record(call_number: i64, date: &str, status: CallStatus, scores: [i64; 6]) -> CallRecord {
        CallRecord {
            id: call_number,
            call_number,
            member_id: "member-1".to_string(),
            team_id: "team-1".to_string(),
            session_id: format!("session-{call_number}"),
            bot_name: "Real Estate Coach".to_string(),
            bot_picture: "/placeholder.svg".to_string(),
            user_name: "You".to_string(),
            user_picture: "/placeholder.svg".to_string(),
            timestamp: parse_call_date(date),
            date_label: date.to_string(),
            duration_label: "7 seconds".to_string(),
            duration_seconds: Some(7.0),
            status,
            scores: Scores {
                engagement: scores[0],
                objection_handling: scores[1],
                information_gathering: scores[2],
                program_explanation: scores[3],
                closing_skills: scores[4],
                effectiveness: scores[5],
            },
            stored_average: None,
            narratives: ScoreNarratives::default(),
            power_moment: None,
            key_wins: None,
            areas_for_growth: None,
            call_notes: None,
            managers_feedback: None,
            call_recording: None,
            call_transcript: None,
            notes_score: 0,
            language: LanguageMetrics {
                user_talk_percentage: 46.0,
                bot_talk_percentage: 54.0,
                monologues_time: "0s".to_string(),
                response_time: "0s".to_string(),
                turn_switches: 0,
                speaking_pace: 0.0,
                average_sentence_length: 0.0,
                filler_words_percentage: 0.0,
                filler_words_used: String::new(),
                most_used_phrases: String::new(),
                listening_skills_score: 0,
                listening_skills_analysis: String::new(),
            },
        }
    }

    // The fixture set from the reference dashboard: 11 calls, newest first,
    // spanning Dec 27, 2024 to Jan 8, 2025.
    fn sample_calls() -> Vec<CallRecord> {
        vec![
            record(11, "Jan 8, 2025, 06:33 PM", CallStatus::Completed, [98, 95, 96, 97, 95, 98]),
            record(10, "Jan 5, 2025, 12:44 AM", CallStatus::Completed, [85, 82, 88, 80, 85, 84]),
            record(9, "Jan 4, 2025, 03:15 PM", CallStatus::Completed, [55, 45, 50, 60, 48, 52]),
            record(8, "Jan 3, 2025, 11:20 AM", CallStatus::Completed, [25, 30, 15, 20, 35, 25]),
            record(7, "Jan 2, 2025, 10:15 AM", CallStatus::Completed, [92, 88, 90, 95, 89, 91]),
            record(6, "Jan 1, 2025, 09:30 AM", CallStatus::Completed, [78, 75, 80, 82, 77, 78]),
            record(5, "Dec 31, 2024, 02:45 PM", CallStatus::Completed, [88, 85, 87, 89, 86, 87]),
            record(4, "Dec 30, 2024, 11:20 AM", CallStatus::Completed, [95, 92, 93, 94, 91, 93]),
            record(3, "Dec 29, 2024, 03:15 PM", CallStatus::Completed, [72, 70, 75, 73, 71, 72]),
            record(2, "Dec 28, 2024, 01:30 PM", CallStatus::Completed, [83, 80, 85, 82, 81, 82]),
            record(1, "Dec 27, 2024, 10:45 AM", CallStatus::Completed, [68, 65, 70, 67, 66, 67]),
        ]
    }

    #[test]
    fn overall_score_rounds_half_up() {
        // 84 * 5 + 81 = 501, mean 83.5, half-up to 84.
        let scores = Scores {
            engagement: 84,
            objection_handling: 84,
            information_gathering: 84,
            program_explanation: 84,
            closing_skills: 84,
            effectiveness: 81,
        };
        assert_eq!(scores.total(), 501);
        assert_eq!(overall_score(&scores), 84);

        assert_eq!(overall_score(&Scores::default()), 0);
    }

    #[test]
    fn category_average_of_empty_is_zero() {
        for category in Category::ALL {
            assert_eq!(category_average(&[], category), 0.0);
        }
        assert_eq!(overall_average(&[]), 0);
    }

    #[test]
    fn all_tied_categories_pick_first_declared() {
        let records = vec![record(
            1,
            "Jan 2, 2025, 10:15 AM",
            CallStatus::Completed,
            [70, 70, 70, 70, 70, 70],
        )];
        assert_eq!(best_category(&records), Category::Engagement);
        assert_eq!(worst_category(&records), Category::Engagement);
    }

    #[test]
    fn best_and_worst_differ_when_averages_differ() {
        let records = sample_calls();
        let best = best_category(&records);
        let worst = worst_category(&records);
        assert_ne!(best, worst);
    }

    #[test]
    fn pending_records_are_invisible_to_aggregation() {
        let mut records = sample_calls();
        records.insert(
            0,
            record(12, "Jan 9, 2025, 09:00 AM", CallStatus::Pending, [0, 0, 0, 0, 0, 0]),
        );

        let with_pending = aggregate(&records);
        let without = aggregate(&records[1..]);
        assert_eq!(with_pending.total_calls, without.total_calls);
        assert_eq!(with_pending.overall_average, without.overall_average);

        let trend = series(&records, Metric::Overall);
        assert_eq!(trend.points.len(), 11);
    }

    #[test]
    fn series_is_oldest_first_with_call_labels() {
        let records = sample_calls();
        let trend = series(&records, Metric::Category(Category::Engagement));
        assert_eq!(trend.metric, "Engagement");
        assert_eq!(trend.points.first().unwrap().label, "Call 1");
        assert_eq!(trend.points.first().unwrap().value, 68);
        assert_eq!(trend.points.last().unwrap().label, "Call 11");
        assert_eq!(trend.points.last().unwrap().value, 98);
    }

    #[test]
    fn overall_series_uses_derived_score() {
        let records = sample_calls();
        let trend = series(&records, Metric::Overall);
        // Call 11: (98+95+96+97+95+98)/6 = 96.5 -> 97.
        assert_eq!(trend.points.last().unwrap().value, 97);
    }

    #[test]
    fn chart_cache_reuses_same_generation() {
        let records = sample_calls();
        let generation = generation_of(&records);
        let mut cache = ChartCache::default();

        let first = cache.charts(generation, &records).to_vec();
        // Same generation with different input returns the cached charts.
        let cached = cache.charts(generation, &[]).to_vec();
        assert_eq!(first, cached);
        assert_eq!(first.len(), 7);

        let recomputed = cache.charts(generation.wrapping_add(1), &[]).to_vec();
        assert!(recomputed.iter().all(|s| s.points.is_empty()));
    }

    #[test]
    fn generation_changes_with_content() {
        let records = sample_calls();
        let mut edited = sample_calls();
        edited[0].scores.engagement = 1;
        assert_ne!(generation_of(&records), generation_of(&edited));
        assert_eq!(generation_of(&records), generation_of(&sample_calls()));
    }

    // End-to-end window: filter Jan 1 - Jan 8 out of the 11 fixture calls,
    // page size 5, aggregate over the filtered set only.
    #[test]
    fn date_window_pagination_scenario() {
        let records = sample_calls();
        let from = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();

        let filtered = filter_by_date_range(&records, from, to);
        assert_eq!(filtered.len(), 6);
        assert!(filtered.iter().all(|r| r.call_number >= 6));

        let total_pages = filtered.len().div_ceil(5);
        assert_eq!(total_pages, 2);
        let first = paginate(&filtered, 5, 1);
        let second = paginate(&filtered, 5, 2);
        assert_eq!(first.items.len(), 5);
        assert_eq!(second.items.len(), 1);
        assert_eq!(first.total_pages, 2);

        // Ranking over the filtered six calls only.
        assert_eq!(best_category(&filtered), Category::ProgramExplanation);
        assert_eq!(worst_category(&filtered), Category::ObjectionHandling);
    }
}
