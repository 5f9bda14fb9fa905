use crate::score::{college_or_unknown, LeaderboardRow, ScoreEntry};
use itertools::Itertools;
use std::collections::HashMap;

pub const DEFAULT_LIMIT: usize = 50;

/// Which colleges a leaderboard view covers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CollegeFilter {
    #[default]
    All,
    Only(String),
}

impl CollegeFilter {
    /// `"all"` (any case), blank, or absent means no filtering
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() && !v.eq_ignore_ascii_case("all") => {
                CollegeFilter::Only(v.to_uppercase())
            }
            _ => CollegeFilter::All,
        }
    }

    pub fn matches(&self, college: &str) -> bool {
        match self {
            CollegeFilter::All => true,
            CollegeFilter::Only(wanted) => college.to_uppercase() == *wanted,
        }
    }
}

/// One row per user: best WPM, running mean accuracy, attempt count.
/// Sorted by best WPM descending; equal scores keep first-seen order.
pub fn aggregate<'a, I>(rows: I, limit: usize) -> Vec<LeaderboardRow>
where
    I: IntoIterator<Item = &'a ScoreEntry>,
{
    aggregate_filtered(rows, limit, &CollegeFilter::All)
}

/// Like [`aggregate`], with the college filter applied before the limit
pub fn aggregate_filtered<'a, I>(
    rows: I,
    limit: usize,
    filter: &CollegeFilter,
) -> Vec<LeaderboardRow>
where
    I: IntoIterator<Item = &'a ScoreEntry>,
{
    fold_by_user(rows)
        .into_iter()
        .sorted_by(|a, b| b.best_wpm.total_cmp(&a.best_wpm))
        .filter(|row| filter.matches(&row.college))
        .take(limit)
        .collect()
}

fn fold_by_user<'a, I>(rows: I) -> Vec<LeaderboardRow>
where
    I: IntoIterator<Item = &'a ScoreEntry>,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut users: Vec<LeaderboardRow> = Vec::new();

    for row in rows {
        match index.get(row.username.as_str()) {
            Some(&i) => {
                let user = &mut users[i];
                let n = user.tests_taken as f64;
                user.best_wpm = user.best_wpm.max(row.wpm);
                user.avg_accuracy = (user.avg_accuracy * n + row.accuracy) / (n + 1.0);
                user.tests_taken += 1;
            }
            None => {
                index.insert(row.username.as_str(), users.len());
                users.push(LeaderboardRow {
                    username: row.username.clone(),
                    college: college_or_unknown(Some(&row.college)),
                    best_wpm: row.wpm,
                    avg_accuracy: row.accuracy,
                    tests_taken: 1,
                });
            }
        }
    }

    users
}

/// Distinct usernames in scan order
pub fn distinct_usernames<'a, I>(rows: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a ScoreEntry>,
{
    rows.into_iter()
        .map(|r| r.username.clone())
        .unique()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user: &str, wpm: f64, accuracy: f64) -> ScoreEntry {
        ScoreEntry::new(user, wpm, accuracy)
    }

    #[test]
    fn folds_repeat_attempts_into_one_row() {
        let rows = vec![entry("a", 50.0, 90.0), entry("a", 70.0, 80.0)];
        let board = aggregate(&rows, 10);

        assert_eq!(board.len(), 1);
        assert_eq!(board[0].username, "a");
        assert_eq!(board[0].best_wpm, 70.0);
        assert_eq!(board[0].tests_taken, 2);
        assert_eq!(board[0].avg_accuracy, 85.0);
    }

    #[test]
    fn running_average_over_three_attempts() {
        let rows = vec![
            entry("a", 40.0, 90.0),
            entry("a", 45.0, 60.0),
            entry("a", 42.0, 75.0),
        ];
        let board = aggregate(&rows, 10);
        assert!((board[0].avg_accuracy - 75.0).abs() < 1e-9);
        assert_eq!(board[0].best_wpm, 45.0);
        assert_eq!(board[0].tests_taken, 3);
    }

    #[test]
    fn sorted_by_best_wpm_descending() {
        let rows = vec![
            entry("slow", 30.0, 99.0),
            entry("fast", 110.0, 91.0),
            entry("mid", 65.0, 95.0),
            entry("slow", 72.0, 97.0),
        ];
        let board = aggregate(&rows, 10);
        let names: Vec<&str> = board.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, vec!["fast", "slow", "mid"]);
        assert!(board.windows(2).all(|w| w[0].best_wpm >= w[1].best_wpm));
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let rows = vec![
            entry("first", 60.0, 90.0),
            entry("second", 60.0, 90.0),
            entry("third", 60.0, 90.0),
        ];
        let board = aggregate(&rows, 10);
        let names: Vec<&str> = board.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn limit_caps_row_count() {
        let rows: Vec<ScoreEntry> = (0..20)
            .map(|i| entry(&format!("user{i}"), i as f64, 90.0))
            .collect();
        assert_eq!(aggregate(&rows, 5).len(), 5);
        assert_eq!(aggregate(&rows, 0).len(), 0);
        assert_eq!(aggregate(&rows, 100).len(), 20);
        assert_eq!(aggregate(&rows, 5)[0].username, "user19");
    }

    #[test]
    fn first_seen_college_wins() {
        let rows = vec![
            entry("a", 50.0, 90.0).with_college("NMIMS"),
            entry("a", 80.0, 90.0).with_college("DJSCE"),
        ];
        let board = aggregate(&rows, 10);
        assert_eq!(board[0].college, "NMIMS");
    }

    #[test]
    fn blank_college_becomes_unknown() {
        let rows = vec![entry("a", 50.0, 90.0).with_college("")];
        assert_eq!(aggregate(&rows, 10)[0].college, "Unknown");
    }

    #[test]
    fn college_filter_is_case_insensitive() {
        let rows = vec![
            entry("a", 50.0, 90.0).with_college("nmims"),
            entry("b", 80.0, 90.0).with_college("DJSCE"),
            entry("c", 60.0, 90.0).with_college("NMIMS"),
        ];
        let filter = CollegeFilter::parse(Some("Nmims"));
        let board = aggregate_filtered(&rows, 10, &filter);
        let names: Vec<&str> = board.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, vec!["c", "a"]);
    }

    #[test]
    fn unknown_college_filter_yields_nothing() {
        let rows = vec![entry("a", 50.0, 90.0).with_college("NMIMS")];
        let filter = CollegeFilter::parse(Some("Nowhere"));
        assert!(aggregate_filtered(&rows, 10, &filter).is_empty());
    }

    #[test]
    fn filter_applies_before_limit() {
        let mut rows: Vec<ScoreEntry> = (0..10)
            .map(|i| entry(&format!("other{i}"), 100.0 + i as f64, 90.0).with_college("X"))
            .collect();
        rows.push(entry("mine1", 40.0, 90.0).with_college("Y"));
        rows.push(entry("mine2", 30.0, 90.0).with_college("Y"));

        let board = aggregate_filtered(&rows, 2, &CollegeFilter::parse(Some("y")));
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].username, "mine1");
    }

    #[test]
    fn all_sentinel_parses_to_no_filter() {
        assert_eq!(CollegeFilter::parse(Some("ALL")), CollegeFilter::All);
        assert_eq!(CollegeFilter::parse(Some("")), CollegeFilter::All);
        assert_eq!(CollegeFilter::parse(None), CollegeFilter::All);
        assert_eq!(
            CollegeFilter::parse(Some("djsce")),
            CollegeFilter::Only("DJSCE".into())
        );
    }

    #[test]
    fn empty_scan_gives_empty_board() {
        let rows: Vec<ScoreEntry> = vec![];
        assert!(aggregate(&rows, 50).is_empty());
    }

    #[test]
    fn distinct_usernames_in_scan_order() {
        let rows = vec![
            entry("b", 1.0, 1.0),
            entry("a", 1.0, 1.0),
            entry("b", 1.0, 1.0),
        ];
        assert_eq!(distinct_usernames(&rows), vec!["b", "a"]);
    }
}
