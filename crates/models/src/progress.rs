//! Rules for turning raw watch events and reviews into the cached
//! aggregates stored on enrollments and courses

use serde::Serialize;

/// Rounds to two decimal places, the precision percentages and averages are
/// stored with
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Decides when a lesson counts as completed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionPolicy {
    /// Share of the video that must be watched, in percent
    pub threshold_percent: f64,
}

impl Default for CompletionPolicy {
    fn default() -> Self {
        Self {
            threshold_percent: 95.0,
        }
    }
}

/// Watch state of one lesson for one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LessonWatch {
    pub watched_duration: i32,
    pub progress_percent: f64,
    pub is_completed: bool,
}

impl CompletionPolicy {
    /// Folds a new watch position into the previous state. The furthest
    /// position wins and completion never reverts.
    pub fn record(
        &self,
        previous: Option<LessonWatch>,
        watched_duration: i32,
        video_duration: i32,
    ) -> LessonWatch {
        let previous = previous.unwrap_or_default();
        let watched = watched_duration.max(previous.watched_duration);

        let percent = if video_duration <= 0 {
            100.0
        } else {
            (f64::from(watched) * 100.0 / f64::from(video_duration)).min(100.0)
        };

        LessonWatch {
            watched_duration: watched,
            progress_percent: round2(percent),
            is_completed: previous.is_completed || percent >= self.threshold_percent,
        }
    }
}

/// Completion summary cached on an enrollment
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CourseCompletion {
    pub completed_lessons: i32,
    pub progress_percent: f64,
    pub finished: bool,
}

impl CourseCompletion {
    /// `total_lessons` is the snapshot taken at enrollment time
    pub fn new(completed_lessons: i32, total_lessons: i32) -> Self {
        let progress_percent = if total_lessons <= 0 {
            0.0
        } else {
            round2((f64::from(completed_lessons) * 100.0 / f64::from(total_lessons)).min(100.0))
        };

        Self {
            completed_lessons,
            progress_percent,
            finished: total_lessons > 0 && completed_lessons >= total_lessons,
        }
    }
}

/// Average and count of the approved ratings of a course
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RatingSummary {
    pub rating_avg: f64,
    pub rating_count: i32,
}

impl RatingSummary {
    pub fn from_ratings<I: IntoIterator<Item = i32>>(ratings: I) -> Self {
        let (sum, count) = ratings
            .into_iter()
            .fold((0i64, 0i32), |(sum, count), r| (sum + i64::from(r), count + 1));

        if count == 0 {
            return Self::default();
        }

        Self {
            rating_avg: round2(sum as f64 / f64::from(count)),
            rating_count: count,
        }
    }
}
