//! Burnout detection: weighted risk factors over working habits.
//!
//! [`assess`] is pure over a [`BurnoutInputs`] value; [`gather_inputs`]
//! builds that value from the ledger for a given instant. Factor thresholds
//! and weights follow the inherited tuning table; see each factor below.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use serde::Serialize;

use crate::entry::{TimeBreak, TimeEntry, day_bounds};
use crate::ledger::{Collaborators, Ledger, StoreError, breaks_of};
use crate::types::UserId;

/// Overall burnout risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Maps a total factor score to a level.
    #[must_use]
    pub const fn from_score(score: u32) -> Self {
        match score {
            80.. => Self::Critical,
            60..=79 => Self::High,
            40..=59 => Self::Medium,
            20..=39 => Self::Low,
            _ => Self::None,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a single triggered factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

/// The kind of working-habit signal a factor measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    WeeklyHours,
    Overtime,
    LateNightWork,
    WeekendWork,
    ConsecutiveDays,
    InsufficientBreaks,
    ProductivityDecline,
}

/// One triggered risk factor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskFactor {
    pub kind: FactorKind,
    pub severity: Severity,
    /// Contribution to the total score.
    pub score: u32,
    pub detail: String,
}

/// The signals the detector weighs, all relative to one assessment instant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BurnoutInputs {
    /// Net hours worked over the trailing 7 days.
    pub weekly_hours: f64,
    /// Net hours from sessions starting on Saturday/Sunday in that week.
    pub weekend_hours: f64,
    /// Net hours from sessions starting in \[20:00, 06:00) in that week.
    pub late_night_hours: f64,
    /// Today's net hours beyond the user's daily target, floored at 0.
    pub overtime_hours_today: f64,
    /// Breaks taken today.
    pub breaks_today: u32,
    /// Current consecutive-work-day streak.
    pub consecutive_days: u32,
    /// Relative change (percent) of mean focus score between the earlier
    /// and later half of the trailing 14-day snapshot history. `None` with
    /// too little history.
    pub productivity_trend_pct: Option<f64>,
}

/// A complete burnout assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurnoutAssessment {
    /// Sum of the triggered factor scores (uncapped).
    pub score: u32,
    pub level: RiskLevel,
    pub factors: Vec<RiskFactor>,
    pub recommendations: Vec<String>,
}

/// Weighs the inputs into a score, level, and recommendations.
#[must_use]
pub fn assess(inputs: &BurnoutInputs) -> BurnoutAssessment {
    let mut factors = Vec::new();

    // Weekly hours: >55 / >50 / >45.
    if inputs.weekly_hours > 55.0 {
        factors.push(factor(
            FactorKind::WeeklyHours,
            Severity::Critical,
            30,
            format!("{:.1} hours worked in the last 7 days", inputs.weekly_hours),
        ));
    } else if inputs.weekly_hours > 50.0 {
        factors.push(factor(
            FactorKind::WeeklyHours,
            Severity::High,
            25,
            format!("{:.1} hours worked in the last 7 days", inputs.weekly_hours),
        ));
    } else if inputs.weekly_hours > 45.0 {
        factors.push(factor(
            FactorKind::WeeklyHours,
            Severity::Medium,
            15,
            format!("{:.1} hours worked in the last 7 days", inputs.weekly_hours),
        ));
    }

    // Daily overtime: >4h / >2h beyond the target.
    if inputs.overtime_hours_today > 4.0 {
        factors.push(factor(
            FactorKind::Overtime,
            Severity::High,
            20,
            format!("{:.1} hours of overtime today", inputs.overtime_hours_today),
        ));
    } else if inputs.overtime_hours_today > 2.0 {
        factors.push(factor(
            FactorKind::Overtime,
            Severity::Medium,
            10,
            format!("{:.1} hours of overtime today", inputs.overtime_hours_today),
        ));
    }

    // Late-night hours over the week: >10h / >5h.
    if inputs.late_night_hours > 10.0 {
        factors.push(factor(
            FactorKind::LateNightWork,
            Severity::High,
            20,
            format!("{:.1} late-night hours this week", inputs.late_night_hours),
        ));
    } else if inputs.late_night_hours > 5.0 {
        factors.push(factor(
            FactorKind::LateNightWork,
            Severity::Medium,
            15,
            format!("{:.1} late-night hours this week", inputs.late_night_hours),
        ));
    }

    // Weekend hours over the week: >8h / >3h.
    if inputs.weekend_hours > 8.0 {
        factors.push(factor(
            FactorKind::WeekendWork,
            Severity::High,
            25,
            format!("{:.1} weekend hours this week", inputs.weekend_hours),
        ));
    } else if inputs.weekend_hours > 3.0 {
        factors.push(factor(
            FactorKind::WeekendWork,
            Severity::Medium,
            15,
            format!("{:.1} weekend hours this week", inputs.weekend_hours),
        ));
    }

    // Consecutive work days: >=10 / >=7.
    if inputs.consecutive_days >= 10 {
        factors.push(factor(
            FactorKind::ConsecutiveDays,
            Severity::Critical,
            35,
            format!("{} consecutive work days", inputs.consecutive_days),
        ));
    } else if inputs.consecutive_days >= 7 {
        factors.push(factor(
            FactorKind::ConsecutiveDays,
            Severity::High,
            25,
            format!("{} consecutive work days", inputs.consecutive_days),
        ));
    }

    // No breaks today while the week's average day runs long. The
    // cross-window comparison (week average vs today's breaks) is inherited
    // behavior: a proxy for habitual long days.
    if inputs.breaks_today < 1 && inputs.weekly_hours / 7.0 > 6.0 {
        factors.push(factor(
            FactorKind::InsufficientBreaks,
            Severity::Medium,
            15,
            "no breaks taken today despite long average days".to_string(),
        ));
    }

    // Focus trend decline: <-20% / <-10%.
    if let Some(trend) = inputs.productivity_trend_pct {
        if trend < -20.0 {
            factors.push(factor(
                FactorKind::ProductivityDecline,
                Severity::High,
                25,
                format!("focus score down {:.0}% over two weeks", -trend),
            ));
        } else if trend < -10.0 {
            factors.push(factor(
                FactorKind::ProductivityDecline,
                Severity::Medium,
                15,
                format!("focus score down {:.0}% over two weeks", -trend),
            ));
        }
    }

    let score = factors.iter().map(|f| f.score).sum();
    let recommendations = recommendations_for(&factors);
    BurnoutAssessment {
        score,
        level: RiskLevel::from_score(score),
        factors,
        recommendations,
    }
}

fn factor(kind: FactorKind, severity: Severity, score: u32, detail: String) -> RiskFactor {
    RiskFactor {
        kind,
        severity,
        score,
        detail,
    }
}

/// One recommendation per triggered factor kind, in factor order; any
/// Critical factor prepends two escalation recommendations.
fn recommendations_for(factors: &[RiskFactor]) -> Vec<String> {
    let mut recommendations = Vec::new();
    if factors.iter().any(|f| f.severity == Severity::Critical) {
        recommendations.push("Take time off soon; the current pace is not sustainable".to_string());
        recommendations.push("Raise your workload with your manager or team".to_string());
    }

    let mut seen = std::collections::HashSet::new();
    for f in factors {
        if !seen.insert(f.kind) {
            continue;
        }
        recommendations.push(
            match f.kind {
                FactorKind::WeeklyHours => "Reduce weekly hours; aim to stay under 45",
                FactorKind::Overtime => "Stop close to your daily target instead of running over",
                FactorKind::LateNightWork => "Move work out of late-night hours where possible",
                FactorKind::WeekendWork => "Keep weekends free for recovery",
                FactorKind::ConsecutiveDays => "Schedule a full rest day to break the streak",
                FactorKind::InsufficientBreaks => "Take short breaks during long working days",
                FactorKind::ProductivityDecline => {
                    "Focus is trending down; lighten the load and rest"
                }
            }
            .to_string(),
        );
    }
    recommendations
}

/// Builds [`BurnoutInputs`] from the ledger for an assessment day.
///
/// The week is the trailing 7 calendar days ending at `date`; `as_of` only
/// closes open intervals. The focus trend reads the trailing 14 snapshot
/// days ending the day *before* `date`, so snapshot generation never reads
/// the row it is about to write.
pub fn gather_inputs<S: Ledger + Collaborators + ?Sized>(
    store: &S,
    user: &UserId,
    date: NaiveDate,
    as_of: DateTime<Utc>,
) -> Result<BurnoutInputs, StoreError> {
    let (today_start, today_end) = day_bounds(date);
    let week_start = today_start - Duration::days(6);

    let week_entries = store.entries_in_range(user, week_start, today_end)?;
    let week_breaks = breaks_of(store, &week_entries)?;

    let weekly_hours = net_hours(&week_entries, &week_breaks, as_of, |_| true);
    let weekend_hours = net_hours(&week_entries, &week_breaks, as_of, |e| {
        matches!(
            e.start_time.weekday(),
            chrono::Weekday::Sat | chrono::Weekday::Sun
        )
    });
    let late_night_hours = net_hours(&week_entries, &week_breaks, as_of, starts_late_night);

    let today_entries: Vec<&TimeEntry> = week_entries
        .iter()
        .filter(|e| e.start_time >= today_start)
        .collect();
    let today_ids: Vec<_> = today_entries.iter().map(|e| e.id.clone()).collect();
    let breaks_today = week_breaks
        .iter()
        .filter(|b| today_ids.contains(&b.entry_id))
        .count();
    let today_hours: f64 = today_entries
        .iter()
        .map(|e| e.net_duration(&week_breaks, as_of).num_seconds() as f64 / 3600.0)
        .sum();
    let target = store.daily_target_hours(user)?;
    let overtime_hours_today = (today_hours - target).max(0.0);

    let consecutive_days = consecutive_work_days(store, user)?;

    let trend_to = date.pred_opt().unwrap_or(date);
    let trend_from = trend_to - Duration::days(13);
    let history = store.snapshots_in_range(user, trend_from, trend_to)?;
    let productivity_trend_pct = focus_trend_pct(
        &history
            .iter()
            .map(|s| f64::from(s.focus_score.value()))
            .collect::<Vec<_>>(),
    );

    Ok(BurnoutInputs {
        weekly_hours,
        weekend_hours,
        late_night_hours,
        overtime_hours_today,
        breaks_today: u32::try_from(breaks_today).unwrap_or(u32::MAX),
        consecutive_days,
        productivity_trend_pct,
    })
}

/// Whether a session starts in the late-night band \[20:00, 06:00).
fn starts_late_night(entry: &TimeEntry) -> bool {
    let hour = entry.start_time.hour();
    hour >= 20 || hour < 6
}

fn net_hours(
    entries: &[TimeEntry],
    breaks: &[TimeBreak],
    as_of: DateTime<Utc>,
    select: impl Fn(&TimeEntry) -> bool,
) -> f64 {
    entries
        .iter()
        .filter(|e| select(e))
        .map(|e| e.net_duration(breaks, as_of).num_seconds() as f64 / 3600.0)
        .sum()
}

/// Counts the run of adjacent distinct work days over the trailing 30
/// entries, newest first.
pub fn consecutive_work_days<L: Ledger + ?Sized>(
    ledger: &L,
    user: &UserId,
) -> Result<u32, StoreError> {
    let recent = ledger.recent_entries(user, 30)?;
    let mut days: Vec<_> = recent.iter().map(|e| e.start_time.date_naive()).collect();
    days.sort_unstable();
    days.dedup();
    days.reverse();

    let mut streak = 0u32;
    for pair in days.windows(2) {
        if streak == 0 {
            streak = 1;
        }
        if (pair[0] - pair[1]).num_days() == 1 {
            streak += 1;
        } else {
            break;
        }
    }
    if streak == 0 && !days.is_empty() {
        streak = 1;
    }
    Ok(streak)
}

/// Relative change in mean focus between the earlier and later half of a
/// snapshot history, in percent. `None` with fewer than 2 points or a zero
/// baseline.
fn focus_trend_pct(focus_scores: &[f64]) -> Option<f64> {
    if focus_scores.len() < 2 {
        return None;
    }
    let mid = focus_scores.len() / 2;
    let earlier = &focus_scores[..mid];
    let later = &focus_scores[mid..];
    let earlier_mean = earlier.iter().sum::<f64>() / earlier.len() as f64;
    let later_mean = later.iter().sum::<f64>() / later.len() as f64;
    if earlier_mean <= 0.0 {
        return None;
    }
    Some((later_mean - earlier_mean) / earlier_mean * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::TimeEntry;
    use crate::ledger::Ledger;
    use crate::testutil::MemoryLedger;
    use crate::types::EntryId;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn fifty_six_weekly_hours_alone_is_low_risk() {
        // Critical weekly-hours factor scores 30, which is still only LOW
        // overall (20 <= 30 < 40).
        let assessment = assess(&BurnoutInputs {
            weekly_hours: 56.0,
            consecutive_days: 1,
            breaks_today: 1,
            ..BurnoutInputs::default()
        });
        assert_eq!(assessment.score, 30);
        assert_eq!(assessment.level, RiskLevel::Low);
        assert_eq!(assessment.factors.len(), 1);
        assert_eq!(assessment.factors[0].kind, FactorKind::WeeklyHours);
        assert_eq!(assessment.factors[0].severity, Severity::Critical);
    }

    #[test]
    fn weekly_hour_bands() {
        let score_for = |hours: f64| {
            assess(&BurnoutInputs {
                weekly_hours: hours,
                breaks_today: 1,
                ..BurnoutInputs::default()
            })
            .score
        };
        assert_eq!(score_for(45.0), 0);
        assert_eq!(score_for(46.0), 15);
        assert_eq!(score_for(51.0), 25);
        assert_eq!(score_for(56.0), 30);
    }

    #[test]
    fn consecutive_day_bands() {
        let score_for = |days: u32| {
            assess(&BurnoutInputs {
                consecutive_days: days,
                breaks_today: 1,
                ..BurnoutInputs::default()
            })
            .score
        };
        assert_eq!(score_for(6), 0);
        assert_eq!(score_for(7), 25);
        assert_eq!(score_for(10), 35);
    }

    #[test]
    fn break_scarcity_uses_week_average_but_todays_breaks() {
        // 49 weekly hours averages 7h/day; no breaks today triggers the
        // factor even though 49 > 45 also fires the weekly band.
        let assessment = assess(&BurnoutInputs {
            weekly_hours: 49.0,
            breaks_today: 0,
            ..BurnoutInputs::default()
        });
        assert!(
            assessment
                .factors
                .iter()
                .any(|f| f.kind == FactorKind::InsufficientBreaks)
        );

        // One break today suppresses it.
        let with_break = assess(&BurnoutInputs {
            weekly_hours: 49.0,
            breaks_today: 1,
            ..BurnoutInputs::default()
        });
        assert!(
            !with_break
                .factors
                .iter()
                .any(|f| f.kind == FactorKind::InsufficientBreaks)
        );
    }

    #[test]
    fn trend_decline_bands() {
        let score_for = |trend: f64| {
            assess(&BurnoutInputs {
                productivity_trend_pct: Some(trend),
                breaks_today: 1,
                ..BurnoutInputs::default()
            })
            .score
        };
        assert_eq!(score_for(-5.0), 0);
        assert_eq!(score_for(-15.0), 15);
        assert_eq!(score_for(-25.0), 25);
        assert_eq!(score_for(10.0), 0);
    }

    #[test]
    fn critical_factor_prepends_escalation_recommendations() {
        let assessment = assess(&BurnoutInputs {
            consecutive_days: 12,
            breaks_today: 1,
            ..BurnoutInputs::default()
        });
        assert!(assessment.recommendations.len() >= 3);
        assert!(assessment.recommendations[0].contains("time off"));
        assert!(assessment.recommendations[1].contains("manager"));
    }

    #[test]
    fn recommendations_are_deduplicated_per_factor_kind() {
        let assessment = assess(&BurnoutInputs {
            weekly_hours: 56.0,
            weekend_hours: 9.0,
            late_night_hours: 11.0,
            overtime_hours_today: 5.0,
            consecutive_days: 12,
            breaks_today: 0,
            productivity_trend_pct: Some(-30.0),
            ..BurnoutInputs::default()
        });
        let unique: std::collections::HashSet<_> = assessment.recommendations.iter().collect();
        assert_eq!(unique.len(), assessment.recommendations.len());
        // All 7 factors plus 2 escalations.
        assert_eq!(assessment.factors.len(), 7);
        assert_eq!(assessment.recommendations.len(), 9);
        assert_eq!(assessment.level, RiskLevel::Critical);
    }

    #[test]
    fn risk_level_thresholds() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::None);
        assert_eq!(RiskLevel::from_score(19), RiskLevel::None);
        assert_eq!(RiskLevel::from_score(20), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(40), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(60), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(80), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(120), RiskLevel::Critical);
    }

    fn day_entry(ledger: &mut MemoryLedger, id: &str, start: &str, end: &str) {
        let e = TimeEntry {
            id: EntryId::new(id).unwrap(),
            user_id: UserId::new("user-1").unwrap(),
            start_time: ts(start),
            end_time: Some(ts(end)),
            description: None,
            is_manual: false,
            subtask_id: None,
            task_ids: Vec::new(),
            created_at: ts(start),
            updated_at: ts(start),
        };
        ledger.insert_entry(&e).unwrap();
    }

    #[test]
    fn streak_counts_adjacent_days_only() {
        let mut ledger = MemoryLedger::default();
        let user = UserId::new("user-1").unwrap();
        // Three adjacent days, then a gap, then an older day.
        day_entry(&mut ledger, "e1", "2025-03-05T09:00:00Z", "2025-03-05T10:00:00Z");
        day_entry(&mut ledger, "e2", "2025-03-04T09:00:00Z", "2025-03-04T10:00:00Z");
        day_entry(&mut ledger, "e3", "2025-03-03T09:00:00Z", "2025-03-03T10:00:00Z");
        day_entry(&mut ledger, "e4", "2025-03-01T09:00:00Z", "2025-03-01T10:00:00Z");
        assert_eq!(consecutive_work_days(&ledger, &user).unwrap(), 3);
    }

    #[test]
    fn streak_single_day_is_one() {
        let mut ledger = MemoryLedger::default();
        let user = UserId::new("user-1").unwrap();
        day_entry(&mut ledger, "e1", "2025-03-05T09:00:00Z", "2025-03-05T10:00:00Z");
        assert_eq!(consecutive_work_days(&ledger, &user).unwrap(), 1);
    }

    #[test]
    fn streak_empty_ledger_is_zero() {
        let ledger = MemoryLedger::default();
        let user = UserId::new("user-1").unwrap();
        assert_eq!(consecutive_work_days(&ledger, &user).unwrap(), 0);
    }

    #[test]
    fn gather_inputs_measures_week_and_day() {
        let mut ledger = MemoryLedger::default();
        let user = UserId::new("user-1").unwrap();
        // as_of is Wednesday 2025-03-05 18:00 UTC.
        let as_of = ts("2025-03-05T18:00:00Z");
        // Saturday session, 4h, starting 22:00: weekend and late-night.
        day_entry(&mut ledger, "e1", "2025-03-01T22:00:00Z", "2025-03-02T02:00:00Z");
        // Today: 10h straight, no breaks -> 2h overtime at the default target.
        day_entry(&mut ledger, "e2", "2025-03-05T07:00:00Z", "2025-03-05T17:00:00Z");

        let inputs = gather_inputs(&ledger, &user, as_of.date_naive(), as_of).unwrap();
        assert!((inputs.weekly_hours - 14.0).abs() < 1e-9);
        assert!((inputs.weekend_hours - 4.0).abs() < 1e-9);
        assert!((inputs.late_night_hours - 4.0).abs() < 1e-9);
        assert!((inputs.overtime_hours_today - 2.0).abs() < 1e-9);
        assert_eq!(inputs.breaks_today, 0);
        assert_eq!(inputs.productivity_trend_pct, None);
    }

    #[test]
    fn focus_trend_relative_change() {
        assert_eq!(focus_trend_pct(&[]), None);
        assert_eq!(focus_trend_pct(&[80.0]), None);
        let trend = focus_trend_pct(&[80.0, 80.0, 60.0, 60.0]).unwrap();
        assert!((trend - -25.0).abs() < 1e-9);
    }
}
