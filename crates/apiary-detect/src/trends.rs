use apiary_core::{DayBucket, TrendDirection, TrendReport};

/// Direction and averages for a day-bucketed attack timeline.
///
/// The direction compares the trailing three buckets against the leading
/// three, both divided by a fixed 3 even when fewer buckets exist; for
/// windows of 2 to 5 buckets the slices overlap. Timelines with fewer
/// than 2 buckets are always "stable".
pub fn trend_from_timeline(days: i64, timeline: Vec<DayBucket>) -> TrendReport {
    if timeline.is_empty() {
        return TrendReport {
            trend: TrendDirection::Stable,
            average_per_day: 0.0,
            total_attacks: 0,
            days_analyzed: days,
            timeline,
        };
    }

    let total: u64 = timeline.iter().map(|b| b.count).sum();
    let average_per_day = round2(total as f64 / timeline.len() as f64);

    let trend = if timeline.len() >= 2 {
        let tail_start = timeline.len().saturating_sub(3);
        let recent: u64 = timeline[tail_start..].iter().map(|b| b.count).sum();
        let old: u64 = timeline[..timeline.len().min(3)]
            .iter()
            .map(|b| b.count)
            .sum();

        let recent_avg = recent as f64 / 3.0;
        let old_avg = old as f64 / 3.0;

        if recent_avg > old_avg * 1.5 {
            TrendDirection::Increasing
        } else if recent_avg < old_avg * 0.5 {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    } else {
        TrendDirection::Stable
    };

    TrendReport {
        trend,
        average_per_day,
        total_attacks: total,
        days_analyzed: days,
        timeline,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
