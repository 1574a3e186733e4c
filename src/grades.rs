use serde::Serialize;

/// Letter grade for a raw score out of a maximum.
///
/// A missing or zero value on either side yields no grade at all (the record
/// form treats an empty field and a literal 0 the same way). Band boundaries
/// are inclusive on the lower bound and compared without rounding.
pub fn letter_grade(score: Option<f64>, max_score: Option<f64>) -> Option<&'static str> {
    let (score, max) = match (score, max_score) {
        (Some(s), Some(m)) if s != 0.0 && m != 0.0 => (s, m),
        _ => return None,
    };
    let pct = score / max * 100.0;
    Some(if pct >= 90.0 {
        "A"
    } else if pct >= 80.0 {
        "B"
    } else if pct >= 70.0 {
        "C"
    } else if pct >= 60.0 {
        "D"
    } else {
        "F"
    })
}

/// Whole-number percentage stored on an exam record at write time.
/// 0 when the maximum is absent or non-positive.
pub fn percentage(score: f64, max_score: f64) -> i64 {
    if max_score <= 0.0 {
        return 0;
    }
    (score / max_score * 100.0).round() as i64
}

/// Rounded mean over stored percentages; 0 for the empty set, never NaN.
///
/// Averages always run over the `percentage` field persisted with each exam,
/// not recomputed from raw scores, so they stay consistent with what was
/// written at record time.
pub fn average_percentage(percentages: &[i64]) -> i64 {
    if percentages.is_empty() {
        return 0;
    }
    let sum: i64 = percentages.iter().sum();
    (sum as f64 / percentages.len() as f64).round() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub present_count: i64,
    pub absent_count: i64,
    pub total_count: i64,
    pub attendance_rate: i64,
}

pub fn attendance_summary<'a, I>(statuses: I) -> AttendanceSummary
where
    I: IntoIterator<Item = &'a str>,
{
    let mut present_count: i64 = 0;
    let mut absent_count: i64 = 0;
    let mut total_count: i64 = 0;
    for status in statuses {
        total_count += 1;
        match status {
            "Present" => present_count += 1,
            "Absent" => absent_count += 1,
            _ => {}
        }
    }
    let attendance_rate = if total_count > 0 {
        (present_count as f64 / total_count as f64 * 100.0).round() as i64
    } else {
        0
    };
    AttendanceSummary {
        present_count,
        absent_count,
        total_count,
        attendance_rate,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedStudent {
    pub student_id: String,
    pub name: String,
    pub class: String,
    pub average: i64,
    /// Zero averages stay in the ranking; display logic filters on this flag.
    pub has_results: bool,
}

/// Descending ranking by average, stable so ties keep roster order.
pub fn top_performers(mut rows: Vec<RankedStudent>, n: usize) -> Vec<RankedStudent> {
    rows.sort_by(|a, b| b.average.cmp(&a.average));
    rows.truncate(n);
    rows
}
