use serde::Serialize;

use crate::grades::AttendanceSummary;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRow {
    pub exam_id: String,
    pub exam_name: String,
    pub subject: String,
    pub date: String,
    pub score: f64,
    pub max_score: f64,
    pub percentage: i64,
    pub grade: Option<String>,
    pub notes: Option<String>,
}

/// Fixed report structure for one student: header, info block, three stat
/// cards, exam table, attendance breakdown, narrative. The HTML variants are
/// serialized from this same model.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportModel {
    pub student_id: String,
    pub name: String,
    pub class: String,
    pub email: String,
    pub phone: String,
    pub average_score: i64,
    pub attendance: AttendanceSummary,
    pub exams: Vec<ExamRow>,
    pub narrative: String,
}

/// Narrative band sentence for the analysis section. These bands (80/70/60)
/// are looser than the letter-grade bands on purpose: the letter is a per-exam
/// fact, the narrative judges the whole average.
pub fn performance_narrative(average: i64) -> &'static str {
    if average >= 80 {
        "Excellent academic performance with strong attendance."
    } else if average >= 70 {
        "Good academic performance with satisfactory attendance."
    } else if average >= 60 {
        "Average academic performance with room for improvement."
    } else {
        "Below average academic performance. Additional support recommended."
    }
}

/// `Student_Report_<Name_With_Underscores>_<ISO date>.html` — whitespace runs
/// in the name collapse to single underscores.
pub fn export_file_name(name: &str, date: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_ws = false;
    for ch in name.chars() {
        if ch.is_whitespace() {
            if !in_ws {
                slug.push('_');
            }
            in_ws = true;
        } else {
            slug.push(ch);
            in_ws = false;
        }
    }
    format!("Student_Report_{}_{}.html", slug, date)
}

fn esc(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

const REPORT_CSS: &str = "\
body { margin: 0; padding: 20px; font-family: Arial, sans-serif; color: #000; background: white; }\n\
.report-container { max-width: 800px; margin: 0 auto; padding: 20px; background: white; }\n\
.report-header { text-align: center; border-bottom: 3px solid #133215; padding-bottom: 20px; margin-bottom: 30px; }\n\
.student-info { background: #f8f9fa; padding: 20px; border-radius: 8px; margin-bottom: 30px; }\n\
.stats-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(250px, 1fr)); gap: 20px; margin: 30px 0; }\n\
.stat-card { background: white; border: 1px solid #ddd; border-radius: 8px; padding: 20px; text-align: center; }\n\
table { width: 100%; border-collapse: collapse; margin: 20px 0; }\n\
th { background: #133215; color: #F3E8D3; padding: 12px; text-align: left; }\n\
td { padding: 12px; border-bottom: 1px solid #ddd; }\n\
tr:nth-child(even) { background: #f8f9fa; }\n\
.grade-A { color: #28a745; font-weight: bold; }\n\
.grade-B { color: #007bff; font-weight: bold; }\n\
.grade-C { color: #ffc107; font-weight: bold; }\n\
.grade-D { color: #fd7e14; font-weight: bold; }\n\
.grade-F { color: #dc3545; font-weight: bold; }\n\
h1, h2, h3 { color: #133215; }\n\
.date-stamp { text-align: right; margin-top: 40px; font-size: 14px; color: #666; }\n";

// Write into a blank popup: print on load, close shortly after.
const PRINT_SCRIPT: &str = "\
<script>\n\
window.onload = function() {\n\
  window.focus();\n\
  window.print();\n\
  setTimeout(function() { window.close(); }, 500);\n\
};\n\
</script>\n";

/// Standalone UTF-8 HTML document for the report. `for_print` adds the
/// auto-print script used by the popup variant; the download variant omits it.
pub fn render_html(model: &ReportModel, generated_on: &str, for_print: bool) -> String {
    let mut html = String::with_capacity(8 * 1024);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!(
        "<title>Student Report - {}</title>\n",
        esc(&model.name)
    ));
    html.push_str("<style>\n");
    html.push_str(REPORT_CSS);
    html.push_str("</style>\n</head>\n<body>\n<div class=\"report-container\">\n");

    html.push_str("<div class=\"report-header\">\n<h1>Student Performance Report</h1>\n");
    html.push_str(&format!("<h2>{}</h2>\n", esc(&model.name)));
    html.push_str(&format!("<p>Class: {}</p>\n", esc(&model.class)));
    html.push_str("<p>Report Period: All Time</p>\n</div>\n");

    html.push_str("<div class=\"student-info\">\n<h3>Student Information</h3>\n");
    html.push_str(&format!(
        "<p><strong>Full Name:</strong> {}</p>\n<p><strong>Class:</strong> {}</p>\n",
        esc(&model.name),
        esc(&model.class)
    ));
    html.push_str(&format!(
        "<p><strong>Email:</strong> {}</p>\n<p><strong>Phone:</strong> {}</p>\n</div>\n",
        esc(&model.email),
        esc(&model.phone)
    ));

    html.push_str("<div class=\"stats-grid\">\n");
    html.push_str(&format!(
        "<div class=\"stat-card\">\n<h4>Academic Performance</h4>\n<p><strong>{}%</strong></p>\n<p>Average Score</p>\n</div>\n",
        model.average_score
    ));
    html.push_str(&format!(
        "<div class=\"stat-card\">\n<h4>Attendance Rate</h4>\n<p><strong>{}%</strong></p>\n<p>Overall Attendance</p>\n</div>\n",
        model.attendance.attendance_rate
    ));
    html.push_str(&format!(
        "<div class=\"stat-card\">\n<h4>Exams Taken</h4>\n<p><strong>{}</strong></p>\n<p>Total Tests/Exams</p>\n</div>\n",
        model.exams.len()
    ));
    html.push_str("</div>\n");

    html.push_str("<h3>Exam Results</h3>\n");
    if model.exams.is_empty() {
        html.push_str("<p>No exam results recorded for this student.</p>\n");
    } else {
        html.push_str(
            "<table>\n<thead>\n<tr><th>Exam Name</th><th>Subject</th><th>Date</th><th>Score</th><th>Grade</th></tr>\n</thead>\n<tbody>\n",
        );
        for exam in &model.exams {
            let grade = exam.grade.as_deref().unwrap_or("");
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}/{} ({}%)</td><td class=\"grade-{}\">{}</td></tr>\n",
                esc(&exam.exam_name),
                esc(&exam.subject),
                esc(&exam.date),
                exam.score,
                exam.max_score,
                exam.percentage,
                esc(grade),
                esc(grade)
            ));
        }
        html.push_str("</tbody>\n</table>\n");
    }

    html.push_str("<h3>Attendance Summary</h3>\n");
    if model.attendance.total_count > 0 {
        html.push_str(&format!(
            "<p><strong>{}</strong> Days Present &middot; <strong>{}</strong> Days Absent &middot; <strong>{}%</strong> Attendance Rate</p>\n",
            model.attendance.present_count,
            model.attendance.absent_count,
            model.attendance.attendance_rate
        ));
    } else {
        html.push_str("<p>No attendance records for this student.</p>\n");
    }

    html.push_str("<h3>Overall Performance Analysis</h3>\n");
    html.push_str(&format!(
        "<p>{} has an overall average score of <strong>{}%</strong> across all exams. \
Attendance rate is <strong>{}%</strong> with <strong>{}</strong> days present out of \
<strong>{}</strong> total recorded days.</p>\n",
        esc(&model.name),
        model.average_score,
        model.attendance.attendance_rate,
        model.attendance.present_count,
        model.attendance.total_count
    ));
    html.push_str(&format!("<p>{}</p>\n", esc(&model.narrative)));

    html.push_str(&format!(
        "<div class=\"date-stamp\">Generated on: {}</div>\n",
        esc(generated_on)
    ));
    html.push_str("</div>\n");
    if for_print {
        html.push_str(PRINT_SCRIPT);
    }
    html.push_str("</body>\n</html>\n");
    html
}
