//! Burnout assessment command.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};

use wl_core::burnout::{self, Severity};
use wl_core::UserId;
use wl_db::Database;

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    user: &UserId,
    json: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    let date = now.date_naive();
    let inputs = burnout::gather_inputs(db, user, date, now)?;
    let assessment = burnout::assess(&inputs);

    if json {
        serde_json::to_writer_pretty(&mut *writer, &assessment)?;
        writeln!(writer)?;
        return Ok(());
    }

    writeln!(
        writer,
        "Burnout risk for {user}: {} (score {})",
        assessment.level.as_str(),
        assessment.score
    )?;

    if assessment.factors.is_empty() {
        writeln!(writer, "No risk factors detected.")?;
    } else {
        writeln!(writer, "Factors:")?;
        for factor in &assessment.factors {
            writeln!(
                writer,
                "- [{}] {} (+{})",
                severity_label(factor.severity),
                factor.detail,
                factor.score
            )?;
        }
    }

    if !assessment.recommendations.is_empty() {
        writeln!(writer, "Recommendations:")?;
        for recommendation in &assessment.recommendations {
            writeln!(writer, "- {recommendation}")?;
        }
    }
    Ok(())
}

const fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Medium => "medium",
        Severity::High => "high",
        Severity::Critical => "critical",
    }
}
