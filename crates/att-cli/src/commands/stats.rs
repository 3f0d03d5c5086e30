//! Stats command for today's attendance counters.

use std::io::Write;

use anyhow::Result;
use att_db::Database;
use chrono::NaiveDate;

pub fn run<W: Write>(writer: &mut W, db: &Database, today: NaiveDate, json: bool) -> Result<()> {
    let stats = db.attendance_stats(today)?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&stats)?)?;
        return Ok(());
    }

    writeln!(writer, "Attendance for {}", stats.date)?;
    writeln!(writer, "Check-ins today:   {}", stats.today_checkins)?;
    writeln!(writer, "Currently present: {}", stats.currently_present)?;
    writeln!(writer, "Active employees:  {}", stats.total_employees)?;
    Ok(())
}
