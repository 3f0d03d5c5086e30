//! Export command for CSV attendance reports.

use std::io::Write;

use anyhow::Result;
use att_core::{BreakPolicy, ExportFilter, render_csv};
use att_db::Database;

/// Renders the CSV for `filter`.
pub fn render(db: &Database, filter: &ExportFilter, policy: &BreakPolicy) -> Result<String> {
    filter.validate().map_err(att_core::AttendanceError::from)?;
    let records = db.list_attendance(&filter.to_query())?;
    Ok(render_csv(filter, &records, policy)?)
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    filter: &ExportFilter,
    policy: &BreakPolicy,
) -> Result<()> {
    let csv = render(db, filter, policy)?;
    writer.write_all(csv.as_bytes())?;
    Ok(())
}
