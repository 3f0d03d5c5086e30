//! Employee management commands.

use std::io::Write;

use anyhow::Result;
use att_core::{AttendanceError, Employee, provision_identifier};
use att_db::{Database, NewEmployee};

/// Fields for a new employee as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct AddEmployee {
    pub name: String,
    pub identifier: Option<String>,
    pub role: Option<String>,
    pub department: Option<String>,
    pub external_id: Option<String>,
    pub active: bool,
}

/// Provisions an identifier and stores the employee.
pub fn add(db: &mut Database, request: &AddEmployee) -> Result<Employee> {
    let identifier = provision_identifier(&request.name, request.identifier.as_deref(), |c| {
        db.identifier_exists(c).map_err(AttendanceError::storage)
    })?;

    let employee = db.insert_employee(&NewEmployee {
        name: request.name.trim().to_string(),
        identifier,
        active: request.active,
        role: request.role.clone(),
        department: request.department.clone(),
        external_id: request.external_id.clone(),
    })?;
    tracing::info!(id = %employee.id, identifier = %employee.identifier, "added employee");
    Ok(employee)
}

pub fn run_add<W: Write>(writer: &mut W, db: &mut Database, request: &AddEmployee) -> Result<()> {
    let employee = add(db, request)?;
    writeln!(
        writer,
        "Added {} (#{}) with identifier {}",
        employee.name, employee.id, employee.identifier
    )?;
    Ok(())
}

pub fn run_list<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let employees = db.list_employees()?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&employees)?)?;
        return Ok(());
    }

    if employees.is_empty() {
        writeln!(writer, "No employees.")?;
        return Ok(());
    }

    for employee in &employees {
        let mut line = format!(
            "#{:<4} {:<16}  {}",
            employee.id.get(),
            employee.identifier,
            employee.name
        );
        if let Some(department) = &employee.department {
            line.push_str(&format!("  [{department}]"));
        }
        if !employee.active {
            line.push_str("  (inactive)");
        }
        writeln!(writer, "{line}")?;
    }
    Ok(())
}
