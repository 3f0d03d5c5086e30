//! Resolution of device identifiers to active employees.

use crate::codec::decode_identifier;
use crate::error::{AttendanceError, AttendanceResult};
use crate::types::{Employee, Identifier};

/// Read access to active employees, provided by the employee-management store.
pub trait EmployeeDirectory {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Finds the active employee whose stored identifier equals `identifier`.
    fn find_active_by_identifier(&self, identifier: &str)
    -> Result<Option<Employee>, Self::Error>;

    /// Finds an active employee whose display name equals `name`, ignoring case.
    fn find_active_by_name(&self, name: &str) -> Result<Option<Employee>, Self::Error>;
}

/// Resolves a device identifier to an active employee.
///
/// An exact identifier match wins. Failing that, the identifier is decoded as
/// byte-pair hex and matched case-insensitively against display names.
pub fn resolve_employee<D>(directory: &D, identifier: &Identifier) -> AttendanceResult<Employee>
where
    D: EmployeeDirectory + ?Sized,
{
    if let Some(employee) = directory
        .find_active_by_identifier(identifier.as_str())
        .map_err(AttendanceError::storage)?
    {
        return Ok(employee);
    }

    let name = decode_identifier(identifier.as_str()).map_err(|source| {
        tracing::warn!(%identifier, error = %source, "identifier is not decodable");
        AttendanceError::Decode {
            identifier: identifier.to_string(),
            source,
        }
    })?;

    directory
        .find_active_by_name(&name)
        .map_err(AttendanceError::storage)?
        .ok_or_else(|| {
            tracing::warn!(%identifier, %name, "no active employee matches identifier");
            AttendanceError::NotFound {
                identifier: identifier.to_string(),
            }
        })
}
