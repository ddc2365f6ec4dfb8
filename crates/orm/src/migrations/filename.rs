//! Migration file name parsing
//!
//! File names follow `{version}_{title}.{up|down}.{extension}`, for example
//! `3_add_orders_index.up.sql`.

use std::path::PathBuf;

use super::definitions::{MigrationDescriptor, MigrationDirection};
use crate::error::FormatError;

/// Parse a bare file name into a descriptor.
///
/// `file_path` is set to the file name; the loader replaces it with the
/// resolved path.
pub fn parse_file_name(file_name: &str) -> Result<MigrationDescriptor, FormatError> {
    let parts: Vec<&str> = file_name.split('.').collect();
    let [prefix, direction, extension] = parts.as_slice() else {
        return Err(FormatError::SegmentCount(file_name.to_string()));
    };

    let (sequence_number, name) = parse_prefix(prefix)?;
    let direction = parse_direction(direction)?;

    Ok(MigrationDescriptor {
        sequence_number,
        name: name.to_string(),
        file_name: file_name.to_string(),
        file_path: PathBuf::from(file_name),
        direction,
        extension: extension.to_string(),
    })
}

/// Split `{number}_{name}` on the first underscore
fn parse_prefix(prefix: &str) -> Result<(i64, &str), FormatError> {
    let (number, name) = prefix
        .split_once('_')
        .ok_or_else(|| FormatError::MissingSeparator(prefix.to_string()))?;

    let sequence_number = number
        .parse::<i64>()
        .map_err(|source| FormatError::InvalidNumber {
            value: number.to_string(),
            source,
        })?;

    Ok((sequence_number, name))
}

fn parse_direction(direction: &str) -> Result<MigrationDirection, FormatError> {
    match direction.to_lowercase().as_str() {
        "up" => Ok(MigrationDirection::Up),
        "down" => Ok(MigrationDirection::Down),
        other => Err(FormatError::InvalidDirection(other.to_string())),
    }
}
