use super::model::MeasurementTable;
use crate::error::InputError;

// ---------------------------------------------------------------------------
// Incomplete-row filter
// ---------------------------------------------------------------------------

/// Indices of rows that hold a missing value in at least one signal.
pub fn incomplete_rows(table: &MeasurementTable) -> Result<Vec<usize>, InputError> {
    let rows = table.row_count()?;
    Ok((0..rows)
        .filter(|&row| table.signals.values().any(|values| values[row].is_none()))
        .collect())
}

/// Return a copy of `table` without any row that is missing a value in any
/// signal. Removal is applied to every signal at once so the arrays stay
/// aligned, and surviving rows keep their relative order.
///
/// Rows are collected in one pass and deleted back to front, so earlier
/// deletions never shift the indices still to be removed.
pub fn drop_incomplete_rows(table: &MeasurementTable) -> Result<MeasurementTable, InputError> {
    let to_remove = incomplete_rows(table)?;
    let mut cleaned = table.clone();
    for &row in to_remove.iter().rev() {
        for values in cleaned.signals.values_mut() {
            values.remove(row);
        }
    }
    if !to_remove.is_empty() {
        log::debug!(
            "dropped {} incomplete rows, {} remain",
            to_remove.len(),
            cleaned.row_count()?
        );
    }
    Ok(cleaned)
}
