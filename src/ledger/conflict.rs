use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

use super::error::DateField;
use super::LedgerError;

/// Strict `YYYY-MM-DD`: the input must be the canonical rendering of a real date.
pub(crate) fn parse_date(field: DateField, raw: &str) -> Result<NaiveDate, LedgerError> {
    let invalid = || LedgerError::InvalidDate {
        field,
        value: raw.to_string(),
    };
    let date = NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| invalid())?;
    // chrono accepts unpadded fields ("2024-3-1"); reject anything non-canonical
    if date.format(DATE_FORMAT).to_string() != raw {
        return Err(invalid());
    }
    Ok(date)
}

/// Parse both ends (start first) and require `end > start`.
pub(crate) fn parse_range(start: &str, end: &str) -> Result<DateRange, LedgerError> {
    let start = parse_date(DateField::StartDate, start)?;
    let end = parse_date(DateField::EndDate, end)?;
    if end <= start {
        return Err(LedgerError::InvalidDateRange { start, end });
    }
    Ok(DateRange::new(start, end))
}

/// Scan every reservation of the hotel; `exclude` skips the one being updated.
pub(crate) fn check_no_conflict(
    existing: &[Reservation],
    range: &DateRange,
    exclude: Option<Ulid>,
) -> Result<(), LedgerError> {
    for r in existing {
        if Some(r.id) == exclude {
            continue;
        }
        if r.range().overlaps(range) {
            metrics::counter!(crate::observability::OVERLAP_CONFLICTS_TOTAL).increment(1);
            return Err(LedgerError::OverlapConflict(r.id));
        }
    }
    Ok(())
}
