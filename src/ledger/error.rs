use chrono::NaiveDate;
use ulid::Ulid;

/// Which request field failed date parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    StartDate,
    EndDate,
}

impl DateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateField::StartDate => "startDate",
            DateField::EndDate => "endDate",
        }
    }
}

impl std::fmt::Display for DateField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    HotelNotFound(String),
    ReservationNotFound(String),
    InvalidDate { field: DateField, value: String },
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    /// Carries the id of the existing reservation that blocks the range.
    OverlapConflict(Ulid),
}

impl LedgerError {
    /// Stable machine-readable tag for callers.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::HotelNotFound(_) => "hotel_not_found",
            LedgerError::ReservationNotFound(_) => "reservation_not_found",
            LedgerError::InvalidDate { .. } => "invalid_date",
            LedgerError::InvalidDateRange { .. } => "invalid_date_range",
            LedgerError::OverlapConflict(_) => "overlap_conflict",
        }
    }

    /// HTTP-style status a transport should report.
    pub fn status(&self) -> u16 {
        match self {
            LedgerError::HotelNotFound(_) | LedgerError::ReservationNotFound(_) => 404,
            LedgerError::InvalidDate { .. } | LedgerError::InvalidDateRange { .. } => 400,
            LedgerError::OverlapConflict(_) => 409,
        }
    }
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::HotelNotFound(id) => write!(f, "hotel not found: {id}"),
            LedgerError::ReservationNotFound(id) => write!(f, "reservation not found: {id}"),
            LedgerError::InvalidDate { field, value } => {
                write!(f, "invalid {field}: {value:?} (expected YYYY-MM-DD)")
            }
            LedgerError::InvalidDateRange { start, end } => {
                write!(f, "end date {end} must be after start date {start}")
            }
            LedgerError::OverlapConflict(id) => {
                write!(f, "reservation dates overlap with existing booking {id}")
            }
        }
    }
}

impl std::error::Error for LedgerError {}
