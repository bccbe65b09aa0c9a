use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Canonical text form of a calendar date.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Half-open date range `[start, end)`. `end` is the checkout day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start < end, "DateRange start must be before end");
        Self { start, end }
    }

    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Ranges that only touch (one ends on the day the other starts) do not overlap.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A stored booking. Only the ledger constructs or mutates these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Ulid,
    pub hotel_id: String,
    pub customer_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }
}

/// Caller-supplied fields for create and update. Dates are still raw text here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    pub customer_name: String,
    pub start_date: String,
    pub end_date: String,
}

impl ReservationRequest {
    pub fn new(
        customer_name: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            customer_name: customer_name.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }
}

/// Change feed entry, published per hotel after each committed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReservationEvent {
    Created { reservation: Reservation },
    Updated { reservation: Reservation },
    #[serde(rename_all = "camelCase")]
    Deleted { hotel_id: String, id: Ulid },
}

impl ReservationEvent {
    pub fn hotel_id(&self) -> &str {
        match self {
            ReservationEvent::Created { reservation } | ReservationEvent::Updated { reservation } => {
                &reservation.hotel_id
            }
            ReservationEvent::Deleted { hotel_id, .. } => hotel_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::new(d(start), d(end))
    }

    #[test]
    fn range_basics() {
        let r = range("2024-03-01", "2024-03-05");
        assert_eq!(r.nights(), 4);
    }

    #[test]
    fn range_overlap() {
        let a = range("2024-03-01", "2024-03-05");
        let b = range("2024-03-04", "2024-03-06");
        let c = range("2024-03-05", "2024-03-10");
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // touching, not overlapping
        assert!(b.overlaps(&c));
    }

    #[test]
    fn range_overlap_containment() {
        let outer = range("2024-01-01", "2024-02-01");
        let inner = range("2024-01-10", "2024-01-11");
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
        assert!(outer.overlaps(&outer));
    }

    #[test]
    fn range_overlap_is_symmetric() {
        let base = d("2024-06-01");
        let mut ranges = Vec::new();
        for start in 0..8 {
            for len in 1..5 {
                let s = base + chrono::Days::new(start);
                ranges.push(DateRange::new(s, s + chrono::Days::new(len)));
            }
        }
        for a in &ranges {
            for b in &ranges {
                assert_eq!(a.overlaps(b), b.overlaps(a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn range_overlap_across_year_boundary() {
        let a = range("2024-12-30", "2025-01-02");
        let b = range("2025-01-01", "2025-01-03");
        let c = range("2025-01-02", "2025-01-03");
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert_eq!(a.nights(), 3);
    }

    #[test]
    fn reservation_serializes_camel_case_with_canonical_dates() {
        let now = Utc::now();
        let r = Reservation {
            id: Ulid::new(),
            hotel_id: "H1".into(),
            customer_name: "Alice".into(),
            start_date: d("2024-03-01"),
            end_date: d("2024-03-05"),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["hotelId"], "H1");
        assert_eq!(json["customerName"], "Alice");
        assert_eq!(json["startDate"], "2024-03-01");
        assert_eq!(json["endDate"], "2024-03-05");
        assert_eq!(json["id"], r.id.to_string());
        assert!(json["createdAt"].as_str().unwrap().ends_with('Z'));
        assert_eq!(r.range(), range("2024-03-01", "2024-03-05"));
    }

    #[test]
    fn deleted_event_shape() {
        let id = Ulid::new();
        let event = ReservationEvent::Deleted { hotel_id: "H1".into(), id };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "deleted");
        assert_eq!(json["hotelId"], "H1");
        assert_eq!(event.hotel_id(), "H1");
    }
}
