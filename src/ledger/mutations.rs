use chrono::Utc;
use tracing::debug;
use ulid::Ulid;

use crate::model::*;

use super::conflict::{check_no_conflict, parse_range};
use super::{Ledger, LedgerError};

impl Ledger {
    pub async fn create_reservation(
        &self,
        hotel_id: &str,
        request: ReservationRequest,
    ) -> Result<Reservation, LedgerError> {
        self.hotel(hotel_id)?;
        let range = parse_range(&request.start_date, &request.end_date)?;

        let mut guard = self.state.write().await;
        let list = guard.entry(hotel_id.to_string()).or_default();
        check_no_conflict(list, &range, None)?;

        let now = Utc::now();
        let reservation = Reservation {
            id: Ulid::new(),
            hotel_id: hotel_id.to_string(),
            customer_name: request.customer_name,
            start_date: range.start,
            end_date: range.end,
            created_at: now,
            updated_at: now,
        };
        list.push(reservation.clone());
        debug!(hotel_id, reservation_id = %reservation.id, nights = range.nights(), "reservation created");

        self.publish(ReservationEvent::Created {
            reservation: reservation.clone(),
        });
        Ok(reservation)
    }

    /// Replace name and dates of an existing reservation. The reservation's own
    /// current range never conflicts with the new one.
    pub async fn update_reservation(
        &self,
        hotel_id: &str,
        id: Ulid,
        request: ReservationRequest,
    ) -> Result<Reservation, LedgerError> {
        self.hotel(hotel_id)?;
        let range = parse_range(&request.start_date, &request.end_date)?;

        let mut guard = self.state.write().await;
        let not_found = || LedgerError::ReservationNotFound(id.to_string());
        let list = guard.get_mut(hotel_id).ok_or_else(not_found)?;
        let pos = list.iter().position(|r| r.id == id).ok_or_else(not_found)?;
        check_no_conflict(list, &range, Some(id))?;

        let entry = &mut list[pos];
        entry.customer_name = request.customer_name;
        entry.start_date = range.start;
        entry.end_date = range.end;
        entry.updated_at = Utc::now();
        let updated = entry.clone();
        debug!(hotel_id, reservation_id = %id, "reservation updated");

        self.publish(ReservationEvent::Updated {
            reservation: updated.clone(),
        });
        Ok(updated)
    }

    pub async fn delete_reservation(&self, hotel_id: &str, id: Ulid) -> Result<(), LedgerError> {
        self.hotel(hotel_id)?;

        let mut guard = self.state.write().await;
        let not_found = || LedgerError::ReservationNotFound(id.to_string());
        let list = guard.get_mut(hotel_id).ok_or_else(not_found)?;
        let pos = list.iter().position(|r| r.id == id).ok_or_else(not_found)?;
        list.remove(pos);
        debug!(hotel_id, reservation_id = %id, "reservation deleted");

        self.publish(ReservationEvent::Deleted {
            hotel_id: hotel_id.to_string(),
            id,
        });
        Ok(())
    }
}
