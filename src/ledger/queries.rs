use ulid::Ulid;

use crate::model::*;

use super::{Ledger, LedgerError};

impl Ledger {
    /// All reservations for the hotel in insertion order; empty if it has none yet.
    pub async fn list_reservations(&self, hotel_id: &str) -> Result<Vec<Reservation>, LedgerError> {
        self.hotel(hotel_id)?;
        let guard = self.state.read().await;
        Ok(guard.get(hotel_id).cloned().unwrap_or_default())
    }

    pub async fn get_reservation(&self, hotel_id: &str, id: Ulid) -> Result<Reservation, LedgerError> {
        self.hotel(hotel_id)?;
        let guard = self.state.read().await;
        guard
            .get(hotel_id)
            .and_then(|list| list.iter().find(|r| r.id == id))
            .cloned()
            .ok_or_else(|| LedgerError::ReservationNotFound(id.to_string()))
    }

    /// Total number of stored reservations across all hotels.
    pub async fn reservation_count(&self) -> usize {
        self.state.read().await.values().map(Vec::len).sum()
    }
}
