mod conflict;
mod error;
mod mutations;
mod queries;

pub use error::{DateField, LedgerError};

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::catalog::{Hotel, HotelCatalog};
use crate::model::*;
use crate::notify::NotifyHub;

/// hotel id → reservations in insertion order.
type Bookings = HashMap<String, Vec<Reservation>>;

/// In-memory reservation store for every hotel in the catalog.
///
/// One `RwLock` covers the whole map. Reads share it; create, update and
/// delete hold the write side from the overlap check through the mutation,
/// so two writers can never both validate against the same stale view.
/// Nothing else can reach the map: reads hand out clones.
///
/// `customer_name` is stored as given. Callers validate it is non-empty;
/// the wire layer rejects empty names with `bad_request` before they get here.
pub struct Ledger {
    catalog: Arc<HotelCatalog>,
    state: RwLock<Bookings>,
    pub notify: Arc<NotifyHub>,
}

impl Ledger {
    pub fn new(catalog: Arc<HotelCatalog>, notify: Arc<NotifyHub>) -> Self {
        Self {
            catalog,
            state: RwLock::new(HashMap::new()),
            notify,
        }
    }

    pub fn catalog(&self) -> &HotelCatalog {
        &self.catalog
    }

    /// Catalog precondition shared by every operation. Runs before any lock is taken.
    pub fn hotel(&self, hotel_id: &str) -> Result<&Hotel, LedgerError> {
        self.catalog
            .lookup(hotel_id)
            .ok_or_else(|| LedgerError::HotelNotFound(hotel_id.to_string()))
    }

    /// Commit hook for a mutation: metrics + change feed. Caller still holds the write lock.
    pub(super) fn publish(&self, event: ReservationEvent) {
        let gauge = metrics::gauge!(crate::observability::RESERVATIONS_ACTIVE);
        match &event {
            ReservationEvent::Created { .. } => gauge.increment(1.0),
            ReservationEvent::Deleted { .. } => gauge.decrement(1.0),
            ReservationEvent::Updated { .. } => {}
        }
        self.notify.send(event.hotel_id(), &event);
    }
}
