use std::net::SocketAddr;

use crate::wire::Request;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total requests handled. Labels: op, status.
pub const REQUESTS_TOTAL: &str = "hotelbook_requests_total";

/// Histogram: request latency in seconds. Labels: op.
pub const REQUEST_DURATION_SECONDS: &str = "hotelbook_request_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "hotelbook_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "hotelbook_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "hotelbook_connections_rejected_total";

// ── Ledger ──────────────────────────────────────────────────────

/// Gauge: reservations currently stored across all hotels.
pub const RESERVATIONS_ACTIVE: &str = "hotelbook_reservations_active";

/// Counter: create/update attempts rejected for overlapping an existing booking.
pub const OVERLAP_CONFLICTS_TOTAL: &str = "hotelbook_overlap_conflicts_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Map a Request variant to a short label for metrics.
pub fn op_label(req: &Request) -> &'static str {
    match req {
        Request::SearchHotels(_) => "search_hotels",
        Request::GetHotel { .. } => "get_hotel",
        Request::ListReservations { .. } => "list_reservations",
        Request::GetReservation { .. } => "get_reservation",
        Request::CreateReservation { .. } => "create_reservation",
        Request::UpdateReservation { .. } => "update_reservation",
        Request::DeleteReservation { .. } => "delete_reservation",
        Request::Subscribe { .. } => "subscribe",
    }
}
