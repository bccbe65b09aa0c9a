//! Line-delimited JSON protocol. One request object per line, one response
//! line per request; subscribed change events are pushed in between.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Instant;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, warn};
use ulid::Ulid;

use crate::catalog::SearchParams;
use crate::ledger::{Ledger, LedgerError};
use crate::model::*;
use crate::observability;

pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Pending pushes per connection before forwarders wait on the socket.
const PUSH_BUFFER: usize = 256;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Request {
    SearchHotels(SearchParams),
    GetHotel {
        hotel_id: String,
    },
    ListReservations {
        hotel_id: String,
    },
    GetReservation {
        hotel_id: String,
        reservation_id: String,
    },
    CreateReservation {
        hotel_id: String,
        #[serde(default)]
        customer_name: String,
        #[serde(default)]
        start_date: String,
        #[serde(default)]
        end_date: String,
    },
    UpdateReservation {
        hotel_id: String,
        reservation_id: String,
        #[serde(default)]
        customer_name: String,
        #[serde(default)]
        start_date: String,
        #[serde(default)]
        end_date: String,
    },
    DeleteReservation {
        hotel_id: String,
        reservation_id: String,
    },
    Subscribe {
        hotel_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    fn success(status: u16, data: Value) -> Self {
        Self {
            ok: true,
            status,
            data: (!data.is_null()).then_some(data),
            error: None,
        }
    }

    fn failure(err: &RequestError) -> Self {
        Self {
            ok: false,
            status: err.status(),
            data: None,
            error: Some(ErrorBody {
                kind: err.kind().to_string(),
                message: err.to_string(),
            }),
        }
    }
}

/// Unsolicited lines sent to subscribers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum Push<'a> {
    Event(&'a ReservationEvent),
    Lagged(u64),
}

#[derive(Debug)]
pub enum RequestError {
    Ledger(LedgerError),
    BadRequest(String),
    Encode(serde_json::Error),
}

impl RequestError {
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::Ledger(e) => e.kind(),
            RequestError::BadRequest(_) => "bad_request",
            RequestError::Encode(_) => "internal",
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            RequestError::Ledger(e) => e.status(),
            RequestError::BadRequest(_) => 400,
            RequestError::Encode(_) => 500,
        }
    }
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::Ledger(e) => write!(f, "{e}"),
            RequestError::BadRequest(msg) => write!(f, "bad request: {msg}"),
            RequestError::Encode(e) => write!(f, "failed to encode response: {e}"),
        }
    }
}

impl std::error::Error for RequestError {}

impl From<LedgerError> for RequestError {
    fn from(e: LedgerError) -> Self {
        RequestError::Ledger(e)
    }
}

impl From<serde_json::Error> for RequestError {
    fn from(e: serde_json::Error) -> Self {
        RequestError::Encode(e)
    }
}

fn reservation_request(
    customer_name: String,
    start_date: String,
    end_date: String,
) -> Result<ReservationRequest, RequestError> {
    if customer_name.is_empty() || start_date.is_empty() || end_date.is_empty() {
        return Err(RequestError::BadRequest(
            "customerName, startDate and endDate are required".into(),
        ));
    }
    Ok(ReservationRequest {
        customer_name,
        start_date,
        end_date,
    })
}

/// Per-connection state: the shared ledger plus this client's subscriptions.
struct Connection {
    ledger: Arc<Ledger>,
    push_tx: mpsc::Sender<String>,
    subscriptions: HashMap<String, JoinHandle<()>>,
}

impl Drop for Connection {
    fn drop(&mut self) {
        for (_, handle) in self.subscriptions.drain() {
            handle.abort();
        }
    }
}

impl Connection {
    /// Ids that are not ULIDs cannot name a stored reservation. The hotel is
    /// checked first so an unknown hotel still reports `hotel_not_found`.
    fn reservation_id(&self, hotel_id: &str, raw: &str) -> Result<Ulid, RequestError> {
        self.ledger.hotel(hotel_id)?;
        Ulid::from_string(raw).map_err(|_| LedgerError::ReservationNotFound(raw.to_string()).into())
    }

    async fn execute(&mut self, req: Request) -> Result<(u16, Value), RequestError> {
        let ledger = &self.ledger;
        match req {
            Request::SearchHotels(params) => {
                let hotels = ledger.catalog().search(&params);
                Ok((200, serde_json::to_value(Hotels { hotels })?))
            }
            Request::GetHotel { hotel_id } => {
                let hotel = ledger.hotel(&hotel_id)?;
                Ok((200, serde_json::to_value(hotel)?))
            }
            Request::ListReservations { hotel_id } => {
                let reservations = ledger.list_reservations(&hotel_id).await?;
                Ok((200, serde_json::to_value(Reservations { reservations })?))
            }
            Request::GetReservation {
                hotel_id,
                reservation_id,
            } => {
                let id = self.reservation_id(&hotel_id, &reservation_id)?;
                let reservation = self.ledger.get_reservation(&hotel_id, id).await?;
                Ok((200, serde_json::to_value(reservation)?))
            }
            Request::CreateReservation {
                hotel_id,
                customer_name,
                start_date,
                end_date,
            } => {
                let request = reservation_request(customer_name, start_date, end_date)?;
                let reservation = ledger.create_reservation(&hotel_id, request).await?;
                Ok((201, serde_json::to_value(reservation)?))
            }
            Request::UpdateReservation {
                hotel_id,
                reservation_id,
                customer_name,
                start_date,
                end_date,
            } => {
                let request = reservation_request(customer_name, start_date, end_date)?;
                let id = self.reservation_id(&hotel_id, &reservation_id)?;
                let reservation = self.ledger.update_reservation(&hotel_id, id, request).await?;
                Ok((200, serde_json::to_value(reservation)?))
            }
            Request::DeleteReservation {
                hotel_id,
                reservation_id,
            } => {
                let id = self.reservation_id(&hotel_id, &reservation_id)?;
                self.ledger.delete_reservation(&hotel_id, id).await?;
                Ok((204, Value::Null))
            }
            Request::Subscribe { hotel_id } => {
                ledger.hotel(&hotel_id)?;
                if !self.subscriptions.contains_key(&hotel_id) {
                    let rx = ledger.notify.subscribe(&hotel_id);
                    let handle = tokio::spawn(forward_events(rx, self.push_tx.clone()));
                    self.subscriptions.insert(hotel_id.clone(), handle);
                    debug!(
                        hotel_id = %hotel_id,
                        subscribers = ledger.notify.subscriber_count(&hotel_id),
                        "subscribed"
                    );
                }
                Ok((200, serde_json::to_value(Subscribed { subscribed: hotel_id })?))
            }
        }
    }

    async fn respond(&mut self, line: &str) -> String {
        let start = Instant::now();
        let (op, outcome) = match serde_json::from_str::<Request>(line) {
            Ok(req) => {
                let op = observability::op_label(&req);
                (op, self.execute(req).await)
            }
            Err(e) => ("invalid", Err(RequestError::BadRequest(e.to_string()))),
        };
        let response = match outcome {
            Ok((status, data)) => Response::success(status, data),
            Err(e) => {
                debug!(op, kind = e.kind(), "request failed: {e}");
                Response::failure(&e)
            }
        };
        metrics::counter!(
            observability::REQUESTS_TOTAL,
            "op" => op,
            "status" => response.status.to_string()
        )
        .increment(1);
        metrics::histogram!(observability::REQUEST_DURATION_SECONDS, "op" => op)
            .record(start.elapsed().as_secs_f64());
        encode(&response)
    }
}

#[derive(Serialize)]
struct Hotels {
    hotels: Vec<crate::catalog::Hotel>,
}

#[derive(Serialize)]
struct Reservations {
    reservations: Vec<Reservation>,
}

#[derive(Serialize)]
struct Subscribed {
    subscribed: String,
}

fn encode(response: &Response) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        tracing::error!("response encoding failed: {e}");
        r#"{"ok":false,"status":500,"error":{"kind":"internal","message":"response encoding failed"}}"#
            .to_string()
    })
}

/// Pump one hotel's change feed into the connection's push channel.
async fn forward_events(mut rx: broadcast::Receiver<ReservationEvent>, tx: mpsc::Sender<String>) {
    loop {
        let encoded = match rx.recv().await {
            Ok(event) => serde_json::to_string(&Push::Event(&event)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("subscriber lagged, {skipped} events dropped");
                serde_json::to_string(&Push::Lagged(skipped))
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        let Ok(line) = encoded else { continue };
        if tx.send(line).await.is_err() {
            break;
        }
    }
}

/// Serve one client until it disconnects.
pub async fn process_connection<S>(socket: S, ledger: Arc<Ledger>) -> Result<(), LinesCodecError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(socket, LinesCodec::new_with_max_length(MAX_LINE_LEN));
    let (push_tx, mut push_rx) = mpsc::channel::<String>(PUSH_BUFFER);
    let mut conn = Connection {
        ledger,
        push_tx,
        subscriptions: HashMap::new(),
    };

    // Framed yields one `None` right after a decode error; that one is not EOF.
    let mut after_decode_error = false;

    loop {
        tokio::select! {
            frame = framed.next() => {
                let line = match frame {
                    None if after_decode_error => {
                        after_decode_error = false;
                        continue;
                    }
                    None => return Ok(()),
                    Some(Ok(line)) => line,
                    Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                        after_decode_error = true;
                        let err = RequestError::BadRequest(format!("line exceeds {MAX_LINE_LEN} bytes"));
                        framed.send(encode(&Response::failure(&err))).await?;
                        continue;
                    }
                    // LinesCodec reports a non-UTF-8 line as InvalidData and drops it
                    Some(Err(LinesCodecError::Io(e))) if e.kind() == ErrorKind::InvalidData => {
                        after_decode_error = true;
                        let err = RequestError::BadRequest(e.to_string());
                        framed.send(encode(&Response::failure(&err))).await?;
                        continue;
                    }
                    Some(Err(e)) => return Err(e),
                };
                if line.trim().is_empty() {
                    continue;
                }
                let response = conn.respond(&line).await;
                framed.send(response).await?;
            }
            Some(push) = push_rx.recv() => {
                framed.send(push).await?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Request {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn parse_search_with_filters() {
        let req = parse(r#"{"op":"search_hotels","city":"Seattle","minRating":4.0,"limit":5}"#);
        let Request::SearchHotels(params) = req else {
            panic!("expected search, got {req:?}");
        };
        assert_eq!(params.city.as_deref(), Some("Seattle"));
        assert_eq!(params.min_rating, Some(4.0));
        assert_eq!(params.limit, Some(5));
        assert_eq!(params.name, None);
    }

    #[test]
    fn parse_search_without_filters() {
        assert_eq!(
            parse(r#"{"op":"search_hotels"}"#),
            Request::SearchHotels(SearchParams::default())
        );
    }

    #[test]
    fn parse_camel_case_fields() {
        let req = parse(
            r#"{"op":"update_reservation","hotelId":"H1","reservationId":"R1",
                "customerName":"Bob","startDate":"2024-03-01","endDate":"2024-03-03"}"#,
        );
        assert_eq!(
            req,
            Request::UpdateReservation {
                hotel_id: "H1".into(),
                reservation_id: "R1".into(),
                customer_name: "Bob".into(),
                start_date: "2024-03-01".into(),
                end_date: "2024-03-03".into(),
            }
        );
    }

    #[test]
    fn create_missing_fields_default_to_empty() {
        let req = parse(r#"{"op":"create_reservation","hotelId":"H1"}"#);
        let Request::CreateReservation { customer_name, .. } = req else {
            panic!("expected create");
        };
        assert!(customer_name.is_empty());
    }

    #[test]
    fn unknown_op_rejected() {
        assert!(serde_json::from_str::<Request>(r#"{"op":"drop_tables"}"#).is_err());
    }

    #[test]
    fn required_fields_checked() {
        let err = reservation_request("".into(), "2024-01-01".into(), "2024-01-02".into()).unwrap_err();
        assert_eq!(err.kind(), "bad_request");
        assert_eq!(err.status(), 400);
        assert!(reservation_request("A".into(), "x".into(), "y".into()).is_ok());
    }

    #[test]
    fn failure_response_shape() {
        let err = RequestError::Ledger(LedgerError::OverlapConflict(Ulid::nil()));
        let json = serde_json::to_value(Response::failure(&err)).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["status"], 409);
        assert_eq!(json["error"]["kind"], "overlap_conflict");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn success_without_body_omits_data() {
        let json = serde_json::to_value(Response::success(204, Value::Null)).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["status"], 204);
        assert!(json.get("data").is_none());
    }

    #[test]
    fn push_lines_are_tagged() {
        let event = ReservationEvent::Deleted {
            hotel_id: "H1".into(),
            id: Ulid::nil(),
        };
        let json: Value = serde_json::from_str(&serde_json::to_string(&Push::Event(&event)).unwrap()).unwrap();
        assert_eq!(json["event"]["type"], "deleted");
        assert_eq!(serde_json::to_string(&Push::Lagged(3)).unwrap(), r#"{"lagged":3}"#);
    }
}
