//! WebSocket connection manager for kiln services.
//!
//! The native counterpart of the `websocket_manager` module that compiled
//! notebooks import: clients grouped into rooms, addressed sends,
//! broadcast, and error close.
//!
//! ```rust,ignore
//! async fn ws_handler(ws: WebSocketUpgrade, State(manager): State<Arc<ConnectionManager<SocketConnection>>>) -> impl IntoResponse {
//!     ws.on_upgrade(move |socket| async move {
//!         let (conn, mut incoming) = SocketConnection::split(socket);
//!         let conn = Arc::new(conn);
//!         let Ok(_client_id) = manager.connect(conn.clone(), None, None).await else { return };
//!         while let Some(Ok(Message::Text(text))) = incoming.next().await {
//!             let value = serde_json::from_str(&text).unwrap_or(Value::String(text.to_string()));
//!             let _ = manager.route_message(Outbound::from_value(value)).await;
//!         }
//!         manager.disconnect(&conn, None).await;
//!     })
//! }
//! ```

mod connection;
mod error;
mod manager;
mod message;

pub use connection::{Connection, SocketConnection};
pub use error::{RuntimeError, RuntimeResult};
pub use manager::{ConnectionManager, DEFAULT_CLOSE_CODE, DEFAULT_ROOM};
pub use message::{Outbound, Target};
