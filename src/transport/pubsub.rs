//! Log subscriptions over the node's WebSocket pubsub endpoint.
//!
//! Each subscription owns one socket and one task. `logsSubscribe` is
//! confirmed before the task starts; the task then hands every
//! `logsNotification` to the handler and reconnects with a growing delay
//! when the socket drops. A rejection from the node is final.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async, tungstenite, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};

use crate::error::TransportError;
use crate::models::{Commitment, LogNotification};
use crate::transport::{LogHandler, SubscriptionId, TransportResult};

const MAX_RECONNECT_ATTEMPTS: u32 = 10;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type TaskMap = Arc<Mutex<HashMap<SubscriptionId, JoinHandle<()>>>>;

#[derive(Debug, Deserialize)]
struct RawNotification {
    method: String,
    params: RawParams,
}

#[derive(Debug, Deserialize)]
struct RawParams {
    result: RawResult,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    context: RawContext,
    value: RawLogs,
}

#[derive(Debug, Deserialize)]
struct RawContext {
    slot: u64,
}

#[derive(Debug, Deserialize)]
struct RawLogs {
    signature: String,
    #[serde(default)]
    err: Option<Value>,
    #[serde(default)]
    logs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawRpcError {
    code: i64,
    message: String,
}

/// What a single text frame from the pubsub socket carries.
#[derive(Debug)]
enum Frame {
    Notification(LogNotification),
    Confirmed(u64),
    Rejected(TransportError),
    Other,
}

fn parse_frame(text: &str) -> Frame {
    if let Ok(raw) = serde_json::from_str::<RawNotification>(text) {
        if raw.method == "logsNotification" {
            let RawResult { context, value } = raw.params.result;
            return Frame::Notification(LogNotification {
                slot: context.slot,
                signature: value.signature,
                err: value.err,
                logs: value.logs,
            });
        }
        return Frame::Other;
    }

    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return Frame::Other;
    };
    if let Some(id) = value.get("result").and_then(Value::as_u64) {
        return Frame::Confirmed(id);
    }
    match value
        .get("error")
        .cloned()
        .map(serde_json::from_value::<RawRpcError>)
    {
        Some(Ok(err)) => Frame::Rejected(TransportError::Rpc {
            code: err.code,
            message: err.message,
        }),
        _ => Frame::Other,
    }
}

/// Decodes a `logsNotification` frame; anything else yields `None`.
pub fn parse_log_notification(text: &str) -> Option<LogNotification> {
    match parse_frame(text) {
        Frame::Notification(notification) => Some(notification),
        _ => None,
    }
}

fn subscribe_request(topic: &str, commitment: Commitment) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "logsSubscribe",
        "params": [
            { "mentions": [topic] },
            { "commitment": commitment.as_str() }
        ]
    })
    .to_string()
}

fn socket_error(err: tungstenite::Error) -> TransportError {
    TransportError::WebSocket(err.to_string())
}

/// Connects, sends `request` and waits for the node to confirm it.
///
/// A rejection comes back as `TransportError::Rpc`; anything else that ends
/// the handshake early is a `WebSocket` error.
async fn open_stream(ws_url: &str, request: &str, handler: &LogHandler) -> TransportResult<WsStream> {
    let (mut ws, _) = connect_async(ws_url).await.map_err(socket_error)?;
    ws.send(Message::Text(request.to_string().into()))
        .await
        .map_err(socket_error)?;

    while let Some(msg) = ws.next().await {
        let Message::Text(text) = msg.map_err(socket_error)? else {
            continue;
        };
        match parse_frame(text.as_str()) {
            Frame::Confirmed(server_id) => {
                debug!(server_id, "Log subscription confirmed");
                return Ok(ws);
            }
            Frame::Rejected(err) => return Err(err),
            Frame::Notification(notification) => handler(notification),
            Frame::Other => debug!(frame = text.as_str(), "Ignoring pubsub frame"),
        }
    }

    Err(TransportError::WebSocket(
        "connection closed before the subscription was confirmed".to_string(),
    ))
}

/// Streams a confirmed connection until the server closes it.
///
/// Returns the number of notifications delivered.
async fn stream_logs(mut ws: WsStream, handler: &LogHandler) -> TransportResult<u64> {
    let mut delivered = 0;
    while let Some(msg) = ws.next().await {
        match msg.map_err(socket_error)? {
            Message::Text(text) => match parse_frame(text.as_str()) {
                Frame::Notification(notification) => {
                    handler(notification);
                    delivered += 1;
                }
                Frame::Rejected(err) => return Err(err),
                Frame::Confirmed(_) | Frame::Other => {
                    debug!(frame = text.as_str(), "Ignoring pubsub frame");
                }
            },
            Message::Close(_) => {
                info!("Received close frame");
                break;
            }
            _ => {
                // Ignore binary, ping, pong messages
            }
        }
    }

    Ok(delivered)
}

/// Removes the subscription from the registry once its task ends, whether
/// it gave up or was aborted.
struct Registration {
    tasks: TaskMap,
    id: SubscriptionId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.tasks.lock().remove(&self.id);
    }
}

async fn run_subscription(
    ws_url: String,
    topic: String,
    request: String,
    handler: LogHandler,
    first: WsStream,
    registration: Registration,
) {
    let _registration = registration;
    let mut connection = Some(first);
    let mut failures = 0;

    loop {
        let result = match connection.take() {
            Some(ws) => stream_logs(ws, &handler).await,
            None => match open_stream(&ws_url, &request, &handler).await {
                Ok(ws) => stream_logs(ws, &handler).await,
                Err(err) => Err(err),
            },
        };

        match result {
            Ok(delivered) => {
                info!(%topic, delivered, "Log stream closed by server");
                if delivered > 0 {
                    failures = 0;
                }
            }
            Err(err @ TransportError::Rpc { .. }) => {
                error!(%topic, error = %err, "Log subscription rejected by node");
                return;
            }
            Err(err) => warn!(%topic, error = %err, "Log stream failed"),
        }

        failures += 1;
        if failures >= MAX_RECONNECT_ATTEMPTS {
            error!(%topic, failures, "Giving up on log subscription");
            return;
        }

        let delay = RECONNECT_DELAY * failures;
        warn!(%topic, ?delay, "Reconnecting log stream (attempt {}/{})", failures, MAX_RECONNECT_ATTEMPTS);
        tokio::time::sleep(delay).await;
    }
}

// == Logs Pubsub ==
/// Registry of running log subscriptions against one WebSocket endpoint.
///
/// A subscription stays registered while its task runs; a task that gives
/// up drops out on its own.
#[derive(Debug)]
pub struct LogsPubsub {
    ws_url: String,
    next_id: AtomicU64,
    tasks: TaskMap,
}

impl LogsPubsub {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            next_id: AtomicU64::new(1),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Opens a subscription for `topic` and starts streaming it.
    ///
    /// Returns once the node has confirmed the subscription. A node that
    /// rejects it, or cannot be reached, fails the call and nothing is
    /// registered.
    pub async fn subscribe(
        &self,
        topic: &str,
        commitment: Commitment,
        handler: LogHandler,
    ) -> TransportResult<SubscriptionId> {
        let request = subscribe_request(topic, commitment);
        let first = open_stream(&self.ws_url, &request, &handler).await?;
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        // Held across spawn so the task cannot deregister before it is registered
        let mut tasks = self.tasks.lock();
        let task = tokio::spawn(run_subscription(
            self.ws_url.clone(),
            topic.to_string(),
            request,
            handler,
            first,
            Registration {
                tasks: self.tasks.clone(),
                id,
            },
        ));
        tasks.insert(id, task);
        drop(tasks);

        info!(%id, %topic, %commitment, "Log subscription started");
        Ok(id)
    }

    /// Stops a subscription and closes its socket.
    pub fn unsubscribe(&self, id: SubscriptionId) -> TransportResult<()> {
        let task = self
            .tasks
            .lock()
            .remove(&id)
            .ok_or(TransportError::UnknownSubscription(id))?;
        task.abort();
        info!(%id, "Log subscription stopped");
        Ok(())
    }

    pub fn active_count(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl Drop for LogsPubsub {
    fn drop(&mut self) {
        let tasks: Vec<_> = self.tasks.lock().drain().collect();
        for (_, task) in tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::sync::atomic::AtomicUsize;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    #[test]
    fn test_parse_log_notification() {
        let frame = r#"{
            "jsonrpc": "2.0",
            "method": "logsNotification",
            "params": {
                "result": {
                    "context": { "slot": 5208469 },
                    "value": {
                        "signature": "5h6xBEauJ3PK6SWCZ1PGjBvj8vDdWG3KpwATGy1ARAXFSDwt8GFXM7W5Ncn16wmqokgpiKRLuS83KUxyZyv2sUYv",
                        "err": null,
                        "logs": ["Program 11111111111111111111111111111111 invoke [1]"]
                    }
                },
                "subscription": 24040
            }
        }"#;

        let notification = parse_log_notification(frame).unwrap();
        assert_eq!(notification.slot, 5208469);
        assert!(notification.succeeded());
        assert_eq!(notification.logs.len(), 1);
    }

    #[test]
    fn test_parse_ignores_other_frames() {
        assert!(parse_log_notification(r#"{"jsonrpc":"2.0","result":23784,"id":1}"#).is_none());
        assert!(parse_log_notification("not json").is_none());
        assert!(matches!(
            parse_frame(r#"{"jsonrpc":"2.0","result":23784,"id":1}"#),
            Frame::Confirmed(23784)
        ));
    }

    #[test]
    fn test_parse_rejection() {
        let frame = r#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"Invalid params"},"id":1}"#;
        assert!(matches!(
            parse_frame(frame),
            Frame::Rejected(TransportError::Rpc { code: -32602, .. })
        ));
    }

    #[test]
    fn test_subscribe_request_shape() {
        let request: Value =
            serde_json::from_str(&subscribe_request("Prog1", Commitment::Confirmed)).unwrap();

        assert_eq!(request["method"], "logsSubscribe");
        assert_eq!(request["params"][0]["mentions"][0], "Prog1");
        assert_eq!(request["params"][1]["commitment"], "confirmed");
    }

    // == Live socket tests ==

    type ServerStream = WebSocketStream<TcpStream>;

    /// Serves every accepted connection with `session`, passing it the
    /// 1-based connection number. Returns the endpoint URL and a
    /// connection counter.
    async fn spawn_ws_node<F, Fut>(session: F) -> (String, Arc<AtomicUsize>)
    where
        F: Fn(usize, ServerStream) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = connections.clone();

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                let ws = tokio_tungstenite::accept_async(socket).await.unwrap();
                tokio::spawn(session(n, ws));
            }
        });

        (url, connections)
    }

    /// Reads the `logsSubscribe` request and answers it.
    async fn answer_subscribe(ws: &mut ServerStream, reply: Value) -> Value {
        let request = match ws.next().await {
            Some(Ok(Message::Text(text))) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("expected subscribe request, got {other:?}"),
        };
        ws.send(Message::Text(reply.to_string().into())).await.unwrap();
        request
    }

    fn confirmation() -> Value {
        json!({ "jsonrpc": "2.0", "result": 24040, "id": 1 })
    }

    fn notification(slot: u64) -> Message {
        let frame = json!({
            "jsonrpc": "2.0",
            "method": "logsNotification",
            "params": {
                "result": {
                    "context": { "slot": slot },
                    "value": { "signature": format!("sig{slot}"), "err": null, "logs": [] }
                },
                "subscription": 24040
            }
        });
        Message::Text(frame.to_string().into())
    }

    /// Keeps the connection open until the client goes away.
    async fn hold_open(mut ws: ServerStream) {
        while let Some(Ok(_)) = ws.next().await {}
    }

    fn channel_handler() -> (LogHandler, mpsc::UnboundedReceiver<LogNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler: LogHandler = Arc::new(move |notification| {
            let _ = tx.send(notification);
        });
        (handler, rx)
    }

    async fn wait_until_idle(pubsub: &LogsPubsub) {
        for _ in 0..2_000 {
            if pubsub.active_count() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("subscription task never finished");
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifications_reach_handler() {
        let (requests_tx, mut requests_rx) = mpsc::unbounded_channel();
        let (url, _) = spawn_ws_node(move |_, mut ws| {
            let requests_tx = requests_tx.clone();
            async move {
                let request = answer_subscribe(&mut ws, confirmation()).await;
                let _ = requests_tx.send(request);
                for slot in [100, 101, 102] {
                    ws.send(notification(slot)).await.unwrap();
                }
                hold_open(ws).await;
            }
        })
        .await;

        let pubsub = LogsPubsub::new(url);
        let (handler, mut events) = channel_handler();
        let id = pubsub
            .subscribe("Prog1", Commitment::Finalized, handler)
            .await
            .unwrap();

        let request = requests_rx.recv().await.unwrap();
        assert_eq!(request["method"], "logsSubscribe");
        assert_eq!(request["params"][0]["mentions"][0], "Prog1");
        assert_eq!(request["params"][1]["commitment"], "finalized");

        for slot in [100, 101, 102] {
            let event = events.recv().await.unwrap();
            assert_eq!(event.slot, slot);
            assert_eq!(event.signature, format!("sig{slot}"));
        }
        assert!(events.try_recv().is_err());

        assert_eq!(pubsub.active_count(), 1);
        pubsub.unsubscribe(id).unwrap();
        assert_eq!(pubsub.active_count(), 0);
        assert!(matches!(
            pubsub.unsubscribe(id),
            Err(TransportError::UnknownSubscription(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_subscription_fails_without_retry() {
        let (url, connections) = spawn_ws_node(|_, mut ws| async move {
            let rejection = json!({
                "jsonrpc": "2.0",
                "error": { "code": -32602, "message": "Invalid Request: Only 1 address supported" },
                "id": 1
            });
            answer_subscribe(&mut ws, rejection).await;
            hold_open(ws).await;
        })
        .await;

        let pubsub = LogsPubsub::new(url);
        let (handler, _events) = channel_handler();
        let result = pubsub.subscribe("Prog1", Commitment::Confirmed, handler).await;

        assert!(matches!(
            result,
            Err(TransportError::Rpc { code: -32602, .. })
        ));
        assert_eq!(pubsub.active_count(), 0);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(connections.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_node_fails_subscribe() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        drop(listener);

        let pubsub = LogsPubsub::new(url);
        let (handler, _events) = channel_handler();
        let result = pubsub.subscribe("Prog1", Commitment::Confirmed, handler).await;

        assert!(matches!(result, Err(TransportError::WebSocket(_))));
        assert_eq!(pubsub.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_close_reconnects_then_gives_up() {
        // First connection delivers one event; every later one closes at once
        let (url, connections) = spawn_ws_node(|n, mut ws| async move {
            answer_subscribe(&mut ws, confirmation()).await;
            if n == 1 {
                ws.send(notification(7)).await.unwrap();
            }
            let _ = ws.close(None).await;
        })
        .await;

        let pubsub = LogsPubsub::new(url);
        let (handler, mut events) = channel_handler();
        let start = Instant::now();
        let id = pubsub
            .subscribe("Prog1", Commitment::Confirmed, handler)
            .await
            .unwrap();

        assert_eq!(events.recv().await.unwrap().slot, 7);

        wait_until_idle(&pubsub).await;
        let elapsed = start.elapsed();

        // One connection per failure up to the limit, with 1s + 2s + ... + 9s
        // of backoff in between
        assert_eq!(
            connections.load(Ordering::SeqCst),
            MAX_RECONNECT_ATTEMPTS as usize
        );
        assert!(elapsed >= Duration::from_secs(45), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(60), "elapsed {elapsed:?}");
        assert!(matches!(
            pubsub.unsubscribe(id),
            Err(TransportError::UnknownSubscription(_))
        ));
    }
}
