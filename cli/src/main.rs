use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{Args, Parser, Subcommand};
use frames::{Frame, Status};
use futures_util::{SinkExt, StreamExt};
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use gst::GstBreakdown;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing session token; pass --session-token or set TABLESIDE_SESSION_TOKEN")]
    MissingSessionToken,
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("frame decode failed: {0}")]
    Decode(#[from] frames::CodecError),
    #[error("timed out waiting for websocket frame")]
    Timeout,
    #[error("server returned error for {syscall}: {message}")]
    ServerError { syscall: String, message: String },
    #[error("missing expected field `{0}`")]
    MissingField(&'static str),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid amount: {0}")]
    Gst(#[from] gst::GstError),
}

#[derive(Parser, Debug)]
#[command(name = "tableside", about = "Tableside restaurant ordering CLI")]
struct Cli {
    #[arg(long, env = "TABLESIDE_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "TABLESIDE_SESSION_TOKEN")]
    session_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone)]
struct CliContext {
    base_url: String,
    session_token: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Ping,
    /// GST calculations, done locally.
    Gst(GstCommand),
    Menu(MenuCommand),
    Orders(OrdersCommand),
    /// Stream live order changes and notifications.
    Watch(WatchArgs),
    /// Print the restaurant's QR entry URLs.
    Qr(QrArgs),
}

#[derive(Args, Debug)]
struct GstCommand {
    #[command(subcommand)]
    command: GstSubcommand,
}

#[derive(Subcommand, Debug)]
enum GstSubcommand {
    Quote {
        subtotal: Decimal,
        #[arg(long, default_value = "5")]
        rate: Decimal,
        #[arg(long, default_value_t = false)]
        inter_state: bool,
    },
}

#[derive(Args, Debug)]
struct MenuCommand {
    #[command(subcommand)]
    command: MenuSubcommand,
}

#[derive(Subcommand, Debug)]
enum MenuSubcommand {
    List,
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: Decimal,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = false)]
        unavailable: bool,
    },
    Update {
        item_id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        price: Option<Decimal>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        available: Option<bool>,
    },
    Delete {
        item_id: Uuid,
    },
}

#[derive(Args, Debug)]
struct OrdersCommand {
    #[command(subcommand)]
    command: OrdersSubcommand,
}

#[derive(Subcommand, Debug)]
enum OrdersSubcommand {
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Advance {
        order_id: Uuid,
    },
    Cancel {
        order_id: Uuid,
    },
    /// Record a cash payment.
    Paid {
        order_id: Uuid,
    },
}

#[derive(Args, Debug)]
struct WatchArgs {
    #[arg(long, value_delimiter = ',', default_value = "orders")]
    tables: Vec<String>,

    #[arg(long, value_delimiter = ',', default_value = "*")]
    events: Vec<String>,
}

#[derive(Args, Debug)]
struct QrArgs {
    /// Also print one URL per table.
    #[arg(long, default_value_t = false)]
    tables: bool,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let ctx = CliContext { base_url: cli.base_url, session_token: cli.session_token };

    match cli.command {
        Command::Ping => run_ping(&ctx).await,
        Command::Gst(gst) => run_gst(gst),
        Command::Menu(menu) => run_menu(&ctx, menu).await,
        Command::Orders(orders) => run_orders(&ctx, orders).await,
        Command::Watch(args) => run_watch(&ctx, args).await,
        Command::Qr(args) => run_qr(&ctx, args).await,
    }
}

async fn run_ping(cli: &CliContext) -> Result<(), CliError> {
    let client = reqwest::Client::new();
    let url = format!("{}/healthz", cli.base_url.trim_end_matches('/'));
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerError {
            syscall: format!("HTTP {}", status.as_u16()),
            message: "health check failed".to_owned(),
        });
    }
    println!("ok");
    Ok(())
}

// =============================================================================
// GST
// =============================================================================

/// Validate the input the way the server's quote endpoint does, then price it.
fn quote_gst(subtotal: Decimal, rate: Decimal, inter_state: bool) -> Result<GstBreakdown, CliError> {
    let subtotal = gst::validate_amount(subtotal)?;
    let rate = gst::validate_rate(rate)?;
    Ok(gst::calculate_gst(subtotal, rate, inter_state))
}

fn run_gst(command: GstCommand) -> Result<(), CliError> {
    match command.command {
        GstSubcommand::Quote { subtotal, rate, inter_state } => {
            let breakdown = quote_gst(subtotal, rate, inter_state)?;
            for line in gst::format_gst_breakdown(&breakdown) {
                println!("{:<16}{}", line.label, line.value);
            }
            Ok(())
        }
    }
}

// =============================================================================
// MENU + ORDERS
// =============================================================================

async fn run_menu(cli: &CliContext, menu: MenuCommand) -> Result<(), CliError> {
    let json = match menu.command {
        MenuSubcommand::List => api_request(cli, reqwest::Method::GET, "/api/owner/menu", None).await?,
        MenuSubcommand::Create { name, price, description, category, unavailable } => {
            let body = serde_json::json!({
                "name": name,
                "price": price.to_string(),
                "description": description,
                "category": category,
                "is_available": !unavailable,
            });
            api_request(cli, reqwest::Method::POST, "/api/owner/menu", Some(body)).await?
        }
        MenuSubcommand::Update { item_id, name, price, description, category, available } => {
            let mut body = Map::new();
            if let Some(name) = name {
                body.insert("name".to_owned(), Value::String(name));
            }
            if let Some(price) = price {
                body.insert("price".to_owned(), Value::String(price.to_string()));
            }
            if let Some(description) = description {
                body.insert("description".to_owned(), Value::String(description));
            }
            if let Some(category) = category {
                body.insert("category".to_owned(), Value::String(category));
            }
            if let Some(available) = available {
                body.insert("is_available".to_owned(), Value::Bool(available));
            }
            let path = format!("/api/owner/menu/{item_id}");
            api_request(cli, reqwest::Method::PATCH, &path, Some(Value::Object(body))).await?
        }
        MenuSubcommand::Delete { item_id } => {
            let path = format!("/api/owner/menu/{item_id}");
            api_request(cli, reqwest::Method::DELETE, &path, None).await?
        }
    };
    print_json(&json)
}

async fn run_orders(cli: &CliContext, orders: OrdersCommand) -> Result<(), CliError> {
    let (method, path) = match orders.command {
        OrdersSubcommand::List { status, limit } => {
            let mut query = Vec::new();
            if let Some(status) = status {
                query.push(format!("status={status}"));
            }
            if let Some(limit) = limit {
                query.push(format!("limit={limit}"));
            }
            let path = if query.is_empty() {
                "/api/owner/orders".to_owned()
            } else {
                format!("/api/owner/orders?{}", query.join("&"))
            };
            (reqwest::Method::GET, path)
        }
        OrdersSubcommand::Advance { order_id } => {
            (reqwest::Method::POST, format!("/api/owner/orders/{order_id}/advance"))
        }
        OrdersSubcommand::Cancel { order_id } => {
            (reqwest::Method::POST, format!("/api/owner/orders/{order_id}/cancel"))
        }
        OrdersSubcommand::Paid { order_id } => (reqwest::Method::POST, format!("/api/owner/orders/{order_id}/paid")),
    };

    let json = api_request(cli, method, &path, None).await?;
    match json.as_array() {
        Some(list) => {
            for order in list {
                println!("{}", order_line(order));
            }
            Ok(())
        }
        None => print_json(&json),
    }
}

/// One-line dashboard rendering of an order view.
fn order_line(order: &Value) -> String {
    let field = |key: &str| order.get(key).and_then(Value::as_str).unwrap_or("-").to_owned();
    let table = order
        .get("table_number")
        .and_then(Value::as_i64)
        .map_or_else(|| "-".to_owned(), |t| t.to_string());
    let items = order.get("item_count").and_then(Value::as_u64).unwrap_or(0);
    format!(
        "{}  table {table:>3}  {:<10}  {:<8}  {items} items  {}",
        field("id"),
        field("status"),
        field("payment_status"),
        field("total_display"),
    )
}

async fn run_qr(cli: &CliContext, args: QrArgs) -> Result<(), CliError> {
    let json = api_request(cli, reqwest::Method::GET, "/api/owner/qr", None).await?;
    let url = json
        .get("url")
        .and_then(Value::as_str)
        .ok_or(CliError::MissingField("url"))?;
    println!("{url}");

    if args.tables {
        let tables = json
            .get("tables")
            .and_then(Value::as_array)
            .ok_or(CliError::MissingField("tables"))?;
        for entry in tables {
            let table = entry.get("table").and_then(Value::as_u64).unwrap_or(0);
            let url = entry.get("url").and_then(Value::as_str).unwrap_or("-");
            println!("table {table:>3}  {url}");
        }
    }
    Ok(())
}

// =============================================================================
// WATCH
// =============================================================================

async fn run_watch(cli: &CliContext, args: WatchArgs) -> Result<(), CliError> {
    let ticket = fetch_ws_ticket(cli).await?;
    let ws_url = ws_url(&cli.base_url, &ticket)?;
    let (mut stream, _) = connect_async(ws_url)
        .await
        .map_err(|error| CliError::WsConnect(Box::new(error)))?;

    wait_for_session_connected(&mut stream).await?;

    for table in &args.tables {
        let req = request_frame("feed:subscribe", serde_json::json!({ "table": table, "events": args.events }));
        let req_id = req.id.clone();
        stream
            .send(Message::Binary(frames::encode_frame(&req).into()))
            .await
            .map_err(|error| CliError::WsConnect(Box::new(error)))?;
        wait_for_terminal_response(&mut stream, &req_id, "feed:subscribe").await?;
        eprintln!("subscribed to {table}");
    }

    loop {
        let frame = recv_frame(&mut stream).await?;
        if let Some(line) = feed_line(&frame) {
            println!("{line}");
        }
    }
}

/// Printable summary of a pushed feed frame; replies are skipped.
fn feed_line(frame: &Frame) -> Option<String> {
    if frame.parent_id.is_some() {
        return None;
    }
    let text = |key: &str| frame.data.get(key).and_then(Value::as_str).unwrap_or("-");
    if frame.syscall.starts_with("change:") {
        let record = frame.data.get("record").cloned().unwrap_or(Value::Null);
        let id = record.get("id").and_then(Value::as_str).unwrap_or("-");
        let status = record.get("status").and_then(Value::as_str).unwrap_or("-");
        return Some(format!("{} {} {id} status={status}", text("event"), text("table")));
    }
    if frame.syscall == frames::syscall::NOTIFY_SHOW {
        return Some(format!("NOTIFY {}: {}", text("title"), text("body")));
    }
    None
}

// =============================================================================
// HTTP + WEBSOCKET PLUMBING
// =============================================================================

async fn api_request(
    cli: &CliContext,
    method: reqwest::Method,
    path: &str,
    body: Option<Value>,
) -> Result<Value, CliError> {
    let session_token = cli
        .session_token
        .as_deref()
        .ok_or(CliError::MissingSessionToken)?;

    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, HeaderValue::from_str(&format!("session_token={session_token}"))?);

    let client = reqwest::Client::builder().default_headers(headers).build()?;
    let url = format!("{}{}", cli.base_url.trim_end_matches('/'), path);

    let request = client.request(method, &url);
    let request = if let Some(json) = body { request.json(&json) } else { request };

    let response = request.send().await?;
    let status = response.status();
    let value = response
        .json::<Value>()
        .await
        .unwrap_or_else(|_| Value::Null);

    if !status.is_success() {
        return Err(CliError::ServerError { syscall: format!("HTTP {}", status.as_u16()), message: value.to_string() });
    }

    Ok(value)
}

async fn fetch_ws_ticket(cli: &CliContext) -> Result<String, CliError> {
    let body = api_request(cli, reqwest::Method::POST, "/api/auth/ws-ticket", None).await?;

    body.get("ticket")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or(CliError::MissingField("ticket"))
}

fn ws_url(base_url: &str, ticket: &str) -> Result<String, CliError> {
    let base_url = base_url.trim_end_matches('/');
    if let Some(rest) = base_url.strip_prefix("http://") {
        return Ok(format!("ws://{rest}/api/ws?ticket={ticket}"));
    }
    if let Some(rest) = base_url.strip_prefix("https://") {
        return Ok(format!("wss://{rest}/api/ws?ticket={ticket}"));
    }

    Err(CliError::InvalidBaseUrl(base_url.to_owned()))
}

async fn wait_for_session_connected(stream: &mut WsStream) -> Result<(), CliError> {
    loop {
        let frame = recv_next(stream, Duration::from_secs(5)).await?;
        if frame.syscall == frames::syscall::SESSION_CONNECTED {
            return Ok(());
        }
    }
}

async fn wait_for_terminal_response(stream: &mut WsStream, request_id: &str, syscall: &str) -> Result<Frame, CliError> {
    loop {
        let frame = recv_next(stream, Duration::from_secs(15)).await?;
        if frame.parent_id.as_deref() != Some(request_id) || frame.syscall != syscall {
            continue;
        }
        if !frame.status.is_terminal() {
            continue;
        }
        if frame.status == Status::Error {
            return Err(CliError::ServerError {
                syscall: frame.syscall,
                message: frame
                    .data
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown websocket error")
                    .to_owned(),
            });
        }
        return Ok(frame);
    }
}

async fn recv_next(stream: &mut WsStream, timeout: Duration) -> Result<Frame, CliError> {
    tokio::time::timeout(timeout, recv_frame(stream))
        .await
        .map_err(|_| CliError::Timeout)?
}

async fn recv_frame(stream: &mut WsStream) -> Result<Frame, CliError> {
    loop {
        let Some(message) = stream.next().await else {
            return Err(CliError::WsClosed);
        };
        match message.map_err(|error| CliError::WsConnect(Box::new(error)))? {
            Message::Binary(bytes) => return frames::decode_frame(&bytes).map_err(CliError::from),
            Message::Close(_) => return Err(CliError::WsClosed),
            _ => {}
        }
    }
}

fn request_frame(syscall: &str, data: Value) -> Frame {
    Frame {
        id: Uuid::new_v4().to_string(),
        parent_id: None,
        ts: now_ms(),
        owner_id: None,
        from: None,
        syscall: syscall.to_owned(),
        status: Status::Request,
        data,
    }
}

fn now_ms() -> i64 {
    let Ok(duration) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(duration.as_millis()).unwrap_or(0)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
