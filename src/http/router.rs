//! Pure request router for the remote command surface.
//!
//! Routes and response bodies are a wire-exact contract with the
//! existing remote controls — both logical success and validation
//! failure answer with HTTP 200 and a plain-text body; only an
//! unmatched route answers 404, echoing the method, path and argument
//! list for diagnosis.
//!
//! Parameter parsing keeps the remote contract's integer semantics: a
//! missing or non-numeric value reads as 0, and range validation then
//! applies to that value like any other.  `/container` without a
//! `container` argument therefore reports invalid params (0 is not a
//! slot id), while `/servo` without a `position` argument legitimately
//! parks the servo at 0°.

use log::warn;

use crate::app::commands::FeederCommand;
use crate::app::controller::FeederController;
use crate::app::ports::{DelayPort, EventSink, FeederStore, ServoPort};

/// Identity body for `GET /`.
const IDENTITY_BODY: &str = "Cat Feeder";
/// Body for every logically successful command.
const SUCCESS_BODY: &str = "{success: true}";
/// Body for every validation failure.
const INVALID_BODY: &str = "{success: false, message: Invalid params}";

// ───────────────────────────────────────────────────────────────
// Request / response model
// ───────────────────────────────────────────────────────────────

/// Request method, as far as the surface distinguishes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// A parsed-on-demand view over one request line.
///
/// Borrows the raw request target (`/container?container=2`) and
/// exposes the path and the query arguments without allocating.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    method: Method,
    target: &'a str,
}

impl<'a> Request<'a> {
    pub fn new(method: Method, target: &'a str) -> Self {
        Self { method, target }
    }

    /// Shorthand for the only method the surface serves.
    pub fn get(target: &'a str) -> Self {
        Self::new(Method::Get, target)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The path component, without the query string.
    pub fn path(&self) -> &'a str {
        match self.target.split_once('?') {
            Some((path, _)) => path,
            None => self.target,
        }
    }

    /// The query arguments, in request order.  An argument without an
    /// `=` yields an empty value.
    pub fn args(&self) -> impl Iterator<Item = (&'a str, &'a str)> {
        let query = match self.target.split_once('?') {
            Some((_, query)) => query,
            None => "",
        };
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
    }

    /// The named argument as an integer, 0 when absent or non-numeric.
    pub fn int_arg(&self, name: &str) -> i32 {
        self.args()
            .find(|(n, _)| *n == name)
            .map_or(0, |(_, v)| to_int(v))
    }
}

/// A rendered response: status code plus plain-text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    fn ok(body: &str) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
        }
    }

    fn not_found(body: String) -> Self {
        Self { status: 404, body }
    }
}

/// Leading-integer parse: consumes an optional sign and then digits,
/// stopping at the first non-digit.  Anything unparseable reads as 0.
fn to_int(s: &str) -> i32 {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let mut value: i64 = 0;
    for c in digits.chars() {
        let Some(d) = c.to_digit(10) else { break };
        value = value * 10 + i64::from(d);
        if value > i64::from(i32::MAX) {
            value = i64::from(i32::MAX);
            break;
        }
    }
    let value = value as i32;
    if negative { -value } else { value }
}

// ───────────────────────────────────────────────────────────────
// Routing
// ───────────────────────────────────────────────────────────────

/// Dispatch one request against the controller and render the response.
///
/// Blocks for the duration of any motion the command triggers — the
/// single-request-at-a-time model means the response confirms a
/// completed slot change, not a queued one.
pub fn route(
    req: &Request<'_>,
    controller: &mut FeederController,
    hw: &mut (impl ServoPort + DelayPort),
    store: &mut impl FeederStore,
    sink: &mut impl EventSink,
) -> Response {
    let command = match (req.method(), req.path()) {
        (Method::Get, "/") => return Response::ok(IDENTITY_BODY),
        (Method::Get, "/servo") => FeederCommand::MoveServo {
            position: req.int_arg("position"),
        },
        (Method::Get, "/servo/pos") => FeederCommand::SetCalibration {
            slot_a: req.int_arg("c1"),
            slot_b: req.int_arg("c2"),
        },
        (Method::Get, "/container") => FeederCommand::SelectContainer {
            id: req.int_arg("container"),
        },
        (Method::Get, "/feed") => FeederCommand::Feed,
        _ => return Response::not_found(render_not_found(req)),
    };

    match controller.handle_command(command, hw, store, sink) {
        Ok(()) => Response::ok(SUCCESS_BODY),
        Err(e) => {
            warn!("{} {} rejected: {e}", req.method().name(), req.path());
            Response::ok(INVALID_BODY)
        }
    }
}

/// Diagnostic echo for unmatched routes: method, path and every
/// argument, one per line.
fn render_not_found(req: &Request<'_>) -> String {
    let mut body = String::from("File Not Found\n\n");
    body.push_str(&format!("URI: {}\n", req.path()));
    body.push_str(&format!("Method: {}\n", req.method().name()));
    body.push_str(&format!("Arguments: {}\n", req.args().count()));
    for (name, value) in req.args() {
        body.push_str(&format!(" {}: {}\n", name, value));
    }
    body
}
