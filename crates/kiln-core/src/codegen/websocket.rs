//! WebSocket endpoint generation.
//!
//! Every handler registers its socket with the shared `manager` under a
//! `(room_id, client_id)` pair, runs one of three loops, and unregisters
//! on disconnect. Any other failure is handed to `manager.handle_error`.
//!
//! - `event`: one call per received frame; non-`None` results go through
//!   `manager.parse_and_send_message`.
//! - `stream` without a message schema: the user async generator is
//!   drained forever and each item is sent back to the caller.
//! - `stream` with a message schema: as above, but a new frame is polled
//!   with a bounded wait before each pass and fed to the generator.

use crate::codegen::http::extract_path_params;
use crate::codegen::ir::{FunctionDef, ModelDef, Param, Stmt, pascal_case, py_str};
use crate::compile::diagnostics::Diagnostics;
use crate::compile::fields::{FieldSpec, normalize_fields};
use crate::compile::introspect::{FunctionSignature, introspect};
use crate::compile::metadata::Metadata;
use crate::error::Error;

/// Seconds a streaming handler waits for a new inbound frame.
pub const STREAM_RECEIVE_TIMEOUT_SECS: f64 = 1.0;

/// Handler mode declared by `type:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsType {
    Event,
    Stream,
}

impl WsType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "event" => Some(Self::Event),
            "stream" => Some(Self::Stream),
            _ => None,
        }
    }
}

/// A classified `@WS` cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSocketEndpoint {
    pub path: String,
    pub ws_type: WsType,
    pub message: Vec<FieldSpec>,
    pub query: Vec<FieldSpec>,
    pub headers: Vec<FieldSpec>,
    pub validate: bool,
    pub source: String,
}

impl WebSocketEndpoint {
    /// Build from parsed metadata. Returns `None` (with an error
    /// diagnostic) for an unknown `type`.
    pub fn from_metadata(
        path: impl Into<String>,
        meta: &Metadata,
        source: impl Into<String>,
        diags: &mut Diagnostics,
    ) -> Option<Self> {
        let path = path.into();
        let ws_type = match meta.get_str("type") {
            None => WsType::Event,
            Some(value) => match WsType::parse(&value) {
                Some(ws_type) => ws_type,
                None => {
                    diags.error(format!(
                        "websocket {path}: unsupported type `{value}`, expected `event` or `stream`"
                    ));
                    return None;
                }
            },
        };

        let mut fields = |key: &str| {
            meta.get(key)
                .map(|value| normalize_fields(value, diags))
                .unwrap_or_default()
        };
        let message = fields("message");
        let query = fields("query");
        let headers = fields("headers");

        Some(Self {
            path,
            ws_type,
            message,
            query,
            headers,
            validate: meta.get_bool("validate").unwrap_or(false),
            source: source.into(),
        })
    }

    /// Generate the handler. Returns `None` when the body defines no
    /// function.
    pub fn generate(&self, diags: &mut Diagnostics) -> Option<Vec<Stmt>> {
        let Some(sig) = introspect(&self.source) else {
            diags.skipped(&Error::InvalidCell(format!(
                "websocket {}: no function definition found",
                self.path
            )));
            return None;
        };
        self.check_function(&sig, diags);

        let model_name = format!("{}Message", pascal_case(&sig.name));
        let validating = self.ws_type == WsType::Stream && !self.message.is_empty() && self.validate;

        let mut items = Vec::new();
        if validating {
            items.push(Stmt::Model(ModelDef::new(&model_name, self.message.clone())));
        }

        let mut body = self.identity_lines();
        match self.ws_type {
            WsType::Event => {
                body.push(Stmt::line("await manager.connect(websocket, room_id, client_id)"));
                body.extend(self.guarded(self.event_loop(&sig)));
            }
            WsType::Stream => {
                body.push(Stmt::Function(self.stream_wrapper(&sig, validating, &model_name)));
                body.push(Stmt::Blank);
                body.push(Stmt::line("await manager.connect(websocket, room_id, client_id)"));
                body.extend(self.guarded(vec![Stmt::block(
                    "async for data in _stream()",
                    vec![Stmt::line(
                        "await manager.send_message(json.dumps(data), room_id, client_id)",
                    )],
                )]));
            }
        }

        let handler = FunctionDef::new(format!("{}_websocket", sig.name))
            .asynchronous()
            .decorator(format!("router.websocket({})", py_str(&self.path)))
            .param(Param::typed("websocket", "WebSocket"))
            .params(self.handler_params())
            .body(body);

        items.push(Stmt::Function(handler));
        items.push(Stmt::Verbatim(self.source.clone()));
        Some(items)
    }

    /// Names bound from the path, query and headers, in that order.
    fn bound_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let declared = extract_path_params(&self.path)
            .into_iter()
            .chain(self.query.iter().map(|f| f.name.clone()))
            .chain(self.headers.iter().map(|f| f.name.clone()));
        for name in declared {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    fn handler_params(&self) -> Vec<Param> {
        let mut params = Vec::new();
        let mut seen: Vec<String> = Vec::new();

        for name in extract_path_params(&self.path) {
            seen.push(name.clone());
            params.push(Param::typed(name, "str"));
        }
        for field in &self.query {
            if !seen.contains(&field.name) {
                seen.push(field.name.clone());
                params.push(Param::from_field(field));
            }
        }
        for field in &self.headers {
            if !seen.contains(&field.name) {
                seen.push(field.name.clone());
                params.push(Param::header(field));
            }
        }
        params
    }

    /// Default room and a fresh client identity unless either is bound
    /// from the request.
    fn identity_lines(&self) -> Vec<Stmt> {
        let bound = self.bound_names();
        let mut lines = Vec::new();
        if !bound.iter().any(|n| n == "room_id") {
            lines.push(Stmt::line("room_id = 'default'"));
        }
        if !bound.iter().any(|n| n == "client_id") {
            lines.push(Stmt::line("client_id = str(uuid.uuid4())"));
        }
        lines
    }

    /// `fn(first, k=k, ...)` with the bound names as keyword arguments.
    fn call(&self, sig: &FunctionSignature, first: Option<&str>) -> String {
        let args: Vec<String> = first
            .map(str::to_string)
            .into_iter()
            .chain(self.bound_names().into_iter().map(|n| format!("{n}={n}")))
            .collect();
        format!("{}({})", sig.name, args.join(", "))
    }

    fn event_loop(&self, sig: &FunctionSignature) -> Vec<Stmt> {
        let call = self.call(sig, Some("event_data"));
        vec![Stmt::block(
            "while True",
            vec![
                Stmt::line("event_data = await websocket.receive_text()"),
                Stmt::Line(format!(
                    "response = {}{call}",
                    if sig.is_async { "await " } else { "" }
                )),
                Stmt::block(
                    "if response is not None",
                    vec![Stmt::line("await manager.parse_and_send_message(response)")],
                ),
            ],
        )]
    }

    /// The nested `_stream()` generator that drives the user function.
    fn stream_wrapper(&self, sig: &FunctionSignature, validating: bool, model: &str) -> FunctionDef {
        let wrapper = FunctionDef::new("_stream").asynchronous();

        if self.message.is_empty() {
            return wrapper.body(vec![Stmt::block(
                "while True",
                vec![Stmt::block(
                    format!("async for data in {}", self.call(sig, None)),
                    vec![Stmt::line("yield data")],
                )],
            )]);
        }

        let accept_input = if validating {
            vec![
                Stmt::block(
                    "try",
                    vec![Stmt::Line(format!(
                        "user_input = {model}.model_validate_json(new_input).model_dump()"
                    ))],
                ),
                Stmt::block(
                    "except ValidationError as e",
                    vec![
                        Stmt::line(
                            "error = json.dumps({'error': 'validation_error', 'detail': json.loads(e.json())})",
                        ),
                        Stmt::line("await manager.send_message(error, room_id, client_id)"),
                        Stmt::line("continue"),
                    ],
                ),
            ]
        } else {
            vec![Stmt::line("user_input = new_input")]
        };

        let mut receive = vec![Stmt::Line(format!(
            "new_input = await asyncio.wait_for(websocket.receive_text(), timeout={STREAM_RECEIVE_TIMEOUT_SECS:?})"
        ))];
        receive.extend(accept_input);

        wrapper.body(vec![
            Stmt::Line(format!(
                "user_input = {}",
                if validating { "{}" } else { "''" }
            )),
            Stmt::block(
                "while True",
                vec![
                    Stmt::block("try", receive),
                    Stmt::block("except asyncio.TimeoutError", vec![Stmt::line("pass")]),
                    Stmt::block(
                        format!("async for data in {}", self.call(sig, Some("user_input"))),
                        vec![Stmt::line("yield data")],
                    ),
                ],
            ),
        ])
    }

    /// Wrap a loop in the disconnect/error handlers shared by all modes.
    fn guarded(&self, body: Vec<Stmt>) -> Vec<Stmt> {
        vec![
            Stmt::block("try", body),
            Stmt::block(
                "except WebSocketDisconnect",
                vec![Stmt::line("manager.disconnect(websocket, room_id)")],
            ),
            Stmt::block(
                "except Exception as e",
                vec![
                    Stmt::line("manager.disconnect(websocket, room_id)"),
                    Stmt::line("await manager.handle_error(websocket, e)"),
                ],
            ),
        ]
    }

    fn check_function(&self, sig: &FunctionSignature, diags: &mut Diagnostics) {
        let missing: Vec<String> = self
            .bound_names()
            .into_iter()
            .filter(|name| !sig.has_param(name))
            .collect();
        if !missing.is_empty() {
            diags.warn(format!(
                "missing expected arguments in function {}: {}",
                sig.name,
                missing.join(", ")
            ));
        }

        let takes_input = self.ws_type == WsType::Event || !self.message.is_empty();
        if takes_input && sig.params.is_empty() {
            diags.warn(format!(
                "function {} takes no parameters, but receives the incoming message as its first argument",
                sig.name
            ));
        }
        if self.ws_type == WsType::Stream && !sig.is_async {
            diags.warn(format!(
                "stream function {} should be an async generator",
                sig.name
            ));
        }
        if self.ws_type == WsType::Event && !self.message.is_empty() {
            diags.warn("message schema is ignored for event websockets");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::ir::render;

    fn endpoint(ws_type: WsType, message: Vec<FieldSpec>, validate: bool, source: &str) -> WebSocketEndpoint {
        WebSocketEndpoint {
            path: "/ws/chat".into(),
            ws_type,
            message,
            query: Vec::new(),
            headers: Vec::new(),
            validate,
            source: source.into(),
        }
    }

    fn generate(ep: &WebSocketEndpoint) -> (String, Diagnostics) {
        let mut diags = Diagnostics::for_cell(0);
        let text = render(&ep.generate(&mut diags).unwrap());
        (text, diags)
    }

    #[test]
    fn test_event_mode() {
        let ep = endpoint(WsType::Event, Vec::new(), false, "def echo(data):\n    return data");
        let (text, diags) = generate(&ep);

        assert!(text.starts_with("@router.websocket('/ws/chat')\nasync def echo_websocket(websocket: WebSocket):"));
        assert!(text.contains("    room_id = 'default'\n    client_id = str(uuid.uuid4())\n"));
        assert!(text.contains("    await manager.connect(websocket, room_id, client_id)\n    try:\n        while True:"));
        assert!(text.contains("            response = echo(event_data)\n"));
        assert!(text.contains("                await manager.parse_and_send_message(response)"));
        assert!(text.contains("    except WebSocketDisconnect:\n        manager.disconnect(websocket, room_id)"));
        assert!(text.contains("        await manager.handle_error(websocket, e)"));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_declared_identity_is_not_overwritten() {
        let mut ep = endpoint(WsType::Event, Vec::new(), false, "async def chat(msg, room_id):\n    return msg");
        ep.path = "/ws/{room_id}".into();
        let (text, _) = generate(&ep);

        assert!(text.contains("async def chat_websocket(websocket: WebSocket, room_id: str):"));
        assert!(!text.contains("room_id = 'default'"));
        assert!(text.contains("client_id = str(uuid.uuid4())"));
        assert!(text.contains("response = await chat(event_data, room_id=room_id)"));
    }

    #[test]
    fn test_stream_without_message() {
        let ep = endpoint(WsType::Stream, Vec::new(), false, "async def ticks():\n    yield 1");
        let (text, diags) = generate(&ep);

        assert!(text.contains("    async def _stream():\n        while True:\n            async for data in ticks():\n                yield data\n\n"));
        assert!(text.contains("        async for data in _stream():\n            await manager.send_message(json.dumps(data), room_id, client_id)"));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_stream_with_validated_message() {
        let ep = endpoint(
            WsType::Stream,
            vec![FieldSpec::required("text", "str")],
            true,
            "async def reply(message):\n    yield message",
        );
        let (text, _) = generate(&ep);

        assert!(text.starts_with("class ReplyMessage(BaseModel):\n    text: str\n\n\n"));
        assert!(text.contains("        user_input = {}\n"));
        assert!(text.contains("new_input = await asyncio.wait_for(websocket.receive_text(), timeout=1.0)"));
        assert!(text.contains("user_input = ReplyMessage.model_validate_json(new_input).model_dump()"));
        assert!(text.contains("                except ValidationError as e:"));
        assert!(text.contains("                    continue"));
        assert!(text.contains("            except asyncio.TimeoutError:\n                pass"));
        assert!(text.contains("async for data in reply(user_input):"));
    }

    #[test]
    fn test_stream_with_unvalidated_message() {
        let ep = endpoint(
            WsType::Stream,
            vec![FieldSpec::required("text", "str")],
            false,
            "async def reply(message):\n    yield message",
        );
        let (text, _) = generate(&ep);

        assert!(!text.contains("class ReplyMessage"));
        assert!(text.contains("        user_input = ''\n"));
        assert!(text.contains("                user_input = new_input\n"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let lines = vec!["type: firehose".to_string()];
        let meta = Metadata::parse(&lines, 1).unwrap();
        let mut diags = Diagnostics::for_cell(0);
        assert!(WebSocketEndpoint::from_metadata("/ws", &meta, "def f(x): pass", &mut diags).is_none());
        assert!(diags.has_errors());
    }

    #[test]
    fn test_sync_stream_warns() {
        let ep = endpoint(WsType::Stream, Vec::new(), false, "def ticks():\n    return [1]");
        let (_, diags) = generate(&ep);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_query_and_header_bindings() {
        let mut ep = endpoint(WsType::Event, Vec::new(), false, "def on(data, token, user):\n    return None");
        ep.query = vec![FieldSpec::required("user", "str")];
        ep.headers = vec![FieldSpec::required("token", "str")];
        let (text, diags) = generate(&ep);

        assert!(text.contains(
            "async def on_websocket(websocket: WebSocket, user: str, token: str = Header(...)):"
        ));
        assert!(text.contains("response = on(event_data, user=user, token=token)"));
        assert!(diags.is_empty());
    }
}
