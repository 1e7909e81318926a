//! Command catalog
//!
//! The command set is closed: one [`CommandKind`] variant per kind of request
//! the server understands, carrying only its parameters. Request content and
//! response decoding are plain functions over the variant, so adding a kind
//! means the compiler points at every place that must handle it.

use std::collections::BTreeMap;

use introspection::Snapshot;
use ipc::protocol::{map, named, take_field};
use ipc::{Command, Error, Result, Value};

/// Encoding requested for object blobs
const MSGPACK_ENCODING: &str = "msgpack";

/// A command scoped to a realm context
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCommand {
    context_id: String,
    kind: CommandKind,
}

/// Parameters of each command kind
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// Announce the client and forward its API session
    Registration {
        name: String,
        api_url: String,
        access_token: String,
    },
    /// Fetch an ISS object's value
    IssObject {
        object_id: String,
        ignore_upgrades: bool,
    },
    /// Resolve an object ID to its immutable ID
    ResolveIssObject {
        object_id: String,
        ignore_upgrades: bool,
    },
    /// Fetch an ISS object's metadata headers
    IssObjectMetadata { object_id: String },
    /// Store a value in the ISS under a schema
    PostIssObject { schema: String, object: Value },
    /// Copy an object from this context to another
    CopyIssObject {
        destination_context_id: String,
        object_id: String,
    },
    /// Submit a calculation
    PostCalculation { calculation: Value },
    /// Copy a calculation from this context to another
    CopyCalculation {
        destination_context_id: String,
        calculation_id: String,
    },
    /// Evaluate a meta generator down to a plain calculation
    ResolveMetaChain { generator: Value },
    /// Evaluate a calculation on the server itself
    PerformLocalCalc { calculation: Value },
    /// Fetch the request behind a calculation ID
    CalculationRequest { calculation_id: String },
    /// Search a calculation tree for a function name
    CalculationSearch {
        calculation_id: String,
        search_string: String,
    },
    /// Diff two ISS objects in this context
    IssDiff { id_a: String, id_b: String },
    /// Diff two calculations in this context
    CalculationDiff { id_a: String, id_b: String },
    /// Snapshot the server's tasklets
    IntrospectionStatus { include_finished: bool },
    /// Turn tasklet tracking on or off
    IntrospectionSetEnabled { enabled: bool },
    /// Forget all tracked tasklets
    IntrospectionClearAdmin,
    /// Round-trip a message through the server
    Echo { message: String },
}

impl CommandKind {
    /// Stable name for diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::Registration { .. } => "registration",
            Self::IssObject { .. } => "iss_object",
            Self::ResolveIssObject { .. } => "resolve_iss_object",
            Self::IssObjectMetadata { .. } => "iss_object_metadata",
            Self::PostIssObject { .. } => "post_iss_object",
            Self::CopyIssObject { .. } => "copy_iss_object",
            Self::PostCalculation { .. } => "post_calculation",
            Self::CopyCalculation { .. } => "copy_calculation",
            Self::ResolveMetaChain { .. } => "resolve_meta_chain",
            Self::PerformLocalCalc { .. } => "perform_local_calc",
            Self::CalculationRequest { .. } => "calculation_request",
            Self::CalculationSearch { .. } => "calculation_search",
            Self::IssDiff { .. } => "iss_diff",
            Self::CalculationDiff { .. } => "calculation_diff",
            Self::IntrospectionStatus { .. } => "introspection_status_query",
            Self::IntrospectionSetEnabled { .. } => "introspection_control set enabled",
            Self::IntrospectionClearAdmin => "introspection_control clear admin",
            Self::Echo { .. } => "test",
        }
    }
}

/// Decoded result of a command
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Void commands
    Nothing,
    /// An arbitrary structured value (objects, diffs, calculations)
    Value(Value),
    /// An object or calculation ID
    Id(String),
    Metadata(BTreeMap<String, String>),
    Matches(Vec<String>),
    Snapshot(Snapshot),
    Echo(EchoReply),
}

/// Server's answer to an echo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoReply {
    /// Name the server registered this client under
    pub name: String,
    pub message: String,
}

impl ServiceCommand {
    pub fn new(context_id: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            context_id: context_id.into(),
            kind,
        }
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }
}

impl Command for ServiceCommand {
    type Output = Reply;

    fn name(&self) -> &str {
        self.kind.name()
    }

    fn build_request_payload(&self) -> Result<Value> {
        request_content(&self.context_id, &self.kind)
    }

    fn decode_response(&self, content: Value) -> Result<Reply> {
        decode_content(&self.kind, content)
    }
}

fn text(s: &str) -> Value {
    Value::from(s)
}

/// Named request content for a command kind
pub fn request_content(context_id: &str, kind: &CommandKind) -> Result<Value> {
    let content = match kind {
        CommandKind::Registration {
            name,
            api_url,
            access_token,
        } => named(
            "registration",
            map([
                ("name", text(name)),
                (
                    "session",
                    map([("api_url", text(api_url)), ("access_token", text(access_token))]),
                ),
            ]),
        ),
        CommandKind::IssObject {
            object_id,
            ignore_upgrades,
        } => named(
            "iss_object",
            map([
                ("context_id", text(context_id)),
                ("object_id", text(object_id)),
                ("encoding", text(MSGPACK_ENCODING)),
                ("ignore_upgrades", Value::from(*ignore_upgrades)),
            ]),
        ),
        CommandKind::ResolveIssObject {
            object_id,
            ignore_upgrades,
        } => named(
            "resolve_iss_object",
            map([
                ("context_id", text(context_id)),
                ("object_id", text(object_id)),
                ("ignore_upgrades", Value::from(*ignore_upgrades)),
            ]),
        ),
        CommandKind::IssObjectMetadata { object_id } => named(
            "iss_object_metadata",
            map([("context_id", text(context_id)), ("object_id", text(object_id))]),
        ),
        CommandKind::PostIssObject { schema, object } => named(
            "post_iss_object",
            map([
                ("context_id", text(context_id)),
                ("schema", text(schema)),
                ("encoding", text(MSGPACK_ENCODING)),
                ("object", Value::Binary(rmp_serde::to_vec(object)?)),
            ]),
        ),
        CommandKind::CopyIssObject {
            destination_context_id,
            object_id,
        } => named(
            "copy_iss_object",
            map([
                ("source_context_id", text(context_id)),
                ("destination_context_id", text(destination_context_id)),
                ("object_id", text(object_id)),
            ]),
        ),
        CommandKind::PostCalculation { calculation } => named(
            "post_calculation",
            map([("context_id", text(context_id)), ("calculation", calculation.clone())]),
        ),
        CommandKind::CopyCalculation {
            destination_context_id,
            calculation_id,
        } => named(
            "copy_calculation",
            map([
                ("source_context_id", text(context_id)),
                ("destination_context_id", text(destination_context_id)),
                ("calculation_id", text(calculation_id)),
            ]),
        ),
        CommandKind::ResolveMetaChain { generator } => named(
            "resolve_meta_chain",
            map([("context_id", text(context_id)), ("generator", generator.clone())]),
        ),
        CommandKind::PerformLocalCalc { calculation } => named(
            "perform_local_calc",
            map([("context_id", text(context_id)), ("calculation", calculation.clone())]),
        ),
        CommandKind::CalculationRequest { calculation_id } => named(
            "calculation_request",
            map([
                ("context_id", text(context_id)),
                ("calculation_id", text(calculation_id)),
            ]),
        ),
        CommandKind::CalculationSearch {
            calculation_id,
            search_string,
        } => named(
            "calculation_search",
            map([
                ("context_id", text(context_id)),
                ("calculation_id", text(calculation_id)),
                ("search_string", text(search_string)),
            ]),
        ),
        CommandKind::IssDiff { id_a, id_b } => {
            named("iss_diff", diff_request(context_id, id_a, id_b))
        }
        CommandKind::CalculationDiff { id_a, id_b } => {
            named("calculation_diff", diff_request(context_id, id_a, id_b))
        }
        CommandKind::IntrospectionStatus { include_finished } => named(
            "introspection_status_query",
            map([("include_finished", Value::from(*include_finished))]),
        ),
        CommandKind::IntrospectionSetEnabled { enabled } => named(
            "introspection_control",
            named("enabled", Value::from(*enabled)),
        ),
        CommandKind::IntrospectionClearAdmin => {
            named("introspection_control", named("clear_admin", Value::Nil))
        }
        CommandKind::Echo { message } => named("test", map([("message", text(message))])),
    };
    Ok(content)
}

// Both diff kinds compare two IDs within the same context
fn diff_request(context_id: &str, id_a: &str, id_b: &str) -> Value {
    map([
        ("id_a", text(id_a)),
        ("context_a", text(context_id)),
        ("id_b", text(id_b)),
        ("context_b", text(context_id)),
    ])
}

/// Decode the content of a non-error response to a command kind
pub fn decode_content(kind: &CommandKind, content: Value) -> Result<Reply> {
    let command = kind.name();
    let reply = match kind {
        CommandKind::Registration { .. }
        | CommandKind::CopyIssObject { .. }
        | CommandKind::CopyCalculation { .. }
        | CommandKind::IntrospectionSetEnabled { .. }
        | CommandKind::IntrospectionClearAdmin => Reply::Nothing,
        CommandKind::IssObject { .. } => {
            let body = body(command, content, "iss_object_response")?;
            let blob = take_field(body, "object")
                .ok_or_else(|| Error::malformed(command, "missing object"))?;
            let Value::Binary(bytes) = blob else {
                return Err(Error::malformed(command, "object is not a blob"));
            };
            let object = rmp_serde::from_slice(&bytes)
                .map_err(|e| Error::malformed(command, format!("undecodable object: {e}")))?;
            Reply::Value(object)
        }
        CommandKind::ResolveIssObject { .. } => Reply::Id(string_field(
            command,
            body(command, content, "resolve_iss_object_response")?,
            "immutable_id",
        )?),
        CommandKind::IssObjectMetadata { .. } => {
            let body = body(command, content, "iss_object_metadata_response")?;
            let metadata = take_field(body, "metadata")
                .ok_or_else(|| Error::malformed(command, "missing metadata"))?;
            Reply::Metadata(string_map(command, &metadata)?)
        }
        CommandKind::PostIssObject { .. } => Reply::Id(string_field(
            command,
            body(command, content, "post_iss_object_response")?,
            "object_id",
        )?),
        CommandKind::PostCalculation { .. } => Reply::Id(string_field(
            command,
            body(command, content, "post_calculation_response")?,
            "calculation_id",
        )?),
        CommandKind::ResolveMetaChain { .. } => Reply::Id(string_field(
            command,
            body(command, content, "resolve_meta_chain_response")?,
            "calculation_id",
        )?),
        CommandKind::PerformLocalCalc { .. } => {
            Reply::Value(body(command, content, "local_calc_result")?)
        }
        CommandKind::CalculationRequest { .. } => {
            Reply::Value(body(command, content, "calculation_request_response")?)
        }
        CommandKind::CalculationSearch { .. } => {
            let body = body(command, content, "calculation_search_response")?;
            let matches = take_field(body, "matches")
                .ok_or_else(|| Error::malformed(command, "missing matches"))?;
            Reply::Matches(string_list(command, &matches)?)
        }
        CommandKind::IssDiff { .. } => Reply::Value(body(command, content, "iss_diff_response")?),
        CommandKind::CalculationDiff { .. } => {
            Reply::Value(body(command, content, "calculation_diff_response")?)
        }
        CommandKind::IntrospectionStatus { .. } => {
            let body = body(command, content, "introspection_status_response")?;
            let snapshot = Snapshot::from_value(body)
                .map_err(|e| Error::malformed(command, e.to_string()))?;
            Reply::Snapshot(snapshot)
        }
        CommandKind::Echo { .. } => {
            let body = body(command, content, "test")?;
            Reply::Echo(EchoReply {
                name: string_field(command, body.clone(), "name")?,
                message: string_field(command, body, "message")?,
            })
        }
    };
    Ok(reply)
}

fn body(command: &str, content: Value, tag: &str) -> Result<Value> {
    take_field(content, tag).ok_or_else(|| Error::malformed(command, format!("missing {tag}")))
}

fn string_field(command: &str, value: Value, key: &str) -> Result<String> {
    match take_field(value, key) {
        Some(Value::String(s)) => s
            .into_str()
            .ok_or_else(|| Error::malformed(command, format!("{key} is not valid UTF-8"))),
        Some(_) => Err(Error::malformed(command, format!("{key} is not a string"))),
        None => Err(Error::malformed(command, format!("missing {key}"))),
    }
}

fn string_map(command: &str, value: &Value) -> Result<BTreeMap<String, String>> {
    let entries = value
        .as_map()
        .ok_or_else(|| Error::malformed(command, "metadata is not a map"))?;
    entries
        .iter()
        .map(|(k, v)| match (k.as_str(), v.as_str()) {
            (Some(k), Some(v)) => Ok((k.to_string(), v.to_string())),
            _ => Err(Error::malformed(command, "metadata entries must be strings")),
        })
        .collect()
}

fn string_list(command: &str, value: &Value) -> Result<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| Error::malformed(command, "matches is not a list"))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::malformed(command, "matches must be strings"))
        })
        .collect()
}

impl Reply {
    fn mismatch(self, wanted: &str) -> Error {
        Error::malformed(wanted, format!("unexpected reply {self:?}"))
    }

    pub fn into_value(self) -> Result<Value> {
        match self {
            Self::Value(value) => Ok(value),
            other => Err(other.mismatch("value")),
        }
    }

    pub fn into_id(self) -> Result<String> {
        match self {
            Self::Id(id) => Ok(id),
            other => Err(other.mismatch("id")),
        }
    }

    pub fn into_metadata(self) -> Result<BTreeMap<String, String>> {
        match self {
            Self::Metadata(metadata) => Ok(metadata),
            other => Err(other.mismatch("metadata")),
        }
    }

    pub fn into_matches(self) -> Result<Vec<String>> {
        match self {
            Self::Matches(matches) => Ok(matches),
            other => Err(other.mismatch("matches")),
        }
    }

    pub fn into_snapshot(self) -> Result<Snapshot> {
        match self {
            Self::Snapshot(snapshot) => Ok(snapshot),
            other => Err(other.mismatch("snapshot")),
        }
    }

    pub fn into_echo(self) -> Result<EchoReply> {
        match self {
            Self::Echo(echo) => Ok(echo),
            other => Err(other.mismatch("echo")),
        }
    }
}

#[cfg(test)]
mod tests {
    use ipc::protocol::{field, union_tag};

    use super::*;

    const CTX: &str = "ctx-1";

    fn cmd(kind: CommandKind) -> ServiceCommand {
        ServiceCommand::new(CTX, kind)
    }

    fn str_at<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
        field(value, key).and_then(Value::as_str)
    }

    #[test]
    fn test_registration_content() {
        let c = cmd(CommandKind::Registration {
            name: "cradle.rust.lib".into(),
            api_url: "https://api".into(),
            access_token: "tok".into(),
        });
        let content = c.build_request_payload().unwrap();
        assert_eq!(union_tag(&content), Some("registration"));
        let body = field(&content, "registration").unwrap();
        assert_eq!(str_at(body, "name"), Some("cradle.rust.lib"));
        let session = field(body, "session").unwrap();
        assert_eq!(str_at(session, "api_url"), Some("https://api"));
        assert_eq!(str_at(session, "access_token"), Some("tok"));

        let ack = named("registration_acknowledgement", Value::Nil);
        assert_eq!(c.decode_response(ack).unwrap(), Reply::Nothing);
    }

    #[test]
    fn test_iss_object_round_trip() {
        let c = cmd(CommandKind::IssObject {
            object_id: "obj".into(),
            ignore_upgrades: true,
        });
        let content = c.build_request_payload().unwrap();
        let body = field(&content, "iss_object").unwrap();
        assert_eq!(str_at(body, "context_id"), Some(CTX));
        assert_eq!(str_at(body, "encoding"), Some("msgpack"));
        assert_eq!(field(body, "ignore_upgrades"), Some(&Value::from(true)));

        let object = Value::Array(vec![Value::from("abc"), Value::from("def")]);
        let blob = rmp_serde::to_vec(&object).unwrap();
        let response = named("iss_object_response", map([("object", Value::Binary(blob))]));
        assert_eq!(c.decode_response(response).unwrap(), Reply::Value(object));
    }

    #[test]
    fn test_post_iss_object_encodes_blob() {
        let object = Value::Array(vec![Value::from("abc"), Value::from("def"), Value::from("ghi")]);
        let c = cmd(CommandKind::PostIssObject {
            schema: "array/string".into(),
            object: object.clone(),
        });
        let content = c.build_request_payload().unwrap();
        let body = field(&content, "post_iss_object").unwrap();
        assert_eq!(str_at(body, "schema"), Some("array/string"));
        let Some(Value::Binary(bytes)) = field(body, "object") else {
            panic!("object should be a blob");
        };
        let decoded: Value = rmp_serde::from_slice(bytes).unwrap();
        assert_eq!(decoded, object);

        let response = named(
            "post_iss_object_response",
            map([("object_id", Value::from("new-id"))]),
        );
        assert_eq!(c.decode_response(response).unwrap(), Reply::Id("new-id".into()));
    }

    #[test]
    fn test_diff_requests_share_context() {
        for kind in [
            CommandKind::IssDiff {
                id_a: "a".into(),
                id_b: "b".into(),
            },
            CommandKind::CalculationDiff {
                id_a: "a".into(),
                id_b: "b".into(),
            },
        ] {
            let tag = kind.name();
            let content = cmd(kind).build_request_payload().unwrap();
            let body = field(&content, tag).unwrap();
            assert_eq!(str_at(body, "context_a"), Some(CTX));
            assert_eq!(str_at(body, "context_b"), Some(CTX));
            assert_eq!(str_at(body, "id_a"), Some("a"));
            assert_eq!(str_at(body, "id_b"), Some("b"));
        }

        let c = cmd(CommandKind::CalculationDiff {
            id_a: "a".into(),
            id_b: "b".into(),
        });
        let diff = Value::Array(vec![map([("service", Value::from("calc"))])]);
        let reply = c
            .decode_response(named("calculation_diff_response", diff.clone()))
            .unwrap();
        assert_eq!(reply.into_value().unwrap(), diff);
    }

    #[test]
    fn test_copy_uses_source_context() {
        let content = cmd(CommandKind::CopyIssObject {
            destination_context_id: "ctx-2".into(),
            object_id: "obj".into(),
        })
        .build_request_payload()
        .unwrap();
        let body = field(&content, "copy_iss_object").unwrap();
        assert_eq!(str_at(body, "source_context_id"), Some(CTX));
        assert_eq!(str_at(body, "destination_context_id"), Some("ctx-2"));
    }

    #[test]
    fn test_metadata_and_search_decoding() {
        let c = cmd(CommandKind::IssObjectMetadata { object_id: "o".into() });
        let response = named(
            "iss_object_metadata_response",
            map([("metadata", map([("Content-Type", Value::from("application/octet-stream"))]))]),
        );
        let metadata = c.decode_response(response).unwrap().into_metadata().unwrap();
        assert_eq!(metadata["Content-Type"], "application/octet-stream");

        let c = cmd(CommandKind::CalculationSearch {
            calculation_id: "calc".into(),
            search_string: "addition".into(),
        });
        let response = named(
            "calculation_search_response",
            map([("matches", Value::Array(vec![Value::from("m1"), Value::from("m2")]))]),
        );
        assert_eq!(
            c.decode_response(response).unwrap().into_matches().unwrap(),
            vec!["m1".to_string(), "m2".to_string()]
        );
    }

    #[test]
    fn test_introspection_control_contents() {
        let on = cmd(CommandKind::IntrospectionSetEnabled { enabled: true })
            .build_request_payload()
            .unwrap();
        let control = field(&on, "introspection_control").unwrap();
        assert_eq!(union_tag(control), Some("enabled"));

        let clear = cmd(CommandKind::IntrospectionClearAdmin)
            .build_request_payload()
            .unwrap();
        let control = field(&clear, "introspection_control").unwrap();
        assert_eq!(field(control, "clear_admin"), Some(&Value::Nil));
    }

    #[test]
    fn test_introspection_status_decodes_snapshot() {
        let c = cmd(CommandKind::IntrospectionStatus { include_finished: true });
        let content = c.build_request_payload().unwrap();
        let body = field(&content, "introspection_status_query").unwrap();
        assert_eq!(field(body, "include_finished"), Some(&Value::from(true)));

        let status = map([
            ("now", Value::from(1_700_000_000_000_i64)),
            ("tasklets", Value::Array(vec![])),
        ]);
        let snapshot = c
            .decode_response(named("introspection_status_response", status))
            .unwrap()
            .into_snapshot()
            .unwrap();
        assert!(snapshot.tasklets().is_empty());
    }

    #[test]
    fn test_missing_key_is_malformed() {
        let c = cmd(CommandKind::PostCalculation {
            calculation: Value::Nil,
        });
        let err = c
            .decode_response(named("post_calculation_response", Value::Map(Vec::new())))
            .unwrap_err();
        match err {
            Error::MalformedResponse { command, reason } => {
                assert_eq!(command, "post_calculation");
                assert!(reason.contains("calculation_id"));
            }
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_variant_is_malformed() {
        let c = cmd(CommandKind::CalculationRequest {
            calculation_id: "c".into(),
        });
        let err = c
            .decode_response(named("iss_diff_response", Value::Nil))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[test]
    fn test_echo() {
        let c = cmd(CommandKind::Echo {
            message: "hello".into(),
        });
        let response = named(
            "test",
            map([("name", Value::from("cradle.rust.lib")), ("message", Value::from("hello"))]),
        );
        let echo = c.decode_response(response).unwrap().into_echo().unwrap();
        assert_eq!(echo.name, "cradle.rust.lib");
        assert_eq!(echo.message, "hello");
    }

    struct Case {
        kind: CommandKind,
        tag: &'static str,
        keys: &'static [&'static str],
        response: Value,
        reply: Reply,
    }

    fn body_keys(content: &Value, tag: &str) -> Vec<String> {
        let body = field(content, tag).unwrap_or_else(|| panic!("missing {tag} body"));
        let mut keys: Vec<String> = body
            .as_map()
            .unwrap_or_else(|| panic!("{tag} body is not a map"))
            .iter()
            .map(|(k, _)| k.as_str().unwrap().to_string())
            .collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_catalog_wire_shapes() {
        let calculation = map([("function", Value::from("addition"))]);
        let object = Value::from("payload");
        let blob = rmp_serde::to_vec(&object).unwrap();
        let status = map([
            ("now", Value::from(1_700_000_000_000_i64)),
            ("tasklets", Value::Array(vec![])),
        ]);
        let diff = Value::Array(vec![map([("path", Value::from("/"))])]);

        let cases = vec![
            Case {
                kind: CommandKind::Registration {
                    name: "cradle.rust.lib".into(),
                    api_url: "https://api".into(),
                    access_token: "tok".into(),
                },
                tag: "registration",
                keys: &["name", "session"],
                response: named("registration_acknowledgement", Value::Nil),
                reply: Reply::Nothing,
            },
            Case {
                kind: CommandKind::IssObject {
                    object_id: "obj".into(),
                    ignore_upgrades: false,
                },
                tag: "iss_object",
                keys: &["context_id", "encoding", "ignore_upgrades", "object_id"],
                response: named("iss_object_response", map([("object", Value::Binary(blob))])),
                reply: Reply::Value(object.clone()),
            },
            Case {
                kind: CommandKind::ResolveIssObject {
                    object_id: "obj".into(),
                    ignore_upgrades: true,
                },
                tag: "resolve_iss_object",
                keys: &["context_id", "ignore_upgrades", "object_id"],
                response: named(
                    "resolve_iss_object_response",
                    map([("immutable_id", Value::from("imm-1"))]),
                ),
                reply: Reply::Id("imm-1".into()),
            },
            Case {
                kind: CommandKind::IssObjectMetadata {
                    object_id: "obj".into(),
                },
                tag: "iss_object_metadata",
                keys: &["context_id", "object_id"],
                response: named(
                    "iss_object_metadata_response",
                    map([("metadata", map([("Content-Length", Value::from("4"))]))]),
                ),
                reply: Reply::Metadata(BTreeMap::from([(
                    "Content-Length".to_string(),
                    "4".to_string(),
                )])),
            },
            Case {
                kind: CommandKind::PostIssObject {
                    schema: "string".into(),
                    object: object.clone(),
                },
                tag: "post_iss_object",
                keys: &["context_id", "encoding", "object", "schema"],
                response: named(
                    "post_iss_object_response",
                    map([("object_id", Value::from("obj-2"))]),
                ),
                reply: Reply::Id("obj-2".into()),
            },
            Case {
                kind: CommandKind::CopyIssObject {
                    destination_context_id: "ctx-2".into(),
                    object_id: "obj".into(),
                },
                tag: "copy_iss_object",
                keys: &["destination_context_id", "object_id", "source_context_id"],
                response: named("copy_iss_object_response", Value::Nil),
                reply: Reply::Nothing,
            },
            Case {
                kind: CommandKind::PostCalculation {
                    calculation: calculation.clone(),
                },
                tag: "post_calculation",
                keys: &["calculation", "context_id"],
                response: named(
                    "post_calculation_response",
                    map([("calculation_id", Value::from("calc-1"))]),
                ),
                reply: Reply::Id("calc-1".into()),
            },
            Case {
                kind: CommandKind::CopyCalculation {
                    destination_context_id: "ctx-2".into(),
                    calculation_id: "calc-1".into(),
                },
                tag: "copy_calculation",
                keys: &["calculation_id", "destination_context_id", "source_context_id"],
                response: named("copy_calculation_response", Value::Nil),
                reply: Reply::Nothing,
            },
            Case {
                kind: CommandKind::ResolveMetaChain {
                    generator: calculation.clone(),
                },
                tag: "resolve_meta_chain",
                keys: &["context_id", "generator"],
                response: named(
                    "resolve_meta_chain_response",
                    map([("calculation_id", Value::from("calc-2"))]),
                ),
                reply: Reply::Id("calc-2".into()),
            },
            Case {
                kind: CommandKind::PerformLocalCalc {
                    calculation: calculation.clone(),
                },
                tag: "perform_local_calc",
                keys: &["calculation", "context_id"],
                response: named("local_calc_result", Value::from(42)),
                reply: Reply::Value(Value::from(42)),
            },
            Case {
                kind: CommandKind::CalculationRequest {
                    calculation_id: "calc-1".into(),
                },
                tag: "calculation_request",
                keys: &["calculation_id", "context_id"],
                response: named(
                    "calculation_request_response",
                    map([("calculation", calculation.clone())]),
                ),
                reply: Reply::Value(map([("calculation", calculation.clone())])),
            },
            Case {
                kind: CommandKind::CalculationSearch {
                    calculation_id: "calc-1".into(),
                    search_string: "addition".into(),
                },
                tag: "calculation_search",
                keys: &["calculation_id", "context_id", "search_string"],
                response: named(
                    "calculation_search_response",
                    map([("matches", Value::Array(vec![Value::from("calc-3")]))]),
                ),
                reply: Reply::Matches(vec!["calc-3".into()]),
            },
            Case {
                kind: CommandKind::IssDiff {
                    id_a: "a".into(),
                    id_b: "b".into(),
                },
                tag: "iss_diff",
                keys: &["context_a", "context_b", "id_a", "id_b"],
                response: named("iss_diff_response", diff.clone()),
                reply: Reply::Value(diff.clone()),
            },
            Case {
                kind: CommandKind::CalculationDiff {
                    id_a: "a".into(),
                    id_b: "b".into(),
                },
                tag: "calculation_diff",
                keys: &["context_a", "context_b", "id_a", "id_b"],
                response: named("calculation_diff_response", diff.clone()),
                reply: Reply::Value(diff.clone()),
            },
            Case {
                kind: CommandKind::IntrospectionStatus {
                    include_finished: false,
                },
                tag: "introspection_status_query",
                keys: &["include_finished"],
                response: named("introspection_status_response", status.clone()),
                reply: Reply::Snapshot(Snapshot::from_value(status).unwrap()),
            },
            Case {
                kind: CommandKind::IntrospectionSetEnabled { enabled: false },
                tag: "introspection_control",
                keys: &["enabled"],
                response: named("introspection_control_response", Value::Nil),
                reply: Reply::Nothing,
            },
            Case {
                kind: CommandKind::IntrospectionClearAdmin,
                tag: "introspection_control",
                keys: &["clear_admin"],
                response: named("introspection_control_response", Value::Nil),
                reply: Reply::Nothing,
            },
            Case {
                kind: CommandKind::Echo {
                    message: "hi".into(),
                },
                tag: "test",
                keys: &["message"],
                response: named(
                    "test",
                    map([("name", Value::from("cradle.rust.lib")), ("message", Value::from("hi"))]),
                ),
                reply: Reply::Echo(EchoReply {
                    name: "cradle.rust.lib".into(),
                    message: "hi".into(),
                }),
            },
        ];

        for case in cases {
            let name = case.kind.name();
            let c = cmd(case.kind);
            let content = c.build_request_payload().unwrap();
            assert_eq!(union_tag(&content), Some(case.tag), "{name}");
            assert_eq!(body_keys(&content, case.tag), case.keys, "{name}");
            assert_eq!(c.decode_response(case.response).unwrap(), case.reply, "{name}");
        }
    }

    #[test]
    fn test_reply_conversion_mismatch() {
        assert!(Reply::Nothing.into_id().is_err());
        assert_eq!(Reply::Id("x".into()).into_id().unwrap(), "x");
    }
}
