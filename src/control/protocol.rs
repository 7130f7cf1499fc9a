//! Control protocol for the viewer connection.
//!
//! Line-delimited JSON: each request is one object with an `op` field and
//! an optional client-chosen `id` that is echoed on the matching events.

use serde_json::Value;

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct RequestId(Value);

impl RequestId {
    pub fn new(value: Value) -> Option<Self> {
        match value {
            Value::String(_) | Value::Number(_) => Some(Self(value)),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// One uploaded file in an `upload_sets` request.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub contents: String,
}

#[derive(Debug)]
pub enum Request {
    Hello(HelloRequest),
    AddLayout(AddLayoutRequest),
    DeleteLayout(IndexRequest),
    DeleteAll(BareRequest),
    RenameLayout(RenameRequest),
    SetVisible(SetVisibleRequest),
    SwapLayouts(SwapRequest),
    SetOpacity(SetOpacityRequest),
    ToggleGizmo(IndexRequest),
    BeginAdjust(IndexRequest),
    Adjust(AdjustRequest),
    EndAdjust(BareRequest),
    OpenLoadDialog(BareRequest),
    LoadSet(LoadSetRequest),
    UploadSets(UploadSetsRequest),
    AdvanceScene(BareRequest),
    ExportSet(ExportRequest),
    GetState(BareRequest),
    Shutdown(BareRequest),
    Unknown { id: Option<RequestId>, op: String },
}

impl Request {
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Request::Hello(req) => req.id.clone(),
            Request::AddLayout(req) => req.id.clone(),
            Request::DeleteLayout(req) | Request::ToggleGizmo(req) | Request::BeginAdjust(req) => {
                req.id.clone()
            }
            Request::DeleteAll(req)
            | Request::EndAdjust(req)
            | Request::OpenLoadDialog(req)
            | Request::AdvanceScene(req)
            | Request::GetState(req)
            | Request::Shutdown(req) => req.id.clone(),
            Request::RenameLayout(req) => req.id.clone(),
            Request::SetVisible(req) => req.id.clone(),
            Request::SwapLayouts(req) => req.id.clone(),
            Request::SetOpacity(req) => req.id.clone(),
            Request::Adjust(req) => req.id.clone(),
            Request::LoadSet(req) => req.id.clone(),
            Request::UploadSets(req) => req.id.clone(),
            Request::ExportSet(req) => req.id.clone(),
            Request::Unknown { id, .. } => id.clone(),
        }
    }
}

#[derive(Debug)]
pub struct HelloRequest {
    pub id: Option<RequestId>,
    pub version: u32,
    pub token: Option<String>,
}

#[derive(Debug)]
pub struct BareRequest {
    pub id: Option<RequestId>,
}

#[derive(Debug)]
pub struct IndexRequest {
    pub id: Option<RequestId>,
    pub index: usize,
}

#[derive(Debug)]
pub struct AddLayoutRequest {
    pub id: Option<RequestId>,
    pub category: String,
}

#[derive(Debug)]
pub struct RenameRequest {
    pub id: Option<RequestId>,
    pub index: usize,
    pub name: String,
}

#[derive(Debug)]
pub struct SetVisibleRequest {
    pub id: Option<RequestId>,
    pub index: usize,
    pub visible: bool,
}

#[derive(Debug)]
pub struct SwapRequest {
    pub id: Option<RequestId>,
    pub a: usize,
    pub b: usize,
}

#[derive(Debug)]
pub struct SetOpacityRequest {
    pub id: Option<RequestId>,
    pub value: f32,
}

#[derive(Debug)]
pub struct AdjustRequest {
    pub id: Option<RequestId>,
    pub position: Option<[f32; 3]>,
    pub yaw_degrees: Option<f32>,
    pub scale: Option<[f32; 3]>,
}

#[derive(Debug)]
pub struct LoadSetRequest {
    pub id: Option<RequestId>,
    pub name: String,
    pub contents: String,
    pub replace: bool,
}

#[derive(Debug)]
pub struct UploadSetsRequest {
    pub id: Option<RequestId>,
    pub files: Vec<UploadFile>,
}

#[derive(Debug)]
pub struct ExportRequest {
    pub id: Option<RequestId>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Unsupported,
    Busy,
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "bad_request",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::Unsupported => "unsupported",
            ErrorCode::Busy => "busy",
            ErrorCode::Internal => "internal",
        }
    }
}

#[derive(Debug)]
pub struct ProtocolError {
    pub id: Option<RequestId>,
    pub code: ErrorCode,
    pub message: String,
}

fn bad_request(id: &Option<RequestId>, message: impl Into<String>) -> ProtocolError {
    ProtocolError {
        id: id.clone(),
        code: ErrorCode::BadRequest,
        message: message.into(),
    }
}

pub fn decode_request(line: &str) -> Result<Request, ProtocolError> {
    let value: Value = serde_json::from_str(line).map_err(|err| ProtocolError {
        id: None,
        code: ErrorCode::BadRequest,
        message: format!("invalid JSON: {err}"),
    })?;

    let obj = value.as_object().ok_or_else(|| ProtocolError {
        id: None,
        code: ErrorCode::BadRequest,
        message: "request must be a JSON object".to_string(),
    })?;

    let id = obj.get("id").cloned().and_then(RequestId::new);

    let op = obj
        .get("op")
        .and_then(|v| v.as_str())
        .ok_or_else(|| bad_request(&id, "missing or invalid string field `op`"))?;

    match op {
        "hello" => {
            let version = obj
                .get("version")
                .and_then(|v| v.as_u64())
                .ok_or_else(|| bad_request(&id, "missing or invalid numeric field `version`"))?
                as u32;
            let token = obj
                .get("token")
                .and_then(|v| v.as_str())
                .map(ToString::to_string);
            Ok(Request::Hello(HelloRequest { id, version, token }))
        }
        "add_layout" => {
            let category = parse_string(obj, &id, "category")?;
            Ok(Request::AddLayout(AddLayoutRequest { id, category }))
        }
        "delete_layout" => {
            let index = parse_index(obj, &id, "index")?;
            Ok(Request::DeleteLayout(IndexRequest { id, index }))
        }
        "delete_all" => Ok(Request::DeleteAll(BareRequest { id })),
        "rename_layout" => {
            let index = parse_index(obj, &id, "index")?;
            let name = parse_string(obj, &id, "name")?;
            Ok(Request::RenameLayout(RenameRequest { id, index, name }))
        }
        "set_visible" => {
            let index = parse_index(obj, &id, "index")?;
            let visible = obj
                .get("visible")
                .and_then(|v| v.as_bool())
                .ok_or_else(|| bad_request(&id, "missing or invalid boolean field `visible`"))?;
            Ok(Request::SetVisible(SetVisibleRequest { id, index, visible }))
        }
        "swap_layouts" => {
            let a = parse_index(obj, &id, "a")?;
            let b = parse_index(obj, &id, "b")?;
            Ok(Request::SwapLayouts(SwapRequest { id, a, b }))
        }
        "set_opacity" => {
            let value = obj
                .get("value")
                .and_then(|v| v.as_f64())
                .ok_or_else(|| bad_request(&id, "missing or invalid numeric field `value`"))?
                as f32;
            Ok(Request::SetOpacity(SetOpacityRequest { id, value }))
        }
        "toggle_gizmo" => {
            let index = parse_index(obj, &id, "index")?;
            Ok(Request::ToggleGizmo(IndexRequest { id, index }))
        }
        "begin_adjust" => {
            let index = parse_index(obj, &id, "index")?;
            Ok(Request::BeginAdjust(IndexRequest { id, index }))
        }
        "adjust" => {
            let position = parse_optional_vec3(obj, &id, "position")?;
            let yaw_degrees = match obj.get("yaw") {
                None => None,
                Some(v) => Some(
                    v.as_f64()
                        .ok_or_else(|| bad_request(&id, "invalid numeric field `yaw`"))?
                        as f32,
                ),
            };
            let scale = parse_optional_vec3(obj, &id, "scale")?;
            Ok(Request::Adjust(AdjustRequest {
                id,
                position,
                yaw_degrees,
                scale,
            }))
        }
        "end_adjust" => Ok(Request::EndAdjust(BareRequest { id })),
        "open_load_dialog" => Ok(Request::OpenLoadDialog(BareRequest { id })),
        "load_set" => {
            let name = obj
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("uploaded set")
                .to_string();
            let contents = parse_contents(obj, &id)?;
            let replace = obj.get("replace").and_then(|v| v.as_bool()).unwrap_or(true);
            Ok(Request::LoadSet(LoadSetRequest {
                id,
                name,
                contents,
                replace,
            }))
        }
        "upload_sets" => {
            let raw_files = obj
                .get("files")
                .and_then(|v| v.as_array())
                .ok_or_else(|| bad_request(&id, "missing or invalid array field `files`"))?;
            let mut files = Vec::with_capacity(raw_files.len());
            for entry in raw_files {
                let entry = entry
                    .as_object()
                    .ok_or_else(|| bad_request(&id, "each file must be a JSON object"))?;
                let name = entry
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("uploaded set")
                    .to_string();
                let contents = parse_contents(entry, &id)?;
                files.push(UploadFile { name, contents });
            }
            Ok(Request::UploadSets(UploadSetsRequest { id, files }))
        }
        "advance_scene" => Ok(Request::AdvanceScene(BareRequest { id })),
        "export_set" => {
            let name = obj.get("name").and_then(|v| v.as_str()).map(str::to_string);
            Ok(Request::ExportSet(ExportRequest { id, name }))
        }
        "get_state" => Ok(Request::GetState(BareRequest { id })),
        "shutdown" => Ok(Request::Shutdown(BareRequest { id })),
        other => Ok(Request::Unknown {
            id,
            op: other.to_string(),
        }),
    }
}

fn parse_string(
    obj: &serde_json::Map<String, Value>,
    id: &Option<RequestId>,
    key: &str,
) -> Result<String, ProtocolError> {
    obj.get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| bad_request(id, format!("missing or invalid string field `{key}`")))
}

fn parse_index(
    obj: &serde_json::Map<String, Value>,
    id: &Option<RequestId>,
    key: &str,
) -> Result<usize, ProtocolError> {
    let raw = obj
        .get(key)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| bad_request(id, format!("missing or invalid numeric field `{key}`")))?;
    usize::try_from(raw).map_err(|_| bad_request(id, format!("field `{key}` out of range")))
}

fn parse_optional_vec3(
    obj: &serde_json::Map<String, Value>,
    id: &Option<RequestId>,
    key: &str,
) -> Result<Option<[f32; 3]>, ProtocolError> {
    let Some(value) = obj.get(key) else {
        return Ok(None);
    };
    let arr = value
        .as_array()
        .filter(|arr| arr.len() == 3)
        .ok_or_else(|| bad_request(id, format!("field `{key}` must be a 3-element array")))?;
    let mut out = [0.0f32; 3];
    for (slot, item) in out.iter_mut().zip(arr) {
        *slot = item
            .as_f64()
            .ok_or_else(|| bad_request(id, format!("field `{key}` must hold numbers")))?
            as f32;
    }
    Ok(Some(out))
}

/// File contents may arrive as a raw JSON string or as the parsed set
/// object itself; both normalize to the raw text the codec parses.
fn parse_contents(
    obj: &serde_json::Map<String, Value>,
    id: &Option<RequestId>,
) -> Result<String, ProtocolError> {
    match obj.get("contents") {
        Some(Value::String(raw)) => Ok(raw.clone()),
        Some(value @ Value::Object(_)) => Ok(value.to_string()),
        _ => Err(bad_request(
            id,
            "missing field `contents` (string or object)",
        )),
    }
}

pub fn event_hello(id: Option<RequestId>, capabilities: &[&str]) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("event".to_string(), Value::String("hello".to_string()));
    obj.insert(
        "version".to_string(),
        Value::Number((PROTOCOL_VERSION as u64).into()),
    );
    obj.insert(
        "capabilities".to_string(),
        Value::Array(
            capabilities
                .iter()
                .map(|cap| Value::String((*cap).to_string()))
                .collect(),
        ),
    );
    if let Some(id) = id {
        obj.insert("id".to_string(), id.into_value());
    }
    Value::Object(obj)
}

pub fn event_ok(id: Option<RequestId>) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("event".to_string(), Value::String("ok".to_string()));
    if let Some(id) = id {
        obj.insert("id".to_string(), id.into_value());
    }
    Value::Object(obj)
}

pub fn event_error(id: Option<RequestId>, code: ErrorCode, message: impl Into<String>) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("event".to_string(), Value::String("error".to_string()));
    obj.insert("code".to_string(), Value::String(code.as_str().to_string()));
    obj.insert("message".to_string(), Value::String(message.into()));
    if let Some(id) = id {
        obj.insert("id".to_string(), id.into_value());
    }
    Value::Object(obj)
}

pub fn event_state(id: Option<RequestId>, snapshot: Value) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("event".to_string(), Value::String("state".to_string()));
    obj.insert("session".to_string(), snapshot);
    if let Some(id) = id {
        obj.insert("id".to_string(), id.into_value());
    }
    Value::Object(obj)
}

pub fn event_imported(
    id: Option<RequestId>,
    added: usize,
    total: usize,
    replaced: bool,
    queued: usize,
) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("event".to_string(), Value::String("imported".to_string()));
    obj.insert("added".to_string(), Value::Number((added as u64).into()));
    obj.insert("total".to_string(), Value::Number((total as u64).into()));
    obj.insert("replaced".to_string(), Value::Bool(replaced));
    obj.insert("queued".to_string(), Value::Number((queued as u64).into()));
    if let Some(id) = id {
        obj.insert("id".to_string(), id.into_value());
    }
    Value::Object(obj)
}

pub fn event_exported(id: Option<RequestId>, name: &str, path: &str) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("event".to_string(), Value::String("exported".to_string()));
    obj.insert("name".to_string(), Value::String(name.to_string()));
    obj.insert("path".to_string(), Value::String(path.to_string()));
    if let Some(id) = id {
        obj.insert("id".to_string(), id.into_value());
    }
    Value::Object(obj)
}

pub fn event_gizmo(id: Option<RequestId>, bound_index: Option<usize>) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("event".to_string(), Value::String("gizmo".to_string()));
    obj.insert(
        "bound".to_string(),
        match bound_index {
            Some(index) => Value::Number((index as u64).into()),
            None => Value::Null,
        },
    );
    if let Some(id) = id {
        obj.insert("id".to_string(), id.into_value());
    }
    Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hello_parses_with_id() {
        let req = decode_request(r#"{"op":"hello","id":1,"version":1}"#).expect("should parse");
        let Request::Hello(hello) = req else {
            panic!("expected hello");
        };
        assert_eq!(hello.version, 1);
        assert!(hello.id.is_some());
    }

    #[test]
    fn rejects_non_object() {
        let err = decode_request("[]").unwrap_err();
        assert_eq!(err.code.as_str(), "bad_request");
    }

    #[test]
    fn decode_missing_op_is_bad_request() {
        let err = decode_request(r#"{"id":1}"#).unwrap_err();
        assert_eq!(err.code.as_str(), "bad_request");
        assert_eq!(err.id.unwrap().into_value(), json!(1));
    }

    #[test]
    fn add_layout_requires_category() {
        let err = decode_request(r#"{"op":"add_layout","id":2}"#).unwrap_err();
        assert!(err.message.contains("category"));

        let req = decode_request(r#"{"op":"add_layout","category":"wall"}"#).unwrap();
        let Request::AddLayout(add) = req else {
            panic!("expected add_layout");
        };
        assert_eq!(add.category, "wall");
    }

    #[test]
    fn adjust_parses_partial_patches() {
        let req =
            decode_request(r#"{"op":"adjust","scale":[2.0,1.0,1.0],"yaw":45.0}"#).unwrap();
        let Request::Adjust(adjust) = req else {
            panic!("expected adjust");
        };
        assert_eq!(adjust.scale, Some([2.0, 1.0, 1.0]));
        assert_eq!(adjust.yaw_degrees, Some(45.0));
        assert_eq!(adjust.position, None);
    }

    #[test]
    fn adjust_rejects_short_arrays() {
        let err = decode_request(r#"{"op":"adjust","position":[1.0,2.0]}"#).unwrap_err();
        assert!(err.message.contains("3-element"));
    }

    #[test]
    fn load_set_accepts_embedded_object_contents() {
        let req = decode_request(
            r#"{"op":"load_set","name":"a.json","contents":{"bboxes":[],"labels":[]}}"#,
        )
        .unwrap();
        let Request::LoadSet(load) = req else {
            panic!("expected load_set");
        };
        assert!(load.contents.contains("bboxes"));
        assert!(load.replace);
    }

    #[test]
    fn upload_sets_parses_file_list() {
        let req = decode_request(
            r#"{"op":"upload_sets","files":[
                {"name":"a.json","contents":"{}"},
                {"name":"b.json","contents":{"bboxes":[],"labels":[]}}
            ]}"#,
        )
        .unwrap();
        let Request::UploadSets(upload) = req else {
            panic!("expected upload_sets");
        };
        assert_eq!(upload.files.len(), 2);
        assert_eq!(upload.files[0].name, "a.json");
    }

    #[test]
    fn unknown_op_is_preserved() {
        let req = decode_request(r#"{"op":"warp","id":"x"}"#).unwrap();
        match req {
            Request::Unknown { op, id } => {
                assert_eq!(op, "warp");
                assert_eq!(id.unwrap().into_value(), json!("x"));
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn request_id_extraction_works_for_all_variants() {
        let req = decode_request(r#"{"op":"shutdown","id":"x"}"#).unwrap();
        assert_eq!(req.request_id().unwrap().into_value(), json!("x"));
    }
}
