use crate::error::{Result, WorkerError};
use layout_engine::{BuildRequest, EngineConfig, LayoutWorker};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const COMMAND_BUILD_LAYOUT: &str = "buildLayout";
pub const COMMAND_RESET_CONFIG: &str = "resetConfig";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "__success__")]
    Success,
    #[serde(rename = "__error__")]
    Error,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub context: Value,
    pub command: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub context: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    fn success(context: Value, command: String, result: Value) -> Self {
        Self {
            context,
            command: Some(command),
            status: Status::Success,
            result: Some(result),
            error: None,
        }
    }

    fn failure(context: Value, command: Option<String>, error: &WorkerError) -> Self {
        Self {
            context,
            command,
            status: Status::Error,
            result: None,
            error: Some(ErrorBody {
                message: error.to_string(),
            }),
        }
    }
}

/// Routes protocol messages to the hosted engine.
#[derive(Debug, Default)]
pub struct Dispatcher {
    worker: LayoutWorker,
}

impl Dispatcher {
    pub fn new(worker: LayoutWorker) -> Self {
        Self { worker }
    }

    pub fn worker(&self) -> &LayoutWorker {
        &self.worker
    }

    /// Never fails: problems are reported in the response.
    pub fn handle_line(&mut self, line: &str) -> Response {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("Unreadable request: {e}");
                return Response::failure(Value::Null, None, &WorkerError::from(e));
            }
        };

        let context = value.get("context").cloned().unwrap_or(Value::Null);
        let command = value
            .get("command")
            .and_then(Value::as_str)
            .map(str::to_string);

        let request: Request = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                let error = WorkerError::MalformedRequest(e.to_string());
                warn!("{error}");
                return Response::failure(context, command, &error);
            }
        };

        let Request {
            context,
            command,
            data,
        } = request;
        debug!("Handling {command} (context {context})");
        match self.dispatch(&command, data) {
            Ok(result) => Response::success(context, command, result),
            Err(e) => {
                warn!("{command} failed: {e}");
                Response::failure(context, Some(command), &e)
            }
        }
    }

    fn dispatch(&mut self, command: &str, data: Value) -> Result<Value> {
        match command {
            COMMAND_BUILD_LAYOUT => {
                let request = build_request(data)?;
                let snapshot = self.worker.build_layout(request)?;
                Ok(serde_json::to_value(snapshot)?)
            }
            COMMAND_RESET_CONFIG => {
                let config: EngineConfig = if data.is_null() {
                    EngineConfig::default()
                } else {
                    serde_json::from_value(data)?
                };
                self.worker.reset_config(config)?;
                info!("Engine configuration replaced");
                Ok(Value::Null)
            }
            other => Err(WorkerError::UnknownCommand(other.to_string())),
        }
    }
}

/// Accepts named fields or positional `params`:
/// `[metaInfo, instanceMap, config, textViewMetrics]`.
fn build_request(data: Value) -> Result<BuildRequest> {
    let params = match data {
        Value::Object(mut object) => match object.remove("params") {
            Some(Value::Array(params)) => params,
            Some(_) => {
                return Err(WorkerError::MalformedRequest(
                    "params must be an array".to_string(),
                ));
            }
            None => return Ok(serde_json::from_value(Value::Object(object))?),
        },
        Value::Array(params) => params,
        other => {
            return Err(WorkerError::MalformedRequest(format!(
                "buildLayout expects an object or params array, got {other}"
            )));
        }
    };

    if !(3..=4).contains(&params.len()) {
        return Err(WorkerError::MalformedRequest(format!(
            "buildLayout takes 3 or 4 params, got {}",
            params.len()
        )));
    }

    let mut params = params.into_iter();
    let mut next = || params.next().unwrap_or(Value::Null);
    let (meta_info, instance_map, config, metrics) = (next(), next(), next(), next());
    let mut object = serde_json::Map::new();
    object.insert("metaInfo".to_string(), meta_info);
    object.insert("instanceMap".to_string(), instance_map);
    object.insert("config".to_string(), config);
    if !metrics.is_null() {
        object.insert("textViewMetrics".to_string(), metrics);
    }
    Ok(serde_json::from_value(Value::Object(object))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use layout_engine::{SearchConfig, TieBreakMode};
    use serde_json::json;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(LayoutWorker::new(EngineConfig {
            search: SearchConfig {
                tie_break: TieBreakMode::First,
                ..Default::default()
            },
        }))
    }

    fn meta() -> Value {
        json!([
            { "type": "article", "root": true, "children": [{ "type": "title" }] },
            { "type": "title", "imperative": true }
        ])
    }

    fn instances() -> Value {
        json!({
            "article": [],
            "title": [{ "type": "title", "height": 200, "config": { "alignTop": true } }]
        })
    }

    fn metrics() -> Value {
        json!({ "columnsHeight": 1000, "lineHeight": 20, "linesPerColumn": 50 })
    }

    #[test]
    fn test_build_layout_with_named_fields() {
        let line = json!({
            "context": { "requestId": 7 },
            "command": "buildLayout",
            "data": {
                "metaInfo": meta(),
                "instanceMap": instances(),
                "config": { "colspan": 1 },
                "textViewMetrics": metrics()
            }
        })
        .to_string();

        let response = dispatcher().handle_line(&line);
        assert_eq!(response.status, Status::Success);
        assert_eq!(response.context, json!({ "requestId": 7 }));
        assert_eq!(response.command.as_deref(), Some(COMMAND_BUILD_LAYOUT));
        let result = response.result.unwrap();
        assert_eq!(result["_colspan"], json!(1));
        assert_eq!(result["_blockInstances"][0]["type"], json!("title"));
    }

    #[test]
    fn test_build_layout_with_positional_params() {
        let line = json!({
            "context": "abc",
            "command": "buildLayout",
            "data": { "params": [meta(), instances(), { "colspan": 1 }, metrics()] }
        })
        .to_string();

        let response = dispatcher().handle_line(&line);
        assert_eq!(response.status, Status::Success);
        assert_eq!(response.result.unwrap()["_colspan"], json!(1));
    }

    #[test]
    fn test_no_layout_is_a_null_result() {
        let line = json!({
            "command": "buildLayout",
            "data": {
                "metaInfo": meta(),
                "instanceMap": { "article": [], "title": [] },
                "config": { "colspan": 1 },
                "textViewMetrics": metrics()
            }
        })
        .to_string();

        let response = dispatcher().handle_line(&line);
        assert_eq!(response.status, Status::Success);
        assert_eq!(response.result, Some(Value::Null));

        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(wire["status"], json!("__success__"));
        assert!(wire.get("result").unwrap().is_null());
        assert!(wire.get("error").is_none());
    }

    #[test]
    fn test_metrics_persist_between_lines() {
        let mut dispatcher = dispatcher();
        let first = json!({
            "command": "buildLayout",
            "data": { "params": [meta(), instances(), { "colspan": 1 }, metrics()] }
        });
        let second = json!({
            "command": "buildLayout",
            "data": { "params": [meta(), instances(), { "colspan": 1 }] }
        });

        assert_eq!(dispatcher.handle_line(&first.to_string()).status, Status::Success);
        assert_eq!(dispatcher.handle_line(&second.to_string()).status, Status::Success);
    }

    #[test]
    fn test_reset_config() {
        let mut dispatcher = dispatcher();
        let line = json!({
            "command": "resetConfig",
            "data": { "search": { "allow_expand": true, "tie_break": "seeded", "seed": 3 } }
        })
        .to_string();

        let response = dispatcher.handle_line(&line);
        assert_eq!(response.status, Status::Success);
        assert!(dispatcher.worker().config().search.allow_expand);

        let invalid = json!({
            "command": "resetConfig",
            "data": { "search": { "tie_break": "seeded" } }
        })
        .to_string();
        assert_eq!(dispatcher.handle_line(&invalid).status, Status::Error);
        assert_eq!(dispatcher.worker().config().search.seed, Some(3));
    }

    #[test]
    fn test_malformed_lines() {
        let mut dispatcher = dispatcher();

        let response = dispatcher.handle_line("{not json");
        assert_eq!(response.status, Status::Error);
        assert!(response.command.is_none());

        let response = dispatcher.handle_line(r#"{"context": 1, "command": "fly"}"#);
        assert_eq!(response.status, Status::Error);
        assert_eq!(response.command.as_deref(), Some("fly"));
        assert_eq!(response.context, json!(1));
        assert!(response.error.unwrap().message.contains("fly"));

        let response = dispatcher.handle_line(r#"{"command": "buildLayout", "data": 5}"#);
        assert_eq!(response.status, Status::Error);
        assert_eq!(response.command.as_deref(), Some(COMMAND_BUILD_LAYOUT));

        let response =
            dispatcher.handle_line(r#"{"command": "buildLayout", "data": {"params": [1]}}"#);
        assert_eq!(response.status, Status::Error);
    }

    #[test]
    fn test_engine_errors_are_reported() {
        let line = json!({
            "command": "buildLayout",
            "data": { "params": [meta(), instances(), {}, metrics()] }
        })
        .to_string();

        let response = dispatcher().handle_line(&line);
        assert_eq!(response.status, Status::Error);
        assert!(response.error.unwrap().message.contains("colspan"));
    }
}
