//! Python interpreter plugin backed by a remote execution service

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::agent::{Action, PluginInfo, TaskExecutionContext};
use crate::config::PluginSettings;
use crate::error::{ConfigError, Result, ToolError};
use crate::tools::{Tool, ToolFactory};

const DESCRIPTION_FOR_MODEL: &str = "The tool for running python code. The output text is treated as results of this tool. \
So program codes should output the results to stdout always. \
If the program codes are for create an image, write the image file to working directory. \
You can use the third party packages contained in this list ['numpy', 'pandas', 'matplotlib', 'opencv-python', 'requests']. \
This tool accept the json format input with the property 'code' only. \
'code' property contains the python code to be executed. ex. {\"code\": \"print('hello')\"}. \
The code should be a valid python code. The code should print the results always. \
The code should not contain any infinite loops. The codes should not contain any input statements. \
When the image urls are returned as the results, that images should be displayed using markdown notation like this ![caption](url).";

/// Sends code to the interpreter backend and returns its JSON reply
pub struct PythonInterpreterTool {
    info: PluginInfo,
    backend: String,
    http: reqwest::Client,
}

impl PythonInterpreterTool {
    pub fn new(backend: impl Into<String>, http: reqwest::Client) -> Self {
        let mut info = PluginInfo::new(
            "python_interpreter",
            "Python Interpreter",
            "You can run python code here.",
        )
        .displayed();
        info.description_for_model = DESCRIPTION_FOR_MODEL.to_string();
        Self {
            info,
            backend: backend.into(),
            http,
        }
    }
}

/// Code carried by the action input, either `{"code": ...}` or raw source
pub fn code_from_input(input: &str) -> Result<String> {
    if !input.starts_with('{') {
        return Ok(input.to_string());
    }
    let value: Value = serde_json::from_str(input).map_err(|e| ToolError::InvalidInput {
        message: e.to_string(),
    })?;
    Ok(value
        .get("code")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}

#[async_trait]
impl Tool for PythonInterpreterTool {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    async fn execute(&self, _context: &TaskExecutionContext, action: &Action) -> Result<String> {
        let code = code_from_input(&action.plugin_input)?;
        let reply: Value = self
            .http
            .post(&self.backend)
            .json(&json!({ "language": "python", "code": code }))
            .send()
            .await?
            .json()
            .await?;
        Ok(reply.to_string())
    }
}

/// Creates the interpreter when a backend is configured
pub struct PythonInterpreterFactory;

impl ToolFactory for PythonInterpreterFactory {
    fn tool_name(&self) -> &str {
        "python_interpreter"
    }

    fn create(&self, settings: &PluginSettings, http: &reqwest::Client) -> Result<Arc<dyn Tool>> {
        let backend = settings
            .python_interpreter_backend
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                field: "python_interpreter_backend".to_string(),
            })?;
        Ok(Arc::new(PythonInterpreterTool::new(backend, http.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_from_input() {
        assert_eq!(
            code_from_input(r#"{"code": "print('hello')"}"#).unwrap(),
            "print('hello')"
        );
        assert_eq!(code_from_input("print(1 + 1)").unwrap(), "print(1 + 1)");
        assert_eq!(code_from_input(r#"{"other": 1}"#).unwrap(), "");
        assert!(code_from_input("{not json").is_err());
    }

    #[test]
    fn test_factory_requires_backend() {
        let http = reqwest::Client::new();
        assert!(PythonInterpreterFactory
            .create(&PluginSettings::default(), &http)
            .is_err());

        let settings = PluginSettings {
            python_interpreter_backend: Some("http://localhost:8000/run".to_string()),
            ..Default::default()
        };
        let tool = PythonInterpreterFactory.create(&settings, &http).unwrap();
        assert_eq!(tool.name(), "python_interpreter");
        assert!(tool.info().display_for_user);
        assert_eq!(tool.info().description_for_human, "You can run python code here.");
    }
}
