//! Built-in tools

pub mod google;
pub mod python;
pub mod remote;
pub mod requests;
pub mod wikipedia;

pub use google::{GoogleSearchFactory, GoogleSearchTool};
pub use python::{PythonInterpreterFactory, PythonInterpreterTool};
pub use remote::RemotePluginTool;
pub use requests::{
    api_tools, forwarded_headers, webpage_tools, RequestsGetTool, RequestsGetWebpageTool,
    RequestsPostTool, RequestsPostWebpageTool,
};
pub use wikipedia::{WikipediaFactory, WikipediaTool};
