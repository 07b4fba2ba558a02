//! Tool registry for MCP tools.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::Instrument;

use super::handlers::{
    DownloadBatchHandler, DownloadHandler, GetDocumentHandler, SearchHandler, SummarizePdfHandler,
    ToolContext,
};
use crate::sources::SourceError;
use crate::utils::{PdfExtractError, ValidationError, MAX_BATCH_SIZE};

/// Why a tool call failed. Rendered into the `{"error": ...}` envelope.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Pdf(#[from] PdfExtractError),

    #[error("{0}")]
    NotFound(String),

    #[error("Failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// An MCP tool that can be called by the client
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "search_adams")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: Value,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;
}

/// Registry for all MCP tools
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Create a registry with every ADAMS tool bound to `context`
    pub fn new(context: Arc<ToolContext>) -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };

        registry.register(Tool {
            name: "search_adams".to_string(),
            description: "Search NRC ADAMS documents, optionally supplemented by Google results \
                          from nrc.gov. ADAMS results come first; duplicates are removed."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query (2-500 characters). A year or year range in the query (e.g. '2019-2021') narrows the document date."
                    },
                    "max_pages": {
                        "type": "integer",
                        "description": "Number of ADAMS result pages to fetch",
                        "minimum": 1,
                        "maximum": 10,
                        "default": 1
                    },
                    "top_n": {
                        "type": "integer",
                        "description": "Maximum number of merged results to return",
                        "minimum": 1,
                        "maximum": 50,
                        "default": 5
                    },
                    "use_google": {
                        "type": "boolean",
                        "description": "Also search nrc.gov via Google Custom Search (requires GOOGLE_API_KEY and GOOGLE_CX)",
                        "default": true
                    },
                    "document_type": {
                        "type": "string",
                        "description": "Exact ADAMS document type (e.g. 'Inspection Report')"
                    },
                    "docket_number": {
                        "type": "string",
                        "description": "Docket number prefix (e.g. '05000')"
                    },
                    "date_from": {
                        "type": "string",
                        "description": "Earliest document date, YYYY-MM-DD"
                    },
                    "date_to": {
                        "type": "string",
                        "description": "Latest document date, YYYY-MM-DD"
                    },
                    "added_period": {
                        "type": "string",
                        "description": "Only documents added to ADAMS in this window",
                        "enum": ["today", "this_week", "this_month"]
                    },
                    "days_back": {
                        "type": "integer",
                        "description": "Only documents added in the last N days",
                        "minimum": 1,
                        "maximum": 3650
                    },
                    "filters": {
                        "type": "object",
                        "description": "Additional ADAMS properties to match (property name to substring)",
                        "additionalProperties": { "type": "string" }
                    }
                },
                "required": ["query"]
            }),
            handler: Arc::new(SearchHandler {
                context: context.clone(),
            }),
        });

        registry.register(Tool {
            name: "download_adams".to_string(),
            description: "Download the PDF for an ADAMS accession number. Saved as <ACCESSION>.pdf; an existing copy is replaced."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "accession_number": {
                        "type": "string",
                        "description": "ADAMS accession number (e.g. 'ML24001A001')"
                    },
                    "directory": {
                        "type": "string",
                        "description": "Directory to save the PDF in",
                        "default": "./downloads"
                    }
                },
                "required": ["accession_number"]
            }),
            handler: Arc::new(DownloadHandler {
                context: context.clone(),
            }),
        });

        registry.register(Tool {
            name: "download_adams_batch".to_string(),
            description: format!(
                "Download up to {} ADAMS documents. Each document succeeds or fails on its own.",
                MAX_BATCH_SIZE
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "accession_numbers": {
                        "type": "array",
                        "description": "Accession numbers to download",
                        "items": { "type": "string" },
                        "minItems": 1,
                        "maxItems": MAX_BATCH_SIZE
                    },
                    "directory": {
                        "type": "string",
                        "description": "Directory to save the PDFs in",
                        "default": "./downloads"
                    }
                },
                "required": ["accession_numbers"]
            }),
            handler: Arc::new(DownloadBatchHandler {
                context: context.clone(),
            }),
        });

        registry.register(Tool {
            name: "get_document".to_string(),
            description: "Get ADAMS metadata for a single accession number.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "accession_number": {
                        "type": "string",
                        "description": "ADAMS accession number (e.g. 'ML24001A001')"
                    }
                },
                "required": ["accession_number"]
            }),
            handler: Arc::new(GetDocumentHandler {
                context: context.clone(),
            }),
        });

        registry.register(Tool {
            name: "summarize_pdf".to_string(),
            description: "Extract the leading text of a local PDF, page by page, up to max_chars characters."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path to a PDF file (usually one returned by download_adams)"
                    },
                    "max_chars": {
                        "type": "integer",
                        "description": "Maximum characters of text to return",
                        "minimum": 100,
                        "maximum": 10000,
                        "default": 2000
                    }
                },
                "required": ["path"]
            }),
            handler: Arc::new(SummarizePdfHandler { context }),
        });

        registry
    }

    /// Register a tool
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get all tools, sorted by name
    pub fn all(&self) -> Vec<&Tool> {
        let mut tools: Vec<_> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(format!("Tool '{}' not found", name)))?;

        tool.handler.execute(args).await
    }

    /// Execute a tool and fold any failure into `{"error": "<message>"}`
    pub async fn call(&self, name: &str, args: Value) -> Value {
        let span = tracing::info_span!("tool", name = %name);
        async {
            match self.execute(name, args).await {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!("Tool call failed: {}", e);
                    error_envelope(&e)
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// The uniform failure shape returned by every tool
pub fn error_envelope(error: &ToolError) -> Value {
    json!({ "error": error.to_string() })
}
