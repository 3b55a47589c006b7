//! Prompt construction and dispatch for file and structure analysis.

use crate::analyzer::client::{AnalysisError, ChatClient, ChatMessage, ChatRequest};
use crate::models::ProjectMap;
use tracing::{error, info};

/// System prompt establishing the assistant persona.
pub const SYSTEM_PROMPT: &str = "You are an AI assistant that helps analyze code.";

/// Instruction placed before file content when no custom prompt is given.
pub const DEFAULT_TEXT_PROMPT: &str = "Please analyze the following file content:";

/// Reply shown in place of an analysis when the remote call failed.
pub const NO_RESULT_MESSAGE: &str =
    "No result from OpenAI due to an error. Please check the logs for more details.";

/// Sends file contents or project maps to a model.
pub struct CodeAnalyzer<C> {
    client: C,
}

impl<C: ChatClient> CodeAnalyzer<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Analyze arbitrary text, typically one file's content.
    ///
    /// The user message is the prompt (or the default instruction), a blank
    /// line, then `content` as-is.
    pub async fn analyze_text(
        &self,
        content: &str,
        model: &str,
        prompt: Option<&str>,
    ) -> Result<String, AnalysisError> {
        self.submit(model, text_prompt(content, prompt)).await
    }

    /// Analyze a project map.
    ///
    /// A custom prompt replaces the whole user message; otherwise the map is
    /// embedded as compact JSON.
    pub async fn analyze_structure(
        &self,
        structure: &ProjectMap,
        model: &str,
        prompt: Option<&str>,
    ) -> Result<String, AnalysisError> {
        let user_prompt = match non_empty(prompt) {
            Some(custom) => custom.to_string(),
            None => structure_prompt(structure)?,
        };
        self.submit(model, user_prompt).await
    }

    async fn submit(&self, model: &str, user_prompt: String) -> Result<String, AnalysisError> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user_prompt)],
        };

        info!("Requesting analysis from model {}", model);
        let result = self.client.complete(&request).await;

        match &result {
            Ok(reply) => info!("Received {} characters from model", reply.len()),
            Err(e) if e.is_remote_failure() => log_remote_failure(e),
            Err(_) => {}
        }

        result
    }
}

/// Replace a remote failure with [`NO_RESULT_MESSAGE`].
///
/// Local failures such as a missing credential are passed through.
pub fn reply_or_sentinel(result: Result<String, AnalysisError>) -> Result<String, AnalysisError> {
    match result {
        Err(e) if e.is_remote_failure() => Ok(NO_RESULT_MESSAGE.to_string()),
        other => other,
    }
}

fn log_remote_failure(err: &AnalysisError) {
    error!("Error calling the model API");
    if let AnalysisError::Api { status, body } = err {
        error!("Status: {}", status);
        error!("Response data: {}", body);
    }
    error!("Error message: {}", err);
}

fn non_empty(prompt: Option<&str>) -> Option<&str> {
    prompt.filter(|p| !p.is_empty())
}

fn text_prompt(content: &str, prompt: Option<&str>) -> String {
    format!(
        "{}\n\n{}",
        non_empty(prompt).unwrap_or(DEFAULT_TEXT_PROMPT),
        content
    )
}

fn structure_prompt(structure: &ProjectMap) -> Result<String, AnalysisError> {
    let json = serde_json::to_string(structure)?;
    Ok(format!("Here is my project structure: {}", json))
}
