use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use crate::action::StructuredAction;
use crate::config::Settings;
use crate::error::ToolError;
use crate::exec::{CommandOutput, ShellExecutor};
use crate::llm::LlmClient;
use crate::synth::CommandSynthesizer;
use crate::types::{Capability, ToolRequest, ToolResult};

/// Routes a capability to its synthesize-then-execute pipeline.
///
/// Each call is independent: one LLM request, at most one subprocess, no
/// shared mutable state.
pub struct Dispatcher {
    synthesizer: CommandSynthesizer,
    executor: ShellExecutor,
}

impl Dispatcher {
    pub fn new(synthesizer: CommandSynthesizer, executor: ShellExecutor) -> Self {
        Self {
            synthesizer,
            executor,
        }
    }

    pub fn from_settings(settings: &Settings, llm: Arc<LlmClient>) -> Self {
        Self::new(
            CommandSynthesizer::new(llm).with_fence_mode(settings.fence_mode),
            ShellExecutor::new(settings.command_timeout),
        )
    }

    pub async fn run_diagnosis(&self, input_text: &str) -> Result<String, ToolError> {
        self.dispatch(&ToolRequest::new(Capability::Diagnosis, input_text))
            .await
    }

    pub async fn get_pc_settings(&self, input_text: &str) -> Result<String, ToolError> {
        self.dispatch(&ToolRequest::new(Capability::Settings, input_text))
            .await
    }

    pub async fn execute_troubleshooting(&self, input_text: &str) -> Result<String, ToolError> {
        self.dispatch(&ToolRequest::new(Capability::Troubleshoot, input_text))
            .await
    }

    /// Full pipeline for one request. Errors only on LLM/parse failure, a
    /// missing command, or a command that could not be launched.
    pub async fn dispatch(&self, request: &ToolRequest) -> Result<String, ToolError> {
        info!(tool = %request.capability, input = %request.input_text, "tool call");

        let action = self
            .synthesizer
            .synthesize_action(request.capability, &request.input_text)
            .await?;
        let command = action.require_command()?;
        let output = self.executor.run(command).await?;

        info!(
            tool = %request.capability,
            exit_code = ?output.exit_code,
            "tool completed"
        );
        Ok(render_result(&action, command, &output))
    }

    /// Like [`dispatch`](Self::dispatch) but never fails: errors become a
    /// labelled message in the result text.
    pub async fn call(&self, request: ToolRequest) -> ToolResult {
        let (result, is_error) = match self.dispatch(&request).await {
            Ok(text) => (text, false),
            Err(e) => {
                error!(tool = %request.capability, kind = e.kind(), error = %e, "tool failed");
                (format!("Error ({}): {e}", e.kind()), true)
            }
        };
        ToolResult {
            tool: request.capability,
            input_text: request.input_text,
            result,
            is_error,
            timestamp: Utc::now(),
        }
    }
}

/// Combine the model's explanation with what the command printed.
pub fn render_result(action: &StructuredAction, command: &str, output: &CommandOutput) -> String {
    let mut text = String::new();
    if let Some(explanation) = action.explanation() {
        text.push_str(explanation);
        text.push_str("\n\n");
    }
    text.push_str(&format!("$ {command}\n"));

    let stdout = output.stdout.trim();
    let stderr = output.stderr.trim();

    if output.success() {
        text.push_str(if stdout.is_empty() { "(no output)" } else { stdout });
        if !stderr.is_empty() {
            text.push_str(&format!("\n\nstderr:\n{stderr}"));
        }
        push_truncation_note(&mut text, output);
        return text;
    }

    if !stdout.is_empty() {
        text.push_str(stdout);
        text.push_str("\n\n");
    }
    match output.exit_code {
        Some(code) => text.push_str(&format!("Command failed with exit code {code}")),
        None => text.push_str("Command was terminated by a signal"),
    }
    if !stderr.is_empty() {
        text.push_str(&format!("\nError output:\n{stderr}"));
    }
    push_truncation_note(&mut text, output);
    text
}

fn push_truncation_note(text: &mut String, output: &CommandOutput) {
    if output.truncated {
        text.push_str("\n\n(output truncated)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::tests::MockProvider;
    use std::sync::atomic::Ordering;

    fn dispatcher(provider: MockProvider) -> Dispatcher {
        let llm = Arc::new(LlmClient::new(provider, "mock", "m"));
        Dispatcher::from_settings(&Settings::default(), llm)
    }

    fn action(json: &str) -> StructuredAction {
        StructuredAction::parse(json, json).unwrap()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn troubleshooting_runs_command_and_explains() {
        let d = dispatcher(MockProvider::replying(&[
            r#"{"command": "echo hello", "explanation": "test echo"}"#,
        ]));
        let out = d.execute_troubleshooting("say hello").await.unwrap();
        assert!(out.contains("test echo"));
        assert!(out.contains("hello"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_is_reported_not_raised() {
        let d = dispatcher(MockProvider::replying(&[r#"{"command": "exit 1"}"#]));
        let out = d.run_diagnosis("break").await.unwrap();
        assert!(out.contains("exit code 1"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn settings_lookup_runs_fenced_reply() {
        let d = dispatcher(MockProvider::replying(&[
            "```json\n{\"command\": \"echo alice\"}\n```",
        ]));
        let out = d.get_pc_settings("what is my username").await.unwrap();
        assert!(out.contains("alice"));
    }

    #[tokio::test]
    async fn missing_command_is_an_error() {
        let d = dispatcher(MockProvider::replying(&[r#"{"explanation": "no idea"}"#]));
        let err = d.run_diagnosis("x").await.unwrap_err();
        assert!(matches!(err, ToolError::MissingCommand { .. }));
    }

    #[tokio::test]
    async fn garbage_reply_becomes_labelled_result() {
        let d = dispatcher(MockProvider::replying(&["I cannot help with that"]));
        let result = d
            .call(ToolRequest::new(Capability::Settings, "volume"))
            .await;
        assert!(result.is_error);
        assert!(result.result.starts_with("Error (action_parse)"));
        assert!(result.result.contains("I cannot help with that"));
        assert_eq!(result.tool, Capability::Settings);
        assert_eq!(result.input_text, "volume");
    }

    #[tokio::test]
    async fn unconfigured_llm_is_configuration_error() {
        let d = Dispatcher::from_settings(&Settings::default(), Arc::new(LlmClient::unconfigured()));
        for cap in Capability::ALL {
            let err = d.dispatch(&ToolRequest::new(cap, "x")).await.unwrap_err();
            assert!(matches!(err, ToolError::Configuration(_)));
        }
    }

    #[tokio::test]
    async fn one_llm_call_per_request() {
        let provider = MockProvider::replying(&[r#"{"explanation": "none"}"#]);
        let calls = provider.call_counter();
        let d = dispatcher(provider);
        let _ = d.run_diagnosis("x").await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn render_success_without_output() {
        let out = CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: Some(0),
            truncated: false,
        };
        let text = render_result(&action(r#"{"command": "true"}"#), "true", &out);
        assert_eq!(text, "$ true\n(no output)");
    }

    #[test]
    fn render_failure_includes_stderr() {
        let out = CommandOutput {
            stdout: String::new(),
            stderr: "permission denied\n".into(),
            exit_code: Some(2),
            truncated: false,
        };
        let text = render_result(
            &action(r#"{"command": "cat /root/x", "explanation": "read it"}"#),
            "cat /root/x",
            &out,
        );
        assert!(text.starts_with("read it\n\n$ cat /root/x\n"));
        assert!(text.contains("Command failed with exit code 2"));
        assert!(text.ends_with("Error output:\npermission denied"));
    }

    #[test]
    fn render_signal_termination() {
        let out = CommandOutput {
            stdout: "partial".into(),
            stderr: String::new(),
            exit_code: None,
            truncated: false,
        };
        let text = render_result(&action(r#"{"command": "x"}"#), "x", &out);
        assert!(text.contains("partial"));
        assert!(text.contains("terminated by a signal"));
    }

    #[test]
    fn render_marks_truncated_output() {
        let out = CommandOutput {
            stdout: "yyyy".into(),
            stderr: String::new(),
            exit_code: Some(0),
            truncated: true,
        };
        let text = render_result(&action(r#"{"command": "yes"}"#), "yes", &out);
        assert_eq!(text, "$ yes\nyyyy\n\n(output truncated)");
    }
}
