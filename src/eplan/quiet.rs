//! Quiet-execution bridge.
//!
//! Some EPLAN actions pop interactive dialogs (close-project confirmation,
//! printer selection, restore overwrite prompts). Those cannot be driven
//! over the remoting interface directly, so the bridge wraps them in a
//! generated C# script that runs the action inside the host's
//! "show no dialogs" quiet mode and hands the outcome back through a
//! temporary JSON result file:
//!
//! 1. render the script with the action string and result path baked in
//! 2. register it with the host (`RegisterScript`)
//! 3. trigger it (`ExecuteScript`)
//! 4. poll the result file with backoff until it appears or times out
//! 5. parse `{success, message, data?}` into an [`ActionResult`]
//! 6. unregister and delete the temporary artifacts on every exit path
//!
//! Each invocation is one [`ScriptJob`] moving through
//! `Generated → Registered → Executing → {Completed | Failed}`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::eplan::action::{ActionRequest, ActionResult};
use crate::eplan::client::Session;
use crate::eplan::dispatch::execute_plain;
use crate::eplan::transport::ActionTransport;
use crate::error::EplanError;

/// Lifecycle of one quiet-execution job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Script source rendered and written to disk.
    Generated,
    /// Script registered with the host.
    Registered,
    /// Execution triggered; waiting for the result file.
    Executing,
    /// Result file consumed successfully.
    Completed,
    /// Any failure after generation.
    Failed,
}

/// One quiet-execution invocation and its temporary artifacts.
#[derive(Debug)]
pub struct ScriptJob {
    /// Short unique ID baked into file names and the script class name.
    pub job_id: String,
    /// Rendered C# source.
    pub script_source: String,
    /// C# class name the script is registered under.
    pub registered_name: String,
    /// Where the script is written.
    pub script_path: PathBuf,
    /// Where the script writes its JSON result.
    pub result_path: PathBuf,
    /// Current lifecycle state.
    pub state: JobState,
}

impl ScriptJob {
    /// Renders a job for one request. Nothing is written to disk yet.
    #[must_use]
    pub fn generate(request: &ActionRequest, temp_dir: &Path) -> Self {
        let job_id = Uuid::new_v4().simple().to_string()[..8].to_string();
        let registered_name = format!("QuietRun_{job_id}");
        let script_path = temp_dir.join(format!("quiet_{job_id}.cs"));
        let result_path = temp_dir.join(format!("quiet_{job_id}.json"));
        let script_source = render_script(
            &registered_name,
            &request.to_action_string(),
            &request.name,
            &result_path,
        );

        Self {
            job_id,
            script_source,
            registered_name,
            script_path,
            result_path,
            state: JobState::Generated,
        }
    }
}

/// Structure the generated script writes to the result file.
#[derive(Debug, Deserialize)]
struct QuietOutcome {
    success: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// Runs dialog-suppressed actions through generated host-side scripts.
pub struct QuietBridge {
    temp_dir: PathBuf,
    poll_timeout: Duration,
}

impl QuietBridge {
    /// Creates a bridge writing its artifacts under `temp_dir`.
    #[must_use]
    pub const fn new(temp_dir: PathBuf, poll_timeout: Duration) -> Self {
        Self {
            temp_dir,
            poll_timeout,
        }
    }

    /// Executes one quiet-mode request end to end.
    ///
    /// # Errors
    ///
    /// - `Host` when script registration or triggering is rejected
    /// - `Timeout` when the result file never appears
    /// - `CorruptResult` when the result file cannot be parsed
    /// - `Io`/`NotConnected` surfaced from the transport or filesystem
    ///
    /// Temporary artifacts are removed on all of these paths.
    pub async fn run_quiet<T: ActionTransport>(
        &self,
        session: &mut Session<T>,
        request: &ActionRequest,
        action_timeout: Duration,
    ) -> Result<ActionResult, EplanError> {
        let mut job = ScriptJob::generate(request, &self.temp_dir);
        self.run_job(session, &mut job, action_timeout).await
    }

    /// Drives an already-generated job through its lifecycle, then cleans
    /// up unconditionally.
    ///
    /// # Errors
    ///
    /// See [`Self::run_quiet`].
    pub async fn run_job<T: ActionTransport>(
        &self,
        session: &mut Session<T>,
        job: &mut ScriptJob,
        action_timeout: Duration,
    ) -> Result<ActionResult, EplanError> {
        let outcome = self.drive(session, job, action_timeout).await;

        job.state = if outcome.is_ok() {
            JobState::Completed
        } else {
            JobState::Failed
        };

        // Cleanup runs on every exit path, including errors above.
        Self::cleanup(session, job, action_timeout).await;

        outcome
    }

    /// The fallible part of the job lifecycle; cleanup happens outside.
    async fn drive<T: ActionTransport>(
        &self,
        session: &mut Session<T>,
        job: &mut ScriptJob,
        action_timeout: Duration,
    ) -> Result<ActionResult, EplanError> {
        tokio::fs::create_dir_all(&self.temp_dir).await?;
        tokio::fs::write(&job.script_path, &job.script_source).await?;

        let script_file = job.script_path.to_string_lossy().to_string();

        let register =
            ActionRequest::new("RegisterScript").param("ScriptFile", script_file.clone());
        let registered = execute_plain(session, &register, action_timeout).await?;
        if !registered.success {
            return Err(EplanError::Host(format!(
                "script registration failed: {}",
                registered.message
            )));
        }
        job.state = JobState::Registered;

        let execute = ActionRequest::new("ExecuteScript").param("ScriptFile", script_file);
        let triggered = execute_plain(session, &execute, action_timeout).await?;
        if !triggered.success {
            return Err(EplanError::Host(format!(
                "script execution failed: {}",
                triggered.message
            )));
        }
        job.state = JobState::Executing;

        self.await_result_file(&job.result_path).await?;

        let contents = tokio::fs::read_to_string(&job.result_path).await?;
        let outcome: QuietOutcome = serde_json::from_str(&contents)
            .map_err(|e| EplanError::CorruptResult(e.to_string()))?;

        let mut result = if outcome.success {
            ActionResult::ok(outcome.message, String::new())
        } else {
            ActionResult::failure(outcome.message, String::new())
        };
        if let Some(data) = outcome.data {
            result = result.with_payload(data);
        }
        Ok(result)
    }

    /// Polls for the result file with backoff until the bridge timeout.
    async fn await_result_file(&self, result_path: &Path) -> Result<(), EplanError> {
        let deadline = tokio::time::Instant::now() + self.poll_timeout;
        let mut delay = Duration::from_millis(50);

        loop {
            if tokio::fs::try_exists(result_path).await.unwrap_or(false) {
                // Give the host a moment to finish writing the file.
                tokio::time::sleep(Duration::from_millis(50)).await;
                return Ok(());
            }
            if tokio::time::Instant::now() + delay >= deadline {
                return Err(EplanError::Timeout(self.poll_timeout));
            }
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(Duration::from_millis(500));
        }
    }

    /// Best-effort removal of all temporary artifacts. Never fails.
    async fn cleanup<T: ActionTransport>(
        session: &mut Session<T>,
        job: &ScriptJob,
        action_timeout: Duration,
    ) {
        let script_file = job.script_path.to_string_lossy().to_string();
        let unregister = ActionRequest::new("UnregisterScript").param("ScriptFile", script_file);
        if let Err(e) = execute_plain(session, &unregister, action_timeout).await {
            tracing::debug!(job_id = %job.job_id, error = %e, "script unregistration failed");
        }

        for path in [&job.script_path, &job.result_path] {
            if let Err(e) = tokio::fs::remove_file(path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(path = %path.display(), error = %e, "failed to remove temp artifact");
                }
            }
        }
    }
}

/// Renders the C# wrapper script.
///
/// The script switches the host to "show no dialogs", runs the action
/// through the command-line interpreter, restores the previous mode, and
/// writes a JSON outcome to the result path. The generated source is an
/// opaque unit of work from the controller's perspective.
fn render_script(
    class_name: &str,
    action_string: &str,
    action_name: &str,
    result_path: &Path,
) -> String {
    let action_literal = escape_csharp(action_string);
    let message_literal = escape_csharp(&format!("Executed: {action_name}"));
    // Verbatim C# string: only double quotes need doubling.
    let result_literal = result_path.to_string_lossy().replace('"', "\"\"");

    format!(
        r#"using System;
using System.IO;
using Eplan.EplApi.ApplicationFramework;
using Eplan.EplApi.Base;
using Eplan.EplApi.Scripting;

public class {class_name}
{{
    [Start]
    public void Run()
    {{
        string resultPath = @"{result_literal}";
        bool success = true;
        string message = "{message_literal}";

        EplApplication app = new EplApplication();
        QuietModes previous = app.QuietMode;
        app.QuietMode = QuietModes.ShowNoDialogs;
        try
        {{
            new CommandLineInterpreter().Execute("{action_literal}");
        }}
        catch (Exception ex)
        {{
            success = false;
            message = ex.Message;
        }}
        finally
        {{
            app.QuietMode = previous;
        }}

        string json = "{{\"success\":" + (success ? "true" : "false")
            + ",\"message\":\"" + message.Replace("\\", "\\\\").Replace("\"", "\\\"") + "\"}}";
        File.WriteAllText(resultPath, json);
    }}
}}
"#
    )
}

/// Escapes a value for embedding in a regular (non-verbatim) C# string.
fn escape_csharp(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
