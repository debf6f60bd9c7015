//! Subprocess transport: spawn the configured predictor command,
//! write the request JSON to its stdin, and parse its stdout.
//!
//! This preserves the legacy deployment where the predictor is a local
//! Python script. The process gets one bounded wait; on expiry it is
//! killed and nothing is persisted.

use std::process::Stdio;

use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{reject_error_reply, PredictionRequest, PredictorError};

pub struct SubprocessPredictor {
    program: String,
    args: Vec<String>,
    timeout_secs: u64,
}

impl SubprocessPredictor {
    /// `command` is split on whitespace: first token is the program,
    /// the rest are arguments (e.g. `python3 ml/predict.py`).
    pub fn new(command: &str, timeout_secs: u64) -> Self {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_default();
        Self {
            program,
            args: parts.collect(),
            timeout_secs,
        }
    }

    pub async fn predict(&self, request: &PredictionRequest) -> Result<Value, PredictorError> {
        let payload = serde_json::to_vec(request)
            .map_err(|e| PredictorError::Unavailable(format!("request encoding: {e}")))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timed-out wait drops the child; the process must not
            // outlive the request.
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                PredictorError::Unavailable(format!("cannot spawn {}: {e}", self.program))
            })?;

        {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| PredictorError::Unavailable("stdin not captured".into()))?;
            if let Err(e) = stdin.write_all(&payload).await {
                // The process may have exited before reading; surface
                // whatever it printed instead of the pipe error.
                tracing::debug!("predictor stdin write failed: {e}");
            }
            // Dropping stdin closes the pipe so the child sees EOF.
        }

        let wait = tokio::time::timeout(
            std::time::Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        );
        let output = match wait.await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(PredictorError::Unavailable(format!("process wait: {e}")))
            }
            Err(_elapsed) => return Err(PredictorError::Timeout(self.timeout_secs)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PredictorError::Unavailable(format!(
                "process exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let raw: Value = serde_json::from_str(stdout.trim())
            .map_err(|e| PredictorError::Unavailable(format!("unparseable stdout: {e}")))?;

        if !raw.is_object() {
            return Err(PredictorError::Unavailable(
                "expected a JSON object on stdout".into(),
            ));
        }

        reject_error_reply(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::Features;
    use crate::screening::{Gender, VitalsInput};

    fn request() -> PredictionRequest {
        let vitals = VitalsInput {
            age: 52.0,
            gender: Gender::Female,
            weight_kg: 70.0,
            height_cm: 165.0,
            smoker: false,
            alcohol: false,
            cholesterol: 180.0,
            systolic_bp: 120.0,
            fasting_blood_sugar_high: false,
            chest_pain: false,
        };
        PredictionRequest {
            features: Features::from(&vitals),
            images: vec![],
        }
    }

    #[tokio::test]
    async fn echoed_request_parses_as_response() {
        // `cat` reflects the request JSON, which is a valid object
        // without an error key.
        let predictor = SubprocessPredictor::new("cat", 5);
        let raw = predictor.predict(&request()).await.unwrap();
        assert!(raw.get("features").is_some());
    }

    #[tokio::test]
    async fn slow_process_times_out() {
        let predictor = SubprocessPredictor::new("sleep 30", 1);
        let err = predictor.predict(&request()).await.unwrap_err();
        assert!(matches!(err, PredictorError::Timeout(1)));
    }

    #[tokio::test]
    async fn failing_process_is_unavailable() {
        let predictor = SubprocessPredictor::new("false", 5);
        let err = predictor.predict(&request()).await.unwrap_err();
        assert!(matches!(err, PredictorError::Unavailable(_)));
    }

    #[tokio::test]
    async fn missing_program_is_unavailable() {
        let predictor = SubprocessPredictor::new("definitely-not-a-real-binary", 5);
        let err = predictor.predict(&request()).await.unwrap_err();
        assert!(matches!(err, PredictorError::Unavailable(_)));
    }

    #[tokio::test]
    async fn non_json_stdout_is_unavailable() {
        let predictor = SubprocessPredictor::new("echo not-json", 5);
        let err = predictor.predict(&request()).await.unwrap_err();
        assert!(matches!(err, PredictorError::Unavailable(_)));
    }

    #[tokio::test]
    async fn error_reply_is_rejected() {
        let predictor = SubprocessPredictor::new("echo {\"error\":\"model missing\"}", 5);
        let err = predictor.predict(&request()).await.unwrap_err();
        match err {
            PredictorError::Unavailable(reason) => assert!(reason.contains("model missing")),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }
}
