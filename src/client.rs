//! Backends that turn a video and a prompt into feedback text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    StatusCode,
    multipart::{Form, Part},
};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::model::{AnalysisOutcome, FileHandle};
use crate::progress::{Phase, PhaseReporter};

/// Used when the caller leaves the prompt blank
pub const DEFAULT_PROMPT: &str =
    "Analyze the video for storytelling, hook effectiveness, and transitions.";

const ANALYZE_PATH: &str = "/api/analyze-video";
const HEALTH_PATH: &str = "/health";
const NO_ANALYSIS: &str = "No analysis generated";
const SERVICE_FAILED: &str = "The analysis service reported an error";

/// Anything that can analyze a video.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Runs the analysis, announcing phase boundaries through `phases`.
    async fn analyze(
        &self,
        file: &FileHandle,
        prompt: &str,
        phases: &PhaseReporter,
    ) -> Result<String, AnalysisError>;

    /// Like [`analyze`](Self::analyze) but never fails: errors come back as a
    /// failed [`AnalysisOutcome`]. Blank prompts are replaced by [`DEFAULT_PROMPT`].
    async fn submit(&self, file: &FileHandle, prompt: &str, phases: &PhaseReporter) -> AnalysisOutcome {
        let prompt = effective_prompt(prompt);
        match self.analyze(file, prompt, phases).await {
            Ok(text) => AnalysisOutcome::success(text),
            Err(e) => {
                tracing::warn!(file = %file.name, error = %e, "Analysis request failed");
                AnalysisOutcome::failure(e.to_string())
            }
        }
    }
}

pub fn effective_prompt(prompt: &str) -> &str {
    if prompt.trim().is_empty() {
        DEFAULT_PROMPT
    } else {
        prompt
    }
}

/// JSON carried in the `analysis_request` form field
#[derive(Debug, Serialize)]
struct AnalysisRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum ResponseStatus {
    #[serde(alias = "success")]
    Ok,
    Error,
}

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    status: ResponseStatus,
    analysis: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Talks to the analysis service over HTTP.
pub struct HttpAnalysisClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAnalysisClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AnalysisError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Checks that the service is up.
    pub async fn health(&self) -> Result<(), AnalysisError> {
        let url = format!("{}{}", self.base_url, HEALTH_PATH);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::Service(format!(
                "Health check returned status {}",
                status
            )));
        }
        let body: HealthResponse = response.json().await?;
        if body.status != "healthy" {
            return Err(AnalysisError::Service(format!(
                "Service reports status '{}'",
                body.status
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    async fn analyze(
        &self,
        file: &FileHandle,
        prompt: &str,
        phases: &PhaseReporter,
    ) -> Result<String, AnalysisError> {
        let bytes = tokio::fs::read(&file.path)
            .await
            .map_err(|source| AnalysisError::ReadFile {
                name: file.name.clone(),
                source,
            })?;

        let video = Part::bytes(bytes)
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| AnalysisError::InvalidRequest(format!("bad MIME type: {e}")))?;
        let form = Form::new()
            .part("file", video)
            .text("analysis_request", serde_json::to_string(&AnalysisRequest { prompt })?);

        let url = format!("{}{}", self.base_url, ANALYZE_PATH);
        tracing::info!(%url, file = %file.name, size = file.size_bytes, "Uploading video for analysis");
        phases.report(Phase::Prepared);

        let response = self.http.post(&url).multipart(form).send().await?;
        phases.report(Phase::Responded);

        let status = response.status();
        let body = response.text().await?;
        let analysis = decode_response(status, &body)?;
        phases.report(Phase::Decoded);

        tracing::info!(chars = analysis.len(), "Analysis received");
        Ok(analysis)
    }
}

/// Interprets the service's reply.
fn decode_response(status: StatusCode, body: &str) -> Result<String, AnalysisError> {
    if !status.is_success() {
        return Err(AnalysisError::Service(error_message(status, body)));
    }

    let response: AnalysisResponse = serde_json::from_str(body)?;
    match response.status {
        ResponseStatus::Error => Err(AnalysisError::Service(
            response.message.unwrap_or_else(|| SERVICE_FAILED.to_string()),
        )),
        ResponseStatus::Ok => response
            .analysis
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| AnalysisError::Service(NO_ANALYSIS.to_string())),
    }
}

/// Best message for a non-2xx reply: JSON `message`/`detail`, raw body, then status.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(ErrorBody { message, detail }) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(msg) = message.or(detail) {
            return msg;
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() && !trimmed.starts_with('{') {
        return trimmed.to_string();
    }
    format!("The analysis service returned status {}", status)
}

/// Offline stand-in that returns canned feedback after a fake delay.
pub struct SimulatedAnalysisClient {
    latency: Duration,
}

impl SimulatedAnalysisClient {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for SimulatedAnalysisClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(8))
    }
}

#[async_trait]
impl AnalysisClient for SimulatedAnalysisClient {
    async fn analyze(
        &self,
        file: &FileHandle,
        prompt: &str,
        phases: &PhaseReporter,
    ) -> Result<String, AnalysisError> {
        phases.report(Phase::Prepared);
        // Most of the time goes to "upload", the rest to "processing"
        tokio::time::sleep(self.latency.mul_f32(0.75)).await;
        phases.report(Phase::Responded);
        tokio::time::sleep(self.latency.mul_f32(0.25)).await;
        phases.report(Phase::Decoded);
        Ok(canned_feedback(prompt, &file.name))
    }
}

fn canned_feedback(prompt: &str, file_name: &str) -> String {
    format!(
        "Based on your prompt: \"{prompt}\"\n\n\
         Analysis of video \"{file_name}\":\n\n\
         1. Storytelling: The video effectively builds narrative through visual sequencing. \
         The opening hook is strong and captures attention immediately.\n\n\
         2. Pacing: Good rhythm overall, with smooth transitions between scenes. \
         Consider reducing the middle section by 2-3 seconds for optimal viewer retention.\n\n\
         3. Visual Elements: The lighting choices enhance the mood, and the color grading is \
         consistent throughout. The composition follows rule-of-thirds principles effectively.\n\n\
         4. Audio Integration: The sound design complements the visuals well. \
         Consider adjusting audio levels during transition points for greater impact.\n\n\
         5. Call-to-Action: Clear and well-positioned, though it could appear 0.5 seconds \
         earlier to improve conversion potential."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::Multipart,
        http::StatusCode as AxumStatus,
        routing::{get, post},
    };
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default, Clone)]
    struct Received {
        file_name: Option<String>,
        content_type: Option<String>,
        file_len: usize,
        analysis_request: Option<Value>,
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn video_on_disk(dir: &tempfile::TempDir, len: usize) -> FileHandle {
        let path = dir.path().join("pacing.mp4");
        std::fs::write(&path, vec![7u8; len]).unwrap();
        FileHandle::from_path(&path).unwrap()
    }

    fn client(base: &str) -> HttpAnalysisClient {
        HttpAnalysisClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn uploads_multipart_and_returns_analysis() {
        let received = Arc::new(Mutex::new(Received::default()));
        let sink = received.clone();
        let router = Router::new().route(
            "/api/analyze-video",
            post(move |mut multipart: Multipart| {
                let sink = sink.clone();
                async move {
                    while let Some(field) = multipart.next_field().await.unwrap() {
                        let name = field.name().unwrap_or_default().to_string();
                        let file_name = field.file_name().map(str::to_string);
                        let content_type = field.content_type().map(str::to_string);
                        let data = field.bytes().await.unwrap();
                        let mut got = sink.lock().unwrap();
                        match name.as_str() {
                            "file" => {
                                got.file_name = file_name;
                                got.content_type = content_type;
                                got.file_len = data.len();
                            }
                            "analysis_request" => {
                                got.analysis_request = serde_json::from_slice(&data).ok();
                            }
                            _ => {}
                        }
                    }
                    Json(json!({"status": "success", "analysis": "Tight edit."}))
                }
            }),
        );
        let base = serve(router).await;
        let dir = tempfile::tempdir().unwrap();
        let file = video_on_disk(&dir, 4096);

        let (reporter, mut phases) = PhaseReporter::channel();
        let text = client(&base)
            .analyze(&file, "Check pacing", &reporter)
            .await
            .unwrap();
        assert_eq!(text, "Tight edit.");

        let got = received.lock().unwrap().clone();
        assert_eq!(got.file_name.as_deref(), Some("pacing.mp4"));
        assert_eq!(got.content_type.as_deref(), Some("video/mp4"));
        assert_eq!(got.file_len, 4096);
        assert_eq!(got.analysis_request, Some(json!({"prompt": "Check pacing"})));

        let mut seen = Vec::new();
        while let Ok(phase) = phases.try_recv() {
            seen.push(phase);
        }
        assert_eq!(seen, vec![Phase::Prepared, Phase::Responded, Phase::Decoded]);
    }

    #[tokio::test]
    async fn service_error_becomes_failed_outcome() {
        let router = Router::new().route(
            "/api/analyze-video",
            post(|| async { Json(json!({"status": "error", "message": "quota exceeded"})) }),
        );
        let base = serve(router).await;
        let dir = tempfile::tempdir().unwrap();
        let file = video_on_disk(&dir, 16);

        let outcome = client(&base)
            .submit(&file, "Check pacing", &PhaseReporter::detached())
            .await;
        assert_eq!(outcome, AnalysisOutcome::failure("quota exceeded"));
    }

    #[tokio::test]
    async fn non_success_status_uses_body_message() {
        let router = Router::new().route(
            "/api/analyze-video",
            post(|| async {
                (
                    AxumStatus::SERVICE_UNAVAILABLE,
                    Json(json!({"message": "model overloaded"})),
                )
            }),
        );
        let base = serve(router).await;
        let dir = tempfile::tempdir().unwrap();
        let file = video_on_disk(&dir, 16);

        let err = client(&base)
            .analyze(&file, "x", &PhaseReporter::detached())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "model overloaded");
    }

    #[tokio::test]
    async fn unreachable_service_is_a_network_error() {
        // Bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        let file = video_on_disk(&dir, 16);
        let err = client(&format!("http://{addr}"))
            .analyze(&file, "x", &PhaseReporter::detached())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Network(_)), "{err:?}");
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let router = Router::new().route(
            "/api/analyze-video",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"status": "ok", "analysis": "too late"}))
            }),
        );
        let base = serve(router).await;
        let dir = tempfile::tempdir().unwrap();
        let file = video_on_disk(&dir, 16);
        let impatient = HttpAnalysisClient::new(base.as_str(), Duration::from_millis(300)).unwrap();

        let err = impatient
            .analyze(&file, "x", &PhaseReporter::detached())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Timeout), "{err:?}");

        let outcome = impatient
            .submit(&file, "x", &PhaseReporter::detached())
            .await;
        assert_eq!(
            outcome,
            AnalysisOutcome::failure("The analysis service did not respond in time")
        );
    }

    #[tokio::test]
    async fn missing_file_fails_before_any_request() {
        let file = FileHandle::new("/definitely/not/here.mp4", 10, "video/mp4");
        let outcome = client("http://127.0.0.1:9")
            .submit(&file, "x", &PhaseReporter::detached())
            .await;
        assert!(!outcome.success);
        assert!(outcome.error_message.unwrap().starts_with("Could not read"));
    }

    #[tokio::test]
    async fn health_check_accepts_healthy_service() {
        let router = Router::new().route("/health", get(|| async { Json(json!({"status": "healthy"})) }));
        let base = serve(router).await;
        client(&base).health().await.unwrap();
    }

    #[tokio::test]
    async fn health_check_rejects_other_status() {
        let router = Router::new().route("/health", get(|| async { Json(json!({"status": "degraded"})) }));
        let base = serve(router).await;
        assert!(client(&base).health().await.is_err());
    }

    #[test]
    fn decode_accepts_ok_and_success() {
        for status in ["ok", "success"] {
            let body = json!({"status": status, "analysis": "fine"}).to_string();
            assert_eq!(decode_response(StatusCode::OK, &body).unwrap(), "fine");
        }
    }

    #[test]
    fn decode_requires_analysis_text() {
        let err = decode_response(StatusCode::OK, r#"{"status":"ok"}"#).unwrap_err();
        assert_eq!(err.to_string(), "No analysis generated");
        let err = decode_response(StatusCode::OK, r#"{"status":"ok","analysis":"  "}"#).unwrap_err();
        assert_eq!(err.to_string(), "No analysis generated");
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = decode_response(StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, AnalysisError::Decode(_)));
    }

    #[test]
    fn error_message_falls_back_to_text_then_status() {
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "upstream down\n"), "upstream down");
        assert_eq!(
            error_message(StatusCode::UNPROCESSABLE_ENTITY, r#"{"detail":"bad form"}"#),
            "bad form"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, ""),
            "The analysis service returned status 502 Bad Gateway"
        );
    }

    #[test]
    fn blank_prompt_falls_back_to_default() {
        assert_eq!(effective_prompt(""), DEFAULT_PROMPT);
        assert_eq!(effective_prompt("  \n"), DEFAULT_PROMPT);
        assert_eq!(effective_prompt("Check pacing"), "Check pacing");
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_client_quotes_prompt_and_file() {
        let file = FileHandle::new("beach.webm", 1024, "video/webm");
        let (reporter, mut phases) = PhaseReporter::channel();
        let outcome = SimulatedAnalysisClient::default()
            .submit(&file, "", &reporter)
            .await;

        let text = outcome.result_text.unwrap();
        assert!(text.starts_with(&format!("Based on your prompt: \"{DEFAULT_PROMPT}\"")));
        assert!(text.contains("Analysis of video \"beach.webm\""));
        assert!(text.ends_with(
            "5. Call-to-Action: Clear and well-positioned, though it could appear 0.5 seconds \
             earlier to improve conversion potential."
        ));
        assert!(text.contains(
            "\n\n2. Pacing: Good rhythm overall, with smooth transitions between scenes. \
             Consider reducing the middle section by 2-3 seconds for optimal viewer retention.\n\n"
        ));
        assert_eq!(phases.try_recv().unwrap(), Phase::Prepared);
        assert_eq!(phases.try_recv().unwrap(), Phase::Responded);
        assert_eq!(phases.try_recv().unwrap(), Phase::Decoded);
    }
}
