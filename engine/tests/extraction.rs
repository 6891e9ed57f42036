//! End-to-end scenarios for the orchestrator and fallback machine,
//! driven by a scripted provider adapter.

use async_trait::async_trait;
use docflow_engine::audit::{AttemptStatus, AuditSink, MemoryAuditLog};
use docflow_engine::config::{
    DocType, FallbackChain, FallbackStep, MemoryConfigStore, ModelSpec, PromptTemplate,
};
use docflow_engine::error::ExtractionError;
use docflow_engine::fallback::RetryPolicy;
use docflow_engine::orchestrator::{EngineConfig, Orchestrator};
use docflow_engine::types::{ExtractionRequest, ExtractionStatus};
use docflow_gateway::{
    AdapterError, AdapterResponse, CompletionRequest, Credential, Gateway, ProviderAdapter,
    ProviderId, StaticCredentials, TenantId,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const LAB_TEXT: &str = "Laboratory results\nPatient: Marie Dubois\nPotassium: 4.2 mmol/L (reference range 3.5-5.0)";

/// Opt-in log output for debugging failing scenarios:
/// `RUST_LOG=docflow_engine=debug cargo test`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

const TEMPLATE_BODY: &str = "Extract {{doc_type}} fields from the document below.\n\
<document>\n{{document}}\n</document>\n\
Respond with JSON matching this schema:\n{{schema}}";

const VALID_OUTPUT: &str = r#"{"patient": "Marie Dubois", "potassium": 4.2}"#;
const INVALID_OUTPUT: &str = r#"{"potassium": -1}"#;

fn lab_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "patient": {"type": "string"},
            "potassium": {"type": "number", "minimum": 0}
        },
        "required": ["patient", "potassium"]
    })
}

/// One scripted provider reply.
#[derive(Clone)]
enum Reply {
    /// Return this text.
    Text(&'static str),
    /// Fail with this HTTP status.
    Status(u16),
    /// Sleep, then return text (for deadline tests).
    SlowText(Duration, &'static str),
}

/// Adapter that replays a fixed script and records every prompt it saw.
struct ScriptedAdapter {
    script: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedAdapter {
    fn new(script: Vec<Reply>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    async fn call(
        &self,
        request: &CompletionRequest,
        _credential: &Credential,
    ) -> Result<AdapterResponse, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());

        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted adapter ran out of replies");

        let result = match reply {
            Reply::Text(text) => Ok(AdapterResponse {
                text: text.to_owned(),
                usage: None,
            }),
            Reply::Status(status) => Err(AdapterError::Status {
                status,
                body: "scripted failure".into(),
            }),
            Reply::SlowText(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(AdapterResponse {
                    text: text.to_owned(),
                    usage: None,
                })
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

struct Harness {
    orchestrator: Orchestrator,
    audit: Arc<MemoryAuditLog>,
    adapter: Arc<ScriptedAdapter>,
}

fn harness(steps: Vec<FallbackStep>, script: Vec<Reply>) -> Harness {
    harness_with(steps, script, true)
}

fn harness_with(steps: Vec<FallbackStep>, script: Vec<Reply>, with_template: bool) -> Harness {
    let adapter = Arc::new(ScriptedAdapter::new(script));

    let mut store = MemoryConfigStore::new()
        .with_doc_type(DocType::new("LAB_REPORT", lab_schema()))
        .with_model(ModelSpec::new("model-a", "prov"))
        .with_model(ModelSpec::new("model-b", "prov"))
        .with_model(ModelSpec::new("model-c", "prov"))
        .with_chain(FallbackChain::new("chain-1", "LAB_REPORT", "acme", steps));
    if with_template {
        store = store.with_template(PromptTemplate::new("t-default", "LAB_REPORT", TEMPLATE_BODY));
    }

    let credentials = StaticCredentials::new().with_credential(
        ProviderId::new("prov"),
        TenantId::new("acme"),
        Credential::new("secret"),
    );
    let gateway = Gateway::new(Arc::new(credentials))
        .with_adapter(ProviderId::new("prov"), adapter.clone() as Arc<dyn ProviderAdapter>);

    let audit = Arc::new(MemoryAuditLog::new());
    let config = EngineConfig::default()
        .with_retry(RetryPolicy::default().with_base_delay(Duration::from_millis(1)));

    let orchestrator = Orchestrator::new(
        Arc::new(store),
        Arc::new(gateway),
        audit.clone(),
        config,
    );

    Harness {
        orchestrator,
        audit,
        adapter,
    }
}

fn request(correlation: &str) -> ExtractionRequest {
    ExtractionRequest::new(LAB_TEXT.as_bytes().to_vec(), "acme", correlation)
        .with_doc_type("LAB_REPORT")
}

async fn rows(h: &Harness, correlation: &str) -> Vec<(u32, u32, AttemptStatus)> {
    h.audit
        .attempts_for(&correlation.into())
        .await
        .unwrap()
        .iter()
        .map(|r| (r.step_order, r.attempt, r.status))
        .collect()
}

// --- Scenario: retry budget, then advance, then success ---

#[tokio::test]
async fn rate_limited_step_advances_and_next_step_succeeds() {
    init_tracing();
    let h = harness(
        vec![
            FallbackStep::new(1, "model-a").with_max_retries(2),
            FallbackStep::new(2, "model-b"),
        ],
        vec![
            Reply::Status(429),
            Reply::Status(429),
            Reply::Text(VALID_OUTPUT),
        ],
    );

    let result = h.orchestrator.extract(request("req-1")).await.unwrap();
    assert_eq!(result.status, ExtractionStatus::Success);
    assert_eq!(result.succeeded_step, 2);
    assert_eq!(result.model.as_str(), "model-b");
    assert_eq!(result.data["patient"], "Marie Dubois");

    // 2 audit rows for step 1, one for step 2.
    assert_eq!(
        rows(&h, "req-1").await,
        vec![
            (1, 1, AttemptStatus::ProviderError),
            (1, 2, AttemptStatus::ProviderError),
            (2, 1, AttemptStatus::Succeeded),
        ]
    );
    assert_eq!(h.adapter.calls(), 3);
    assert_eq!(result.metrics.total_attempts, 3);
    assert_eq!(result.metrics.steps_tried, 2);
}

// --- Scenario: two invalid results exhaust a one-step chain ---

#[tokio::test]
async fn two_invalid_results_exhaust_the_chain() {
    let h = harness(
        vec![FallbackStep::new(1, "model-a")],
        vec![Reply::Text(INVALID_OUTPUT), Reply::Text(INVALID_OUTPUT)],
    );

    let err = h.orchestrator.extract(request("req-2")).await.unwrap_err();
    assert!(matches!(
        err,
        ExtractionError::Exhausted {
            failed_at_step: 1,
            ..
        }
    ));
    assert_eq!(err.code(), "FALLBACK_EXHAUSTED");

    assert_eq!(
        rows(&h, "req-2").await,
        vec![
            (1, 1, AttemptStatus::ValidationFailed),
            (1, 2, AttemptStatus::ValidationFailed),
        ]
    );

    // The second prompt must carry the corrective feedback.
    let prompts = h.adapter.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("failed validation"));
    assert!(prompts[1].contains("failed validation"));
    assert!(prompts[1].contains("required"));
}

// --- Scenario: corrective re-prompt rescues a step ---

#[tokio::test]
async fn corrective_reprompt_rescues_the_step() {
    let h = harness(
        vec![FallbackStep::new(1, "model-a")],
        vec![Reply::Text(INVALID_OUTPUT), Reply::Text(VALID_OUTPUT)],
    );

    let result = h.orchestrator.extract(request("req-3")).await.unwrap();
    assert_eq!(result.succeeded_step, 1);
    assert_eq!(
        rows(&h, "req-3").await,
        vec![
            (1, 1, AttemptStatus::ValidationFailed),
            (1, 2, AttemptStatus::Succeeded),
        ]
    );
    assert_eq!(result.metrics.total_attempts, 2);
}

// --- Scenario: deadline expires while a step is in flight ---

#[tokio::test(start_paused = true)]
async fn deadline_mid_step_stops_the_chain() {
    let h = harness(
        vec![
            FallbackStep::new(1, "model-a"),
            FallbackStep::new(2, "model-b").with_attempt_timeout(Duration::from_secs(30)),
            FallbackStep::new(3, "model-c"),
        ],
        vec![
            Reply::Status(401),
            Reply::SlowText(Duration::from_secs(600), VALID_OUTPUT),
        ],
    );

    let err = h
        .orchestrator
        .extract(request("req-4").with_deadline(Duration::from_secs(5)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ExtractionError::DeadlineExceeded { failed_at_step: 2 }
    ));

    let recorded = h.audit.attempts_for(&"req-4".into()).await.unwrap();
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].status, AttemptStatus::ProviderError);
    assert_eq!(recorded[1].step_order, 2);
    assert_eq!(recorded[1].status, AttemptStatus::Timeout);
    assert_eq!(recorded[1].error_code.as_deref(), Some("DEADLINE_EXCEEDED"));

    // Step 3 was never attempted.
    assert_eq!(h.adapter.calls(), 2);
}

// --- Idempotence ---

#[tokio::test]
async fn duplicate_submission_replays_the_result_without_provider_calls() {
    let h = harness(
        vec![FallbackStep::new(1, "model-a")],
        vec![Reply::Text(VALID_OUTPUT)],
    );

    let first = h.orchestrator.extract(request("req-5")).await.unwrap();
    assert_eq!(h.adapter.calls(), 1);

    // Script is exhausted: any further provider call would panic.
    let second = h.orchestrator.extract(request("req-5")).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(h.adapter.calls(), 1);
    assert_eq!(rows(&h, "req-5").await.len(), 1);
}

#[tokio::test]
async fn duplicate_submission_replays_terminal_failures_too() {
    let h = harness(
        vec![FallbackStep::new(1, "model-a")],
        vec![Reply::Status(401)],
    );

    let first = h.orchestrator.extract(request("req-6")).await.unwrap_err();
    assert!(matches!(first, ExtractionError::Exhausted { .. }));

    let second = h.orchestrator.extract(request("req-6")).await.unwrap_err();
    assert_eq!(first, second);
    assert_eq!(h.adapter.calls(), 1);
}

// --- Retry bound ---

#[tokio::test]
async fn retry_budget_is_never_exceeded() {
    let h = harness(
        vec![FallbackStep::new(1, "model-a").with_max_retries(3)],
        vec![
            Reply::Status(429),
            Reply::Status(429),
            Reply::Status(429),
            // Never reached: budget is 3 attempts.
            Reply::Status(429),
        ],
    );

    let err = h.orchestrator.extract(request("req-7")).await.unwrap_err();
    assert!(matches!(err, ExtractionError::Exhausted { .. }));
    assert_eq!(h.adapter.calls(), 3);
    assert_eq!(rows(&h, "req-7").await.len(), 3);
}

// --- Fallback progression ---

#[tokio::test]
async fn non_retryable_error_advances_immediately() {
    let h = harness(
        vec![
            FallbackStep::new(1, "model-a").with_max_retries(5),
            FallbackStep::new(2, "model-b"),
        ],
        vec![Reply::Status(401), Reply::Text(VALID_OUTPUT)],
    );

    let result = h.orchestrator.extract(request("req-8")).await.unwrap();
    assert_eq!(result.succeeded_step, 2);
    // Auth failure consumed exactly one attempt despite the big budget.
    assert_eq!(
        rows(&h, "req-8").await,
        vec![
            (1, 1, AttemptStatus::ProviderError),
            (2, 1, AttemptStatus::Succeeded),
        ]
    );
}

#[tokio::test]
async fn non_retryable_error_on_last_step_is_exhausted() {
    let h = harness(
        vec![FallbackStep::new(1, "model-a")],
        vec![Reply::Status(403)],
    );

    let err = h.orchestrator.extract(request("req-9")).await.unwrap_err();
    assert!(matches!(
        err,
        ExtractionError::Exhausted {
            failed_at_step: 1,
            ..
        }
    ));
    assert_eq!(err.failed_at_step(), Some(1));
}

// --- Audit completeness ---

#[tokio::test]
async fn audit_rows_match_attempts_exactly() {
    let h = harness(
        vec![
            FallbackStep::new(1, "model-a").with_max_retries(2),
            FallbackStep::new(2, "model-b"),
        ],
        vec![
            Reply::Status(429),
            Reply::Text(INVALID_OUTPUT),
            Reply::Text(VALID_OUTPUT),
        ],
    );

    let result = h.orchestrator.extract(request("req-10")).await.unwrap();
    // 1 rate limit + 1 validation failure + 1 corrective success = 3 calls.
    assert_eq!(h.adapter.calls(), 3);
    assert_eq!(rows(&h, "req-10").await.len(), 3);
    assert_eq!(result.metrics.total_attempts, 3);
    assert_eq!(result.succeeded_step, 1);
}

// --- Template resolution failure ---

#[tokio::test]
async fn missing_template_advances_without_a_provider_call() {
    let h = harness_with(
        vec![FallbackStep::new(1, "model-a")],
        vec![],
        false,
    );

    let err = h.orchestrator.extract(request("req-11")).await.unwrap_err();
    assert!(matches!(err, ExtractionError::Exhausted { .. }));
    assert_eq!(h.adapter.calls(), 0);

    let recorded = h.audit.attempts_for(&"req-11".into()).await.unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].status, AttemptStatus::Failed);
    assert_eq!(recorded[0].error_code.as_deref(), Some("TEMPLATE_NOT_FOUND"));
}

// --- Configuration faults: fatal, nothing attempted, nothing recorded ---

#[tokio::test]
async fn unknown_doc_type_chain_is_a_configuration_error() {
    let h = harness(
        vec![FallbackStep::new(1, "model-a")],
        vec![],
    );

    let err = h
        .orchestrator
        .extract(
            ExtractionRequest::new(LAB_TEXT.as_bytes().to_vec(), "acme", "req-12")
                .with_doc_type("DISCHARGE_SUMMARY"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::NoActiveChain { .. }));
    assert_eq!(err.code(), "NO_ACTIVE_CHAIN");
    assert_eq!(h.adapter.calls(), 0);
    assert!(rows(&h, "req-12").await.is_empty());
}

#[tokio::test]
async fn missing_credential_fails_preflight() {
    // Chain and models exist, but the tenant has no secret for the provider.
    let adapter = Arc::new(ScriptedAdapter::new(vec![]));
    let store = MemoryConfigStore::new()
        .with_doc_type(DocType::new("LAB_REPORT", lab_schema()))
        .with_model(ModelSpec::new("model-a", "prov"))
        .with_template(PromptTemplate::new("t-default", "LAB_REPORT", TEMPLATE_BODY))
        .with_chain(FallbackChain::new(
            "chain-1",
            "LAB_REPORT",
            "acme",
            vec![FallbackStep::new(1, "model-a")],
        ));
    let gateway = Gateway::new(Arc::new(StaticCredentials::new()))
        .with_adapter(ProviderId::new("prov"), adapter.clone() as Arc<dyn ProviderAdapter>);
    let audit = Arc::new(MemoryAuditLog::new());
    let orchestrator = Orchestrator::new(
        Arc::new(store),
        Arc::new(gateway),
        audit.clone(),
        EngineConfig::default(),
    );

    let err = orchestrator.extract(request("req-13")).await.unwrap_err();
    assert!(matches!(
        err,
        ExtractionError::MissingCredential { step: 1, .. }
    ));
    assert_eq!(err.code(), "MISSING_CREDENTIAL");
    assert_eq!(adapter.calls(), 0);
    assert!(audit.attempts_for(&"req-13".into()).await.unwrap().is_empty());
}

#[tokio::test]
async fn unsupported_binary_input_fails_before_any_call() {
    let h = harness(
        vec![FallbackStep::new(1, "model-a")],
        vec![],
    );

    let err = h
        .orchestrator
        .extract(ExtractionRequest::new(
            b"%PDF-1.7 not really".to_vec(),
            "acme",
            "req-14",
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "UNSUPPORTED_FORMAT");
    assert_eq!(h.adapter.calls(), 0);
}

#[tokio::test]
async fn unclassifiable_document_without_declared_type_is_rejected() {
    let h = harness(
        vec![FallbackStep::new(1, "model-a")],
        vec![],
    );

    let err = h
        .orchestrator
        .extract(ExtractionRequest::new(
            b"completely generic prose with no medical terms".to_vec(),
            "acme",
            "req-15",
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::UnknownDocType));
    assert_eq!(h.adapter.calls(), 0);
}

// --- Classification feeds chain selection ---

#[tokio::test]
async fn classified_doc_type_selects_the_chain() {
    let h = harness(
        vec![FallbackStep::new(1, "model-a")],
        vec![Reply::Text(VALID_OUTPUT)],
    );

    // No declared type; LAB_TEXT classifies as LAB_REPORT.
    let result = h
        .orchestrator
        .extract(ExtractionRequest::new(
            LAB_TEXT.as_bytes().to_vec(),
            "acme",
            "req-16",
        ))
        .await
        .unwrap();
    assert_eq!(result.doc_type.as_str(), "LAB_REPORT");
    assert!(result.confidence > 0.0 && result.confidence < 1.0);
}

// --- Chain-order property over generated chains ---

#[test]
fn generated_chain_orders_validate_iff_continuous_from_one() {
    use rand::Rng;
    let mut rng = rand::thread_rng();

    for _ in 0..500 {
        let len = rng.gen_range(1..=6);
        let orders: Vec<u32> = (0..len).map(|_| rng.gen_range(0..8)).collect();
        let steps: Vec<FallbackStep> = orders
            .iter()
            .map(|&o| FallbackStep::new(o, "model-a"))
            .collect();
        let chain = FallbackChain::new("gen", "LAB_REPORT", "acme", steps);

        let expected: Vec<u32> = (1..=u32::try_from(len).unwrap()).collect();
        let should_be_valid = orders == expected;
        assert_eq!(
            chain.validate().is_ok(),
            should_be_valid,
            "orders {orders:?}"
        );
    }
}

// --- Concurrency bound ---

#[tokio::test(start_paused = true)]
async fn concurrent_requests_respect_the_limit() {
    let adapter = Arc::new(ScriptedAdapter::new(vec![
        Reply::SlowText(Duration::from_millis(50), VALID_OUTPUT),
        Reply::SlowText(Duration::from_millis(50), VALID_OUTPUT),
        Reply::SlowText(Duration::from_millis(50), VALID_OUTPUT),
    ]));

    let store = MemoryConfigStore::new()
        .with_doc_type(DocType::new("LAB_REPORT", lab_schema()))
        .with_model(ModelSpec::new("model-a", "prov"))
        .with_template(PromptTemplate::new("t-default", "LAB_REPORT", TEMPLATE_BODY))
        .with_chain(FallbackChain::new(
            "chain-1",
            "LAB_REPORT",
            "acme",
            vec![FallbackStep::new(1, "model-a")],
        ));
    let credentials = StaticCredentials::new().with_credential(
        ProviderId::new("prov"),
        TenantId::new("acme"),
        Credential::new("secret"),
    );
    let gateway = Gateway::new(Arc::new(credentials))
        .with_adapter(ProviderId::new("prov"), adapter.clone() as Arc<dyn ProviderAdapter>);

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(store),
        Arc::new(gateway),
        Arc::new(MemoryAuditLog::new()),
        EngineConfig::default().with_max_concurrent_requests(1),
    ));

    let runs = (0..3).map(|i| {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .extract(request(&format!("req-concurrent-{i}")))
                .await
        })
    });

    for outcome in futures::future::join_all(runs).await {
        assert!(outcome.unwrap().is_ok());
    }

    assert_eq!(adapter.calls(), 3);
    assert_eq!(adapter.max_in_flight.load(Ordering::SeqCst), 1);
}

// --- Doc-type schemas derived from Rust types ---

#[tokio::test]
async fn schemars_derived_schema_drives_validation() {
    use schemars::{schema_for, JsonSchema};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct LabReport {
        patient: String,
        potassium: f64,
    }

    let schema = serde_json::to_value(schema_for!(LabReport)).unwrap();

    let adapter = Arc::new(ScriptedAdapter::new(vec![Reply::Text(VALID_OUTPUT)]));
    let store = MemoryConfigStore::new()
        .with_doc_type(DocType::new("LAB_REPORT", schema))
        .with_model(ModelSpec::new("model-a", "prov"))
        .with_template(PromptTemplate::new("t-default", "LAB_REPORT", TEMPLATE_BODY))
        .with_chain(FallbackChain::new(
            "chain-1",
            "LAB_REPORT",
            "acme",
            vec![FallbackStep::new(1, "model-a")],
        ));
    let credentials = StaticCredentials::new().with_credential(
        ProviderId::new("prov"),
        TenantId::new("acme"),
        Credential::new("secret"),
    );
    let gateway = Gateway::new(Arc::new(credentials))
        .with_adapter(ProviderId::new("prov"), adapter.clone() as Arc<dyn ProviderAdapter>);
    let orchestrator = Orchestrator::new(
        Arc::new(store),
        Arc::new(gateway),
        Arc::new(MemoryAuditLog::new()),
        EngineConfig::default(),
    );

    let result = orchestrator.extract(request("req-schemars")).await.unwrap();
    let typed: LabReport = serde_json::from_value(result.data).unwrap();
    assert_eq!(typed.patient, "Marie Dubois");
    assert!((typed.potassium - 4.2).abs() < f64::EPSILON);
}
