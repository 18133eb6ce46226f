//! Fallback chain behaviour end to end, with in-process provider doubles

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use social_leaf::capabilities::fallbacks::SCRIPT_UNAVAILABLE_REASON;
use social_leaf::capabilities::{CaptionBrief, CapabilityKind, CapabilityPayload, CapabilityRequest, Frame};
use social_leaf::clients::{GenerationRequest, ImageInput, ProviderError, TextProvider};
use social_leaf::error::SocialLeafError;
use social_leaf::orchestrator::Orchestrator;

enum Behaviour {
    Reply(&'static str),
    Fail,
    Hang,
}

struct Double {
    id: &'static str,
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl Double {
    fn new(id: &'static str, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            id,
            behaviour,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextProvider for Double {
    fn id(&self) -> &str {
        self.id
    }

    fn model(&self) -> &str {
        "double"
    }

    fn accepts_images(&self) -> bool {
        true
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Reply(text) => Ok(text.to_string()),
            Behaviour::Fail => Err(ProviderError::Http {
                status: 503,
                body: "unavailable".into(),
            }),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
        }
    }
}

fn orchestrator() -> Orchestrator {
    Orchestrator::with_timeouts(Duration::from_secs(30), Duration::from_secs(60))
}

fn caption_request() -> CapabilityRequest {
    CapabilityRequest::new(CapabilityPayload::Caption {
        images: vec![ImageInput::jpeg(vec![0xFF, 0xD8, 0xFF])],
        brief: CaptionBrief::default(),
    })
}

fn frames(n: usize) -> Vec<Frame> {
    (0..n)
        .map(|i| Frame {
            timestamp_sec: i as f64,
            jpeg: vec![0xFF, 0xD8, i as u8],
        })
        .collect()
}

fn payload_for(kind: CapabilityKind) -> CapabilityPayload {
    match kind {
        CapabilityKind::CaptionGeneration => CapabilityPayload::Caption {
            images: vec![ImageInput::jpeg(vec![1])],
            brief: CaptionBrief::default(),
        },
        CapabilityKind::HookDetection => CapabilityPayload::Hook {
            frames: frames(3),
            video_duration: 6.0,
        },
        CapabilityKind::ScriptAnalysis => CapabilityPayload::Script {
            script: "Today we talk about sleep.".into(),
        },
        CapabilityKind::PersonaGeneration => CapabilityPayload::Persona { context: Value::Null },
        CapabilityKind::NarrativeReport => CapabilityPayload::Narrative {
            context: json!({"overview": {"total_impressions": 100, "engagement_rate": 4.0}}),
        },
        CapabilityKind::AnalyticsQuery => CapabilityPayload::Query {
            question: "How do I grow?".into(),
            context: Value::Null,
        },
        CapabilityKind::InsightSummary => CapabilityPayload::Insight { context: Value::Null },
    }
}

#[tokio::test]
async fn second_adapter_rescues_a_failing_first() {
    let first = Double::new("first", Behaviour::Fail);
    let second = Double::new("second", Behaviour::Reply("```json\n{\"caption\":\"hi\"}\n```"));
    let chain: Vec<Arc<dyn TextProvider>> = vec![first.clone(), second.clone()];

    let result = orchestrator().execute(&caption_request(), &chain).await.unwrap();
    assert_eq!(result.source, "second");
    assert_eq!(result.str_field("caption"), "hi");
    assert!(result.list_field("hashtags").is_empty());
    assert_eq!(result.str_field("cta"), "Follow for more!");
    assert_eq!(result.str_field("style"), "custom");
    assert_eq!(first.calls(), 1);
}

#[tokio::test]
async fn success_short_circuits_the_chain() {
    let first = Double::new("first", Behaviour::Reply(r#"{"caption": "done"}"#));
    let second = Double::new("second", Behaviour::Reply(r#"{"caption": "never"}"#));
    let chain: Vec<Arc<dyn TextProvider>> = vec![first.clone(), second.clone()];

    let result = orchestrator().execute(&caption_request(), &chain).await.unwrap();
    assert_eq!(result.str_field("caption"), "done");
    assert_eq!(second.calls(), 0);
}

#[tokio::test]
async fn exhausted_script_chain_reports_unavailable() {
    let chain: Vec<Arc<dyn TextProvider>> = vec![
        Double::new("a", Behaviour::Fail),
        Double::new("b", Behaviour::Fail),
        Double::new("c", Behaviour::Reply("")),
    ];
    let request = CapabilityRequest::new(payload_for(CapabilityKind::ScriptAnalysis));

    let result = orchestrator().execute(&request, &chain).await.unwrap();
    assert_eq!(result.f64_field("retention_score"), 0.0);
    assert_eq!(result.str_field("retention_score_reason"), SCRIPT_UNAVAILABLE_REASON);
    assert_eq!(result.source, "fallback");
}

#[tokio::test]
async fn every_capability_completes_when_all_adapters_fail() {
    for kind in CapabilityKind::ALL {
        let chain: Vec<Arc<dyn TextProvider>> = vec![
            Double::new("a", Behaviour::Fail),
            Double::new("b", Behaviour::Reply("no json here")),
        ];
        let request = CapabilityRequest::new(payload_for(kind));
        let result = orchestrator().execute(&request, &chain).await.unwrap();
        assert!(result.satisfies(kind.schema()), "{kind} fallback incomplete");
    }
}

#[tokio::test(start_paused = true)]
async fn hanging_adapter_times_out_and_chain_advances() {
    let slow = Double::new("slow", Behaviour::Hang);
    let fast = Double::new("fast", Behaviour::Reply(r#"{"answer": "post at 8 PM"}"#));
    let chain: Vec<Arc<dyn TextProvider>> = vec![slow.clone(), fast.clone()];
    let request = CapabilityRequest::new(payload_for(CapabilityKind::AnalyticsQuery));

    let orchestrator = Orchestrator::with_timeouts(Duration::from_secs(1), Duration::from_secs(2));
    let result = orchestrator.execute(&request, &chain).await.unwrap();
    assert_eq!(result.source, "fast");
    assert_eq!(result.str_field("answer"), "post at 8 PM");
    assert_eq!(slow.calls(), 1);
}

#[tokio::test]
async fn empty_frames_fail_before_any_provider_call() {
    let provider = Double::new("a", Behaviour::Reply(r#"{"frame_index": 0}"#));
    let chain: Vec<Arc<dyn TextProvider>> = vec![provider.clone()];
    let request = CapabilityRequest::new(CapabilityPayload::Hook {
        frames: Vec::new(),
        video_duration: 0.0,
    });

    let err = orchestrator().execute(&request, &chain).await.unwrap_err();
    assert!(matches!(err, SocialLeafError::InvalidParams { .. }));
    assert_eq!(provider.calls(), 0);
}
