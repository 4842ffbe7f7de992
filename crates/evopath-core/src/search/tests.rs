use super::*;
use crate::error::Error;
use async_trait::async_trait;
use evopath_llm::{
    LlmProvider, MockProvider, ToolChoice, ToolCompletionRequest, ToolCompletionResponse,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Candidates answer "4"; judges reply with `stars`; structured calls succeed.
fn scripted(stars: &'static str) -> MockProvider {
    MockProvider::new().with_handler(move |req| {
        if let ToolChoice::Tool(name) = &req.tool_choice {
            let args = if name == "mutate_result" {
                serde_json::json!({"lessons": ["be direct"], "improved_strategy": "Answer directly."})
            } else {
                serde_json::json!({"merged_strategy": "Merged."})
            };
            return Ok(MockProvider::tool_call_response("call_0", name.clone(), args));
        }
        if req.request.messages[0].content.starts_with("Judge") {
            return Ok(MockProvider::text_response(format!("STARS: {stars}"), 5));
        }
        Ok(MockProvider::text_response("4", 10))
    })
}

fn structured_calls(provider: &MockProvider) -> usize {
    provider
        .requests()
        .iter()
        .filter(|r| matches!(r.tool_choice, ToolChoice::Tool(_)))
        .count()
}

fn config(generations: u32, candidates: usize) -> SearchConfig {
    SearchConfig::default()
        .with_generations(generations)
        .with_candidates(candidates)
}

#[tokio::test]
async fn test_single_candidate_answers() {
    let provider = scripted("5");
    let search = PathSearch::new(Arc::new(provider.clone()));

    let outcome = search
        .search(SearchRequest::new("what is 2+2"), &config(1, 1))
        .await
        .unwrap();

    assert_eq!(outcome.answer, "4");
    assert_eq!(outcome.archive_size, 1);
    assert_eq!(outcome.generations_run, 1);
    assert_eq!(outcome.pareto_front.len(), 1);
    assert_eq!(outcome.pareto_front[0].id, outcome.candidate_id);
    assert_eq!(outcome.trace.total_tokens, 10);
}

#[tokio::test]
async fn test_all_candidates_fail_execution() {
    let provider = MockProvider::new().with_handler(|_| {
        Err(evopath_llm::Error::Network("connection refused".into()))
    });
    let search = PathSearch::new(Arc::new(provider));

    let err = search
        .search(SearchRequest::new("q"), &config(3, 3))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ArchiveExhaustion { generation: 0 }));
}

#[tokio::test]
async fn test_all_candidates_fail_evaluation() {
    let provider = MockProvider::new().with_handler(|req| {
        if req.request.messages[0].content.starts_with("Judge") {
            Ok(MockProvider::text_response("no rating", 1))
        } else {
            Ok(MockProvider::text_response("4", 1))
        }
    });
    let search = PathSearch::new(Arc::new(provider));

    let err = search
        .search(SearchRequest::new("q"), &config(1, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ArchiveExhaustion { generation: 0 }));
}

#[tokio::test]
async fn test_target_reached_in_first_generation() {
    let provider = scripted("5");
    let search = PathSearch::new(Arc::new(provider.clone()));

    let outcome = search
        .search(SearchRequest::new("q"), &config(3, 3))
        .await
        .unwrap();

    assert_eq!(outcome.generations_run, 1);
    assert!(outcome.weighted_score >= 4.0);
    assert_eq!(structured_calls(&provider), 0);
}

#[tokio::test]
async fn test_below_target_evolves_until_last_generation() {
    let provider = scripted("2");
    let search = PathSearch::new(Arc::new(provider.clone()));

    let outcome = search
        .search(SearchRequest::new("q"), &config(2, 2))
        .await
        .unwrap();

    assert_eq!(outcome.generations_run, 2);
    assert!(outcome.weighted_score < 4.0);
    assert!(structured_calls(&provider) >= 1);

    let evolved_prompt_seen = provider.requests().iter().any(|r| {
        let system = &r.request.messages[0].content;
        system.starts_with("## Approach Strategy\nAnswer directly.")
            && system.ends_with("## Lessons from previous attempts\n- be direct")
    });
    assert!(evolved_prompt_seen);
}

#[tokio::test]
async fn test_crossover_disabled() {
    let provider = scripted("2");
    let search = PathSearch::new(Arc::new(provider.clone()));

    search
        .search(
            SearchRequest::new("q"),
            &config(2, 3).with_crossover(false),
        )
        .await
        .unwrap();

    let crossover_calls = provider
        .requests()
        .iter()
        .filter(|r| r.tool_choice == ToolChoice::Tool("crossover_result".into()))
        .count();
    assert_eq!(crossover_calls, 0);
}

#[tokio::test]
async fn test_invalid_config_rejected_before_any_call() {
    let provider = scripted("5");
    let search = PathSearch::new(Arc::new(provider.clone()));

    let err = search
        .search(SearchRequest::new("q"), &config(0, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_external_cancellation() {
    let provider = scripted("5");
    let cancel = CancellationToken::new();
    cancel.cancel();
    let search = PathSearch::new(Arc::new(provider)).with_cancellation(cancel);

    let err = search
        .search(SearchRequest::new("q"), &config(1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

struct StalledProvider;

#[async_trait]
impl LlmProvider for StalledProvider {
    fn name(&self) -> &str {
        "stalled"
    }

    fn default_model(&self) -> &str {
        "stalled"
    }

    async fn complete_with_tools(
        &self,
        _request: ToolCompletionRequest,
    ) -> evopath_llm::Result<ToolCompletionResponse> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(ToolCompletionResponse::text("too late"))
    }
}

#[tokio::test(start_paused = true)]
async fn test_deadline_exceeded() {
    let search = PathSearch::new(Arc::new(StalledProvider));

    let err = search
        .search(
            SearchRequest::new("q"),
            &config(1, 1).with_deadline_secs(2),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DeadlineExceeded(2)));
}
