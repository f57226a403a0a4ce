//! Debounce and supersession behaviour of the suggestion fetcher

mod common;

use common::{labels, ready_context, ScriptedBackend};
use intelview::model::SearchStatus;
use intelview::notify::ChangeNotifier;
use intelview::suggest::{SuggestionFetcher, SuggestionSettings};
use intelview::{EntityKind, EntitySummary, SharedContext};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn fetcher(backend: Arc<ScriptedBackend>, context: Arc<SharedContext>) -> SuggestionFetcher {
    SuggestionFetcher::new(
        Arc::new(EntityKind::equipment()),
        context,
        backend,
        SuggestionSettings::default(),
        ChangeNotifier::new(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_burst_issues_one_request_for_last_text() {
    let backend = ScriptedBackend::new();
    let fetcher = fetcher(backend.clone(), ready_context());

    fetcher.search("Abr");
    sleep(Duration::from_millis(100)).await;
    fetcher.search("Abra");
    sleep(Duration::from_millis(100)).await;
    fetcher.search("Abram");
    assert_eq!(fetcher.snapshot().status, SearchStatus::Pending);

    sleep(Duration::from_millis(299)).await;
    assert!(backend.suggest_calls().is_empty());

    sleep(Duration::from_millis(2)).await;
    assert_eq!(backend.suggest_calls(), vec!["Abram"]);

    sleep(Duration::from_millis(10)).await;
    let snapshot = fetcher.snapshot();
    assert_eq!(snapshot.status, SearchStatus::Ready);
    assert_eq!(labels(&snapshot.candidates), vec!["Abram match", "Abram exercise"]);
    assert_eq!(snapshot.query_text, "Abram");
}

#[tokio::test(start_paused = true)]
async fn test_late_response_for_old_text_is_discarded() {
    let backend = ScriptedBackend::new();
    backend.set_suggest_delay("Abr", Duration::from_millis(1000));
    backend.set_suggest_delay("Abra", Duration::from_millis(50));
    let fetcher = fetcher(backend.clone(), ready_context());

    fetcher.search("Abr");
    sleep(Duration::from_millis(350)).await;
    assert_eq!(backend.suggest_calls(), vec!["Abr"]);
    assert_eq!(fetcher.snapshot().status, SearchStatus::Loading);

    fetcher.search("Abra");
    sleep(Duration::from_millis(450)).await;
    assert_eq!(backend.suggest_calls(), vec!["Abr", "Abra"]);
    assert_eq!(labels(&fetcher.snapshot().candidates), vec!["Abra match", "Abra exercise"]);

    // "Abr" resolves here, after "Abra" was applied
    sleep(Duration::from_millis(1000)).await;
    let snapshot = fetcher.snapshot();
    assert_eq!(snapshot.status, SearchStatus::Ready);
    assert_eq!(labels(&snapshot.candidates), vec!["Abra match", "Abra exercise"]);
}

#[tokio::test(start_paused = true)]
async fn test_old_response_arriving_first_is_discarded() {
    let backend = ScriptedBackend::new();
    backend.set_suggest_delay("Abr", Duration::from_millis(400));
    backend.set_suggest_delay("Abra", Duration::from_millis(500));
    let fetcher = fetcher(backend.clone(), ready_context());

    fetcher.search("Abr");
    sleep(Duration::from_millis(350)).await;
    fetcher.search("Abra");

    // "Abr" resolved at 700ms, "Abra" is still in flight
    sleep(Duration::from_millis(450)).await;
    let snapshot = fetcher.snapshot();
    assert_eq!(snapshot.status, SearchStatus::Loading);
    assert!(snapshot.candidates.is_empty());

    sleep(Duration::from_millis(400)).await;
    let snapshot = fetcher.snapshot();
    assert_eq!(snapshot.status, SearchStatus::Ready);
    assert_eq!(labels(&snapshot.candidates), vec!["Abra match", "Abra exercise"]);
}

#[tokio::test(start_paused = true)]
async fn test_short_query_shows_capped_defaults_without_request() {
    let backend = ScriptedBackend::new();
    let fetcher = fetcher(backend.clone(), ready_context());
    let defaults: Vec<EntitySummary> = (0..15)
        .map(|i| EntitySummary::new(format!("eq-{}", i), format!("Tank {}", i)))
        .collect();
    fetcher.set_defaults(defaults);

    fetcher.search("Ab");
    let snapshot = fetcher.snapshot();
    assert_eq!(snapshot.status, SearchStatus::Ready);
    assert_eq!(snapshot.candidates.len(), 10);
    assert_eq!(snapshot.candidates[0].label, "Tank 0");

    sleep(Duration::from_secs(1)).await;
    assert!(backend.suggest_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_short_query_cancels_armed_request() {
    let backend = ScriptedBackend::new();
    let fetcher = fetcher(backend.clone(), ready_context());

    fetcher.search("Abr");
    sleep(Duration::from_millis(100)).await;
    fetcher.search("Ab");
    sleep(Duration::from_secs(1)).await;

    assert!(backend.suggest_calls().is_empty());
    assert_eq!(fetcher.snapshot().status, SearchStatus::Empty);
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_yields_empty() {
    let backend = ScriptedBackend::new();
    backend.fail_suggest(true);
    let fetcher = fetcher(backend.clone(), ready_context());

    fetcher.search("Leopard");
    sleep(Duration::from_millis(400)).await;

    let snapshot = fetcher.snapshot();
    assert_eq!(backend.suggest_calls(), vec!["Leopard"]);
    assert_eq!(snapshot.status, SearchStatus::Empty);
    assert!(snapshot.candidates.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_not_ready_context_skips_network() {
    let backend = ScriptedBackend::new();
    let fetcher = fetcher(backend.clone(), Arc::new(SharedContext::new()));

    fetcher.search("Leopard");
    sleep(Duration::from_millis(400)).await;

    assert!(backend.suggest_calls().is_empty());
    assert_eq!(fetcher.snapshot().status, SearchStatus::Empty);
}

#[tokio::test(start_paused = true)]
async fn test_reset_makes_in_flight_response_stale() {
    let backend = ScriptedBackend::new();
    backend.set_suggest_delay("Leopard", Duration::from_millis(200));
    let fetcher = fetcher(backend.clone(), ready_context());

    fetcher.search("Leopard");
    sleep(Duration::from_millis(350)).await;
    fetcher.reset();
    sleep(Duration::from_millis(500)).await;

    let snapshot = fetcher.snapshot();
    assert_eq!(snapshot.status, SearchStatus::Idle);
    assert!(snapshot.candidates.is_empty());
    assert_eq!(snapshot.query_text, "");
}
