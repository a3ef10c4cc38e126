use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use super::session::{Phase, QuerySession, SessionError};
use crate::food::analysis::normalize;
use crate::food::api::FoodApi;
use crate::food::models::{ImpactReport, RecommendationOptions, Recommendations};

/// Drives one analyzer view: suggestions while typing, the parallel
/// impact/recommendation lookup on submit, and how partial failures land in
/// the session.
///
/// Every mutation is published on a watch channel (see [`subscribe`]).
/// Dropping the orchestrator aborts the in-flight analysis and closes the
/// channel.
///
/// [`subscribe`]: SearchOrchestrator::subscribe
pub struct SearchOrchestrator<A: FoodApi + 'static> {
    inner: Arc<Inner<A>>,
}

struct Inner<A> {
    api: A,
    debounce: Duration,
    options: Mutex<RecommendationOptions>,
    state: watch::Sender<QuerySession>,
    // Bumped by every keystroke, submit, dismissal and clear. A suggestion
    // response is only applied if its number is still current.
    suggestion_seq: AtomicU64,
    analysis_seq: AtomicU64,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl<A: FoodApi + 'static> SearchOrchestrator<A> {
    pub fn new(api: A, debounce: Duration) -> Self {
        let (state, _) = watch::channel(QuerySession::default());
        Self {
            inner: Arc::new(Inner {
                api,
                debounce,
                options: Mutex::new(RecommendationOptions::default()),
                state,
                suggestion_seq: AtomicU64::new(0),
                analysis_seq: AtomicU64::new(0),
                in_flight: Mutex::new(None),
            }),
        }
    }

    pub fn with_recommendation_options(self, options: RecommendationOptions) -> Self {
        self.set_recommendation_options(options);
        self
    }

    pub fn set_recommendation_options(&self, options: RecommendationOptions) {
        *self.inner.options.lock() = options;
    }

    pub fn recommendation_options(&self) -> RecommendationOptions {
        *self.inner.options.lock()
    }

    pub fn subscribe(&self) -> watch::Receiver<QuerySession> {
        self.inner.state.subscribe()
    }

    pub fn session(&self) -> QuerySession {
        self.inner.state.borrow().clone()
    }

    /// Keystroke handler. Fragments of one character or less clear the
    /// suggestion list; longer ones fetch fresh suggestions after the
    /// debounce window unless an analysis is running.
    pub async fn input_changed(&self, text: &str) {
        let seq = self.inner.suggestion_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let fragment = text.trim().to_string();
        let wants_suggestions = fragment.chars().count() > 1;
        let mut analyzing = false;

        self.inner.state.send_modify(|s| {
            s.current_query = text.to_string();
            if !wants_suggestions {
                s.suggestions.clear();
                if s.phase == Phase::SuggestingLoading {
                    s.phase = Phase::Idle;
                }
            } else if s.phase == Phase::Analyzing {
                analyzing = true;
            } else if s.phase == Phase::Idle {
                s.phase = Phase::SuggestingLoading;
            }
        });

        if !wants_suggestions || analyzing {
            return;
        }

        if !self.inner.debounce.is_zero() {
            tokio::time::sleep(self.inner.debounce).await;
            if !self.inner.is_current_suggestion(seq) {
                debug!(%fragment, "Keystroke superseded during debounce");
                return;
            }
        }

        let suggestions = self.inner.api.fetch_suggestions(&fragment).await;

        let applied = self.inner.state.send_if_modified(|s| {
            if !self.inner.is_current_suggestion(seq) {
                return false;
            }
            s.suggestions = suggestions;
            if s.phase == Phase::SuggestingLoading {
                s.phase = Phase::Idle;
            }
            true
        });

        if !applied {
            debug!(%fragment, "Discarding stale suggestions");
        }
    }

    /// Outside-click dismissal: hides suggestions, keeps the query.
    pub fn dismiss_suggestions(&self) {
        self.inner.suggestion_seq.fetch_add(1, Ordering::SeqCst);
        self.inner.state.send_modify(|s| {
            s.suggestions.clear();
            if s.phase == Phase::SuggestingLoading {
                s.phase = Phase::Idle;
            }
        });
    }

    /// Analyzes whatever is currently typed.
    pub async fn submit(&self) -> Phase {
        let query = self.inner.state.borrow().current_query.clone();
        self.analyze(query).await
    }

    /// Sets the query and analyzes it.
    pub async fn submit_query(&self, query: &str) -> Phase {
        self.inner.state.send_modify(|s| s.current_query = query.to_string());
        self.analyze(query.to_string()).await
    }

    pub async fn select_suggestion(&self, suggestion: &str) -> Phase {
        debug!(suggestion, "Suggestion selected");
        self.submit_query(suggestion).await
    }

    /// Jumps to a recommended alternative and analyzes it in turn.
    pub async fn select_alternative(&self, name: &str) -> Phase {
        debug!(alternative = name, "Alternative selected");
        self.submit_query(name).await
    }

    /// Back to a blank session. Local only: no requests are issued, and
    /// anything still in flight is dropped.
    pub fn clear(&self) {
        self.inner.suggestion_seq.fetch_add(1, Ordering::SeqCst);
        self.inner.analysis_seq.fetch_add(1, Ordering::SeqCst);
        self.inner.abort_in_flight();
        self.inner.state.send_replace(QuerySession::default());
    }

    async fn analyze(&self, raw_query: String) -> Phase {
        let food = raw_query.trim().to_string();
        if food.is_empty() {
            warn!("Rejected empty query");
            self.inner.suggestion_seq.fetch_add(1, Ordering::SeqCst);
            self.inner.analysis_seq.fetch_add(1, Ordering::SeqCst);
            self.inner.abort_in_flight();
            self.inner.state.send_modify(|s| {
                s.suggestions.clear();
                s.error = Some(SessionError::EmptyQuery);
                s.phase = Phase::Failure;
            });
            return Phase::Failure;
        }

        self.inner.suggestion_seq.fetch_add(1, Ordering::SeqCst);
        let seq = self.inner.analysis_seq.fetch_add(1, Ordering::SeqCst) + 1;

        self.inner.state.send_modify(|s| {
            s.last_submitted_query = Some(food.clone());
            s.suggestions.clear();
            s.impact = None;
            s.alternatives.clear();
            s.error = None;
            s.recommendation_source = None;
            s.phase = Phase::Analyzing;
        });

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.run_analysis(seq, food).await });

        if let Some(previous) = self.inner.in_flight.lock().replace(task.abort_handle()) {
            previous.abort();
        }

        match task.await {
            Ok(phase) => phase,
            Err(e) => {
                if !e.is_cancelled() {
                    warn!(error = %e, "Analysis task failed");
                }
                self.inner.state.borrow().phase
            }
        }
    }
}

impl<A: FoodApi + 'static> Drop for SearchOrchestrator<A> {
    fn drop(&mut self) {
        self.inner.abort_in_flight();
        debug!("Search session closed");
    }
}

impl<A: FoodApi + 'static> Inner<A> {
    fn is_current_suggestion(&self, seq: u64) -> bool {
        self.suggestion_seq.load(Ordering::SeqCst) == seq
    }

    fn abort_in_flight(&self) {
        if let Some(handle) = self.in_flight.lock().take() {
            handle.abort();
        }
    }

    async fn run_analysis(&self, seq: u64, food: String) -> Phase {
        let options = *self.options.lock();
        info!(food = %food, use_ai = options.use_ai, "Analyzing food impact");

        let (impact, recommendations) = futures::join!(
            self.api.fetch_impact(&food),
            self.api.fetch_recommendations(&food, &options)
        );

        let impact: Result<ImpactReport, SessionError> = match impact {
            Ok(raw) => normalize(&raw).ok_or(SessionError::InvalidImpactShape),
            Err(e) => {
                warn!(food = %food, error = %e, "Impact lookup failed");
                Err(SessionError::NetworkOrServerError)
            }
        };

        // Recommendations are secondary: their failure never reaches the user.
        let recommendations = recommendations.unwrap_or_else(|e| {
            warn!(food = %food, error = %e, "Recommendation lookup failed");
            Recommendations::default()
        });

        let phase = match (&impact, recommendations.alternatives.is_empty()) {
            (Ok(_), _) => Phase::Success,
            (Err(_), false) => Phase::PartialFailure,
            (Err(_), true) => Phase::Failure,
        };

        let applied = self.state.send_if_modified(|s| {
            if self.analysis_seq.load(Ordering::SeqCst) != seq {
                return false;
            }
            match impact {
                Ok(report) => {
                    s.impact = Some(report);
                    s.error = None;
                }
                Err(e) => {
                    s.impact = None;
                    s.error = Some(e);
                }
            }
            s.alternatives = recommendations.alternatives;
            s.recommendation_source = recommendations.source;
            s.phase = phase;
            true
        });

        if applied {
            info!(food = %food, ?phase, "Analysis finished");
            phase
        } else {
            debug!(food = %food, "Discarding superseded analysis");
            self.state.borrow().phase
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::food::api::ApiError;
    use crate::food::models::{Alternative, ImpactLevel};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    #[derive(Clone)]
    struct Script {
        delay: Duration,
        impact: Result<Value, ApiError>,
        recommendations: Result<Recommendations, ApiError>,
    }

    #[derive(Default)]
    struct FakeApi {
        foods: HashMap<String, Script>,
        suggestions: HashMap<String, (Duration, Vec<String>)>,
        impact_calls: Mutex<Vec<String>>,
        recommendation_calls: AtomicUsize,
        suggestion_calls: Mutex<Vec<String>>,
    }

    impl FakeApi {
        fn food(
            mut self,
            name: &str,
            impact: Result<Value, ApiError>,
            recommendations: Result<Recommendations, ApiError>,
        ) -> Self {
            self.foods.insert(
                name.to_string(),
                Script { delay: Duration::from_millis(10), impact, recommendations },
            );
            self
        }

        fn delayed(mut self, name: &str, delay: Duration) -> Self {
            if let Some(script) = self.foods.get_mut(name) {
                script.delay = delay;
            }
            self
        }

        fn suggest(mut self, fragment: &str, delay: Duration, items: &[&str]) -> Self {
            self.suggestions.insert(
                fragment.to_string(),
                (delay, items.iter().map(|s| s.to_string()).collect()),
            );
            self
        }

        fn network_calls(&self) -> usize {
            self.impact_calls.lock().len()
                + self.recommendation_calls.load(Ordering::SeqCst)
                + self.suggestion_calls.lock().len()
        }
    }

    #[async_trait::async_trait]
    impl FoodApi for FakeApi {
        async fn fetch_impact(&self, food_name: &str) -> Result<Value, ApiError> {
            self.impact_calls.lock().push(food_name.to_string());
            let script = self.foods.get(food_name).cloned();
            match script {
                Some(script) => {
                    tokio::time::sleep(script.delay).await;
                    script.impact
                }
                None => Err(ApiError::NotFound),
            }
        }

        async fn fetch_recommendations(
            &self,
            food_name: &str,
            _options: &RecommendationOptions,
        ) -> Result<Recommendations, ApiError> {
            self.recommendation_calls.fetch_add(1, Ordering::SeqCst);
            let script = self.foods.get(food_name).cloned();
            match script {
                Some(script) => {
                    tokio::time::sleep(script.delay).await;
                    script.recommendations
                }
                None => Err(ApiError::NotFound),
            }
        }

        async fn fetch_suggestions(&self, fragment: &str) -> Vec<String> {
            self.suggestion_calls.lock().push(fragment.to_string());
            match self.suggestions.get(fragment).cloned() {
                Some((delay, items)) => {
                    tokio::time::sleep(delay).await;
                    items
                }
                None => Vec::new(),
            }
        }
    }

    fn beef_flat() -> Value {
        json!({
            "food": "Beef", "carbon": 27, "water": 15400, "energy": 42, "waste": 3.2,
            "deforestation": 0.8, "impact": "High", "environmental_score": 8
        })
    }

    fn tofu_nested() -> Value {
        json!({
            "food": "Tofu", "score": 7,
            "breakdown": {"carbon": 2.0, "water": 300, "energy": 2.0, "waste": 0.2, "deforestation": 1.0}
        })
    }

    fn alternative(name: &str) -> Alternative {
        Alternative {
            name: name.to_string(),
            sustainability_improvement: 75.0,
            explanation: format!("{} has a smaller footprint", name),
            impact: Default::default(),
            similarity_score: None,
        }
    }

    fn recs(names: &[&str]) -> Result<Recommendations, ApiError> {
        Ok(Recommendations {
            source: Some("ml".to_string()),
            alternatives: names.iter().map(|n| alternative(n)).collect(),
            ..Default::default()
        })
    }

    fn orchestrator(api: FakeApi) -> (SearchOrchestrator<Arc<FakeApi>>, Arc<FakeApi>) {
        let api = Arc::new(api);
        (SearchOrchestrator::new(Arc::clone(&api), Duration::ZERO), api)
    }

    #[tokio::test(start_paused = true)]
    async fn beef_analysis_succeeds() {
        let (search, _) =
            orchestrator(FakeApi::default().food("Beef", Ok(beef_flat()), recs(&["Lentils", "Tofu"])));

        assert_eq!(search.submit_query("Beef").await, Phase::Success);

        let session = search.session();
        let impact = session.impact.unwrap();
        assert_eq!(impact.breakdown.carbon, 27.0);
        assert_eq!(impact.breakdown.water, 15400.0);
        assert_eq!(impact.breakdown.deforestation, 0.8);
        assert_eq!(impact.score, 8.0);
        assert_eq!(impact.impact_level, Some(ImpactLevel::High));
        let names: Vec<_> = session.alternatives.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["Lentils", "Tofu"]);
        assert_eq!(session.error, None);
        assert_eq!(session.last_submitted_query.as_deref(), Some("Beef"));
        assert_eq!(session.recommendation_source.as_deref(), Some("ml"));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_query_never_hits_the_network() {
        let (search, api) = orchestrator(FakeApi::default());

        for query in ["", "   ", "\t\n"] {
            assert_eq!(search.submit_query(query).await, Phase::Failure);
            let session = search.session();
            assert_eq!(session.error, Some(SessionError::EmptyQuery));
            assert_eq!(
                session.error_message().as_deref(),
                Some("Please enter a food name (e.g., Almond Milk, Beef)")
            );
        }
        assert_eq!(api.network_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_impact_with_alternatives_is_partial_failure() {
        let (search, _) = orchestrator(FakeApi::default().food(
            "Quinoa",
            Err(ApiError::Timeout),
            recs(&["Rice"]),
        ));

        assert_eq!(search.submit_query("Quinoa").await, Phase::PartialFailure);
        let session = search.session();
        assert!(session.impact.is_none());
        assert_eq!(session.alternatives.len(), 1);
        assert_eq!(session.error, Some(SessionError::NetworkOrServerError));
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_impact_reports_shape_error() {
        let (search, _) = orchestrator(FakeApi::default().food(
            "Cheese",
            Ok(json!({"food": "Cheese", "carbon": "a lot"})),
            recs(&["Tofu"]),
        ));

        assert_eq!(search.submit_query("Cheese").await, Phase::PartialFailure);
        let session = search.session();
        assert!(session.impact.is_none());
        assert_eq!(session.alternatives[0].name, "Tofu");
        assert_eq!(
            session.error_message().as_deref(),
            Some("Unable to analyze this food item's impact data.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_impact_without_alternatives_is_failure() {
        let (search, _) = orchestrator(FakeApi::default().food(
            "Cheese",
            Ok(json!({"food": "Cheese", "carbon": "a lot"})),
            recs(&[]),
        ));

        assert_eq!(search.submit_query("Cheese").await, Phase::Failure);
        let session = search.session();
        assert!(session.impact.is_none());
        assert!(session.alternatives.is_empty());
        assert_eq!(session.error, Some(SessionError::InvalidImpactShape));
        assert_eq!(
            session.error_message().as_deref(),
            Some("Unable to analyze this food item's impact data.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_alternative_rows_still_yield_partial_failure() {
        let recommendations: Recommendations = serde_json::from_value(json!({
            "alternatives": [
                {"name": "Tofu", "sustainability_improvement": 90.0, "explanation": "ok"},
                {"name": "Lentils", "sustainability_improvement": null, "explanation": null},
                {"sustainability_improvement": 10.0}
            ]
        }))
        .unwrap();
        let (search, _) = orchestrator(FakeApi::default().food(
            "Quinoa",
            Err(ApiError::Timeout),
            Ok(recommendations),
        ));

        assert_eq!(search.submit_query("Quinoa").await, Phase::PartialFailure);
        let names: Vec<_> = search.session().alternatives.iter().map(|a| a.name.clone()).collect();
        assert_eq!(names, ["Tofu", "Lentils"]);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_food_with_no_alternatives_fails_with_network_message() {
        let (search, _) = orchestrator(FakeApi::default().food(
            "xyzfoo",
            Err(ApiError::NotFound),
            recs(&[]),
        ));

        assert_eq!(search.submit_query("xyzfoo").await, Phase::Failure);
        let session = search.session();
        assert!(session.impact.is_none());
        assert!(session.alternatives.is_empty());
        assert_eq!(session.error, Some(SessionError::NetworkOrServerError));
        assert_ne!(session.error, Some(SessionError::InvalidImpactShape));
    }

    #[tokio::test(start_paused = true)]
    async fn both_lookups_failing_is_failure() {
        let (search, _) = orchestrator(FakeApi::default().food(
            "Beef",
            Err(ApiError::Server { status: 500 }),
            Err(ApiError::Server { status: 500 }),
        ));

        assert_eq!(search.submit_query("Beef").await, Phase::Failure);
        let session = search.session();
        assert!(session.alternatives.is_empty());
        assert_eq!(session.error, Some(SessionError::NetworkOrServerError));
    }

    #[tokio::test(start_paused = true)]
    async fn recommendation_failure_is_silent() {
        let (search, _) = orchestrator(FakeApi::default().food(
            "Beef",
            Ok(beef_flat()),
            Err(ApiError::Timeout),
        ));

        assert_eq!(search.submit_query("Beef").await, Phase::Success);
        let session = search.session();
        assert!(session.impact.is_some());
        assert!(session.alternatives.is_empty());
        assert_eq!(session.error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn impact_and_recommendations_run_concurrently() {
        let api = FakeApi::default()
            .food("Beef", Ok(beef_flat()), recs(&["Tofu"]))
            .delayed("Beef", Duration::from_secs(1));
        let (search, _) = orchestrator(api);

        let started = tokio::time::Instant::now();
        search.submit_query("Beef").await;
        assert!(started.elapsed() < Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn new_submit_supersedes_in_flight_analysis() {
        let api = FakeApi::default()
            .food("Beef", Ok(beef_flat()), recs(&["Lentils"]))
            .delayed("Beef", Duration::from_millis(500))
            .food("Tofu", Ok(tofu_nested()), recs(&["Tempeh"]));
        let (search, _) = orchestrator(api);

        let (_, tofu) = tokio::join!(search.submit_query("Beef"), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            search.submit_query("Tofu").await
        });
        assert_eq!(tofu, Phase::Success);

        tokio::time::sleep(Duration::from_secs(1)).await;
        let session = search.session();
        assert_eq!(session.impact.unwrap().food, "Tofu");
        assert_eq!(session.alternatives[0].name, "Tempeh");
        assert_eq!(session.last_submitted_query.as_deref(), Some("Tofu"));
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_a_suggestion_matches_manual_submit() {
        let script = || FakeApi::default().food("Oat Milk", Ok(tofu_nested()), recs(&["Soy Milk"]));

        let (typed, _) = orchestrator(script());
        typed.submit_query("Oat Milk").await;

        let (picked, _) = orchestrator(script());
        picked.select_suggestion("Oat Milk").await;

        assert_eq!(typed.session(), picked.session());
        assert_eq!(picked.session().current_query, "Oat Milk");
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_an_alternative_analyzes_it() {
        let api = FakeApi::default()
            .food("Beef", Ok(beef_flat()), recs(&["Tofu"]))
            .food("Tofu", Ok(tofu_nested()), recs(&["Tempeh"]));
        let (search, api) = orchestrator(api);

        search.submit_query("Beef").await;
        let next = search.session().alternatives[0].name.clone();
        assert_eq!(search.select_alternative(&next).await, Phase::Success);

        let session = search.session();
        assert_eq!(session.current_query, "Tofu");
        assert_eq!(session.impact.unwrap().food, "Tofu");
        assert_eq!(*api.impact_calls.lock(), ["Beef", "Tofu"]);
    }

    #[tokio::test(start_paused = true)]
    async fn short_fragments_clear_suggestions_without_fetching() {
        let (search, api) =
            orchestrator(FakeApi::default().suggest("be", Duration::ZERO, &["Beef", "Beer"]));

        search.input_changed("be").await;
        assert_eq!(search.session().suggestions, ["Beef", "Beer"]);

        search.input_changed(" b ").await;
        let session = search.session();
        assert!(session.suggestions.is_empty());
        assert_eq!(session.phase, Phase::Idle);
        assert_eq!(*api.suggestion_calls.lock(), ["be"]);
    }

    #[tokio::test(start_paused = true)]
    async fn suggestions_replace_previous_results() {
        let api = FakeApi::default()
            .suggest("mi", Duration::ZERO, &["Almond Milk", "Oat Milk"])
            .suggest("mis", Duration::ZERO, &["Miso"]);
        let (search, _) = orchestrator(api);

        search.input_changed("mi").await;
        search.input_changed("mis").await;
        assert_eq!(search.session().suggestions, ["Miso"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_suggestion_responses_are_discarded() {
        let api = FakeApi::default()
            .suggest("be", Duration::from_millis(200), &["Beef", "Beer", "Beetroot"])
            .suggest("bee", Duration::from_millis(20), &["Beef", "Beetroot"]);
        let (search, _) = orchestrator(api);

        tokio::join!(search.input_changed("be"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            search.input_changed("bee").await;
        });

        let session = search.session();
        assert_eq!(session.suggestions, ["Beef", "Beetroot"]);
        assert_eq!(session.current_query, "bee");
        assert_eq!(session.phase, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_skips_superseded_keystrokes() {
        let api = Arc::new(FakeApi::default().suggest("bee", Duration::ZERO, &["Beef"]));
        let search = SearchOrchestrator::new(Arc::clone(&api), Duration::from_millis(300));

        tokio::join!(search.input_changed("be"), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            search.input_changed("bee").await;
        });

        assert_eq!(*api.suggestion_calls.lock(), ["bee"]);
        assert_eq!(search.session().suggestions, ["Beef"]);
    }

    #[tokio::test(start_paused = true)]
    async fn typing_during_analysis_does_not_fetch_suggestions() {
        let api = FakeApi::default()
            .food("Beef", Ok(beef_flat()), recs(&[]))
            .delayed("Beef", Duration::from_millis(300))
            .suggest("chi", Duration::ZERO, &["Chicken"]);
        let (search, api) = orchestrator(api);

        tokio::join!(search.submit_query("Beef"), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            search.input_changed("chi").await;
        });

        assert!(api.suggestion_calls.lock().is_empty());
        let session = search.session();
        assert_eq!(session.phase, Phase::Success);
        assert_eq!(session.current_query, "chi");
        assert!(session.suggestions.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn submit_drops_pending_suggestions() {
        let api = FakeApi::default()
            .food("Beef", Ok(beef_flat()), recs(&[]))
            .suggest("bee", Duration::from_millis(200), &["Beef", "Beetroot"]);
        let (search, _) = orchestrator(api);

        tokio::join!(search.input_changed("bee"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            search.submit_query("Beef").await;
        });

        assert!(search.session().suggestions.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_keeps_query() {
        let (search, _) = orchestrator(FakeApi::default().suggest("oa", Duration::ZERO, &["Oat Milk"]));

        search.input_changed("oa").await;
        search.dismiss_suggestions();

        let session = search.session();
        assert!(session.suggestions.is_empty());
        assert_eq!(session.current_query, "oa");
    }

    #[tokio::test(start_paused = true)]
    async fn clear_resets_everything_locally() {
        let (search, api) =
            orchestrator(FakeApi::default().food("Beef", Ok(beef_flat()), recs(&["Tofu"])));

        search.submit_query("Beef").await;
        let calls_before = api.network_calls();

        search.clear();
        assert_eq!(search.session(), QuerySession::default());
        assert_eq!(api.network_calls(), calls_before);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_discards_in_flight_analysis() {
        let api = FakeApi::default()
            .food("Beef", Ok(beef_flat()), recs(&["Tofu"]))
            .delayed("Beef", Duration::from_millis(200));
        let (search, _) = orchestrator(api);

        tokio::join!(search.submit_query("Beef"), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            search.clear();
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(search.session(), QuerySession::default());
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_result_reports_current_phase() {
        let api = FakeApi::default()
            .food("Beef", Ok(beef_flat()), recs(&["Tofu"]))
            .delayed("Beef", Duration::from_millis(200));
        let (search, _) = orchestrator(api);

        // Reset the session without aborting, as when the task has already
        // finished its fetches when the clear lands.
        let (phase, _) = tokio::join!(search.submit_query("Beef"), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            search.inner.analysis_seq.fetch_add(1, Ordering::SeqCst);
            search.inner.state.send_replace(QuerySession::default());
        });

        assert_eq!(phase, Phase::Idle);
        assert_eq!(search.session(), QuerySession::default());
    }

    #[tokio::test(start_paused = true)]
    async fn new_submit_recovers_after_failure() {
        let api = FakeApi::default()
            .food("Beef", Ok(beef_flat()), recs(&["Tofu"]));
        let (search, _) = orchestrator(api);

        assert_eq!(search.submit_query("xyzfoo").await, Phase::Failure);
        assert_eq!(search.submit_query("Beef").await, Phase::Success);
        assert_eq!(search.session().error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_observe_updates_until_session_ends() {
        let (search, _) =
            orchestrator(FakeApi::default().food("Beef", Ok(beef_flat()), recs(&["Tofu"])));
        let mut updates = search.subscribe();

        search.submit_query("Beef").await;
        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().phase, Phase::Success);

        drop(search);
        assert!(updates.changed().await.is_err());
    }
}
