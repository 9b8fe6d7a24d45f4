//! Activity span field of the channel info panel.
//!
//! Recomputes the span whenever the selected channel changes and keeps the
//! result for the most recent selection only. Failures leave the field blank;
//! the rest of the panel never sees them.

use crate::span::DurationCalculator;
use crate::store::MessageStore;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::{AbortHandle, JoinHandle};

#[derive(Default)]
struct FieldState {
    /// Bumped on every selection; completions from older generations are dropped
    generation: u64,
    channel_id: Option<String>,
    duration: String,
    in_flight: Option<AbortHandle>,
}

pub struct ActivitySpanField<S> {
    calculator: Arc<DurationCalculator<S>>,
    state: Arc<Mutex<FieldState>>,
}

impl<S> Clone for ActivitySpanField<S> {
    fn clone(&self) -> Self {
        Self { calculator: self.calculator.clone(), state: self.state.clone() }
    }
}

impl<S> ActivitySpanField<S>
where
    S: MessageStore + 'static,
{
    pub fn new(calculator: Arc<DurationCalculator<S>>) -> Self {
        Self { calculator, state: Arc::new(Mutex::new(FieldState::default())) }
    }

    /// React to a channel selection.
    ///
    /// Re-selecting the current channel is a no-op and returns `None`. Otherwise
    /// any computation for the previous channel is aborted and a new one is
    /// spawned on the current tokio runtime.
    pub fn select_channel(&self, channel_id: impl Into<String>) -> Option<JoinHandle<()>> {
        let channel_id = channel_id.into();
        let mut state = self.state.lock();
        if state.channel_id.as_deref() == Some(channel_id.as_str()) {
            return None;
        }

        Some(self.restart(&mut state, channel_id))
    }

    /// Recompute the span of the current channel, e.g. after new messages arrived
    pub fn refresh(&self) -> Option<JoinHandle<()>> {
        let mut state = self.state.lock();
        let channel_id = state.channel_id.clone()?;
        Some(self.restart(&mut state, channel_id))
    }

    /// Forget the selection and cancel any computation in flight
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        if let Some(task) = state.in_flight.take() {
            task.abort();
        }
        state.channel_id = None;
        state.duration.clear();
    }

    /// Text to display: the formatted span, or empty while loading or after a failure
    pub fn duration(&self) -> String {
        self.state.lock().duration.clone()
    }

    pub fn channel_id(&self) -> Option<String> {
        self.state.lock().channel_id.clone()
    }

    fn restart(&self, state: &mut FieldState, channel_id: String) -> JoinHandle<()> {
        state.generation += 1;
        if let Some(task) = state.in_flight.take() {
            task.abort();
        }
        state.channel_id = Some(channel_id.clone());
        state.duration.clear();

        let generation = state.generation;
        let calculator = self.calculator.clone();
        let shared = self.state.clone();

        let handle = tokio::spawn(async move {
            // Errors are logged by the calculator and only blank the field here
            let duration = calculator.compute_duration(&channel_id).await.unwrap_or_default();

            let mut state = shared.lock();
            if state.generation != generation {
                tracing::debug!("Discarding stale activity span for channel {}", channel_id);
                return;
            }
            state.duration = duration;
            state.in_flight = None;
        });

        state.in_flight = Some(handle.abort_handle());
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryMessageStore;
    use std::time::Duration;

    const T: i64 = 1_700_000_000_000;

    fn field(store: &InMemoryMessageStore) -> ActivitySpanField<InMemoryMessageStore> {
        let calculator = DurationCalculator::new(store.clone(), Duration::from_secs(30));
        ActivitySpanField::new(Arc::new(calculator))
    }

    #[tokio::test]
    async fn test_selection_fills_duration() {
        let store = InMemoryMessageStore::new();
        store.insert("general", T);
        store.insert("general", T + 2 * 86_400_000 + 5 * 60_000);

        let field = field(&store);
        assert_eq!(field.duration(), "");

        field.select_channel("general").unwrap().await.unwrap();
        assert_eq!(field.duration(), "2 days 0 hours 5 minutes");
        assert_eq!(field.channel_id().as_deref(), Some("general"));
    }

    #[tokio::test]
    async fn test_failure_leaves_field_blank() {
        let store = InMemoryMessageStore::new();
        store.insert("general", T);
        let field = field(&store);

        field.select_channel("general").unwrap().await.unwrap();
        assert_eq!(field.duration(), "0 days 0 hours 0 minutes");

        // Switching to an empty channel clears the previous value and stays blank
        field.select_channel("empty").unwrap().await.unwrap();
        assert_eq!(field.duration(), "");

        store.set_unreachable(true);
        field.select_channel("general").unwrap().await.unwrap();
        assert_eq!(field.duration(), "");
    }

    #[tokio::test]
    async fn test_reselecting_same_channel_is_noop() {
        let store = InMemoryMessageStore::new();
        store.insert("general", T);
        let field = field(&store);

        field.select_channel("general").unwrap().await.unwrap();
        assert!(field.select_channel("general").is_none());
        assert_eq!(store.stats().sessions_opened, 1);

        field.refresh().unwrap().await.unwrap();
        assert_eq!(store.stats().sessions_opened, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_selection_wins_over_slow_earlier_one() {
        let store = InMemoryMessageStore::new();
        store.insert("slow", T);
        store.insert("slow", T + 60_000);
        store.insert("fast", T);
        store.insert("fast", T + 3_600_000);
        store.set_channel_query_delay("slow", Duration::from_secs(10));
        store.set_channel_query_delay("fast", Duration::from_secs(1));

        let field = field(&store);
        let slow = field.select_channel("slow").unwrap();
        // Let the slow computation open its session before switching away
        tokio::task::yield_now().await;
        let fast = field.select_channel("fast").unwrap();

        fast.await.unwrap();
        assert!(slow.await.unwrap_err().is_cancelled());
        assert_eq!(field.duration(), "0 days 1 hours 0 minutes");

        // The cancelled computation still gave its connection back
        assert_eq!(store.stats().open_sessions, 0);
    }

    #[tokio::test]
    async fn test_panicking_store_releases_and_stays_blank() {
        let store = InMemoryMessageStore::new();
        store.insert("general", T);
        store.set_panic_on_query(true);
        let field = field(&store);

        let result = field.select_channel("general").unwrap().await;
        assert!(result.unwrap_err().is_panic());
        assert_eq!(field.duration(), "");
        assert_eq!(store.stats().open_sessions, 0);
    }

    #[tokio::test]
    async fn test_clear_resets_selection() {
        let store = InMemoryMessageStore::new();
        store.insert("general", T);
        let field = field(&store);

        field.select_channel("general").unwrap().await.unwrap();
        field.clear();
        assert_eq!(field.duration(), "");
        assert!(field.channel_id().is_none());
        assert!(field.refresh().is_none());
    }
}
