//! Live market-data polling.
//!
//! `MarketDataPoller` owns the selection, the display view and the chart. It
//! runs as one task: network work for a refresh cycle is spawned separately
//! and reports back through `FetchEvent`s, which are applied here in order.
//!
//! Cycles are single-flight. A tick that lands while a cycle is still running
//! is skipped, and a selection change or shutdown aborts the running cycle.
//! Every cycle carries a generation number so that events already queued by
//! an aborted cycle are dropped instead of painting stale data.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::{FetchError, MarketDataApi};
use crate::models::{Asset, AssetSelection, MarketSnapshot, PriceSeries, RangeBucket};
use crate::services::chart_service::{ChartController, ChartSurface};
use crate::services::dashboard_service::{fill_fields, show_snapshot, DashboardView, LOADING_TEXT};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Requests from the outside world (user input, shutdown)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerCommand {
    SelectAsset(Asset),
    SelectRange(RangeBucket),
    Refresh,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    /// Snapshot, then series on success
    Full,
    /// Series only
    SeriesOnly,
}

/// Result of one network step, tagged with the cycle that produced it
#[derive(Debug)]
pub enum FetchEvent {
    Snapshot {
        generation: u64,
        asset: Asset,
        result: Result<MarketSnapshot, FetchError>,
    },
    Series {
        generation: u64,
        asset: Asset,
        range: RangeBucket,
        result: Result<PriceSeries, FetchError>,
    },
}

impl FetchEvent {
    fn generation(&self) -> u64 {
        match self {
            FetchEvent::Snapshot { generation, .. } | FetchEvent::Series { generation, .. } => *generation,
        }
    }
}

pub struct MarketDataPoller<V, S> {
    api: Arc<dyn MarketDataApi>,
    view: V,
    chart: ChartController<S>,
    selection: AssetSelection,
    poll_interval: Duration,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
    /// A full cycle started but its snapshot has not been shown yet
    snapshot_pending: bool,
    events_tx: mpsc::UnboundedSender<FetchEvent>,
    events_rx: mpsc::UnboundedReceiver<FetchEvent>,
}

impl<V: DashboardView, S: ChartSurface> MarketDataPoller<V, S> {
    pub fn new(
        api: Arc<dyn MarketDataApi>,
        view: V,
        chart: ChartController<S>,
        selection: AssetSelection,
        poll_interval: Duration,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            api,
            view,
            chart,
            selection,
            poll_interval,
            generation: 0,
            in_flight: None,
            snapshot_pending: false,
            events_tx,
            events_rx,
        }
    }

    pub fn selection(&self) -> AssetSelection {
        self.selection
    }

    /// Refresh immediately, then every poll interval, until `Shutdown` arrives
    /// or every command sender is dropped
    pub async fn run(mut self, mut commands: mpsc::Receiver<PollerCommand>) -> Self {
        info!(
            "📡 Market poller started for {} ({}), refreshing every {}s",
            self.selection.asset,
            self.selection.range,
            self.poll_interval.as_secs()
        );

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.on_tick(),
                command = commands.recv() => match command {
                    Some(PollerCommand::SelectAsset(asset)) => self.select_asset(asset),
                    Some(PollerCommand::SelectRange(range)) => self.select_range(range),
                    Some(PollerCommand::Refresh) => self.start_cycle(CycleKind::Full),
                    Some(PollerCommand::Shutdown) | None => break,
                },
                Some(event) = self.events_rx.recv() => self.apply(event),
            }
        }

        self.cancel_in_flight();
        info!("Market poller stopped");
        self
    }

    fn on_tick(&mut self) {
        if self.is_busy() {
            debug!("⏭️ Previous refresh for {} still running, skipping tick", self.selection.asset);
            return;
        }
        self.start_cycle(CycleKind::Full);
    }

    fn is_busy(&self) -> bool {
        self.in_flight.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn select_asset(&mut self, asset: Asset) {
        info!("🔀 Asset changed: {} -> {}", self.selection.asset, asset);
        self.selection.asset = asset;
        self.start_cycle(CycleKind::Full);
    }

    pub fn select_range(&mut self, range: RangeBucket) {
        info!("🔀 Range changed: {} -> {}", self.selection.range, range);
        self.selection.range = range;
        // Cancelling a cycle whose snapshot never arrived would leave the
        // fields on "Loading...", so redo the whole cycle in that case
        let kind = if self.snapshot_pending {
            CycleKind::Full
        } else {
            CycleKind::SeriesOnly
        };
        self.start_cycle(kind);
    }

    fn cancel_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            if !handle.is_finished() {
                debug!("Cancelling in-flight refresh (generation {})", self.generation);
                handle.abort();
            }
        }
    }

    /// Abort whatever is running and start a new cycle for the current selection
    pub fn start_cycle(&mut self, kind: CycleKind) {
        self.cancel_in_flight();
        self.generation += 1;

        let generation = self.generation;
        let AssetSelection { asset, range } = self.selection;
        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();

        if kind == CycleKind::Full {
            self.snapshot_pending = true;
            fill_fields(&mut self.view, LOADING_TEXT);
            self.view.present();
        }

        debug!("Starting {:?} refresh #{} for {} ({})", kind, generation, asset, range);

        self.in_flight = Some(tokio::spawn(async move {
            if kind == CycleKind::Full {
                let result = api.fetch_snapshot(asset).await;
                let failed = result.is_err();
                if tx.send(FetchEvent::Snapshot { generation, asset, result }).is_err() || failed {
                    return;
                }
            }

            let result = api.fetch_series(asset, range).await;
            let _ = tx.send(FetchEvent::Series {
                generation,
                asset,
                range,
                result,
            });
        }));
    }

    /// Apply a finished network step to the view or the chart
    pub fn apply(&mut self, event: FetchEvent) {
        if event.generation() != self.generation {
            debug!(
                "Dropping stale result from refresh #{} (current #{})",
                event.generation(),
                self.generation
            );
            return;
        }

        match event {
            FetchEvent::Snapshot { asset, result, .. } => {
                self.snapshot_pending = false;
                match result {
                    Ok(snapshot) => {
                        debug!("Snapshot for {}: {:?}", asset, snapshot);
                        show_snapshot(&mut self.view, &snapshot);
                    }
                    Err(e) => {
                        warn!(
                            "❌ Error fetching market data for {} at {}: {}",
                            asset,
                            Utc::now().to_rfc3339(),
                            e
                        );
                        fill_fields(&mut self.view, e.display_text());
                    }
                }
                self.view.present();
            }
            FetchEvent::Series { asset, range, result, .. } => match result {
                Ok(series) => {
                    if let Err(e) = self.chart.apply_series(asset.display_name(), series, range) {
                        warn!("Failed to draw {} chart ({}): {}", asset, range, e);
                    }
                }
                // Keep the previous chart on screen
                Err(e) => warn!("Error updating {} chart ({}): {}", asset, range, e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use crate::models::AxisLabelFormat;
    use crate::services::chart_service::tests::{series, RecordingSurface};
    use crate::services::chart_service::{ChartState, ChartStyle};
    use crate::services::dashboard_service::{Field, FieldValue};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Snapshot(Asset),
        Series(Asset, RangeBucket),
    }

    /// Scripted API: fixed latency and optional failure per asset
    struct FakeApi {
        started: Instant,
        calls: Mutex<Vec<(u64, Call)>>,
        latency: HashMap<Asset, Duration>,
        snapshot_error: Option<FetchError>,
        series_error: Option<FetchError>,
    }

    impl FakeApi {
        fn new() -> Self {
            Self {
                started: Instant::now(),
                calls: Mutex::new(Vec::new()),
                latency: HashMap::new(),
                snapshot_error: None,
                series_error: None,
            }
        }

        fn record(&self, call: Call) {
            let secs = self.started.elapsed().as_secs();
            self.calls.lock().unwrap().push((secs, call));
        }

        fn calls(&self) -> Vec<(u64, Call)> {
            self.calls.lock().unwrap().clone()
        }

        fn snapshot_times(&self) -> Vec<u64> {
            self.calls()
                .into_iter()
                .filter(|(_, c)| matches!(c, Call::Snapshot(_)))
                .map(|(t, _)| t)
                .collect()
        }

        async fn delay(&self, asset: Asset) {
            if let Some(latency) = self.latency.get(&asset) {
                tokio::time::sleep(*latency).await;
            }
        }
    }

    fn snapshot_for(asset: Asset) -> MarketSnapshot {
        match asset {
            Asset::Ethereum => MarketSnapshot {
                symbol: "eth".to_string(),
                name: "Ethereum".to_string(),
                market_cap: 4.2e11,
                current_price: 3456.789,
                change_24h: 2.0,
                volume_24h: 1.5e10,
            },
            _ => MarketSnapshot {
                symbol: "btc".to_string(),
                name: "Bitcoin".to_string(),
                market_cap: 1.3e12,
                current_price: 67123.456,
                change_24h: -3.456,
                volume_24h: 3.0e10,
            },
        }
    }

    fn series_for(asset: Asset, range: RangeBucket) -> PriceSeries {
        let base = if asset == Asset::Ethereum { 3000.0 } else { 60000.0 };
        let n = if range == RangeBucket::Year { 5 } else { 3 };
        series(&(0..n).map(|i| base + i as f64).collect::<Vec<_>>())
    }

    #[async_trait]
    impl MarketDataApi for FakeApi {
        async fn fetch_snapshot(&self, asset: Asset) -> Result<MarketSnapshot, FetchError> {
            self.record(Call::Snapshot(asset));
            self.delay(asset).await;
            match &self.snapshot_error {
                Some(e) => Err(e.clone()),
                None => Ok(snapshot_for(asset)),
            }
        }

        async fn fetch_series(&self, asset: Asset, range: RangeBucket) -> Result<PriceSeries, FetchError> {
            self.record(Call::Series(asset, range));
            match &self.series_error {
                Some(e) => Err(e.clone()),
                None => Ok(series_for(asset, range)),
            }
        }
    }

    #[derive(Default)]
    struct ViewState {
        fields: HashMap<Field, FieldValue>,
        price_label: Option<String>,
    }

    #[derive(Clone, Default)]
    struct RecordingView {
        state: Arc<Mutex<ViewState>>,
    }

    impl RecordingView {
        fn text(&self, field: Field) -> String {
            self.state.lock().unwrap().fields.get(&field).map(|v| v.text.clone()).unwrap_or_default()
        }

        fn label(&self) -> Option<String> {
            self.state.lock().unwrap().price_label.clone()
        }
    }

    impl DashboardView for RecordingView {
        fn set_field(&mut self, field: Field, value: FieldValue) {
            self.state.lock().unwrap().fields.insert(field, value);
        }

        fn set_price_label(&mut self, label: String) {
            self.state.lock().unwrap().price_label = Some(label);
        }
    }

    struct Harness {
        api: Arc<FakeApi>,
        view: RecordingView,
        surface: RecordingSurface,
        commands: mpsc::Sender<PollerCommand>,
        task: JoinHandle<MarketDataPoller<RecordingView, RecordingSurface>>,
    }

    fn spawn_poller(api: FakeApi, selection: AssetSelection) -> Harness {
        let api = Arc::new(api);
        let view = RecordingView::default();
        let surface = RecordingSurface::default();
        let poller = MarketDataPoller::new(
            api.clone(),
            view.clone(),
            ChartController::new(surface.clone(), ChartStyle::default()),
            selection,
            DEFAULT_POLL_INTERVAL,
        );
        let (commands, rx) = mpsc::channel(8);
        let task = tokio::spawn(poller.run(rx));
        Harness {
            api,
            view,
            surface,
            commands,
            task,
        }
    }

    impl Harness {
        async fn stop(
            self,
        ) -> (Arc<FakeApi>, RecordingView, RecordingSurface, MarketDataPoller<RecordingView, RecordingSurface>) {
            self.commands.send(PollerCommand::Shutdown).await.unwrap();
            let poller = self.task.await.unwrap();
            (self.api, self.view, self.surface, poller)
        }
    }

    fn sleep(secs: u64) -> tokio::time::Sleep {
        tokio::time::sleep(Duration::from_secs(secs))
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_immediately_then_every_minute() {
        let harness = spawn_poller(FakeApi::new(), AssetSelection::default());
        sleep(150).await;
        let (api, _, _, _) = harness.stop().await;

        assert_eq!(api.snapshot_times(), vec![0, 60, 120]);
        let series_times: Vec<u64> = api
            .calls()
            .into_iter()
            .filter(|(_, c)| matches!(c, Call::Series(..)))
            .map(|(t, _)| t)
            .collect();
        assert_eq!(series_times, vec![0, 60, 120]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_updates_fields_and_chart() {
        let harness = spawn_poller(FakeApi::new(), AssetSelection::default());
        sleep(1).await;
        let (_, view, surface, poller) = harness.stop().await;

        assert_eq!(view.text(Field::MarketCap), "$1300.00B");
        assert_eq!(view.text(Field::Price), "$67,123.46");
        assert_eq!(view.text(Field::Change), "-3.46%");
        assert_eq!(view.text(Field::Volume), "$30.00B");
        assert_eq!(view.label().as_deref(), Some("BTC Price"));
        assert_eq!(surface.renders.lock().unwrap().len(), 1);
        assert!(matches!(poller.chart.state(), ChartState::Active(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_errors_fill_fields_and_skip_chart() {
        let cases = [
            (FetchError::HttpStatus { status: 500 }, "API Error"),
            (FetchError::Transport("connection refused".to_string()), "Connection Error"),
            (FetchError::InvalidResponseShape("missing market_data".to_string()), "Error loading"),
        ];

        for (error, expected) in cases {
            let mut api = FakeApi::new();
            api.snapshot_error = Some(error);
            let harness = spawn_poller(api, AssetSelection::default());
            sleep(1).await;
            let (api, view, surface, _) = harness.stop().await;

            for field in Field::ALL {
                assert_eq!(view.text(field), expected);
            }
            assert!(surface.renders.lock().unwrap().is_empty());
            assert!(api.calls().iter().all(|(_, c)| matches!(c, Call::Snapshot(_))));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_series_error_keeps_previous_chart() {
        let harness = spawn_poller(FakeApi::new(), AssetSelection::default());
        sleep(1).await;
        let (_, view, surface, mut poller) = harness.stop().await;
        let before = poller.chart.state().clone();

        poller.apply(FetchEvent::Series {
            generation: poller.generation,
            asset: Asset::Bitcoin,
            range: RangeBucket::Month,
            result: Err(FetchError::HttpStatus { status: 502 }),
        });

        assert_eq!(poller.chart.state(), &before);
        assert_eq!(surface.renders.lock().unwrap().len(), 1);
        assert_eq!(view.text(Field::Price), "$67,123.46");
    }

    #[tokio::test(start_paused = true)]
    async fn test_range_switch_changes_only_axis_and_data() {
        let selection = AssetSelection {
            asset: Asset::Bitcoin,
            range: RangeBucket::Week,
        };
        let harness = spawn_poller(FakeApi::new(), selection);
        sleep(1).await;
        harness.commands.send(PollerCommand::SelectRange(RangeBucket::Year)).await.unwrap();
        sleep(1).await;
        let (api, view, surface, poller) = harness.stop().await;

        let renders = surface.renders.lock().unwrap();
        assert_eq!(renders.len(), 2);
        assert_eq!(renders[0].axis_format, AxisLabelFormat::DayMonth);
        assert_eq!(renders[1].axis_format, AxisLabelFormat::MonthYear);
        assert_eq!(renders[0].title, "Bitcoin");
        assert_eq!(renders[1].title, "Bitcoin");
        assert_ne!(renders[0].series, renders[1].series);

        assert_eq!(poller.selection().asset, Asset::Bitcoin);
        assert_eq!(view.label().as_deref(), Some("BTC Price"));
        assert_eq!(
            api.calls().into_iter().map(|(_, c)| c).collect::<Vec<_>>(),
            vec![
                Call::Snapshot(Asset::Bitcoin),
                Call::Series(Asset::Bitcoin, RangeBucket::Week),
                Call::Series(Asset::Bitcoin, RangeBucket::Year),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_asset_switch_cancels_and_leaves_no_residue() {
        let mut api = FakeApi::new();
        api.latency.insert(Asset::Bitcoin, Duration::from_secs(10));
        let harness = spawn_poller(api, AssetSelection::default());

        sleep(1).await;
        harness.commands.send(PollerCommand::SelectAsset(Asset::Ethereum)).await.unwrap();
        sleep(20).await;
        let (api, view, surface, _) = harness.stop().await;

        assert_eq!(view.label().as_deref(), Some("ETH Price"));
        assert_eq!(view.text(Field::Price), "$3,456.79");
        assert_eq!(view.text(Field::Change), "+2.00%");

        let renders = surface.renders.lock().unwrap();
        assert_eq!(renders.len(), 1);
        assert_eq!(renders[0].title, "Ethereum");
        assert_eq!(renders[0].series, series_for(Asset::Ethereum, RangeBucket::Month));

        let calls: Vec<Call> = api.calls().into_iter().map(|(_, c)| c).collect();
        assert_eq!(
            calls,
            vec![
                Call::Snapshot(Asset::Bitcoin),
                Call::Snapshot(Asset::Ethereum),
                Call::Series(Asset::Ethereum, RangeBucket::Month),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_skipped_while_cycle_in_flight() {
        let mut api = FakeApi::new();
        api.latency.insert(Asset::Bitcoin, Duration::from_secs(90));
        let harness = spawn_poller(api, AssetSelection::default());

        sleep(200).await;
        let (api, _, _, _) = harness.stop().await;

        // 0 runs until 90, so 60 is skipped; 120 runs until 210, so 180 is skipped
        assert_eq!(api.snapshot_times(), vec![0, 120]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_events_are_ignored() {
        let harness = spawn_poller(FakeApi::new(), AssetSelection::default());
        sleep(1).await;
        let (_, view, _, mut poller) = harness.stop().await;

        poller.apply(FetchEvent::Snapshot {
            generation: poller.generation - 1,
            asset: Asset::Ethereum,
            result: Ok(snapshot_for(Asset::Ethereum)),
        });

        assert_eq!(view.label().as_deref(), Some("BTC Price"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_range_switch_during_snapshot_redoes_full_cycle() {
        let mut api = FakeApi::new();
        api.latency.insert(Asset::Bitcoin, Duration::from_secs(10));
        let harness = spawn_poller(api, AssetSelection::default());

        sleep(1).await;
        harness.commands.send(PollerCommand::SelectRange(RangeBucket::Quarter)).await.unwrap();
        sleep(30).await;
        let (api, view, _, _) = harness.stop().await;

        assert_eq!(view.text(Field::Price), "$67,123.46");
        assert_eq!(api.snapshot_times(), vec![0, 1]);
        assert!(api
            .calls()
            .iter()
            .any(|(_, c)| *c == Call::Series(Asset::Bitcoin, RangeBucket::Quarter)));
    }
}
