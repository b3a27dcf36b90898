use std::{
    net::SocketAddr,
    sync::{Arc, OnceLock},
    time::{Duration, Instant},
};

use anyhow::Context;
use deskclock_common::{
    config::FEATURE_FLIP_DISPLAY,
    display::ANIMATION_POLL_MS,
    time::{fallback_time, DailyResync},
    ClimateSample, ClockStatus, DeskClock, DisplaySink, DisplayZones, RotatingZone,
    RuntimeConfig, SettableClock,
};
use tokio::{
    net::TcpListener,
    sync::{mpsc, watch, Mutex},
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use crate::{
    api, mqtt,
    sim::{ConsoleDisplay, SimulatedClimateSensor, SimulatedLightSensor, SystemClock},
    store::AppStore,
};

const SAMPLE_QUEUE_DEPTH: usize = 16;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<watch::Sender<RuntimeConfig>>,
    pub status: watch::Receiver<ClockStatus>,
    pub clock: SystemClock,
    pub store: AppStore,
    pub update_lock: Arc<Mutex<()>>,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = AppStore::from_env();
    let runtime = store.load().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config from store: {err:#}");
        RuntimeConfig::default()
    });

    let clock = SystemClock::new(runtime.time.offset());
    let desk = DeskClock::new(runtime.display.clone());

    let (status_tx, status_rx) = watch::channel(desk.status(&clock));
    let (config_tx, config_rx) = watch::channel(runtime);
    let config = Arc::new(config_tx);
    let (sample_tx, sample_rx) = mpsc::channel(SAMPLE_QUEUE_DEPTH);

    tokio::spawn(display_loop(
        desk,
        config_rx,
        clock.clone(),
        status_tx,
        sample_tx,
    ));
    tokio::spawn(mqtt::run(config.subscribe(), sample_rx));

    let app_state = AppState {
        config,
        status: status_rx,
        clock,
        store,
        update_lock: Arc::new(Mutex::new(())),
    };
    let app = api::router(app_state);

    let port = std::env::var("DESKCLOCK_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind settings server at {addr}"))?;

    info!("settings api listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("settings server failed")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn display_loop(
    mut desk: DeskClock,
    mut config: watch::Receiver<RuntimeConfig>,
    clock: SystemClock,
    status: watch::Sender<ClockStatus>,
    samples: mpsc::Sender<ClimateSample>,
) {
    let mut zones = DisplayZones::new(ConsoleDisplay::new("clock"), ConsoleDisplay::new("rotating"));
    let mut light = SimulatedLightSensor::new();
    let mut climate = SimulatedClimateSensor::new();

    let runtime = config.borrow_and_update().clone();
    zones
        .rotating
        .set_flipped(runtime.system.is_feature_enabled(FEATURE_FLIP_DISPLAY));
    let mut resync = startup(&mut zones.rotating, &clock, &runtime).await;

    let mut ticker = tokio::time::interval(Duration::from_millis(ANIMATION_POLL_MS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let now_ms = monotonic_ms();

        if config.has_changed().unwrap_or(false) {
            let runtime = config.borrow_and_update().clone();
            clock.set_offset(runtime.time.offset());
            zones
                .rotating
                .set_flipped(runtime.system.is_feature_enabled(FEATURE_FLIP_DISPLAY));
            desk.set_config(runtime.display);
        }

        if let Some(intensity) = desk.check_brightness(now_ms, &mut light, &mut zones) {
            debug!(?intensity, "display intensity");
        }

        if let Some(sample) = desk.check_climate(now_ms, &mut climate) {
            if let Err(err) = samples.try_send(sample) {
                debug!("dropping climate sample: {err}");
            }
        }

        if desk.check_clock_face(now_ms, &clock, &mut zones.clock).is_some() {
            zones.clock.until_rendered(pause).await;
        }

        if let Some(slot) = desk.check_rotation(now_ms, &clock, &mut zones.rotating) {
            debug!(slot = slot.as_str(), "rotation advanced");
            zones.rotating.until_rendered(pause).await;
        }

        daily_resync(&mut resync, &mut zones.rotating, &clock).await;

        status.send_replace(desk.status(&clock));
    }
}

async fn startup<S, K>(
    zone: &mut RotatingZone<S>,
    clock: &K,
    runtime: &RuntimeConfig,
) -> DailyResync
where
    S: DisplaySink,
    K: SettableClock,
{
    announce(zone, "Connecting to wifi...").await;
    announce(zone, "Time sync...").await;

    let resync = if clock.resync() {
        info!(timezone = %runtime.time.timezone_name, "time synchronized");
        announce(zone, "Done!").await;
        DailyResync::new(Some(clock.epoch_secs()))
    } else {
        warn!("time sync failed; set the time manually");
        announce(zone, "Set time manually").await;
        if !runtime.time.manual_time_set {
            clock.set_local(fallback_time(runtime.time.offset()));
        }
        DailyResync::default()
    };

    announce(zone, "Ready!").await;
    resync
}

async fn daily_resync<S, K>(
    resync: &mut DailyResync,
    zone: &mut RotatingZone<S>,
    clock: &K,
) -> bool
where
    S: DisplaySink,
    K: SettableClock,
{
    if !resync.due(&clock.now_local()) {
        return false;
    }
    info!("performing daily time sync");
    resync.mark_synced(clock.epoch_secs());
    announce(zone, "Daily Time Sync...").await;
    if !clock.resync() {
        warn!("host clock is not synced; keeping current time");
    }
    true
}

async fn announce<S: DisplaySink>(zone: &mut RotatingZone<S>, message: &str) {
    info!("{message}");
    zone.show_message(message);
    zone.until_rendered(pause).await;
}

fn pause() -> tokio::time::Sleep {
    tokio::time::sleep(Duration::from_millis(ANIMATION_POLL_MS))
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use chrono::{DateTime, FixedOffset, TimeZone};
    use deskclock_common::{time::RESYNC_MIN_GAP_SECS, ClockProvider, Intensity, RenderRequest};
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Default)]
    struct ScriptSink {
        texts: Vec<String>,
        polls: u32,
        pending: u32,
    }

    impl DisplaySink for ScriptSink {
        fn clear(&mut self) {}

        fn render(&mut self, request: &RenderRequest) {
            self.texts.push(request.text.clone());
            self.pending = 2;
        }

        fn animate(&mut self) -> bool {
            self.polls += 1;
            self.pending = self.pending.saturating_sub(1);
            self.pending == 0
        }

        fn set_intensity(&mut self, _intensity: Intensity) {}

        fn set_flipped(&mut self, _flipped: bool) {}
    }

    struct FakeClock {
        now: Cell<DateTime<FixedOffset>>,
        synced: bool,
        set_to: RefCell<Vec<DateTime<FixedOffset>>>,
        resyncs: Cell<u32>,
    }

    impl FakeClock {
        fn at(hour: u32, synced: bool) -> Self {
            let offset = FixedOffset::east_opt(19_800).unwrap();
            Self {
                now: Cell::new(offset.with_ymd_and_hms(2024, 10, 5, hour, 10, 0).unwrap()),
                synced,
                set_to: RefCell::new(Vec::new()),
                resyncs: Cell::new(0),
            }
        }
    }

    impl ClockProvider for FakeClock {
        fn now_local(&self) -> DateTime<FixedOffset> {
            self.now.get()
        }
    }

    impl SettableClock for FakeClock {
        fn resync(&self) -> bool {
            self.resyncs.set(self.resyncs.get() + 1);
            self.synced
        }

        fn set_local(&self, local: DateTime<FixedOffset>) {
            self.set_to.borrow_mut().push(local);
            self.now.set(local);
        }
    }

    fn texts(zone: &RotatingZone<ScriptSink>) -> Vec<&str> {
        zone.sink().texts.iter().map(String::as_str).collect()
    }

    #[tokio::test]
    async fn startup_announces_each_stage_in_order() {
        let mut zone = RotatingZone::new(ScriptSink::default());
        let clock = FakeClock::at(3, true);

        let resync = startup(&mut zone, &clock, &RuntimeConfig::default()).await;

        assert_eq!(
            texts(&zone),
            vec!["Connecting to wifi...", "Time sync...", "Done!", "Ready!"]
        );
        // Every message is waited on until its frame completes.
        assert_eq!(zone.sink().polls, 8);
        assert!(clock.set_to.borrow().is_empty());
        assert!(!resync.due(&clock.now_local()));
    }

    #[tokio::test]
    async fn failed_sync_falls_back_to_new_year() {
        let mut zone = RotatingZone::new(ScriptSink::default());
        let clock = FakeClock::at(12, false);
        let runtime = RuntimeConfig::default();

        startup(&mut zone, &clock, &runtime).await;

        assert_eq!(
            texts(&zone),
            vec![
                "Connecting to wifi...",
                "Time sync...",
                "Set time manually",
                "Ready!"
            ]
        );
        assert_eq!(
            *clock.set_to.borrow(),
            vec![fallback_time(runtime.time.offset())]
        );
    }

    #[tokio::test]
    async fn failed_sync_keeps_manually_set_time() {
        let mut zone = RotatingZone::new(ScriptSink::default());
        let clock = FakeClock::at(12, false);
        let mut runtime = RuntimeConfig::default();
        runtime.time.manual_time_set = true;

        startup(&mut zone, &clock, &runtime).await;

        assert!(texts(&zone).contains(&"Set time manually"));
        assert!(clock.set_to.borrow().is_empty());
    }

    #[tokio::test]
    async fn daily_resync_runs_once_in_the_window() {
        let mut zone = RotatingZone::new(ScriptSink::default());
        let clock = FakeClock::at(3, true);
        let mut resync = DailyResync::default();

        assert!(daily_resync(&mut resync, &mut zone, &clock).await);
        assert_eq!(texts(&zone), vec!["Daily Time Sync..."]);
        assert_eq!(zone.sink().polls, 2);
        assert_eq!(clock.resyncs.get(), 1);

        assert!(!daily_resync(&mut resync, &mut zone, &clock).await);
        assert_eq!(clock.resyncs.get(), 1);

        clock
            .now
            .set(clock.now_local() + chrono::Duration::seconds(RESYNC_MIN_GAP_SECS + 1));
        assert!(!daily_resync(&mut resync, &mut zone, &clock).await);
    }

    #[tokio::test]
    async fn daily_resync_waits_for_the_window() {
        let mut zone = RotatingZone::new(ScriptSink::default());
        let clock = FakeClock::at(14, true);
        let mut resync = DailyResync::default();

        assert!(!daily_resync(&mut resync, &mut zone, &clock).await);
        assert!(texts(&zone).is_empty());
        assert_eq!(clock.resyncs.get(), 0);
    }
}
