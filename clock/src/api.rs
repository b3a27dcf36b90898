use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use deskclock_common::{
    config::{MAX_CALIBRATION_DELTA, MAX_INTENSITY, MAX_SLOT_DURATION_SECS},
    ClockProvider, DeviceConfig, DisplayConfig, FirmwareConfig, ManualTime, MqttConfig,
    RuntimeConfig, SettableClock, SystemCommandConfig, TimeConfig,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::host::AppState;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct MqttConfigView {
    server: String,
    port: u16,
    user: String,
    #[serde(rename = "passwordSet")]
    password_set: bool,
}

#[derive(Debug, Serialize)]
struct ConfigView {
    display: DisplayConfig,
    time: TimeConfig,
    mqtt: MqttConfigView,
    device: DeviceConfig,
    system: SystemCommandConfig,
    firmware: FirmwareConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DisplayUpdate {
    use_24h_format: Option<bool>,
    use_celsius: Option<bool>,
    date_duration: Option<u8>,
    temp_duration: Option<u8>,
    humidity_duration: Option<u8>,
    auto_brightness: Option<bool>,
    min_brightness: Option<u8>,
    max_brightness: Option<u8>,
    man_brightness: Option<u8>,
    temp_delta: Option<f32>,
    humidity_delta: Option<f32>,
}

#[derive(Debug, Serialize)]
struct TimeStatus {
    #[serde(rename = "timeSynced")]
    time_synced: bool,
    timezone: String,
    #[serde(rename = "offsetSecs")]
    offset_secs: i32,
    #[serde(rename = "nowEpoch")]
    now_epoch: i64,
    local: String,
    #[serde(rename = "manualTimeSet")]
    manual_time_set: bool,
    #[serde(rename = "lastManualSet")]
    last_manual_set: i64,
}

#[derive(Debug, Deserialize)]
struct TimezoneUpdate {
    timezone_offset_secs: i32,
    timezone_name: String,
}

#[derive(Debug, Deserialize)]
struct MqttUpdate {
    server: String,
    port: u16,
    #[serde(default)]
    user: String,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeviceUpdate {
    hostname: String,
}

#[derive(Debug, Deserialize)]
struct SystemUpdate {
    command: String,
}

#[derive(Debug, Deserialize)]
struct FirmwareUpdate {
    update_url: String,
}

#[derive(Debug, Serialize)]
struct FirmwareStatus {
    update_url: String,
    supported: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(handle_get_status))
        .route("/api/config", get(handle_get_config))
        .route("/api/display", put(handle_put_display))
        .route("/api/time", get(handle_get_time))
        .route("/api/time/zone", put(handle_put_timezone))
        .route("/api/time/manual", post(handle_post_manual_time))
        .route("/api/mqtt", put(handle_put_mqtt))
        .route("/api/device", put(handle_put_device))
        .route("/api/system", put(handle_put_system))
        .route(
            "/api/firmware",
            get(handle_get_firmware).put(handle_put_firmware),
        )
        .route("/api/firmware/apply", post(handle_post_firmware_apply))
        .route("/api/reset", post(handle_post_reset))
        .with_state(state)
}

async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.status.borrow().clone();
    Json(status)
}

async fn handle_get_config(State(state): State<AppState>) -> impl IntoResponse {
    let runtime = state.config.borrow().clone();
    Json(build_config_view(runtime))
}

async fn handle_put_display(
    State(state): State<AppState>,
    Json(update): Json<DisplayUpdate>,
) -> Response {
    if let Err(message) = validate_display_update(&update) {
        return error_response(StatusCode::BAD_REQUEST, message);
    }

    match update_runtime(&state, |runtime| {
        apply_display_update(&mut runtime.display, update);
        Ok(())
    })
    .await
    {
        Ok(runtime) => Json(runtime.display).into_response(),
        Err(response) => response,
    }
}

async fn handle_get_time(State(state): State<AppState>) -> impl IntoResponse {
    let runtime = state.config.borrow().clone();
    Json(build_time_status(&state, &runtime.time))
}

async fn handle_put_timezone(
    State(state): State<AppState>,
    Json(update): Json<TimezoneUpdate>,
) -> Response {
    let result = update_runtime(&state, |runtime| {
        runtime
            .time
            .set_timezone(update.timezone_offset_secs, &update.timezone_name)
            .map_err(|err| err.to_string())
    })
    .await;

    match result {
        Ok(runtime) => {
            state.clock.set_offset(runtime.time.offset());
            info!(
                timezone = %runtime.time.timezone_name,
                offset = runtime.time.timezone_offset_secs,
                "timezone updated"
            );
            Json(build_time_status(&state, &runtime.time)).into_response()
        }
        Err(response) => response,
    }
}

async fn handle_post_manual_time(
    State(state): State<AppState>,
    Json(manual): Json<ManualTime>,
) -> Response {
    let local = match manual.to_local(state.clock.offset()) {
        Ok(local) => local,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    };

    let result = update_runtime(&state, |runtime| {
        runtime.time.manual_time_set = true;
        runtime.time.last_manual_set = local.timestamp();
        Ok(())
    })
    .await;

    match result {
        Ok(runtime) => {
            state.clock.set_local(local);
            info!("time manually set to {}", local.format("%Y-%m-%d %I:%M %p"));
            Json(build_time_status(&state, &runtime.time)).into_response()
        }
        Err(response) => response,
    }
}

async fn handle_put_mqtt(State(state): State<AppState>, Json(update): Json<MqttUpdate>) -> Response {
    if let Err(message) = validate_mqtt_update(&update) {
        return error_response(StatusCode::BAD_REQUEST, message);
    }

    let result = update_runtime(&state, |runtime| {
        runtime.mqtt.server = update.server.trim().to_string();
        runtime.mqtt.port = update.port;
        runtime.mqtt.user = update.user;
        if let Some(password) = update.password {
            runtime.mqtt.password = password;
        }
        Ok(())
    })
    .await;

    match result {
        Ok(runtime) => Json(build_mqtt_view(&runtime.mqtt)).into_response(),
        Err(response) => response,
    }
}

async fn handle_put_device(
    State(state): State<AppState>,
    Json(update): Json<DeviceUpdate>,
) -> Response {
    let result = update_runtime(&state, |runtime| {
        runtime
            .device
            .set_hostname(&update.hostname)
            .map_err(|err| err.to_string())
    })
    .await;

    match result {
        Ok(runtime) => Json(runtime.device).into_response(),
        Err(response) => response,
    }
}

async fn handle_put_system(
    State(state): State<AppState>,
    Json(update): Json<SystemUpdate>,
) -> Response {
    let result = update_runtime(&state, |runtime| {
        runtime
            .system
            .set_command(&update.command)
            .map_err(|err| err.to_string())
    })
    .await;

    match result {
        Ok(runtime) => Json(runtime.system).into_response(),
        Err(response) => response,
    }
}

async fn handle_get_firmware(State(state): State<AppState>) -> impl IntoResponse {
    let runtime = state.config.borrow().clone();
    Json(build_firmware_status(&runtime.firmware))
}

async fn handle_put_firmware(
    State(state): State<AppState>,
    Json(update): Json<FirmwareUpdate>,
) -> Response {
    if let Err(message) = validate_update_url(&update.update_url) {
        return error_response(StatusCode::BAD_REQUEST, message);
    }

    let result = update_runtime(&state, |runtime| {
        runtime.firmware.update_url = update.update_url.trim().to_string();
        Ok(())
    })
    .await;

    match result {
        Ok(runtime) => Json(build_firmware_status(&runtime.firmware)).into_response(),
        Err(response) => response,
    }
}

async fn handle_post_firmware_apply() -> Response {
    error_response(
        StatusCode::NOT_IMPLEMENTED,
        "Firmware updates are only available on the device",
    )
}

async fn handle_post_reset(State(state): State<AppState>) -> Response {
    let _guard = state.update_lock.lock().await;
    if let Err(err) = state.store.clear().await {
        warn!("failed to erase stored config: {err:#}");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to erase stored settings",
        );
    }

    let runtime = RuntimeConfig::default();
    state.clock.set_offset(runtime.time.offset());
    state.clock.clear_adjustment();
    state.config.send_replace(runtime.clone());
    info!("configuration reset to defaults");

    Json(build_config_view(runtime)).into_response()
}

/// Applies `edit` to a copy of the live config, persists it and only then
/// publishes it to the display and MQTT tasks.
async fn update_runtime<F>(state: &AppState, edit: F) -> Result<RuntimeConfig, Response>
where
    F: FnOnce(&mut RuntimeConfig) -> Result<(), String>,
{
    let _guard = state.update_lock.lock().await;
    let mut runtime = state.config.borrow().clone();

    edit(&mut runtime).map_err(|message| error_response(StatusCode::BAD_REQUEST, &message))?;
    runtime.sanitize();

    if let Err(err) = state.store.save(&runtime).await {
        warn!("failed to persist runtime config: {err:#}");
        return Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to persist runtime settings",
        ));
    }

    state.config.send_replace(runtime.clone());
    Ok(runtime)
}

fn apply_display_update(display: &mut DisplayConfig, update: DisplayUpdate) {
    let DisplayUpdate {
        use_24h_format,
        use_celsius,
        date_duration,
        temp_duration,
        humidity_duration,
        auto_brightness,
        min_brightness,
        max_brightness,
        man_brightness,
        temp_delta,
        humidity_delta,
    } = update;

    if let Some(value) = use_24h_format {
        display.use_24h_format = value;
    }
    if let Some(value) = use_celsius {
        display.use_celsius = value;
    }
    if let Some(value) = date_duration {
        display.date_duration = value;
    }
    if let Some(value) = temp_duration {
        display.temp_duration = value;
    }
    if let Some(value) = humidity_duration {
        display.humidity_duration = value;
    }
    if let Some(value) = auto_brightness {
        display.auto_brightness = value;
    }
    if let Some(value) = min_brightness {
        display.min_brightness = value;
    }
    if let Some(value) = max_brightness {
        display.max_brightness = value;
    }
    if let Some(value) = man_brightness {
        display.man_brightness = value;
    }
    if let Some(value) = temp_delta {
        display.temp_delta = value;
    }
    if let Some(value) = humidity_delta {
        display.humidity_delta = value;
    }
}

fn validate_display_update(update: &DisplayUpdate) -> Result<(), &'static str> {
    let durations = [
        update.date_duration,
        update.temp_duration,
        update.humidity_duration,
    ];
    if durations
        .into_iter()
        .flatten()
        .any(|secs| secs > MAX_SLOT_DURATION_SECS)
    {
        return Err("durations must be between 0 and 60 seconds");
    }

    let levels = [
        update.min_brightness,
        update.max_brightness,
        update.man_brightness,
    ];
    if levels
        .into_iter()
        .flatten()
        .any(|level| level > MAX_INTENSITY)
    {
        return Err("brightness must be between 0 and 15");
    }

    let deltas = [update.temp_delta, update.humidity_delta];
    if deltas
        .into_iter()
        .flatten()
        .any(|delta| !delta.is_finite() || delta.abs() > MAX_CALIBRATION_DELTA)
    {
        return Err("calibration deltas must be between -20 and 20");
    }

    Ok(())
}

fn validate_mqtt_update(update: &MqttUpdate) -> Result<(), &'static str> {
    if update.port == 0 {
        return Err("port must be between 1 and 65535");
    }
    if update.server.trim().contains(char::is_whitespace) {
        return Err("server cannot contain spaces");
    }
    Ok(())
}

fn validate_update_url(url: &str) -> Result<(), &'static str> {
    let url = url.trim();
    if url.is_empty() || url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err("update_url must start with http:// or https://")
    }
}

fn build_config_view(runtime: RuntimeConfig) -> ConfigView {
    ConfigView {
        mqtt: build_mqtt_view(&runtime.mqtt),
        display: runtime.display,
        time: runtime.time,
        device: runtime.device,
        system: runtime.system,
        firmware: runtime.firmware,
    }
}

fn build_mqtt_view(mqtt: &MqttConfig) -> MqttConfigView {
    MqttConfigView {
        server: mqtt.server.clone(),
        port: mqtt.port,
        user: mqtt.user.clone(),
        password_set: !mqtt.password.is_empty(),
    }
}

fn build_time_status(state: &AppState, time: &TimeConfig) -> TimeStatus {
    let now = state.clock.now_local();
    TimeStatus {
        time_synced: deskclock_common::time::is_synced_epoch(now.timestamp()),
        timezone: time.timezone_name.clone(),
        offset_secs: time.timezone_offset_secs,
        now_epoch: now.timestamp(),
        local: now.to_rfc3339(),
        manual_time_set: time.manual_time_set,
        last_manual_set: time.last_manual_set,
    }
}

fn build_firmware_status(firmware: &FirmwareConfig) -> FirmwareStatus {
    FirmwareStatus {
        update_url: firmware.update_url.clone(),
        supported: false,
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
