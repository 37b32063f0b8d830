//! Device trust endpoints.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use lanwarden_core::error::ValidationError;
use lanwarden_core::types::{MacAddr, TrustAction, TrustState};
use lanwarden_storage::DeviceStats;

use super::{ApiResult, AppState, MessageBody, blocking, message, required, required_mac};

#[derive(Debug, Deserialize)]
pub struct UpdateDeviceRequest {
    #[serde(default)]
    pub eth_src: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
}

impl UpdateDeviceRequest {
    fn validate(self) -> Result<(MacAddr, TrustAction), ValidationError> {
        let mac = required_mac(self.eth_src, "eth_src")?;
        let action = TrustAction::parse(&required(self.action, "action")?)?;
        Ok((mac, action))
    }
}

/// Body of `/block-device` and `/unblock-device`.
#[derive(Debug, Deserialize)]
pub struct MacAddressRequest {
    #[serde(default, rename = "macAddress")]
    pub mac_address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DevicesQuery {
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DevicesBody {
    pub devices: Vec<MacAddr>,
}

async fn apply(state: &AppState, mac: MacAddr, action: TrustAction) -> ApiResult<()> {
    let trust = state.trust.clone();
    blocking(move || Ok(trust.apply(&mac, action)?)).await
}

async fn list(state: &AppState, category: TrustState) -> ApiResult<Vec<MacAddr>> {
    let trust = state.trust.clone();
    blocking(move || Ok(trust.list(category)?)).await
}

/// `POST /update_device {eth_src, action}`
pub async fn update_device(
    State(state): State<AppState>,
    payload: Result<Json<UpdateDeviceRequest>, JsonRejection>,
) -> ApiResult<Json<MessageBody>> {
    let Json(request) = payload?;
    let (mac, action) = request.validate()?;

    apply(&state, mac, action).await?;
    Ok(message(format!(
        "Device {mac} has been {}.",
        action.past_tense()
    )))
}

/// `GET /get_devices?category=trusted|blocked|unknown`
pub async fn get_devices(
    State(state): State<AppState>,
    query: Result<Query<DevicesQuery>, QueryRejection>,
) -> ApiResult<Json<DevicesBody>> {
    let Query(query) = query?;
    let category = TrustState::from_category(&required(query.category, "category")?)?;

    let devices = list(&state, category).await?;
    Ok(Json(DevicesBody { devices }))
}

/// `GET /device_stats`
pub async fn device_stats(State(state): State<AppState>) -> ApiResult<Json<DeviceStats>> {
    let trust = state.trust.clone();
    let stats = blocking(move || Ok(trust.stats()?)).await?;
    Ok(Json(stats))
}

/// `GET /get_blocked_devices` (bare array of addresses)
pub async fn get_blocked_devices(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<MacAddr>>> {
    Ok(Json(list(&state, TrustState::Blocked).await?))
}

/// `POST /block-device {macAddress}`
pub async fn block_device(
    State(state): State<AppState>,
    payload: Result<Json<MacAddressRequest>, JsonRejection>,
) -> ApiResult<Json<MessageBody>> {
    let Json(request) = payload?;
    let mac = required_mac(request.mac_address, "macAddress")?;

    apply(&state, mac, TrustAction::Block).await?;
    Ok(message(format!("Device {mac} has been blocked.")))
}

/// `POST /unblock-device {macAddress}`
///
/// Unblocking moves the device into the trusted set.
pub async fn unblock_device(
    State(state): State<AppState>,
    payload: Result<Json<MacAddressRequest>, JsonRejection>,
) -> ApiResult<Json<MessageBody>> {
    let Json(request) = payload?;
    let mac = required_mac(request.mac_address, "macAddress")?;

    apply(&state, mac, TrustAction::Trust).await?;
    Ok(message(format!("Device {mac} has been moved to Trusted devices.")))
}
