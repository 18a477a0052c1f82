//! VM security handlers

use axum::{
    extract::{Path, State},
    Json,
};
use hyperv_security::{expand_vm_securities, flatten_vm_securities, VmSecurity};
use tracing::info;

use crate::dto::{VmSecurityBlockDto, VmSecurityDto};
use crate::response::{security_error, ApiResponse, ApiResult};
use crate::SharedState;

pub async fn get_vm_security(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> ApiResult<VmSecurityDto> {
    let security = state.client.get(&name).await.map_err(security_error)?;
    Ok(Json(ApiResponse::success(security.into())))
}

pub async fn put_vm_security(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Json(req): Json<VmSecurityDto>,
) -> ApiResult<VmSecurityDto> {
    let desired = VmSecurity {
        vm_name: name.clone(),
        ..VmSecurity::from(req)
    };
    info!(vm = %name, tpm_enabled = desired.tpm_enabled, shielded = desired.shielded, "applying vm security");

    state
        .client
        .create_or_update(&name, &desired)
        .await
        .map_err(security_error)?;
    Ok(Json(ApiResponse::success(desired.into())))
}

pub async fn get_vm_security_block(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> ApiResult<VmSecurityBlockDto> {
    let securities = state.client.get_all(&name).await.map_err(security_error)?;
    Ok(Json(ApiResponse::success(VmSecurityBlockDto {
        vm_security: flatten_vm_securities(&securities),
    })))
}

pub async fn put_vm_security_block(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Json(req): Json<VmSecurityBlockDto>,
) -> ApiResult<VmSecurityBlockDto> {
    let securities = expand_vm_securities(req.vm_security.as_ref()).map_err(security_error)?;
    info!(vm = %name, count = securities.len(), "applying vm_security block");

    state
        .client
        .create_or_update_all(&name, &securities)
        .await
        .map_err(security_error)?;
    Ok(Json(ApiResponse::success(VmSecurityBlockDto {
        vm_security: flatten_vm_securities(&securities),
    })))
}
