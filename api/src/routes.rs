//! Route definitions

use axum::{routing::get, Router};

use crate::handlers::*;
use crate::SharedState;

pub fn hyperv_routes() -> Router<SharedState> {
    Router::new()
        // VM security
        .route(
            "/vms/{name}/security",
            get(get_vm_security).put(put_vm_security),
        )
        .route(
            "/vms/{name}/security/block",
            get(get_vm_security_block).put(put_vm_security_block),
        )
}
