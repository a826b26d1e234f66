/// Current account endpoint
///
/// `GET /api/auth/user` returns the account bound to the caller's identity
/// token. The first call for an identity provisions the account, joining it
/// to the default organization as `admin`.

use crate::{
    app::AppState,
    error::ApiResult,
    routes::ApiResponse,
};
use axum::{extract::State, Extension, Json};
use kasir_shared::{
    auth::middleware::AuthContext, models::account::Account, provisioning::provision_account,
};

/// Returns (and on first sight creates) the caller's account
pub async fn current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ApiResponse<Account>>> {
    let provisioned = provision_account(state.store.as_ref(), &auth.external_id).await?;

    let response = if provisioned.created {
        ApiResponse::with_message("Account provisioned", provisioned.account)
    } else {
        ApiResponse::ok(provisioned.account)
    };

    Ok(Json(response))
}
