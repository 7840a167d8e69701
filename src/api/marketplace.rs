use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::error::MarketError;
use crate::types::{
    ActivityQueryParams, AppraiseRequest, ErrorResponse, HistoricalSalesParams, OffersQueryParams,
    StatsResponse, TokenStatsParams, TxChainRequest, TxRequest,
};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/marketplace/list", post(list))
        .route("/marketplace/buy", post(buy))
        .route("/marketplace/offer", post(offer))
        .route("/marketplace/cancel-offer", post(cancel_offer))
        .route("/marketplace/approve-offer", post(approve_offer))
        .route("/marketplace/cancel-listing", post(cancel_listing))
        .route("/marketplace/token/list", post(list_token))
        .route("/marketplace/token/buy", post(buy_token))
        .route("/marketplace/token/offer", post(offer_token))
        .route("/marketplace/token/cancel-offer", post(cancel_token_offer))
        .route("/marketplace/token/approve-offer", post(approve_token_offer))
        .route("/marketplace/token/cancel-listing", post(cancel_token_listing))
        .route("/marketplace/listing/{fid}", get(get_listing))
        .route(
            "/marketplace/token/listing/{chain_id}/{token_id}",
            get(get_token_listing),
        )
        .route("/marketplace/best-offer/{fid}", get(get_best_offer))
        .route(
            "/marketplace/token/best-offer/{chain_id}/{token_id}",
            get(get_best_token_offer),
        )
        .route("/marketplace/offers", get(get_offers))
        .route("/marketplace/offer/{fid}/{buyer}", get(get_offer))
        .route("/marketplace/activity", get(get_activities))
        .route("/marketplace/stats", get(get_stats))
        .route("/marketplace/token/stats/{chain_id}", get(get_token_stats))
        .route("/marketplace/appraisal/{fid}", get(get_appraisal))
        .route("/marketplace/appraise", post(appraise))
        .route("/marketplace/historical-sales", get(get_historical_sales))
}

fn map_err(e: MarketError) -> (StatusCode, Json<ErrorResponse>) {
    let status = e.status();
    if status.is_server_error() {
        tracing::error!("Marketplace error: {:?}", e);
    }
    (
        status,
        Json(ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message: e.to_string(),
            status: status.as_u16(),
        }),
    )
}

fn not_found(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Not Found".to_string(),
            message: message.to_string(),
            status: 404,
        }),
    )
}

/// POST /api/marketplace/list
async fn list(
    State(state): State<AppState>,
    Json(req): Json<TxRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let listing = state.market.list(&req.tx_hash).await.map_err(map_err)?;
    Ok(Json(listing))
}

/// POST /api/marketplace/buy
async fn buy(
    State(state): State<AppState>,
    Json(req): Json<TxRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let entry = state.market.buy(&req.tx_hash).await.map_err(map_err)?;
    Ok(Json(entry))
}

/// POST /api/marketplace/offer
async fn offer(
    State(state): State<AppState>,
    Json(req): Json<TxRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let entry = state.market.offer(&req.tx_hash).await.map_err(map_err)?;
    Ok(Json(entry))
}

/// POST /api/marketplace/cancel-offer
async fn cancel_offer(
    State(state): State<AppState>,
    Json(req): Json<TxRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let entry = state
        .market
        .cancel_offer(&req.tx_hash)
        .await
        .map_err(map_err)?;
    Ok(Json(entry))
}

/// POST /api/marketplace/approve-offer
async fn approve_offer(
    State(state): State<AppState>,
    Json(req): Json<TxRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let entry = state
        .market
        .approve_offer(&req.tx_hash)
        .await
        .map_err(map_err)?;
    Ok(Json(entry))
}

/// POST /api/marketplace/cancel-listing
async fn cancel_listing(
    State(state): State<AppState>,
    Json(req): Json<TxRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let entry = state
        .market
        .cancel_listing(&req.tx_hash)
        .await
        .map_err(map_err)?;
    Ok(Json(entry))
}

/// POST /api/marketplace/token/list
async fn list_token(
    State(state): State<AppState>,
    Json(req): Json<TxChainRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let listing = state
        .market
        .list_token(&req.tx_hash, req.chain_id)
        .await
        .map_err(map_err)?;
    Ok(Json(listing))
}

/// POST /api/marketplace/token/buy
async fn buy_token(
    State(state): State<AppState>,
    Json(req): Json<TxChainRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let entry = state
        .market
        .buy_token(&req.tx_hash, req.chain_id)
        .await
        .map_err(map_err)?;
    Ok(Json(entry))
}

/// POST /api/marketplace/token/offer
async fn offer_token(
    State(state): State<AppState>,
    Json(req): Json<TxChainRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let entry = state
        .market
        .offer_token(&req.tx_hash, req.chain_id)
        .await
        .map_err(map_err)?;
    Ok(Json(entry))
}

/// POST /api/marketplace/token/cancel-offer
async fn cancel_token_offer(
    State(state): State<AppState>,
    Json(req): Json<TxChainRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let entry = state
        .market
        .cancel_token_offer(&req.tx_hash, req.chain_id)
        .await
        .map_err(map_err)?;
    Ok(Json(entry))
}

/// POST /api/marketplace/token/approve-offer
async fn approve_token_offer(
    State(state): State<AppState>,
    Json(req): Json<TxChainRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let entry = state
        .market
        .approve_token_offer(&req.tx_hash, req.chain_id)
        .await
        .map_err(map_err)?;
    Ok(Json(entry))
}

/// POST /api/marketplace/token/cancel-listing
async fn cancel_token_listing(
    State(state): State<AppState>,
    Json(req): Json<TxChainRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let entry = state
        .market
        .cancel_token_listing(&req.tx_hash, req.chain_id)
        .await
        .map_err(map_err)?;
    Ok(Json(entry))
}

/// GET /api/marketplace/listing/:fid
async fn get_listing(
    State(state): State<AppState>,
    Path(fid): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    match state.market.get_listing(fid).await.map_err(map_err)? {
        Some(listing) => Ok(Json(listing)),
        None => Err(not_found("FID not listed")),
    }
}

/// GET /api/marketplace/token/listing/:chainId/:tokenId
async fn get_token_listing(
    State(state): State<AppState>,
    Path((chain_id, token_id)): Path<(i32, String)>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    match state
        .market
        .get_token_listing(&token_id, chain_id)
        .await
        .map_err(map_err)?
    {
        Some(listing) => Ok(Json(listing)),
        None => Err(not_found("Token not listed")),
    }
}

/// GET /api/marketplace/best-offer/:fid
async fn get_best_offer(
    State(state): State<AppState>,
    Path(fid): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    match state.market.get_best_offer(fid).await.map_err(map_err)? {
        Some(offer) => Ok(Json(offer)),
        None => Err(not_found("FID not offered")),
    }
}

/// GET /api/marketplace/token/best-offer/:chainId/:tokenId
async fn get_best_token_offer(
    State(state): State<AppState>,
    Path((chain_id, token_id)): Path<(i32, String)>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    match state
        .market
        .get_best_token_offer(&token_id, chain_id)
        .await
        .map_err(map_err)?
    {
        Some(offer) => Ok(Json(offer)),
        None => Err(not_found("Token not offered")),
    }
}

/// GET /api/marketplace/offers
async fn get_offers(
    State(state): State<AppState>,
    Query(params): Query<OffersQueryParams>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let offers = state.market.get_offers(&params).await.map_err(map_err)?;
    Ok(Json(offers))
}

/// GET /api/marketplace/offer/:fid/:buyer
async fn get_offer(
    State(state): State<AppState>,
    Path((fid, buyer)): Path<(i64, String)>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    match state
        .market
        .get_offer(fid, &buyer)
        .await
        .map_err(map_err)?
    {
        Some(offer) => Ok(Json(offer)),
        None => Err(not_found("FID not offered")),
    }
}

/// GET /api/marketplace/activity
async fn get_activities(
    State(state): State<AppState>,
    Query(params): Query<ActivityQueryParams>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let page = state
        .market
        .get_activities(&params)
        .await
        .map_err(map_err)?;
    Ok(Json(page))
}

/// GET /api/marketplace/stats
async fn get_stats(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let stats = state.market.get_stats().await.map_err(map_err)?;
    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}

/// GET /api/marketplace/token/stats/:chainId
async fn get_token_stats(
    State(state): State<AppState>,
    Path(chain_id): Path<i32>,
    Query(params): Query<TokenStatsParams>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let stats = state
        .market
        .get_token_stats(chain_id, params.token_id)
        .await
        .map_err(map_err)?;
    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}

/// GET /api/marketplace/appraisal/:fid
async fn get_appraisal(
    State(state): State<AppState>,
    Path(fid): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let value = state.market.get_appraisal(fid).await.map_err(map_err)?;
    Ok(Json(value))
}

/// POST /api/marketplace/appraise
async fn appraise(
    State(state): State<AppState>,
    Json(req): Json<AppraiseRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let row = state.market.appraise(&req).await.map_err(map_err)?;
    Ok(Json(row))
}

/// GET /api/marketplace/historical-sales
async fn get_historical_sales(
    State(state): State<AppState>,
    Query(params): Query<HistoricalSalesParams>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let points = state
        .market
        .get_historical_sales(&params)
        .await
        .map_err(map_err)?;
    Ok(Json(points))
}
