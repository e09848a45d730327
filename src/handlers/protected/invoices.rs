use axum::{
    http::header,
    response::{IntoResponse, Response},
    Extension,
};

use crate::database::models::{Invoice, NewInvoice, StatusChange};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, AuthUser};
use crate::services::invoice_service::PixCode;
use crate::services::{CreatedInvoice, InvoiceDetail, InvoiceService};

/// GET /api/invoices
pub async fn list(Extension(auth): Extension<AuthUser>) -> ApiResult<Vec<Invoice>> {
    let invoices = InvoiceService::new().await?.list(auth.id).await?;
    Ok(ApiResponse::success(invoices))
}

/// POST /api/invoices - bills the given time entries
pub async fn post(Extension(auth): Extension<AuthUser>, ApiJson(body): ApiJson<NewInvoice>) -> ApiResult<CreatedInvoice> {
    let created = InvoiceService::new().await?.create(auth.id, body).await?;
    Ok(ApiResponse::created(created))
}

/// GET /api/invoices/:id - invoice with its line items
pub async fn get(Extension(auth): Extension<AuthUser>, ApiPath(id): ApiPath<i64>) -> ApiResult<InvoiceDetail> {
    let detail = InvoiceService::new().await?.detail(auth.id, id).await?;
    Ok(ApiResponse::success(detail))
}

/// PATCH /api/invoices/:id/status
pub async fn patch_status(
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<StatusChange>,
) -> ApiResult<Invoice> {
    let invoice = InvoiceService::new().await?.set_status(auth.id, id, body.status).await?;
    Ok(ApiResponse::success(invoice))
}

/// GET /api/invoices/:id/pix
pub async fn pix(Extension(auth): Extension<AuthUser>, ApiPath(id): ApiPath<i64>) -> ApiResult<PixCode> {
    let code = InvoiceService::new().await?.pix(auth.id, id).await?;
    Ok(ApiResponse::success(code))
}

/// GET /api/invoices/:id/document - raw Markdown, not wrapped in the envelope
pub async fn document(Extension(auth): Extension<AuthUser>, ApiPath(id): ApiPath<i64>) -> Result<Response, ApiError> {
    let markdown = InvoiceService::new().await?.document(auth.id, id).await?;
    Ok(([(header::CONTENT_TYPE, "text/markdown; charset=utf-8")], markdown).into_response())
}
