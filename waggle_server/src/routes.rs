//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go into a separate
//! module. Keep this module neat and tidy 🙏
//!
//! Handlers are generic over the engine's collaborator traits and instantiated with the concrete production types
//! (or test doubles) at registration time in [`crate::server`]. The acting participant's role arrives in the
//! `wgl-role` header, injected by the authenticating gateway in front of this service.
use std::str::FromStr;

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use waggle_engine::{
    db_types::{EngagementId, NewParticipant, QuoteId, Role},
    EngagementFlowApi,
    MarketplaceDatabase,
    PaymentProcessor,
    PushGateway,
};

use crate::{data_objects::QuoteRequest, errors::ServerError};

/// Registers every route against concrete collaborator types. The server instantiates this with the production
/// stack; endpoint tests instantiate it with doubles.
pub fn configure<B, P, N>(cfg: &mut web::ServiceConfig)
where
    B: MarketplaceDatabase + 'static,
    P: PaymentProcessor + 'static,
    N: PushGateway + 'static,
{
    cfg.service(health)
        .service(web::resource("/quote").route(web::post().to(create_quote::<B, P, N>)))
        .service(web::resource("/quote/{id}/dispatch").route(web::post().to(dispatch::<B, P, N>)))
        .service(web::resource("/engagement/{id}").route(web::get().to(get_engagement::<B, P, N>)))
        .service(web::resource("/engagement/{id}/accept").route(web::post().to(accept::<B, P, N>)))
        .service(web::resource("/engagement/{id}/deny").route(web::post().to(deny::<B, P, N>)))
        .service(web::resource("/engagement/{id}/cancel").route(web::post().to(cancel::<B, P, N>)))
        .service(web::resource("/engagement/{id}/start").route(web::post().to(start::<B, P, N>)))
        .service(web::resource("/engagement/{id}/complete").route(web::post().to(complete::<B, P, N>)))
        .service(web::resource("/participant").route(web::post().to(upsert_participant::<B, P, N>)));
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

fn acting_role(req: &HttpRequest) -> Result<Role, ServerError> {
    let header = req
        .headers()
        .get("wgl-role")
        .ok_or_else(|| ServerError::ValidationError("The wgl-role header is required".to_string()))?;
    let value = header
        .to_str()
        .map_err(|e| ServerError::ValidationError(format!("Could not read the wgl-role header: {e}")))?;
    Role::from_str(value).map_err(|e| ServerError::ValidationError(e.to_string()))
}

// ----------------------------------------------   Quotes  ----------------------------------------------------
pub async fn create_quote<B, P, N>(
    api: web::Data<EngagementFlowApi<B, P, N>>,
    body: web::Json<QuoteRequest>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    P: PaymentProcessor,
    N: PushGateway,
{
    trace!("💻️ Received quote request");
    let quote = api.create_quote(body.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(quote))
}

pub async fn dispatch<B, P, N>(
    api: web::Data<EngagementFlowApi<B, P, N>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    P: PaymentProcessor,
    N: PushGateway,
{
    let quote_id = QuoteId::from(path.into_inner());
    trace!("💻️ Received dispatch request for quote [{quote_id}]");
    let engagement = api.dispatch(&quote_id).await?;
    Ok(HttpResponse::Ok().json(engagement))
}

// --------------------------------------------  Engagements  --------------------------------------------------
pub async fn get_engagement<B, P, N>(
    api: web::Data<EngagementFlowApi<B, P, N>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    P: PaymentProcessor,
    N: PushGateway,
{
    let id = EngagementId::from(path.into_inner());
    let engagement = api
        .engagement(&id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Engagement {id} does not exist")))?;
    Ok(HttpResponse::Ok().json(engagement))
}

pub async fn accept<B, P, N>(
    api: web::Data<EngagementFlowApi<B, P, N>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    P: PaymentProcessor,
    N: PushGateway,
{
    let id = EngagementId::from(path.into_inner());
    trace!("💻️ Walker accepting engagement [{id}]");
    let engagement = api.accept(&id).await?;
    Ok(HttpResponse::Ok().json(engagement))
}

pub async fn deny<B, P, N>(
    req: HttpRequest,
    api: web::Data<EngagementFlowApi<B, P, N>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    P: PaymentProcessor,
    N: PushGateway,
{
    let id = EngagementId::from(path.into_inner());
    let role = acting_role(&req)?;
    let engagement = api.deny(&id, role).await?;
    Ok(HttpResponse::Ok().json(engagement))
}

pub async fn cancel<B, P, N>(
    req: HttpRequest,
    api: web::Data<EngagementFlowApi<B, P, N>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    P: PaymentProcessor,
    N: PushGateway,
{
    let id = EngagementId::from(path.into_inner());
    let role = acting_role(&req)?;
    let engagement = api.cancel(&id, role).await?;
    Ok(HttpResponse::Ok().json(engagement))
}

pub async fn start<B, P, N>(
    req: HttpRequest,
    api: web::Data<EngagementFlowApi<B, P, N>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    P: PaymentProcessor,
    N: PushGateway,
{
    let id = EngagementId::from(path.into_inner());
    let role = acting_role(&req)?;
    let engagement = api.start(&id, role).await?;
    Ok(HttpResponse::Ok().json(engagement))
}

pub async fn complete<B, P, N>(
    req: HttpRequest,
    api: web::Data<EngagementFlowApi<B, P, N>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    P: PaymentProcessor,
    N: PushGateway,
{
    let id = EngagementId::from(path.into_inner());
    let role = acting_role(&req)?;
    let engagement = api.complete(&id, role).await?;
    Ok(HttpResponse::Ok().json(engagement))
}

// --------------------------------------------  Participants  -------------------------------------------------
/// Profile management proper lives in another service; this veneer exists so deployments and tests can seed the
/// participant store the engine reads.
pub async fn upsert_participant<B, P, N>(
    api: web::Data<EngagementFlowApi<B, P, N>>,
    body: web::Json<NewParticipant>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    P: PaymentProcessor,
    N: PushGateway,
{
    let participant = api.register_participant(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(participant))
}
