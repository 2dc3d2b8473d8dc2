use actix_web::{get, http::header::ContentType, web, HttpResponse, Responder};
use chrono::Utc;

use crate::{
    board::get_board,
    error::NextTrainsResult,
    lines::LineSource,
    next_trains::StopMonitoringSource,
    ContextData,
};

#[get("/ping")]
async fn ping() -> impl Responder {
    HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body("pong")
}

async fn get_next_trains<F, L>(ctx: web::Data<ContextData<F, L>>) -> NextTrainsResult<impl Responder>
where
    F: StopMonitoringSource + 'static,
    L: LineSource + 'static,
{
    let groups = ctx.next_trains.next_trains(Utc::now()).await?;
    Ok(web::Json(groups))
}

/// Routes, generic over the upstream sources so tests can swap in fakes
pub fn configure<F, L>(cfg: &mut web::ServiceConfig)
where
    F: StopMonitoringSource + 'static,
    L: LineSource + 'static,
{
    cfg.service(ping)
        .route("/api/next-trains", web::get().to(get_next_trains::<F, L>))
        .route("/", web::get().to(get_board::<F, L>));
}
