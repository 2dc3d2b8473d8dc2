mod api;
mod board;
mod config;
mod error;
mod idfm;
mod lines;
mod next_trains;
mod trains;

#[cfg(test)]
mod test_utils;

use std::env;

use actix_web::{middleware::Logger, web, App, HttpServer};

use crate::{
    board::Snapshot, config::Config, error::NextTrainsError, idfm::client::IdfmClient,
    lines::LineCache, next_trains::NextTrains,
};

pub struct ContextData<F = IdfmClient, L = IdfmClient> {
    next_trains: NextTrains<F, L>,
    board: Snapshot,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::from_filename(".env").ok();

    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::try_init().ok();

    log::debug!("Debug logging enabled");

    let config = Config::from_env().map_err(|e| {
        log::error!("{}", e);
        NextTrainsError::from(e)
    })?;

    let client = IdfmClient::new(&config).map_err(NextTrainsError::from)?;

    let lines = LineCache::new(client.clone(), &config.cache_dir);
    lines.init().await?;
    log::info!("Caching line info in {}", config.cache_dir.display());

    let ctx = web::Data::new(ContextData {
        next_trains: NextTrains::new(client, lines, &config.stop_ref),
        board: Snapshot::default(),
    });

    log::info!(
        "Starting server at {} for stop {}",
        config.listen_address,
        config.stop_ref
    );

    let allow_origin = config.allow_origin.clone();

    HttpServer::new(move || {
        let logger = Logger::default();

        let mut cors = actix_cors::Cors::default()
            .allowed_methods(vec!["GET"])
            .allowed_headers(vec!["accept"]);

        if allow_origin == "*" {
            cors = cors.allow_any_origin();
        } else {
            cors = cors.allowed_origin(&allow_origin);
        }

        App::new()
            .wrap(logger)
            .wrap(cors)
            .app_data(ctx.clone())
            .configure(api::configure::<IdfmClient, IdfmClient>)
    })
    .bind(&config.listen_address)?
    .run()
    .await?;

    log::info!("Server stopped");
    Ok(())
}
