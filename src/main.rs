use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use tracing::{error, info, warn};

use rentlify::auth::{TokenService, CUSTOMER_TOKEN_HEADER, STAFF_TOKEN_HEADER};
use rentlify::config::Settings;
use rentlify::db::{self, PgStore};
use rentlify::notify::{DisabledNotifier, Notifier, SmtpNotifier};
use rentlify::payment::StripeGateway;
use rentlify::{configure, telemetry, AppState};

fn notifier(settings: &Settings) -> Arc<dyn Notifier> {
    if !settings.email_validation {
        return Arc::new(DisabledNotifier);
    }
    match SmtpNotifier::from_settings(settings) {
        Ok(smtp) => Arc::new(smtp),
        Err(err) => {
            warn!(error = %err, "validation email enabled but SMTP is not usable, disabling");
            Arc::new(DisabledNotifier)
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init();
    dotenv::dotenv().ok();

    let settings = Settings::load()
        .inspect_err(|err| error!(error = %err, "invalid configuration"))
        .map_err(std::io::Error::other)?;

    let pool = db::init_pool(&settings)
        .inspect_err(|err| error!(error = %err, "database unavailable"))
        .map_err(std::io::Error::other)?;
    db::run_migrations(&pool).map_err(std::io::Error::other)?;

    if settings.stripe_secret_key.is_none() {
        warn!("STRIPE_SECRET_KEY not set, payment intents will fail");
    }

    let state = web::Data::new(AppState {
        store: Arc::new(PgStore::new(pool)),
        tokens: Arc::new(TokenService::from_settings(&settings)),
        payments: Arc::new(StripeGateway::from_settings(&settings)),
        notifier: notifier(&settings),
        settings: Arc::new(settings.clone()),
    });

    let (host, port) = settings.bind_address();
    info!(%host, port, "rentlify listening");

    HttpServer::new(move || {
        let cors = state
            .settings
            .allowed_origins()
            .into_iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
            .allowed_headers(vec![
                header::ORIGIN,
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::HeaderName::from_static("x-requested-with"),
                header::HeaderName::from_static(CUSTOMER_TOKEN_HEADER),
                header::HeaderName::from_static(STAFF_TOKEN_HEADER),
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((host, port))?
    .run()
    .await?;

    info!("rentlify stopped");
    Ok(())
}
