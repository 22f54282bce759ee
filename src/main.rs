use std::sync::Arc;
use std::time::Duration;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;

use districthr::config::Config;
use districthr::db::init_db;
use districthr::docs::ApiDoc;
use districthr::external::audit::SqlAuditSink;
use districthr::external::directory::SqlDirectory;
use districthr::external::recommend::{HttpRecommender, NoopRecommender, SubstituteRecommender};
use districthr::routes;
use districthr::store::mysql::MySqlStore;
use districthr::workflow::WorkflowService;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "District HR workflow service"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await;

    let recommender: Arc<dyn SubstituteRecommender> = match &config.recommend_url {
        Some(url) => Arc::new(HttpRecommender::new(url.clone())),
        None => Arc::new(NoopRecommender),
    };
    let service = WorkflowService::new(
        Arc::new(MySqlStore::new(pool.clone())),
        Arc::new(SqlDirectory::new(pool.clone())),
        recommender,
        Arc::new(SqlAuditSink::new(pool.clone())),
        Duration::from_millis(config.recommend_timeout_ms),
    );
    let service = Data::new(service);

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(service.clone())
            .app_data(Data::new(config.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
