use actix_multipart::form::{tempfile::TempFileConfig, MultipartFormConfig};
use actix_web::{
    dev::Server,
    web::{self, Data},
    App, HttpServer,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{net::TcpListener, sync::Arc};
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::{
    adapters::command_transformer::CommandTransformer,
    configuration::{DatabaseSettings, Settings},
    middlewares::ExtractUserContext,
    ports::{
        artifact_repository::{ArtifactRepository, ArtifactRepositoryError},
        image_transformer::ImageTransformer,
        job_repository::JobRepository,
        usage_recorder::UsageRecorder,
    },
    repositories::{
        artifact_filesystem_repository::ArtifactFilesystemRepository,
        authentication_jwt_repository::AuthenticationJwtRepository,
        job_postgres_repository::JobPostgresRepository,
        usage_postgres_repository::UsagePostgresRepository,
    },
    routes::{download, get_job, health_check, my_jobs, submit_jobs, track_usage},
};

/// Holds the newly built server, and some useful properties
pub struct Application {
    server: Server,
    port: u16,
}

#[derive(thiserror::Error, Debug)]
pub enum ApplicationBuildError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("Failed to set up the artifact store: {0}")]
    ArtifactStoreError(#[from] ArtifactRepositoryError),
}

impl Application {
    /// # Parameters
    /// - nb_workers: number of actix-web workers
    ///   if `None`, the number of available physical CPUs is used as the worker count.
    #[tracing::instrument(name = "Building application")]
    pub async fn build(
        settings: Settings,
        nb_workers: Option<usize>,
    ) -> Result<Self, ApplicationBuildError> {
        let connection_pool = get_connection_pool(&settings.database);

        let address = format!(
            "{}:{}",
            settings.application.host, settings.application.port
        );
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr().unwrap().port();

        tokio::fs::create_dir_all(&settings.storage.upload_dir).await?;

        let job_repository: Arc<dyn JobRepository> =
            Arc::new(JobPostgresRepository::new(connection_pool.clone()));
        let usage_recorder: Arc<dyn UsageRecorder> =
            Arc::new(UsagePostgresRepository::new(connection_pool));
        let artifact_repository: Arc<dyn ArtifactRepository> = Arc::new(
            ArtifactFilesystemRepository::new(settings.storage.processed_dir.clone()).await?,
        );
        let transformer: Arc<dyn ImageTransformer> =
            Arc::new(CommandTransformer::new(&settings.transformer));

        let server = run(
            listener,
            settings,
            nb_workers,
            job_repository,
            artifact_repository,
            usage_recorder,
            transformer,
        )?;

        Ok(Self { server, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// This function only returns when the application is stopped
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        info!("Running server ...");
        self.server.await
    }
}

/// listener: the consumer binds their own port
///
/// TracingLogger middleware: helps collecting telemetry data.
/// It generates a unique identifier for each incoming request: `request_id`.
///
/// The job pipeline dependencies are taken as trait objects so integration
/// tests can run the full HTTP surface against in-memory implementations.
///
/// # Parameters
/// - nb_workers: number of actix-web workers
///   if `None`, the number of available physical CPUs is used as the worker count.
pub fn run(
    listener: TcpListener,
    settings: Settings,
    nb_workers: Option<usize>,
    job_repository: Arc<dyn JobRepository>,
    artifact_repository: Arc<dyn ArtifactRepository>,
    usage_recorder: Arc<dyn UsageRecorder>,
    transformer: Arc<dyn ImageTransformer>,
) -> Result<Server, std::io::Error> {
    let auth_repository = Data::new(AuthenticationJwtRepository::new(
        settings.auth.jwt_secret.clone(),
        settings.auth.jwt_expire_in_s,
    ));

    // Wraps the repositories in `actix_web::Data` (`Arc`) to be able to
    // register them and access them from handlers.
    // Those repositories are shared among all threads.
    let job_repository: Data<dyn JobRepository> = Data::from(job_repository);
    let artifact_repository: Data<dyn ArtifactRepository> = Data::from(artifact_repository);
    let usage_recorder: Data<dyn UsageRecorder> = Data::from(usage_recorder);
    let transformer: Data<dyn ImageTransformer> = Data::from(transformer);

    let upload_dir = settings.storage.upload_dir.clone();
    // A multipart request can carry a full batch of maximum-size files.
    let multipart_total_limit =
        settings.storage.max_file_size_bytes as usize * settings.storage.max_batch_size;
    let settings = Data::new(settings);

    // `move` to capture variables from the surrounding environment
    let server = HttpServer::new(move || {
        info!("Starting actix-web worker");

        App::new()
            // Registered before the logger: the last registered middleware is
            // the outermost one, and the identity extractor expects to wrap
            // the plain boxed-body app.
            .wrap(ExtractUserContext::new(auth_repository.clone()))
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/jobs/{operation}", web::post().to(submit_jobs))
            .route("/jobs/{job_id}", web::get().to(get_job))
            .route("/my-jobs", web::get().to(my_jobs))
            .route("/download/{token}/{job_id}", web::get().to(download))
            .route("/track-usage", web::post().to(track_usage))
            .app_data(TempFileConfig::default().directory(&upload_dir))
            .app_data(
                MultipartFormConfig::default()
                    .total_limit(multipart_total_limit)
                    .memory_limit(2 * 1024 * 1024),
            )
            .app_data(settings.clone())
            .app_data(auth_repository.clone())
            .app_data(job_repository.clone())
            .app_data(artifact_repository.clone())
            .app_data(usage_recorder.clone())
            .app_data(transformer.clone())
    })
    .listen(listener)?;

    // If no workers were set, use the actix-web settings (number of workers = number of physical CPUs)
    if let Some(nb_workers) = nb_workers {
        return Ok(server.workers(nb_workers).run());
    }

    // No await
    Ok(server.run())
}

pub fn get_connection_pool(settings: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(settings.with_db())
}
