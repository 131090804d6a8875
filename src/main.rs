use std::{io, io::Write, process, sync::Arc};

use portfolio::{
    application::{
        error::AppError,
        repos::UsersRepo,
        routes::RouteTable,
        seed::{ConflictPolicy, SeedLoader, SeedPlan},
        users::UserService,
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HandlerRegistry, HttpState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Seed(args) => run_seed(settings, args).await,
        config::Command::Routes(args) => run_routes(args),
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;

    let routes = Arc::new(RouteTable::portfolio());
    let state = HttpState {
        routes: routes.clone(),
        site: Arc::new(settings.site.clone()),
        db: repositories,
    };
    let router = http::build_router(state, &HandlerRegistry::portfolio())
        .map_err(|err| AppError::unexpected(err.to_string()))?;

    let addr = settings.server.addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| InfraError::Bind { addr, source })?;

    info!(
        target = "portfolio::serve",
        addr = %addr,
        routes = routes.len(),
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "portfolio::serve", "server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }
}

async fn run_seed(settings: config::Settings, args: config::SeedArgs) -> Result<(), AppError> {
    let plan = match args.file.as_deref() {
        Some(path) => SeedPlan::load(path)?,
        None => SeedPlan::default_users(),
    };
    let policy: ConflictPolicy = args.on_conflict.into();

    let repositories = init_repositories(&settings).await?;
    let users_repo: Arc<dyn UsersRepo> = repositories;
    let loader = SeedLoader::new(UserService::new(users_repo));

    info!(
        target = "portfolio::seed",
        entries = plan.len(),
        policy = ?policy,
        "Starting seed"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let report = loader.run(&plan, policy, &mut out).await?;

    info!(
        target = "portfolio::seed",
        created = report.created.len(),
        skipped = report.skipped.len(),
        "Seed completed"
    );
    Ok(())
}

fn run_routes(args: config::RoutesArgs) -> Result<(), AppError> {
    let table = RouteTable::portfolio();
    let rendered = if args.json {
        let mut encoded = serde_json::to_string_pretty(table.routes())
            .map_err(|err| AppError::unexpected(format!("failed to encode routes: {err}")))?;
        encoded.push('\n');
        encoded
    } else {
        table.render_listing()
    };

    io::stdout()
        .write_all(rendered.as_bytes())
        .map_err(InfraError::from)?;
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(InfraError::from)?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}
