use std::{process, sync::Arc};

use canopy::{
    application::{
        error::AppError,
        fetcher::PostFetcher,
        lookup::RouteLookupCache,
        posts::PostCache,
        refresh::CacheRefresher,
        sitemap::SitemapService,
        source::{PostSource, SourceError},
        urls::SiteUrls,
    },
    config::{self, LoadError},
    infra::{
        error::InfraError,
        http::{self, HttpState},
        notion::NotionClient,
        storage, telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        print_guidance(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

/// Extra hints for the failures an operator can fix on their own.
fn print_guidance(error: &AppError) {
    match error {
        AppError::Config(LoadError::Invalid { key, reason }) if key.starts_with("notion.") => {
            eprintln!("\n{reason}.");
            eprintln!("Set it in .env.local or the process environment and retry.");
        }
        AppError::Source(SourceError::Status { code, .. }) if code == "unauthorized" => {
            eprintln!("\nTroubleshooting tips:");
            eprintln!("1. Check that NOTION_TOKEN in .env.local is the integration secret");
            eprintln!("2. Verify the token at https://www.notion.so/my-integrations");
            eprintln!("3. Make sure the integration has access to the database:");
            eprintln!("   - Open the database in Notion");
            eprintln!("   - Click '...' then 'Connections' and add your integration");
            eprintln!("4. Verify NOTION_DATABASE_ID is correct");
        }
        AppError::Source(SourceError::Status { code, .. }) if code == "object_not_found" => {
            eprintln!("\nTroubleshooting tips:");
            eprintln!("1. Verify NOTION_DATABASE_ID is correct");
            eprintln!("2. Make sure the integration has access to the database");
            eprintln!("3. Check that the database is in the same workspace as the integration");
        }
        _ => {}
    }
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::CachePosts(_) => run_cache_posts(settings).await,
        config::Command::Lookup(args) => run_lookup(settings, args.refresh).await,
        config::Command::Schema(_) => run_schema(settings).await,
    }
}

struct Services {
    notion: Arc<NotionClient>,
    fetcher: PostFetcher,
    post_cache: PostCache,
    lookup: Arc<RouteLookupCache>,
}

fn build_services(settings: &config::Settings) -> Result<Services, AppError> {
    let credentials = settings.notion.credentials()?;
    info!(
        target = "canopy::bootstrap",
        database_id = %credentials.database_id,
        stage = %settings.environment.stage,
        "configured content source"
    );

    let notion = Arc::new(NotionClient::new(&settings.notion)?);
    let source: Arc<dyn PostSource> = notion.clone();
    let fetcher = PostFetcher::new(source);
    let store = storage::lookup_store(&settings.cache, &settings.environment);
    info!(
        target = "canopy::bootstrap",
        storage = store.label(),
        "selected route lookup storage"
    );

    let lookup = Arc::new(RouteLookupCache::new(
        fetcher.clone(),
        store,
        settings.cache.lookup_ttl,
    ));

    Ok(Services {
        notion,
        fetcher,
        post_cache: PostCache::new(settings.cache.posts_path.clone()),
        lookup,
    })
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let services = build_services(&settings)?;
    let urls = SiteUrls::new(settings.site.base_url.clone());
    let state = HttpState {
        lookup: services.lookup,
        posts: services.post_cache.clone(),
        sitemap: Arc::new(SitemapService::new(services.post_cache, urls)),
        environment: Arc::from(settings.environment.stage.as_str()),
    };

    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "canopy::serve",
        addr = %settings.server.addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn run_cache_posts(settings: config::Settings) -> Result<(), AppError> {
    let services = build_services(&settings)?;
    let refresher = CacheRefresher::new(services.fetcher, services.post_cache, services.lookup);

    let report = refresher.refresh_all().await?;
    info!(
        target = "canopy::cache_posts",
        documents = report.documents,
        cached = report.cached_posts,
        route_entries = report.route_entries,
        storage = report.storage,
        "post cache and route lookup rebuilt"
    );
    println!("Successfully cached {} posts.", report.cached_posts);
    println!(
        "Route lookup cache built with {} entries ({}).",
        report.route_entries, report.storage
    );
    Ok(())
}

async fn run_lookup(settings: config::Settings, refresh: bool) -> Result<(), AppError> {
    let services = build_services(&settings)?;
    let envelope = services.lookup.get_route_lookup_map(refresh).await?;
    let rendered = serde_json::to_string_pretty(&envelope)
        .map_err(|err| AppError::unexpected(format!("failed to render lookup: {err}")))?;
    println!("{rendered}");
    Ok(())
}

async fn run_schema(settings: config::Settings) -> Result<(), AppError> {
    let services = build_services(&settings)?;
    let schema = services.notion.retrieve_database().await?;

    println!("Database: {}", schema.title);
    for (name, kind) in schema.properties {
        println!("  {name}: {kind}");
    }
    Ok(())
}
