use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use framebridge::dom::memory::{MemoryDocument, MemoryHostDocument, MemoryWindow};
use framebridge::{
    BridgeConfig, EmbeddedDocumentBridge, EmbeddingDescriptor, HttpStyleService, MutationLog,
    PublisherOptions, SyncPublisher,
};
use tracing_subscriber::EnvFilter;
use url::Url;

const SURFACE_CLASS: &str = "framebridge-surface";

struct DemoArgs {
    content_url: Url,
    use_proxy: bool,
    click_ids: Vec<String>,
}

fn parse_args() -> Result<DemoArgs> {
    let mut args = std::env::args().skip(1);
    let raw_url = args
        .next()
        .unwrap_or_else(|| String::from("http://localhost:8000/"));
    let content_url = Url::parse(&raw_url).with_context(|| format!("invalid URL {raw_url}"))?;

    let mut use_proxy = false;
    let mut click_ids = Vec::new();
    for arg in args {
        if arg == "--proxy" {
            use_proxy = true;
        } else {
            click_ids.push(arg);
        }
    }
    if click_ids.is_empty() {
        click_ids.push(String::from("title"));
    }

    Ok(DemoArgs {
        content_url,
        use_proxy,
        click_ids,
    })
}

fn load_config() -> Result<BridgeConfig> {
    let config_path = std::env::var("FRAMEBRIDGE_CONFIG").ok().map(PathBuf::from);
    let config = BridgeConfig::load(config_path).context("failed to load bridge config")?;
    match std::env::var("FRAMEBRIDGE_ENDPOINT") {
        Ok(endpoint) => config
            .with_endpoint(&endpoint)
            .context("invalid FRAMEBRIDGE_ENDPOINT"),
        Err(_) => Ok(config),
    }
}

/// Stand-in for the page served at the content URL.
fn sample_document(window: Rc<MemoryWindow>) -> Rc<MemoryDocument> {
    let document = MemoryDocument::with_window(window);
    let body = document.append_element(None, "body", "", "");
    let header = document.append_element(Some(body), "header", "masthead", "site-header");
    document.append_element(Some(header), "h1", "title", "headline large");
    let main = document.append_element(Some(body), "main", "content", "");
    document.append_element(Some(main), "p", "intro", "lead");
    document.append_element(Some(main), "button", "cta", "btn btn-primary");
    Rc::new(document)
}

async fn run(args: DemoArgs, config: BridgeConfig) -> Result<()> {
    let descriptor = EmbeddingDescriptor::new(args.content_url, SURFACE_CLASS, args.use_proxy)?;
    tracing::info!(markup = %descriptor.render_markup(), "rendering embedding surface");

    let service = HttpStyleService::new(&config)?;
    tracing::info!(endpoint = %service.endpoint(), "using style service");

    let store = Rc::new(MutationLog::new());
    let publisher = SyncPublisher::new(
        Rc::new(service),
        store.clone(),
        PublisherOptions::from_config(&config),
    );

    let host = MemoryHostDocument::new();
    let surface = host.insert_surface(SURFACE_CLASS);
    let window = Rc::new(MemoryWindow::new());
    let handle =
        EmbeddedDocumentBridge::new(descriptor, publisher, window.clone()).mount_by_class(&host);

    let document = sample_document(window.clone());
    surface.finish_load(document.clone());

    for id in &args.click_ids {
        match document.find_by_id(id) {
            Some(node) => {
                document.click(node);
            }
            None => tracing::warn!(id = %id, "no element with this id in the sample page"),
        }
    }

    handle.publisher().idle().await;
    handle.release();

    for mutation in store.entries() {
        match mutation.payload() {
            Some(payload) => println!("{} {}", mutation.name(), payload),
            None => println!("{}", mutation.name()),
        }
    }
    tracing::info!(
        focus = ?window.focus_owner(),
        refocused = window.focus_calls(),
        "done"
    );
    Ok(())
}

fn main() -> Result<()> {
    let subscriber_result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();
    if subscriber_result.is_err() {
        // tracing was already initialised; continue silently
    }

    let args = parse_args()?;
    let config = load_config()?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&rt, run(args, config))
}
