use clap::{Parser, Subcommand};
use imgboost::config::{self, ServiceConfig};
use imgboost::fetch::ReqwestClient;
use imgboost::imaging::{Quality, RustBackend, TransformOptions};
use imgboost::output;
use imgboost::scheduler::TaskScheduler;
use imgboost::server;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imgboost")]
#[command(about = "On-demand image resizing and WebP conversion server")]
#[command(long_about = "\
On-demand image resizing and WebP conversion server

Send a base64-encoded image URL and get back a resized WebP:

  GET /?src=<base64 url>&width=800&quality=85

Width and height are optional. With one of them, the other follows the source
aspect ratio; with both, the image is stretched to exactly that size; with
neither, the source size is kept. JPEG, PNG and WebP sources are supported.

Downloads and image processing run on two separate worker pools, so slow
upstream servers never hold up CPU-bound work.

Run 'imgboost gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file (TOML); stock defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Args, Clone, Default)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[derive(clap::Args, Clone)]
struct ConvertArgs {
    /// Source image URL
    url: String,

    /// Output width (0 = derive)
    #[arg(short, long, default_value_t = 0)]
    width: u32,

    /// Output height (0 = derive)
    #[arg(short = 'H', long, default_value_t = 0)]
    height: u32,

    /// WebP quality 0-100 (default from config)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(0..=100))]
    quality: Option<u32>,

    /// Where to write the WebP file
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve(ServeArgs),
    /// Fetch and convert one image, writing the WebP to a file
    Convert(ConvertArgs),
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => {
            let mut service_config = config::load_config(cli.config.as_deref())?;
            service_config.apply_port_env(std::env::var("PORT").ok().as_deref())?;
            if let Some(host) = args.host {
                service_config.server.host = host;
            }
            if let Some(port) = args.port {
                service_config.server.port = port;
            }
            init_tracing(&service_config.log_level);
            serve(service_config)?;
        }
        Command::Convert(args) => {
            let service_config = config::load_config(cli.config.as_deref())?;
            init_tracing(&service_config.log_level);
            convert(&service_config, &args)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Build both pools, the HTTP client and the codec backend.
///
/// Runs before any async runtime exists: the blocking HTTP client refuses to
/// be constructed inside one.
fn build_scheduler(service_config: &ServiceConfig) -> Result<TaskScheduler, Box<dyn std::error::Error>> {
    let client = ReqwestClient::new(service_config.fetch.client_settings())?;
    let scheduler = TaskScheduler::new(
        Arc::new(client),
        Arc::new(RustBackend::new()),
        service_config.pools.fetch_threads,
        config::effective_transform_threads(&service_config.pools),
    )?;
    Ok(scheduler)
}

fn serve(service_config: ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let scheduler = Arc::new(build_scheduler(&service_config)?);
    output::print_startup(
        &service_config,
        scheduler.fetch_threads(),
        scheduler.transform_threads(),
    );

    let address = service_config.bind_address();
    let app = server::router(Arc::clone(&scheduler), Arc::new(service_config));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("imgboost-http")
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(&address).await?;
        tracing::info!("HTTP server listening on {}", address);
        server::serve(listener, app).await
    })?;

    scheduler.shutdown();
    Ok(())
}

fn convert(service_config: &ServiceConfig, args: &ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    let scheduler = build_scheduler(service_config)?;
    let quality = args.quality.unwrap_or(service_config.images.default_quality);
    let options = TransformOptions::new(args.width, args.height, Quality::new(quality));

    let outcome = scheduler.process_blocking(&args.url, options)?;
    scheduler.shutdown();

    output::print_convert_result(&args.url, &args.output, &outcome);
    if !outcome.succeeded {
        return Err(format!("conversion failed ({})", outcome.http_status).into());
    }
    write_output(&args.output, &outcome.output_bytes)?;
    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
}
