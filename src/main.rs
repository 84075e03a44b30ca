use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use log::info;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod cli;

use cli::Cli;
use cli::commands::Commands;
use mcp_gateway::compare::{Backend, BackendId, BackendResult, BenchHarness, Comparator, HttpBackend};
use mcp_gateway::config::Config;
use mcp_gateway::gateway::{AppState, Gateway, GatewayRequest, serve};
use mcp_gateway::observability::{LogWriter, ObservabilitySink};
use mcp_gateway::tools::ToolRegistry;

fn setup_logging(config: &Config, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.log_level.as_deref().unwrap_or("info")
    };

    // RUST_LOG wins over the configured level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    info!("Logging initialized at level: {}", level);
}

async fn run_application(cli: &Cli, config: Config, sink: ObservabilitySink) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        None => handle_serve_command(None, None, config, sink).await,
        Some(Commands::Serve { host, port }) => handle_serve_command(host.clone(), *port, config, sink).await,
        Some(Commands::Route { backend, payload }) => {
            handle_route_command(backend, payload.as_deref(), &config, sink).await
        }
        Some(Commands::Compare { payload }) => handle_compare_command(payload.as_deref(), &config, sink).await,
        Some(Commands::Bench {
            requests,
            output,
            ec2_url,
            lambda_url,
        }) => {
            handle_bench_command(*requests, output.clone(), ec2_url.clone(), lambda_url.clone(), config).await
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn handle_serve_command(
    host: Option<String>,
    port: Option<u16>,
    mut config: Config,
    sink: ObservabilitySink,
) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let mut gateway = Gateway::new(ToolRegistry::with_defaults(), sink.clone());
    if let Some(timeout) = config.server.tool_timeout() {
        gateway = gateway.with_tool_timeout(timeout);
    }
    info!("Registered tools: {}", gateway.registry().tool_names().join(", "));

    let mut state = AppState::new(gateway);
    if config.backends.is_configured() {
        let comparator = Comparator::from_config(&config.backends)?.with_sink(sink);
        info!("Comparator backends: {:?}", comparator.backend_ids());
        state = state.with_comparator(comparator);
    }

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind {}", addr))?;

    println!("{} http://{}", "Serving gateway on".green(), addr);
    serve(listener, state, shutdown_signal()).await?;
    Ok(())
}

fn parse_payload(raw: Option<&str>) -> Result<Value> {
    match raw {
        Some(raw) => serde_json::from_str(raw).context("Payload is not valid JSON"),
        None => Ok(serde_json::to_value(GatewayRequest::list_tools())?),
    }
}

fn print_result(result: &BackendResult) {
    let label = format!("{:>6}", result.backend_id.as_str().to_uppercase());
    if result.success {
        println!("{} {} {:.2}ms", label.bold(), "OK".green(), result.latency_ms);
    } else {
        println!(
            "{} {} {:.2}ms {}",
            label.bold(),
            "FAILED".red(),
            result.latency_ms,
            result.error.as_deref().unwrap_or_default()
        );
    }
}

async fn handle_route_command(backend: &str, payload: Option<&str>, config: &Config, sink: ObservabilitySink) -> Result<()> {
    let backend_id: BackendId = backend.parse()?;
    let payload = parse_payload(payload)?;
    let comparator = Comparator::from_config(&config.backends)?.with_sink(sink);

    info!("Routing request to {}", backend_id);
    let response = comparator.route(&payload, backend_id).await?;

    if let Some(data) = &response.data {
        let result: BackendResult = serde_json::from_value(data.clone())?;
        print_result(&result);
        if let Some(body) = &result.result {
            println!("{}", serde_json::to_string_pretty(body)?);
        }
    }
    Ok(())
}

async fn handle_compare_command(payload: Option<&str>, config: &Config, sink: ObservabilitySink) -> Result<()> {
    let payload = parse_payload(payload)?;
    let comparator = Comparator::from_config(&config.backends)?.with_sink(sink);

    println!("{}", "Comparing backends...".cyan());
    let outcome = comparator.compare(&payload).await;
    for result in &outcome.results {
        print_result(result);
    }

    match outcome.faster_backend {
        Some(id) => println!("{} {}", "Faster backend:".green(), id.to_string().bold()),
        None => println!("{}", "All backends failed".red()),
    }
    Ok(())
}

async fn handle_bench_command(
    requests: Option<usize>,
    output: Option<PathBuf>,
    ec2_url: Option<String>,
    lambda_url: Option<String>,
    mut config: Config,
) -> Result<()> {
    if ec2_url.is_some() {
        config.backends.ec2_url = ec2_url;
    }
    if lambda_url.is_some() {
        config.backends.lambda_url = lambda_url;
    }
    let requests = requests.unwrap_or(config.bench.requests);
    let output = output.unwrap_or_else(|| config.bench.report_path.clone());

    let timeout = Duration::from_secs(config.backends.timeout_secs);
    let mut backends: Vec<Arc<dyn Backend>> = Vec::new();
    for id in BackendId::ALL {
        let Some(url) = config.backends.url(id) else {
            bail!("No URL configured for the {} deployment (set backends.{}_url or --{}-url)", id, id, id);
        };
        backends.push(Arc::new(HttpBackend::new(id, url, timeout)?));
    }

    println!(
        "{} {} requests per deployment",
        "Benchmarking:".cyan(),
        requests.to_string().bold()
    );
    let harness = BenchHarness::new(requests).with_delay(Duration::from_millis(config.bench.delay_ms));
    let report = harness.run(&backends).await;

    println!("\n{}", "DEPLOYMENT COMPARISON RESULTS".bold());
    print!("{}", report.render());
    match report.faster_backend {
        Some(id) => println!("{} {}", "Winner:".green(), id.to_string().bold()),
        None => println!("{}", "No deployment completed a request".red()),
    }

    report
        .write_to(&output)
        .context(format!("Failed to write report to {}", output.display()))?;
    println!("{} {}", "Report saved to".green(), output.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config, cli.is_verbose());
    info!("Starting with config from: {:?}", cli.config);

    let (sink, guard) = ObservabilitySink::spawn(LogWriter);

    // Run the main application logic, then flush queued events
    let outcome = run_application(&cli, config, sink).await;
    guard.shutdown().await;

    outcome.context("Application failed")
}
