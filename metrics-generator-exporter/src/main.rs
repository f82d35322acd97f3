use std::env;
use std::process::ExitCode;

use metrics_generator_exporter::{
    build_instrument_set, new_http_listener, parse_args, Command, ExporterConfig, ExporterError,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("metrics-generator");

    let config = match parse_args(program, args.get(1..).unwrap_or_default()) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help(usage)) => {
            print!("{}", usage);
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to create runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ExporterConfig) -> Result<(), ExporterError> {
    let (set, driver) = build_instrument_set(&config)?;
    let allowed_addresses = config.allowed_addresses().map(|addresses| addresses.to_vec());
    let (address, exporter) =
        new_http_listener(set.clone(), config.listen_address(), allowed_addresses)?;
    info!(%address, families = set.len(), "metrics generator listening");

    let ticker = driver.map(|driver| tokio::spawn(driver.run()));

    tokio::select! {
        result = exporter => result?,
        _ = shutdown_signal() => info!("received shutdown signal, exiting"),
    }

    if let Some(ticker) = ticker {
        ticker.abort();
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
