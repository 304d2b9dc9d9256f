mod api;
mod client;
mod liquidity;
mod service;
mod util;

use std::process;
use std::sync::Arc;

use clap::Parser;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use log::{error, info};
use tokio::net::TcpListener;
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;

use crate::client::http::HttpSwapClient;
use crate::liquidity::{autolooper, LiquidityManager, SystemClock};
use crate::service::LiquidityService;
use crate::util::config::{load_config, ArgsConfig};

fn main() {
	let args = ArgsConfig::parse();

	let config = match load_config(&args) {
		Ok(config) => config,
		Err(e) => {
			eprintln!("Invalid configuration: {}", e);
			process::exit(-1);
		},
	};

	if let Err(e) = util::logger::init(config.log_level, config.log_file_path.as_deref()) {
		eprintln!("Failed to set up logging: {}", e);
		process::exit(-1);
	}

	let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
		Ok(runtime) => Arc::new(runtime),
		Err(e) => {
			eprintln!("Failed to setup tokio runtime: {}", e);
			process::exit(-1);
		},
	};

	let swap_client = match HttpSwapClient::new(&config.swap_server_url) {
		Ok(client) => Arc::new(client),
		Err(e) => {
			eprintln!("Failed to create swap client: {}", e);
			process::exit(-1);
		},
	};

	let manager =
		match LiquidityManager::new(swap_client, Arc::new(SystemClock), config.liquidity) {
			Ok(manager) => Arc::new(manager),
			Err(e) => {
				eprintln!("Invalid liquidity parameters: {}", e);
				process::exit(-1);
			},
		};

	runtime.block_on(async {
		let mut sigterm_stream = match tokio::signal::unix::signal(SignalKind::terminate()) {
			Ok(stream) => stream,
			Err(e) => {
				error!("Failed to register for SIGTERM stream: {}", e);
				process::exit(-1);
			},
		};

		let rest_svc_listener = TcpListener::bind(config.rest_service_addr)
			.await
			.expect("Failed to bind listening port");
		info!("swapd listening on {}", config.rest_service_addr);

		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		let looper = tokio::spawn(autolooper::run(
			Arc::clone(&manager),
			config.tick_interval,
			shutdown_rx,
		));

		loop {
			tokio::select! {
				res = rest_svc_listener.accept() => {
					match res {
						Ok((stream, _)) => {
							let io_stream = TokioIo::new(stream);
							let liquidity_service = LiquidityService::new(Arc::clone(&manager));
							tokio::spawn(async move {
								if let Err(err) = http1::Builder::new()
									.serve_connection(io_stream, liquidity_service)
									.await
								{
									error!("Failed to serve connection: {}", err);
								}
							});
						},
						Err(e) => error!("Failed to accept connection: {}", e),
					}
				}
				_ = tokio::signal::ctrl_c() => {
					info!("Received CTRL-C, shutting down..");
					break;
				}
				_ = sigterm_stream.recv() => {
					info!("Received SIGTERM, shutting down..");
					break;
				}
			}
		}

		let _ = shutdown_tx.send(true);
		let _ = looper.await;
	});

	info!("Shutdown complete..");
}
