// This file is Copyright its original authors, visible in version control
// history.
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use std::{fs, io};

use clap::Parser;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::api::types::LiquidityParams;
use crate::liquidity::autolooper::DEFAULT_TICK_INTERVAL;
use crate::liquidity::params::Parameters;

/// Configuration for the swapd daemon.
#[derive(Debug)]
pub(crate) struct Config {
	pub rest_service_addr: SocketAddr,
	pub swap_server_url: String,
	pub tick_interval: Duration,
	pub log_level: LevelFilter,
	pub log_file_path: Option<String>,
	/// The initial autoloop parameters; operators adjust them at runtime
	/// through the REST surface.
	pub liquidity: Parameters,
}

/// A builder for `Config`.
#[derive(Default)]
struct ConfigBuilder {
	rest_service_address: Option<String>,
	swap_server_url: Option<String>,
	tick_interval_secs: Option<u64>,
	log_level: Option<String>,
	log_file_path: Option<String>,
	liquidity: Option<LiquidityParams>,
}

impl ConfigBuilder {
	fn merge_toml(&mut self, toml: TomlConfig) {
		if let Some(daemon) = toml.daemon {
			self.rest_service_address =
				daemon.rest_service_address.or(self.rest_service_address.clone());
			self.swap_server_url = daemon.swap_server_url.or(self.swap_server_url.clone());
			self.tick_interval_secs = daemon.tick_interval_secs.or(self.tick_interval_secs);
		}

		if let Some(log) = toml.log {
			self.log_level = log.level.or(self.log_level.clone());
			self.log_file_path = log.file.or(self.log_file_path.clone());
		}

		if let Some(liquidity) = toml.liquidity {
			self.liquidity = Some(liquidity);
		}
	}

	fn merge_args(&mut self, args: &ArgsConfig) {
		if let Some(rest_service_address) = &args.rest_service_address {
			self.rest_service_address = Some(rest_service_address.clone());
		}

		if let Some(swap_server_url) = &args.swap_server_url {
			self.swap_server_url = Some(swap_server_url.clone());
		}

		if let Some(log_level) = &args.log_level {
			self.log_level = Some(log_level.clone());
		}
	}

	fn build(self) -> io::Result<Config> {
		let rest_service_addr = self
			.rest_service_address
			.ok_or_else(|| missing_field_err("rest_service_address"))?
			.parse::<SocketAddr>()
			.map_err(|e| {
				io::Error::new(
					io::ErrorKind::InvalidInput,
					format!("Invalid rest service address: {}", e),
				)
			})?;

		let swap_server_url =
			self.swap_server_url.ok_or_else(|| missing_field_err("swap_server_url"))?;

		let tick_interval = self
			.tick_interval_secs
			.map(Duration::from_secs)
			.unwrap_or(DEFAULT_TICK_INTERVAL);
		if tick_interval.is_zero() {
			return Err(io::Error::new(
				io::ErrorKind::InvalidInput,
				"tick_interval_secs must be non-zero".to_string(),
			));
		}

		let log_level = self
			.log_level
			.as_ref()
			.map(|level_str| {
				LevelFilter::from_str(level_str).map_err(|e| {
					io::Error::new(
						io::ErrorKind::InvalidInput,
						format!("Invalid log level configured: {}", e),
					)
				})
			})
			.transpose()?
			.unwrap_or(LevelFilter::Debug);

		let liquidity = self
			.liquidity
			.map(Parameters::try_from)
			.transpose()
			.map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?
			.unwrap_or_default();

		Ok(Config {
			rest_service_addr,
			swap_server_url,
			tick_interval,
			log_level,
			log_file_path: self.log_file_path,
			liquidity,
		})
	}
}

/// Configuration loaded from a TOML file.
#[derive(Deserialize, Serialize)]
pub(crate) struct TomlConfig {
	daemon: Option<DaemonConfig>,
	log: Option<LogConfig>,
	liquidity: Option<LiquidityParams>,
}

#[derive(Deserialize, Serialize)]
struct DaemonConfig {
	rest_service_address: Option<String>,
	swap_server_url: Option<String>,
	tick_interval_secs: Option<u64>,
}

#[derive(Deserialize, Serialize)]
struct LogConfig {
	level: Option<String>,
	file: Option<String>,
}

#[derive(Parser, Debug)]
#[command(
	version,
	about = "swapd configuration",
	long_about = None,
	override_usage = "swapd [config_path]"
)]
pub(crate) struct ArgsConfig {
	#[arg(required = false, help = "The configuration file for running swapd.")]
	config_file: Option<String>,

	#[arg(
		long,
		env = "SWAPD_REST_SERVICE_ADDRESS",
		help = "The listen address for the swapd operator API."
	)]
	rest_service_address: Option<String>,

	#[arg(
		long,
		env = "SWAPD_SWAP_SERVER_URL",
		help = "The base URL of the swap daemon backend."
	)]
	swap_server_url: Option<String>,

	#[arg(long, env = "SWAPD_LOG_LEVEL", help = "The log level filter.")]
	log_level: Option<String>,
}

pub(crate) fn load_config(args: &ArgsConfig) -> io::Result<Config> {
	let mut builder = ConfigBuilder::default();

	if let Some(path) = &args.config_file {
		let content = fs::read_to_string(path).map_err(|e| {
			io::Error::new(e.kind(), format!("Failed to read config file '{}': {}", path, e))
		})?;
		let toml_config: TomlConfig = toml::from_str(&content).map_err(|e| {
			io::Error::new(
				io::ErrorKind::InvalidData,
				format!("Config file contains invalid TOML format: {}", e),
			)
		})?;

		builder.merge_toml(toml_config);
	}

	builder.merge_args(args);

	builder.build()
}

fn missing_field_err(field: &str) -> io::Error {
	io::Error::new(
		io::ErrorKind::InvalidInput,
		format!(
			"Missing `{}`. Please provide it via config file, CLI argument, or environment variable.",
			field
		),
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::client::types::ShortChannelId;
	use crate::liquidity::fees::{FeeLimit, FeePortion};

	const DEFAULT_CONFIG: &str = r#"
				[daemon]
				rest_service_address = "127.0.0.1:8477"
				swap_server_url = "https://localhost:11010"
				tick_interval_secs = 300

				[log]
				level = "Trace"
				file = "/var/log/swapd.log"

				[liquidity]
				autoloop = true
				auto_fee_budget_sat = 50000
				auto_fee_start_date = "2023-11-14T22:13:20Z"
				max_auto_in_flight = 2
				failure_backoff_secs = 3600
				sweep_conf_target = 10
				htlc_conf_target = 3
				client_timeout_secs = 15

				[liquidity.fee_limit]
				fee_portion_ppm = 10000

				[[liquidity.channel_rules]]
				channel_id = 123
				swap_type = "out"
				min_incoming_pct = 10
				min_outgoing_pct = 10
				"#;

	fn empty_args_config() -> ArgsConfig {
		ArgsConfig {
			config_file: None,
			rest_service_address: None,
			swap_server_url: None,
			log_level: None,
		}
	}

	fn missing_field_msg(field: &str) -> String {
		format!(
			"Missing `{}`. Please provide it via config file, CLI argument, or environment variable.",
			field
		)
	}

	#[test]
	fn test_config_from_file() {
		let storage_path = std::env::temp_dir();
		let config_file_name = "test_swapd_config_from_file.toml";

		fs::write(storage_path.join(config_file_name), DEFAULT_CONFIG).unwrap();

		let mut args_config = empty_args_config();
		args_config.config_file =
			Some(storage_path.join(config_file_name).to_string_lossy().to_string());

		let config = load_config(&args_config).unwrap();

		assert_eq!(config.rest_service_addr, "127.0.0.1:8477".parse().unwrap());
		assert_eq!(config.swap_server_url, "https://localhost:11010");
		assert_eq!(config.tick_interval, Duration::from_secs(300));
		assert_eq!(config.log_level, LevelFilter::Trace);
		assert_eq!(config.log_file_path, Some("/var/log/swapd.log".to_string()));

		let liquidity = &config.liquidity;
		assert!(liquidity.autoloop);
		assert_eq!(liquidity.auto_fee_budget_sat, 50_000);
		assert_eq!(liquidity.max_auto_in_flight, 2);
		assert_eq!(liquidity.failure_backoff, Duration::from_secs(3_600));
		assert_eq!(
			liquidity.fee_limit,
			FeeLimit::Portion(FeePortion { fee_portion_ppm: 10_000 })
		);
		assert_eq!(liquidity.channel_rules.len(), 1);
		assert!(liquidity.channel_rules.contains_key(&ShortChannelId(123)));
	}

	#[test]
	fn test_config_defaults_without_liquidity_section() {
		let storage_path = std::env::temp_dir();
		let config_file_name = "test_swapd_config_defaults.toml";

		let toml_config = r#"
				[daemon]
				rest_service_address = "127.0.0.1:8477"
				swap_server_url = "https://localhost:11010"
				"#;
		fs::write(storage_path.join(config_file_name), toml_config).unwrap();

		let mut args_config = empty_args_config();
		args_config.config_file =
			Some(storage_path.join(config_file_name).to_string_lossy().to_string());

		let config = load_config(&args_config).unwrap();
		assert_eq!(config.tick_interval, DEFAULT_TICK_INTERVAL);
		assert_eq!(config.log_level, LevelFilter::Debug);
		assert_eq!(config.liquidity, Parameters::default());
	}

	#[test]
	fn test_config_missing_fields() {
		let args_config = empty_args_config();
		let err = load_config(&args_config).unwrap_err();
		assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
		assert_eq!(err.to_string(), missing_field_msg("rest_service_address"));

		let mut args_config = empty_args_config();
		args_config.rest_service_address = Some("127.0.0.1:8477".to_string());
		let err = load_config(&args_config).unwrap_err();
		assert_eq!(err.to_string(), missing_field_msg("swap_server_url"));
	}

	#[test]
	fn test_args_config_overrides_file() {
		let storage_path = std::env::temp_dir();
		let config_file_name = "test_swapd_args_override.toml";

		fs::write(storage_path.join(config_file_name), DEFAULT_CONFIG).unwrap();

		let mut args_config = empty_args_config();
		args_config.config_file =
			Some(storage_path.join(config_file_name).to_string_lossy().to_string());
		args_config.rest_service_address = Some("127.0.0.1:9000".to_string());
		args_config.log_level = Some("Info".to_string());

		let config = load_config(&args_config).unwrap();
		assert_eq!(config.rest_service_addr, "127.0.0.1:9000".parse().unwrap());
		assert_eq!(config.log_level, LevelFilter::Info);
		// Fields without an override keep the file's values.
		assert_eq!(config.swap_server_url, "https://localhost:11010");
	}

	#[test]
	fn test_invalid_liquidity_section_rejected() {
		let storage_path = std::env::temp_dir();
		let config_file_name = "test_swapd_invalid_liquidity.toml";

		let toml_config = r#"
				[daemon]
				rest_service_address = "127.0.0.1:8477"
				swap_server_url = "https://localhost:11010"

				[liquidity]
				auto_fee_start_date = "not-a-date"
				"#;
		fs::write(storage_path.join(config_file_name), toml_config).unwrap();

		let mut args_config = empty_args_config();
		args_config.config_file =
			Some(storage_path.join(config_file_name).to_string_lossy().to_string());

		let err = load_config(&args_config).unwrap_err();
		assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
		assert!(err.to_string().contains("auto_fee_start_date"));
	}
}
