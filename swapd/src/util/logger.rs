//! A minimal logger writing timestamped lines to stdout and, optionally, a
//! log file.

use std::fs::{File, OpenOptions};
use std::io;
use std::io::Write;
use std::sync::{Mutex, OnceLock};

use chrono::{SecondsFormat, Utc};
use log::{LevelFilter, Log, Metadata, Record};

static LOGGER: OnceLock<Logger> = OnceLock::new();

struct Logger {
	level: LevelFilter,
	file: Option<Mutex<File>>,
}

impl Log for Logger {
	fn enabled(&self, metadata: &Metadata) -> bool {
		metadata.level() <= self.level
	}

	fn log(&self, record: &Record) {
		if !self.enabled(record.metadata()) {
			return;
		}

		let line = format!(
			"{} {:<5} [{}] {}",
			Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
			record.level(),
			record.target(),
			record.args()
		);

		println!("{}", line);
		if let Some(file) = &self.file {
			let mut file = file.lock().unwrap();
			let _ = writeln!(file, "{}", line);
		}
	}

	fn flush(&self) {
		if let Some(file) = &self.file {
			let _ = file.lock().unwrap().flush();
		}
	}
}

pub(crate) fn init(level: LevelFilter, file_path: Option<&str>) -> io::Result<()> {
	let file = match file_path {
		Some(path) => {
			let file = OpenOptions::new().create(true).append(true).open(path)?;
			Some(Mutex::new(file))
		},
		None => None,
	};

	let logger = LOGGER.get_or_init(|| Logger { level, file });
	log::set_logger(logger)
		.map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e.to_string()))?;
	log::set_max_level(level);
	Ok(())
}
