use anyhow::{bail, Context, Result};
use clap::Parser;
use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing_subscriber::{fmt::writer::BoxMakeWriter, EnvFilter};
use url::Url;
use vdemo_core::DEFAULT_BATCH_COUNT;
use vdemo_link::backend_url;

#[derive(Parser, Debug)]
#[command(
    name = "vdemo-console",
    about = "Publish person records under different schema versions and watch how a consumer reads them"
)]
pub struct Args {
    /// Host of the demo backend; it always listens on port 5678.
    #[arg(long, env = "VDEMO_BACKEND_ADDRESS", default_value = "localhost")]
    pub backend_host: String,
    /// Records requested per publish.
    #[arg(long, default_value_t = DEFAULT_BATCH_COUNT)]
    pub batch_count: u32,
    #[arg(long, env = "VDEMO_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub backend_url: Url,
    pub batch_count: u32,
    pub log_dir: PathBuf,
    pub log_stdout: bool,
}

pub fn load_config(args: Args) -> Result<Config> {
    if args.backend_host.trim().is_empty() {
        bail!("backend host is empty");
    }
    let backend_url = backend_url(&args.backend_host)
        .with_context(|| format!("backend host {:?}", args.backend_host))?;
    if args.batch_count == 0 {
        bail!("batch count must be at least 1");
    }
    let log_dir = args
        .log_dir
        .unwrap_or_else(|| std::env::temp_dir().join("vdemo"));
    Ok(Config {
        backend_url,
        batch_count: args.batch_count,
        log_dir,
        log_stdout: resolve_log_stdout(),
    })
}

fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn resolve_log_stdout() -> bool {
    std::env::var("VDEMO_LOG_STDOUT")
        .ok()
        .and_then(|value| parse_bool_flag(&value))
        .unwrap_or(false)
}

struct LogWriter {
    file: Option<Arc<Mutex<File>>>,
    stdout_enabled: bool,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.stdout_enabled {
            let _ = io::stdout().write_all(buf);
        }
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                file.write_all(buf)?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                file.flush()?;
            }
        }
        Ok(())
    }
}

fn open_log_file(log_dir: &Path) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(log_dir)?;
    let path = log_dir.join(format!("vdemo-console-{}.log", std::process::id()));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

/// The terminal belongs to the UI, so logs go to a file unless
/// `VDEMO_LOG_STDOUT` asks for a copy on stdout.
pub fn init_logging(config: &Config) -> Option<PathBuf> {
    let level = std::env::var("VDEMO_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let (path, file) = match open_log_file(&config.log_dir) {
        Ok((path, file)) => (Some(path), Some(Arc::new(Mutex::new(file)))),
        Err(err) => {
            eprintln!("log_file_error: {err}");
            (None, None)
        }
    };
    let stdout_enabled = config.log_stdout;
    let make_writer = BoxMakeWriter::new(move || LogWriter {
        file: file.clone(),
        stdout_enabled,
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(make_writer)
        .try_init();
    path
}
