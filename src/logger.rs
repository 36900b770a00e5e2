use log::LevelFilter;
use env_logger::{Builder, Target};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use chrono::Local;

struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()?;
        self.file.flush()
    }
}

/// Installs the process-wide logger. Call once, at startup.
///
/// `RUST_LOG` overrides the default `info` level. If `log_file` cannot be
/// opened, logging goes to stdout only.
pub fn init(log_file: &Path) {
    let file = OpenOptions::new().create(true).append(true).open(log_file);

    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, LevelFilter::Info)
        .parse_default_env();

    let file_error = match file {
        Ok(file) => {
            builder.target(Target::Pipe(Box::new(Tee { file })));
            None
        }
        Err(e) => {
            builder.target(Target::Stdout);
            Some(e)
        }
    };

    if builder.try_init().is_err() {
        return;
    }

    match file_error {
        None => log::info!("Logger initialized ({:?}).", log_file),
        Some(e) => log::warn!("Could not open log file {:?}: {}. Logging to stdout only.", log_file, e),
    }
}
