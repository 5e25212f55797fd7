//! Logger setup: records go to stderr and, for prediction runs, to a log
//! file inside the output directory.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use env_logger::{Builder, Target};
use log::LevelFilter;

/// Writes every record to stderr and to an optional log file.
struct Tee {
    file: Option<File>,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

/// Level implied by the `--debug` and `--quiet` switches.
#[must_use]
pub fn level(debug: bool, quiet: bool) -> LevelFilter {
    if debug {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Error
    } else {
        LevelFilter::Info
    }
}

/// Installs the global logger. Appends to `log_file` when given.
pub fn init(level: LevelFilter, log_file: Option<&Path>) -> anyhow::Result<()> {
    let file = log_file
        .map(|path| File::options().create(true).append(true).open(path))
        .transpose()?;

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                buf.timestamp_seconds(),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(Tee { file })))
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_switches() {
        assert_eq!(level(false, false), LevelFilter::Info);
        assert_eq!(level(false, true), LevelFilter::Error);
        assert_eq!(level(true, true), LevelFilter::Debug);
    }

    #[test]
    fn test_tee_writes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("run.log");
        let mut tee = Tee {
            file: Some(File::create(&path).unwrap()),
        };
        tee.write_all(b"[t] INFO: hello\n").unwrap();
        tee.flush().unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "[t] INFO: hello\n");
    }
}
