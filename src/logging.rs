use std::fs::File;
use std::io::Write;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Optional `<name>.log` file that mirrors what a fit reports.
#[derive(Debug, Default)]
pub struct RunLog {
    file: Option<File>,
}

impl RunLog {
    pub fn create(name: Option<&str>) -> Result<Self> {
        let file = name
            .map(|name| File::create(format!("{name}.log")).with_context(|| format!("create {name}.log")))
            .transpose()?;
        Ok(Self { file })
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    pub fn line(&mut self, message: &str, print: bool) -> Result<()> {
        if print {
            info!("{message}");
        }
        if let Some(file) = self.file.as_mut() {
            writeln!(file, "{message}")?;
        }
        Ok(())
    }

    pub fn warn(&mut self, message: &str) -> Result<()> {
        warn!("{message}");
        if let Some(file) = self.file.as_mut() {
            writeln!(file, "{message}")?;
        }
        Ok(())
    }
}
