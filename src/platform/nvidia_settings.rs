use std::path::PathBuf;
use std::process::Command;

use crate::core::legacy::ReportSource;
use crate::error::{NvChartError, Result};

const PROGRAM: &str = "nvidia-settings";

/// Queries requested from nvidia-settings, in order
pub const QUERY_ATTRIBUTES: [&str; 5] = [
    "GPUUtilization",
    "GPUCurrentClockFreqs",
    "GPUCoreTemp",
    "TotalDedicatedGPUMemory",
    "UsedDedicatedGPUMemory",
];

/// Runs `nvidia-settings` against display `:0` and captures its report
#[derive(Debug, Clone)]
pub struct NvidiaSettings {
    display: String,
}

impl Default for NvidiaSettings {
    fn default() -> Self {
        Self {
            display: ":0".to_string(),
        }
    }
}

impl NvidiaSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full argument list passed to the tool
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["-c".to_string(), self.display.clone()];
        for attribute in QUERY_ATTRIBUTES {
            args.push("-q".to_string());
            args.push(attribute.to_string());
        }
        args
    }

    fn locate() -> Result<PathBuf> {
        which::which(PROGRAM)
            .map_err(|e| NvChartError::legacy_source(format!("{} not found: {}", PROGRAM, e)))
    }
}

impl ReportSource for NvidiaSettings {
    /// Stdout followed by stderr; the exit status is not checked, the
    /// report length decides plausibility
    fn fetch(&mut self) -> Result<String> {
        let program = Self::locate()?;
        let output = Command::new(program).args(self.args()).output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            log::debug!("{} stderr: {}", PROGRAM, stderr.trim());
        }

        let mut report = stdout.into_owned();
        report.push_str(&stderr);
        Ok(report)
    }
}
