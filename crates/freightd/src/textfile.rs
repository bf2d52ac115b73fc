//! Prometheus textfile output.
//!
//! Writes the rendered metrics after every cycle, node-exporter textfile
//! style: into a temporary sibling first, then renamed over the target so
//! scrapers never read a partial file.

use std::path::{Path, PathBuf};

use tracing::warn;

use freightgrid_orchestrator::{CycleObserver, OrchestratorMetrics, render_prometheus};

pub struct TextfileObserver {
    path: PathBuf,
}

impl TextfileObserver {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn write(&self, metrics: &OrchestratorMetrics) -> std::io::Result<()> {
        let tmp = tmp_path(&self.path);
        std::fs::write(&tmp, render_prometheus(metrics))?;
        std::fs::rename(&tmp, &self.path)
    }
}

impl CycleObserver for TextfileObserver {
    fn on_cycle_complete(&self, metrics: &OrchestratorMetrics) {
        if let Err(e) = self.write(metrics) {
            warn!(path = ?self.path, error = %e, "failed to write metrics textfile");
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
