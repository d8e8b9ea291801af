//! Writing a run's outputs to disk.

use crate::error::Result;
use crate::types::PipelineRunResult;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the metadata file written next to the outputs.
pub const METADATA_FILE: &str = "pipeline-metadata.json";

/// File name for a unit's output.
///
/// The unit name is lowercased with spaces turned into hyphens, then given a
/// suffix chosen by the first keyword it contains.
///
/// ```
/// use consultant_pipeline::persist::output_filename;
///
/// assert_eq!(output_filename("BPMN Generation"), "bpmn-generation.bpmn");
/// assert_eq!(output_filename("Transcript Analysis"), "transcript-analysis-analysis.md");
/// assert_eq!(output_filename("Process Optimization"), "process-optimization-recommendations.md");
/// assert_eq!(output_filename("Notes"), "notes.txt");
/// ```
pub fn output_filename(unit_name: &str) -> String {
    let suffix = if unit_name.contains("BPMN") {
        ".bpmn"
    } else if unit_name.contains("Analysis") {
        "-analysis.md"
    } else if unit_name.contains("Optimization") {
        "-recommendations.md"
    } else {
        ".txt"
    };
    format!("{}{}", unit_name.to_lowercase().replace(' ', "-"), suffix)
}

impl PipelineRunResult {
    /// Write every non-null output and the run metadata into `dir`.
    ///
    /// Creates `dir` if needed. Returns the paths written, metadata last.
    pub fn save_outputs(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let mut written = Vec::new();
        for (unit, output) in &self.outputs {
            let Some(text) = output else {
                debug!(unit = %unit, "no output to save");
                continue;
            };
            let path = dir.join(output_filename(unit));
            fs::write(&path, text)?;
            written.push(path);
        }

        let metadata_path = dir.join(METADATA_FILE);
        fs::write(&metadata_path, serde_json::to_string_pretty(&self.metadata)?)?;
        written.push(metadata_path);

        info!(dir = %dir.display(), files = written.len(), "outputs saved");
        Ok(written)
    }
}
