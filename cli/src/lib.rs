use comic::{PanelSet, StoryRecord, types::PANEL_COUNT};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Failed to open panel {}: {source}", path.display())]
    PanelError {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Expected 3 panels, job lists {0}")]
    PanelCount(usize),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Offline composition job: existing panels plus a story, no model calls.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ComposeJob {
    /// Panel image paths in reading order, relative to the job file
    pub panels: Vec<String>,
    /// Where the finished strip is written
    pub output: String,
    /// Skip the paper texture pass
    #[serde(default)]
    pub skip_texture: bool,
    pub story: StoryRecord,
}

impl ComposeJob {
    /// Load ComposeJob from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(content)?)
    }

    /// Load ComposeJob from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load the job
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(CliError::UnsupportedFileFormat),
        }
    }

    pub fn to_toml(&self) -> Result<String, CliError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    /// Save ComposeJob to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CliError> {
        fs::write(path, serde_json::to_string_pretty(&self)?)?;
        Ok(())
    }

    /// Open every panel, resolving relative paths against `base_dir`.
    pub fn load_panels(&self, base_dir: &Path) -> Result<PanelSet, CliError> {
        if self.panels.len() != PANEL_COUNT {
            return Err(CliError::PanelCount(self.panels.len()));
        }
        let images = self
            .panels
            .iter()
            .map(|panel| {
                let path = base_dir.join(panel);
                image::open(&path).map_err(|source| CliError::PanelError { path, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        PanelSet::try_from(images).map_err(|_| CliError::PanelCount(self.panels.len()))
    }

    pub fn output_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    const JOB_TOML: &str = r#"
panels = ["panel_1.png", "panel_2.png", "panel_3.png"]
output = "out/comic.png"

[story]
title = "The Unexpected Curry"
text1 = "Gopal tastes the curry."
text2 = "It is far too spicy."
text3 = "He is the curry champion!"
"#;

    fn write_panels(dir: &Path) {
        for i in 1..=3 {
            RgbImage::from_pixel(30, 30, Rgb([10 * i as u8, 0, 0]))
                .save(dir.join(format!("panel_{i}.png")))
                .expect("Should save panel");
        }
    }

    #[test]
    fn test_job_from_toml() {
        let job = ComposeJob::from_toml(JOB_TOML).expect("Should parse job");
        assert_eq!(job.panels.len(), 3);
        assert!(!job.skip_texture);
        assert_eq!(job.story.title, "The Unexpected Curry");
    }

    #[test]
    fn test_job_from_file_by_extension() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let job = ComposeJob::from_toml(JOB_TOML).expect("Should parse job");

        let json_path = dir.path().join("job.json");
        job.to_json_file(&json_path).expect("Should save json");
        assert_eq!(ComposeJob::from_file(&json_path).expect("Should load json"), job);

        let toml_path = dir.path().join("job.toml");
        fs::write(&toml_path, job.to_toml().expect("Should render toml")).expect("Should write");
        assert_eq!(ComposeJob::from_file(&toml_path).expect("Should load toml"), job);

        assert!(matches!(
            ComposeJob::from_file(dir.path().join("job.yaml")),
            Err(CliError::UnsupportedFileFormat)
        ));
    }

    #[test]
    fn test_load_panels_relative_to_job() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        write_panels(dir.path());
        let job = ComposeJob::from_toml(JOB_TOML).expect("Should parse job");

        let panels = job.load_panels(dir.path()).expect("Should load panels");
        assert_eq!(panels.iter().count(), 3);
        assert_eq!(job.output_path(dir.path()), dir.path().join("out/comic.png"));
    }

    #[test]
    fn test_wrong_panel_count_rejected() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let mut job = ComposeJob::from_toml(JOB_TOML).expect("Should parse job");
        job.panels.pop();
        assert!(matches!(job.load_panels(dir.path()), Err(CliError::PanelCount(2))));
    }

    #[test]
    fn test_missing_panel_file() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let job = ComposeJob::from_toml(JOB_TOML).expect("Should parse job");
        assert!(matches!(job.load_panels(dir.path()), Err(CliError::PanelError { .. })));
    }
}
