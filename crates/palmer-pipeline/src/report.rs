use palmer_core::PipelineResult;
use palmer_io::write_atomic;
use palmer_metrics::{FeatureImportance, RocCurve};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Data behind one evaluation plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlotData {
    ConfusionMatrix {
        labels: Vec<String>,
        matrix: Vec<Vec<usize>>,
    },
    Roc(RocCurve),
    FeatureImportance { features: Vec<FeatureImportance> },
}

/// Destination for evaluation metrics and plots.
pub trait ReportSink {
    fn log_metric(&mut self, name: &str, value: f64) -> PipelineResult<()>;
    fn log_plot(&mut self, name: &str, plot: PlotData) -> PipelineResult<()>;

    /// Flush anything buffered. Called once after the last metric.
    fn finish(&mut self) -> PipelineResult<()> {
        Ok(())
    }
}

/// Keeps everything in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub metrics: BTreeMap<String, f64>,
    pub plots: BTreeMap<String, PlotData>,
}

impl ReportSink for MemorySink {
    fn log_metric(&mut self, name: &str, value: f64) -> PipelineResult<()> {
        self.metrics.insert(name.to_string(), value);
        Ok(())
    }

    fn log_plot(&mut self, name: &str, plot: PlotData) -> PipelineResult<()> {
        self.plots.insert(name.to_string(), plot);
        Ok(())
    }
}

/// Writes `metrics.json`, `plots/<name>.json` and `report.md` under a
/// directory when [`ReportSink::finish`] runs. Nothing touches disk before that.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    buffer: MemorySink,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectorySink {
            dir: dir.into(),
            buffer: MemorySink::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> PipelineResult<()> {
        let bytes = serde_json::to_vec_pretty(value).map_err(io::Error::from)?;
        write_atomic(path, &bytes)
    }

    /// Remove plot files a previous run left behind.
    fn remove_stale_plots(&self) -> PipelineResult<()> {
        let plots = self.dir.join("plots");
        if !plots.is_dir() {
            return Ok(());
        }
        for entry in fs::read_dir(&plots)? {
            let path = entry?.path();
            let stale = path.extension().is_some_and(|ext| ext == "json")
                && path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .map_or(true, |stem| !self.buffer.plots.contains_key(stem));
            if stale {
                fs::remove_file(&path)?;
                debug!(path = %path.display(), "removed stale plot");
            }
        }
        Ok(())
    }
}

impl ReportSink for DirectorySink {
    fn log_metric(&mut self, name: &str, value: f64) -> PipelineResult<()> {
        self.buffer.log_metric(name, value)
    }

    fn log_plot(&mut self, name: &str, plot: PlotData) -> PipelineResult<()> {
        self.buffer.log_plot(name, plot)
    }

    fn finish(&mut self) -> PipelineResult<()> {
        self.write_json(&self.dir.join("metrics.json"), &self.buffer.metrics)?;
        for (name, plot) in &self.buffer.plots {
            self.write_json(&self.dir.join("plots").join(format!("{}.json", name)), plot)?;
        }
        self.remove_stale_plots()?;
        write_atomic(&self.dir.join("report.md"), render_markdown(&self.buffer).as_bytes())?;
        info!(dir = %self.dir.display(), "wrote evaluation report");
        Ok(())
    }
}

/// Markdown summary: metric table, confusion matrix, importance table.
pub fn render_markdown(report: &MemorySink) -> String {
    let mut out = String::from("# Evaluation\n\n| metric | value |\n|---|---|\n");
    for (name, value) in &report.metrics {
        let _ = writeln!(out, "| {} | {:.4} |", name, value);
    }

    for plot in report.plots.values() {
        match plot {
            PlotData::ConfusionMatrix { labels, matrix } => {
                out.push_str("\n## Confusion matrix\n\n| true \\ predicted |");
                for label in labels {
                    let _ = write!(out, " {} |", label);
                }
                out.push_str("\n|---|");
                out.push_str(&"---|".repeat(labels.len()));
                out.push('\n');
                for (label, row) in labels.iter().zip(matrix) {
                    let _ = write!(out, "| {} |", label);
                    for count in row {
                        let _ = write!(out, " {} |", count);
                    }
                    out.push('\n');
                }
            }
            PlotData::FeatureImportance { features } => {
                out.push_str("\n## Permutation importance\n\n| feature | mean | std |\n|---|---|---|\n");
                for fi in features {
                    let _ = writeln!(
                        out,
                        "| {} | {:.4} | {:.4} |",
                        fi.feature, fi.importance_mean, fi.importance_std
                    );
                }
            }
            PlotData::Roc(curve) => {
                let _ = write!(
                    out,
                    "\n## ROC\n\n{} points, AUC {:.4}\n",
                    curve.points.len(),
                    curve.auc
                );
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn confusion() -> PlotData {
        PlotData::ConfusionMatrix {
            labels: vec!["female".into(), "male".into()],
            matrix: vec![vec![30, 4], vec![3, 32]],
        }
    }

    #[test]
    fn test_markdown_tables() {
        let mut sink = MemorySink::default();
        sink.log_metric("accuracy", 0.898_61).unwrap();
        sink.log_plot("confusion_matrix", confusion()).unwrap();
        let md = render_markdown(&sink);
        assert!(md.contains("| accuracy | 0.8986 |"));
        assert!(md.contains("| female | 30 | 4 |"));
        assert!(md.contains("| male | 3 | 32 |"));
    }

    #[test]
    fn test_directory_sink_writes_on_finish() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("eval");
        let mut sink = DirectorySink::new(&out);
        sink.log_metric("accuracy", 0.75).unwrap();
        sink.log_plot("confusion_matrix", confusion()).unwrap();
        assert!(!out.exists());

        sink.finish().unwrap();
        let metrics: BTreeMap<String, f64> =
            serde_json::from_str(&fs::read_to_string(out.join("metrics.json")).unwrap()).unwrap();
        assert_eq!(metrics["accuracy"], 0.75);

        let plot: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("plots/confusion_matrix.json")).unwrap()).unwrap();
        assert_eq!(plot["type"], "confusion_matrix");
        assert_eq!(plot["matrix"][1][1], 32);
        assert!(out.join("report.md").exists());
    }

    #[test]
    fn test_directory_sink_drops_plots_from_earlier_runs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("eval");
        let roc = PlotData::Roc(RocCurve {
            points: Vec::new(),
            auc: 0.9,
        });

        let mut first = DirectorySink::new(&out);
        first.log_plot("confusion_matrix", confusion()).unwrap();
        first.log_plot("roc", roc).unwrap();
        first.finish().unwrap();
        assert!(out.join("plots/roc.json").exists());

        let mut second = DirectorySink::new(&out);
        second.log_plot("confusion_matrix", confusion()).unwrap();
        second.finish().unwrap();
        assert!(out.join("plots/confusion_matrix.json").exists());
        assert!(!out.join("plots/roc.json").exists());
    }
}
