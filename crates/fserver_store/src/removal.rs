//! Step-by-step removal reports.
//!
//! Removing a run touches three independent paths. Each step is attempted
//! regardless of the others and its outcome recorded, so a half-finished
//! removal tells the caller exactly what is left behind.

use crate::error::{Result, StoreError};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Outcome of one removal step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Removed,
    Missing,
    Failed(String),
}

impl StepStatus {
    pub fn from_io(result: io::Result<()>) -> Self {
        match result {
            Ok(()) => StepStatus::Removed,
            Err(e) if e.kind() == io::ErrorKind::NotFound => StepStatus::Missing,
            Err(e) => StepStatus::Failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalStep {
    pub label: String,
    pub path: PathBuf,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalReport {
    steps: Vec<RemovalStep>,
}

impl RemovalReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one step and record its outcome. Never short-circuits.
    pub fn attempt<F>(&mut self, label: &str, path: &Path, op: F)
    where
        F: FnOnce(&Path) -> StepStatus,
    {
        let status = op(path);
        match &status {
            StepStatus::Removed => debug!("Removed {} {}", label, path.display()),
            StepStatus::Missing => debug!("No {} at {}", label, path.display()),
            StepStatus::Failed(reason) => {
                warn!("Failed to remove {} {}: {}", label, path.display(), reason)
            }
        }
        self.steps.push(RemovalStep {
            label: label.to_string(),
            path: path.to_path_buf(),
            status,
        });
    }

    pub fn steps(&self) -> &[RemovalStep] {
        &self.steps
    }

    pub fn has_failures(&self) -> bool {
        self.steps
            .iter()
            .any(|s| matches!(s.status, StepStatus::Failed(_)))
    }

    pub fn all_missing(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|s| s.status == StepStatus::Missing)
    }

    /// Classify the report: nothing there is `NotFound`, any failed step is
    /// `PartialFailure`, anything else succeeded.
    pub fn into_result(self, what: &str) -> Result<RemovalReport> {
        if self.all_missing() {
            return Err(StoreError::not_found(format!("{} not found", what)));
        }
        if self.has_failures() {
            return Err(StoreError::PartialFailure(self));
        }
        Ok(self)
    }
}

impl fmt::Display for RemovalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            match &step.status {
                StepStatus::Removed => write!(f, "removed {} {}", step.label, step.path.display())?,
                StepStatus::Missing => write!(f, "missing {} {}", step.label, step.path.display())?,
                StepStatus::Failed(reason) => write!(
                    f,
                    "failed to remove {} {}: {}",
                    step.label,
                    step.path.display(),
                    reason
                )?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn report(statuses: Vec<StepStatus>) -> RemovalReport {
        let mut report = RemovalReport::new();
        for (i, status) in statuses.into_iter().enumerate() {
            report.attempt(&format!("step{}", i), Path::new("/x"), |_| status);
        }
        report
    }

    #[test]
    fn all_removed_is_ok() {
        let r = report(vec![StepStatus::Removed, StepStatus::Removed]);
        assert!(r.into_result("run").is_ok());
    }

    #[test]
    fn some_missing_is_still_ok() {
        let r = report(vec![StepStatus::Removed, StepStatus::Missing]);
        let r = r.into_result("run").unwrap();
        assert!(r.to_string().contains("missing step1"));
    }

    #[test]
    fn all_missing_is_not_found() {
        let r = report(vec![StepStatus::Missing, StepStatus::Missing]);
        let err = r.into_result("run x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn any_failure_is_partial() {
        let r = report(vec![
            StepStatus::Removed,
            StepStatus::Failed("permission denied".to_string()),
            StepStatus::Missing,
        ]);
        let err = r.into_result("run").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PartialFailure);
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn from_io_maps_not_found() {
        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(StepStatus::from_io(Err(missing)), StepStatus::Missing);
        assert_eq!(StepStatus::from_io(Ok(())), StepStatus::Removed);
    }
}
