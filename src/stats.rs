/// Gene assignment statistics tracking and reporting
use log::{info, warn};

use crate::scaffold::Assignment;

/// Tracks how the required gene slots of one run were filled
#[derive(Default, Debug)]
pub struct AssignmentSummary {
    /// Total number of gene slots
    pub total_genes: u64,
    /// Slots held by a single sequence
    pub complete: u64,
    /// Slots assembled from fragments on several sequences
    pub fragmented: u64,
    /// Slots nothing was found for
    pub missing: u64,
    /// Names of the missing genes, in slot order
    pub missing_genes: Vec<String>,
}

impl AssignmentSummary {
    /// Create new statistics tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Summarize a finished assignment map
    pub fn from_assignments<'a>(
        assignments: impl IntoIterator<Item = (&'a String, &'a Assignment)>,
    ) -> Self {
        let mut summary = Self::new();
        for (gene, assignment) in assignments {
            summary.record(gene, assignment);
        }
        summary
    }

    /// Record the outcome of one gene slot
    pub fn record(&mut self, gene: &str, assignment: &Assignment) {
        self.total_genes += 1;
        match assignment {
            Assignment::Unassigned => {
                self.missing += 1;
                self.missing_genes.push(gene.to_string());
            }
            Assignment::Complete(_) => self.complete += 1,
            Assignment::Fragmented(_) => self.fragmented += 1,
        }
    }

    /// Print summary statistics to log
    pub fn print_summary(&self) {
        if self.total_genes == 0 {
            info!("No gene slots processed");
            return;
        }

        info!("=== Gene Assignment Summary ===");
        info!("Required genes: {}", self.total_genes);
        info!(
            "Complete genes: {} ({:.2}%)",
            self.complete,
            self.complete_percent()
        );
        info!(
            "Fragmented genes: {} ({:.2}%)",
            self.fragmented,
            self.fragmented_percent()
        );
        info!(
            "Missing genes: {} ({:.2}%)",
            self.missing,
            self.missing_percent()
        );
        if !self.missing_genes.is_empty() {
            warn!("Missing: {}", self.missing_genes.join(", "));
            warn!("Missing genes may only have escaped the profile search");
        }
    }

    fn percent(&self, n: u64) -> f64 {
        if self.total_genes == 0 {
            0.0
        } else {
            100.0 * n as f64 / self.total_genes as f64
        }
    }

    pub fn complete_percent(&self) -> f64 {
        self.percent(self.complete)
    }

    pub fn fragmented_percent(&self) -> f64 {
        self.percent(self.fragmented)
    }

    pub fn missing_percent(&self) -> f64 {
        self.percent(self.missing)
    }

    /// Slots with any assignment (complete + fragmented)
    pub fn total_found(&self) -> u64 {
        self.complete + self.fragmented
    }
}
