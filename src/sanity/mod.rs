use log::{debug, info};

use layoutcheck_api::{
    config::CheckerConfig, finding::Finding, layout::LayoutModel, primitives::bytes::ByteCount,
};

mod rules;

use rules::{Context, RULES};

/// Runs the sanity rules over proposed storage layouts.
#[derive(Debug, Clone)]
pub struct SanityChecker {
    product_name: String,
    no_swap_margin: ByteCount,
}

impl Default for SanityChecker {
    fn default() -> Self {
        Self::new(&CheckerConfig::default())
    }
}

impl SanityChecker {
    pub fn new(config: &CheckerConfig) -> Self {
        Self {
            product_name: config.product_name.clone(),
            no_swap_margin: config.no_swap_margin(),
        }
    }

    /// Checks `layout` and returns every problem found, in rule order.
    /// `min_ram_mib` is the memory the installation needs when swap is
    /// available.
    ///
    /// Problems are reported as findings, never as errors: the operator
    /// needs to see all of them at once.
    pub fn check(&self, layout: &LayoutModel, min_ram_mib: u64) -> Vec<Finding> {
        let ctx = Context {
            layout,
            product_name: &self.product_name,
            min_ram: ByteCount::from_mib(min_ram_mib),
            no_swap_margin: self.no_swap_margin,
        };

        let mut findings = Vec::new();
        for rule in RULES.iter() {
            let rule_findings = (rule.check)(&ctx);
            debug!(
                "Sanity rule '{}' produced {} finding(s)",
                rule.name,
                rule_findings.len()
            );
            findings.extend(rule_findings);
        }

        let errors = findings.iter().filter(|f| f.is_error()).count();
        let warnings = findings.len() - errors;
        info!("Storage sanity check found {errors} error(s) and {warnings} warning(s)");
        tracing::info!(metric_name = "sanity_check", errors, warnings);

        findings
    }
}
