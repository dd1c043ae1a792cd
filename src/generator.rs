//! Per-site orchestration.
//!
//! # Architecture
//!
//! ```text
//! generate_all()
//!     │
//!     ├── discover()            ──► SiteRegistry (main first, then by name)
//!     │
//!     └── for each site, in order, isolated from the others:
//!             Pending ──qr──► QrDone ──latex/skip──► CompiledOrSkipped ──► Complete
//!                │              │
//!                └──────────────┴──► Failed
//!
//! publish_main_resume()         ──► root/resume.pdf (only if any site succeeded)
//! ```

use crate::{
    config::GeneratorConfig,
    latex::{TexEngine, compile_site_resume},
    log,
    logger::{log_fail, log_info, log_ok},
    qr::generate_qr,
    site::{MAIN_SITE, RESUME_PDF, Site, SiteRegistry, discover},
    utils::fs::copy_with_mtime,
};
use anyhow::Result;
use std::path::PathBuf;

/// Where a site is in its processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteState {
    Pending,
    QrDone,
    CompiledOrSkipped,
    Failed,
    Complete,
}

impl SiteState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Complete)
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub successful: usize,
    pub total: usize,
    /// Final state of every site, in processing order.
    pub outcomes: Vec<(String, SiteState)>,
}

impl RunReport {
    /// At least one site made it to `Complete`.
    pub const fn overall_success(&self) -> bool {
        self.successful > 0
    }

    #[cfg(test)]
    pub fn state_of(&self, name: &str) -> Option<SiteState> {
        self.outcomes
            .iter()
            .find(|(site, _)| site == name)
            .map(|(_, state)| *state)
    }
}

pub struct Generator<'a> {
    config: &'a GeneratorConfig,
    engine: &'a dyn TexEngine,
}

impl<'a> Generator<'a> {
    pub fn new(config: &'a GeneratorConfig, engine: &'a dyn TexEngine) -> Self {
        Self { config, engine }
    }

    /// Discover every site under the root and process each one.
    pub fn generate_all(&self) -> RunReport {
        log!("folio"; "=== Portfolio Sites Generator ===");

        let registry = discover(&self.config.root);
        self.print_registry(&registry);

        let mut report = RunReport {
            total: registry.len(),
            ..RunReport::default()
        };

        for site in &registry {
            let state = self.process_site(site);
            if state == SiteState::Complete {
                report.successful += 1;
            }
            report.outcomes.push((site.name.clone(), state));
        }

        log!("folio"; "=== Processing Complete ===");
        log!(
            "folio";
            "Successfully processed {}/{} sites",
            report.successful,
            report.total
        );
        report
    }

    fn print_registry(&self, registry: &SiteRegistry) {
        log!("discover"; "Discovered {} site(s):", registry.len());
        for site in registry {
            let note = if site.has_index { "" } else { " (no index.html)" };
            log!("discover"; "  • {} → {}{}", site.name, self.config.site_url(&site.url_path), note);
        }
    }

    /// Drive one site to a terminal state. Never propagates an error.
    pub fn process_site(&self, site: &Site) -> SiteState {
        let mut state = SiteState::Pending;
        while !state.is_terminal() {
            state = match self.advance(site, state) {
                Ok(next) => next,
                Err(e) => {
                    log!("error"; "Error processing {}: {:#}", site.name, e);
                    SiteState::Failed
                }
            };
        }
        state
    }

    /// One transition of the per-site state machine.
    fn advance(&self, site: &Site, state: SiteState) -> Result<SiteState> {
        let next = match state {
            SiteState::Pending => {
                if !site.dir.is_dir() {
                    log_fail(&format!("Site directory {} does not exist, skipping", site.name));
                    return Ok(SiteState::Failed);
                }

                let url = site.url(&self.config.base_url);
                log!("site"; "=== Processing site: {} ({}) ===", site.name, url);

                let target = site.qr_target();
                generate_qr(&url, &target, &self.config.qr)?;
                log_ok(&format!("Generated QR code: {}", target.display()));
                SiteState::QrDone
            }
            SiteState::QrDone => {
                // Checked again here: the tree may have changed since discovery.
                if !(site.has_resume && site.resume_source().is_file()) {
                    log_info(&format!(
                        "No resume.tex found in {}, skipping PDF generation",
                        site.name
                    ));
                    SiteState::CompiledOrSkipped
                } else if compile_site_resume(self.engine, site, self.config.latex.excerpt_len) {
                    SiteState::CompiledOrSkipped
                } else {
                    log_fail(&format!("Failed to generate PDF for {}", site.name));
                    SiteState::Failed
                }
            }
            SiteState::CompiledOrSkipped => {
                log_ok(&format!("Site {} processing complete", site.name));
                SiteState::Complete
            }
            SiteState::Failed | SiteState::Complete => state,
        };
        Ok(next)
    }
}

/// Copy `main/resume.pdf` to the root as the portfolio's default resume.
///
/// Only acts after a successful run and only if the main PDF exists.
/// Returns the destination when a copy was made.
pub fn publish_main_resume(config: &GeneratorConfig, report: &RunReport) -> Result<Option<PathBuf>> {
    if !report.overall_success() {
        return Ok(None);
    }

    let main_resume = config.root.join(MAIN_SITE).join(RESUME_PDF);
    if !main_resume.is_file() {
        return Ok(None);
    }

    let root_resume = config.root_resume();
    copy_with_mtime(&main_resume, &root_resume)?;
    Ok(Some(root_resume))
}
