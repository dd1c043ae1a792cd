//! Folio - QR codes and resume PDFs for every site of a personal portfolio.

mod cli;
mod config;
mod generator;
mod latex;
mod logger;
mod qr;
mod site;
mod utils;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use config::GeneratorConfig;
use generator::{Generator, publish_main_resume};
use latex::XelatexEngine;
use logger::{log_fail, log_ok};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = GeneratorConfig::from_cli(&cli)?;
    let engine = XelatexEngine::from_config(&config.latex);

    let report = Generator::new(&config, &engine).generate_all();

    if !report.overall_success() {
        log_fail("Processing failed!");
        return Ok(());
    }

    match publish_main_resume(&config, &report) {
        Ok(Some(path)) => log_ok(&format!("Copied main resume to root: {}", path.display())),
        Ok(None) => {}
        Err(e) => log!("error"; "{:#}", e),
    }

    print_summary();
    Ok(())
}

/// What a processed site directory ends up holding.
fn print_summary() {
    log!("folio"; "🎉 All portfolio sites processed successfully!");
    log!(
        "folio";
        "Each site directory is independent and contains:\n\
         • index.html - Site content\n\
         • resume.tex - LaTeX source\n\
         • resume.pdf - Generated PDF\n\
         • qr_code.png - QR code for that specific URL"
    );
}
