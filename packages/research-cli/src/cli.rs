//! Command-line arguments.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::landscape::parse_url_list;

#[derive(Parser, Debug)]
#[command(name = "market-research")]
#[command(about = "Classify company websites against a feature landscape")]
pub struct Cli {
    /// Landscape definition (JSON)
    pub landscape: PathBuf,

    /// Site URLs; bare domains get https://
    pub urls: Vec<String>,

    /// File with more URLs, comma- or newline-separated
    #[arg(long)]
    pub urls_file: Option<PathBuf>,

    /// Read pre-extracted site text from `<dir>/<host>.txt` instead of fetching
    #[arg(long)]
    pub text_dir: Option<PathBuf>,

    /// Report path [default: output/<landscape>_analysis.json]
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Ask the model for each site's company name
    #[arg(long)]
    pub identify_company: bool,

    /// Also extract each site's product name, description and features
    #[arg(long)]
    pub extract_products: bool,

    /// Sites processed at once (overrides MAX_CONCURRENT_SITES)
    #[arg(long)]
    pub max_concurrent: Option<usize>,
}

impl Cli {
    /// All URLs from arguments and `--urls-file`, deduplicated in order.
    pub fn collect_urls(&self) -> Result<Vec<String>> {
        let mut urls = parse_url_list(&self.urls.join(","));
        if let Some(path) = &self.urls_file {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read URL file {}", path.display()))?;
            urls.extend(parse_url_list(&raw));
        }

        let mut seen = std::collections::HashSet::new();
        urls.retain(|u| seen.insert(u.clone()));

        if urls.is_empty() {
            bail!("no URLs given; pass them as arguments or with --urls-file");
        }
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let cli = Cli::try_parse_from([
            "market-research",
            "landscape.json",
            "acme.io",
            "https://b.example",
            "--text-dir",
            "texts",
            "--identify-company",
            "--extract-products",
            "--max-concurrent",
            "2",
        ])
        .unwrap();

        assert_eq!(cli.landscape, PathBuf::from("landscape.json"));
        assert_eq!(cli.text_dir, Some(PathBuf::from("texts")));
        assert!(cli.identify_company);
        assert!(cli.extract_products);
        assert_eq!(cli.max_concurrent, Some(2));
        assert_eq!(
            cli.collect_urls().unwrap(),
            vec!["https://acme.io", "https://b.example"]
        );
    }

    #[test]
    fn test_urls_file_merged_and_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("urls.txt");
        std::fs::write(&file, "b.example\nc.example # later\n").unwrap();

        let cli = Cli::try_parse_from([
            "market-research",
            "landscape.json",
            "b.example",
            "--urls-file",
            file.to_str().unwrap(),
        ])
        .unwrap();

        assert_eq!(
            cli.collect_urls().unwrap(),
            vec!["https://b.example", "https://c.example"]
        );
    }

    #[test]
    fn test_no_urls_is_error() {
        let cli = Cli::try_parse_from(["market-research", "landscape.json"]).unwrap();
        assert!(cli.collect_urls().is_err());
    }
}
