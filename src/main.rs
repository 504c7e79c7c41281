use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use pgi_renderer::config::SiteConfig;
use pgi_renderer::dataset::{ContentProvider, Dataset};
use pgi_renderer::render;

#[derive(Parser)]
#[command(name = "pgi_renderer", about = "Pet Gadget Insider article pipeline")]
struct Cli {
    /// Dataset directory (default: PGI_DATA_DIR or ./data)
    #[arg(long)]
    data: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one article fragment to stdout
    Render {
        slug: String,
    },
    /// Render every article into the output directory
    Build {
        /// Output directory (default: PGI_OUT_DIR or ./dist)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List placeholders that do not resolve against the link table
    Check,
    /// Show dataset statistics
    Stats,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let site = SiteConfig::load();
    let data_dir = cli.data.unwrap_or_else(|| PathBuf::from(&site.data_dir));
    let dataset = Dataset::load(&data_dir)
        .with_context(|| format!("loading dataset from {}", data_dir.display()))?;

    let result = match cli.command {
        Commands::Render { slug } => {
            let page = render::render_page(&dataset, &slug, &site)?;
            println!("{}", page.to_fragment());
            Ok(())
        }
        Commands::Build { out } => {
            let out_dir = out.unwrap_or_else(|| PathBuf::from(&site.out_dir));
            if dataset.articles().is_empty() {
                println!("No articles in dataset.");
                return Ok(());
            }
            println!(
                "Building {} articles into {}...",
                dataset.articles().len(),
                out_dir.display()
            );
            let counts = build_articles(&dataset, &site, &out_dir)?;
            counts.print();
            Ok(())
        }
        Commands::Check => {
            let broken = collect_broken_links(&dataset);
            if !broken.is_empty() {
                for (slug, id) in &broken {
                    println!("{}: unresolved id {:?}", slug, id);
                }
                println!("\n{} unresolved placeholder(s).", broken.len());
                std::process::exit(1);
            }
            println!(
                "All placeholders resolve ({} link ids).",
                dataset.links().len()
            );
            Ok(())
        }
        Commands::Stats => {
            let s = dataset.stats();
            let with_faq = dataset
                .articles()
                .iter()
                .filter(|a| render::faq::extract(&a.body).is_some())
                .count();
            println!("Articles:       {}", s.articles);
            println!("Preformatted:   {}", s.preformatted);
            println!("With affiliate: {}", s.with_affiliate);
            println!("With FAQ:       {}", with_faq);
            println!("Link ids:       {}", s.links);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

struct BuildCounts {
    written: usize,
    errors: usize,
}

impl BuildCounts {
    fn print(&self) {
        println!("Wrote {} pages, {} errors.", self.written, self.errors);
    }
}

fn build_articles(dataset: &Dataset, site: &SiteConfig, out_dir: &Path) -> Result<BuildCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let articles = dataset.articles();
    let pb = ProgressBar::new(articles.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut counts = BuildCounts {
        written: 0,
        errors: 0,
    };

    for chunk in articles.chunks(64) {
        let rendered: Vec<_> = chunk
            .par_iter()
            .map(|a| {
                let page = render::render_article(a, dataset.links(), site);
                (a.slug.clone(), page.to_fragment())
            })
            .collect();

        for (slug, fragment) in rendered {
            match write_page(out_dir, &slug, &fragment) {
                Ok(()) => counts.written += 1,
                Err(e) => {
                    tracing::error!(slug = %slug, error = %e, "write failed");
                    counts.errors += 1;
                }
            }
        }
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(counts)
}

fn write_page(out_dir: &Path, slug: &str, fragment: &str) -> std::io::Result<()> {
    std::fs::write(out_dir.join(format!("{slug}.html")), fragment)
}

/// Placeholders with no table entry, per article. Preformatted bodies are
/// skipped, their placeholders are never resolved.
fn collect_broken_links(dataset: &Dataset) -> Vec<(String, String)> {
    let mut broken = Vec::new();
    for article in dataset.articles() {
        if article.preformatted {
            continue;
        }
        for id in render::links::unresolved_ids(&article.body, dataset.links()) {
            broken.push((article.slug.clone(), id));
        }
    }
    broken
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

// ── Tests ──
