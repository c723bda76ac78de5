//! wkpdf CLI - HTML to PDF via wkhtmltopdf

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use wkpdf::{Document, ErrorKind, Page, RendererConfig};

#[derive(Parser)]
#[command(name = "wkpdf")]
#[command(version)]
#[command(about = "Convert HTML files, URLs and stdin into a single PDF", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render pages into one PDF
    Render {
        #[command(flatten)]
        document: DocumentArgs,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print the renderer arguments without running it
    Args {
        #[command(flatten)]
        document: DocumentArgs,

        /// Print as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct DocumentArgs {
    /// Pages in order: file path, http(s) URL, or - for HTML on stdin
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<String>,

    /// Cover page, placed before all other pages
    #[arg(long, value_name = "INPUT")]
    cover: Option<String>,

    /// Raw document option token, repeatable (e.g. -O --page-size -O A4)
    #[arg(short = 'O', long = "option", value_name = "TOKEN", allow_hyphen_values = true)]
    options: Vec<String>,

    /// JSON renderer configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Renderer executable
    #[arg(long, env = "WKHTMLTOPDF_PATH", value_name = "PATH")]
    renderer: Option<PathBuf>,

    /// Virtual-display wrapper used when the direct run fails
    #[arg(long, value_name = "PATH", conflicts_with = "no_wrapper")]
    wrapper: Option<PathBuf>,

    /// Do not retry under a display wrapper
    #[arg(long)]
    no_wrapper: bool,

    /// Directory for temp page files
    #[arg(long, value_name = "DIR")]
    temp_dir: Option<PathBuf>,

    /// Kill the renderer after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

impl DocumentArgs {
    fn renderer_config(&self) -> wkpdf::Result<RendererConfig> {
        let mut config = match self.config {
            Some(ref path) => RendererConfig::from_json_file(path)?,
            None => RendererConfig::from_env()?,
        };

        if let Some(ref renderer) = self.renderer {
            config = config.with_renderer(renderer);
        }
        if let Some(ref wrapper) = self.wrapper {
            config = config.with_display_wrapper(wrapper);
        }
        if self.no_wrapper {
            config = config.without_display_wrapper();
        }
        if let Some(ref dir) = self.temp_dir {
            config = config.with_temp_root(dir);
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    fn build(&self) -> Result<Document, Box<dyn std::error::Error>> {
        let stdin_inputs = self
            .inputs
            .iter()
            .chain(self.cover.iter())
            .filter(|i| i.as_str() == "-")
            .count();
        if stdin_inputs > 1 {
            return Err("stdin (-) can be used for at most one input".into());
        }

        let mut doc = Document::with_config(self.renderer_config()?);
        doc.add_options(self.options.iter().cloned());

        if let Some(ref cover) = self.cover {
            doc.add_cover(page_for(cover)?);
        }
        for input in &self.inputs {
            doc.add_page(page_for(input)?);
        }

        Ok(doc)
    }
}

fn page_for(input: &str) -> wkpdf::Result<Page> {
    if input == "-" {
        Page::from_reader(io::stdin().lock())
    } else if input.starts_with("http://") || input.starts_with("https://") {
        Ok(Page::url(input))
    } else {
        Ok(Page::file(input))
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render { document, output } => cmd_render(&document, output.as_deref()),
        Commands::Args { document, json } => cmd_args(&document, json),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        if let Some(err) = e.downcast_ref::<wkpdf::Error>() {
            if err.kind() == ErrorKind::Cleanup {
                eprintln!(
                    "{}",
                    "The PDF was produced but a temp directory was left behind.".yellow()
                );
            }
        }
        std::process::exit(1);
    }
}

fn cmd_render(
    document: &DocumentArgs,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = document.build()?;
    log::debug!(
        "{} {:?}",
        doc.config().renderer.display(),
        doc.arguments()
    );

    match output {
        Some(path) => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap(),
            );
            pb.set_message(format!("Rendering {} page(s)...", doc.pages().len()));
            pb.enable_steady_tick(Duration::from_millis(100));

            let result = doc.write_to_file(path);
            pb.finish_and_clear();
            result?;

            println!("{} {}", "Saved to".green(), path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            doc.write(&mut stdout)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

fn cmd_args(document: &DocumentArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let doc = document.build()?;
    let args = doc.arguments();

    if json {
        println!("{}", serde_json::to_string_pretty(&args)?);
    } else {
        println!("{} {}", doc.config().renderer.display(), args.join(" "));
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "wkpdf".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("HTML to PDF through wkhtmltopdf");
}
