use clap::{Parser, Subcommand, ValueEnum};
use creative_report::config::{self, RenderEngine, ReportConfig};
use creative_report::context::{JsonContextProvider, NoContextProvider};
use creative_report::export::ExportedDocument;
use creative_report::imaging::{RustDecoder, is_supported_path};
use creative_report::output;
#[cfg(feature = "chrome")]
use creative_report::raster::ChromeRasterizer;
use creative_report::raster::LayoutRasterizer;
use creative_report::render::write_html;
use creative_report::session::ReportSession;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

type Session = ReportSession<RustDecoder>;

/// Screenshot inputs shared by every command that reads images.
#[derive(clap::Args, Clone)]
struct InputArgs {
    /// Screenshot files, or directories to search for screenshots
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

/// Flags for commands that generate a report.
#[derive(clap::Args, Clone)]
struct ReportArgs {
    #[command(flatten)]
    input: InputArgs,

    /// App name shown in the report and used for the PDF file name
    #[arg(long)]
    app_name: String,

    /// App store listing URL (display only)
    #[arg(long, default_value = "")]
    store_url: String,

    /// JSON catalog of app context keyed by app name
    #[arg(long)]
    context: Option<PathBuf>,

    /// Also write the HTML report to this file
    #[arg(long)]
    html: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Renderer {
    Layout,
    Chrome,
}

impl From<Renderer> for RenderEngine {
    fn from(r: Renderer) -> Self {
        match r {
            Renderer::Layout => RenderEngine::Layout,
            Renderer::Chrome => RenderEngine::Chrome,
        }
    }
}

#[derive(Parser)]
#[command(name = "creative-report")]
#[command(about = "Creative analysis reports for app store screenshots")]
#[command(long_about = "\
Creative analysis reports for app store screenshots

Screenshots are ordered by file name, analysed against the app's store
context, and exported as a paginated PDF named <app>_creative_analysis.pdf.

Typical use:

  creative-report check shots/
  creative-report report shots/ --app-name Acme --context apps.json --html acme.html
  creative-report export shots/ --app-name Acme --out-dir out/

Run 'creative-report gen-config' to generate a documented creative-report.toml.")]
#[command(version = env!("BUILD_VERSION"))]
struct Cli {
    /// Config file (defaults to ./creative-report.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode screenshots and show the gallery order
    Check(InputArgs),
    /// Generate a report and print its outline
    Report(ReportArgs),
    /// Generate a report and export it as PDF
    Export {
        #[command(flatten)]
        report: ReportArgs,

        /// Directory the PDF is written to
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Rasterizer to use (overrides render.engine from config)
        #[arg(long, value_enum)]
        renderer: Option<Renderer>,
    },
    /// Print a stock creative-report.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Check(input) => {
            let config = load_config(cli.config.as_deref())?;
            let mut session = Session::new(RustDecoder::new(), config);
            upload(&mut session, &input).await;
        }
        Command::Report(args) => {
            let config = load_config(cli.config.as_deref())?;
            let mut session = Session::new(RustDecoder::new(), config);
            upload(&mut session, &args.input).await;
            generate(&mut session, &args).await?;
        }
        Command::Export {
            report,
            out_dir,
            renderer,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let engine = renderer.map(RenderEngine::from).unwrap_or(config.render.engine);
            let mut session = Session::new(RustDecoder::new(), config);
            upload(&mut session, &report.input).await;
            generate(&mut session, &report).await?;

            println!("==> Exporting PDF to {}", out_dir.display());
            let doc = export(&session, engine, &out_dir).await?;
            output::print_export_output(&doc);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ReportConfig, config::ConfigError> {
    match path {
        Some(path) => config::load_config_file(path),
        None => config::load_config(Path::new(".")),
    }
}

/// Expand directories into the supported image files they contain.
///
/// Files named explicitly are kept whatever their extension; the decoder
/// sniffs the real format.
fn collect_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            paths.extend(
                WalkDir::new(input)
                    .follow_links(true)
                    .into_iter()
                    .filter_map(Result::ok)
                    .filter(|e| e.file_type().is_file() && is_supported_path(e.path()))
                    .map(|e| e.into_path()),
            );
        } else {
            paths.push(input.clone());
        }
    }
    paths
}

async fn upload(session: &mut Session, input: &InputArgs) {
    let paths = collect_inputs(&input.inputs);
    println!("{}", output::format_reading_header(paths.len()));
    let summary = session.upload_paths(&paths).await;
    output::print_ingest_output(&summary, session.gallery());
}

async fn generate(
    session: &mut Session,
    args: &ReportArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let generated = match &args.context {
        Some(path) => {
            let provider = JsonContextProvider::new(path);
            session
                .generate(&args.app_name, &args.store_url, &provider)
                .await
                .map(|_| ())
        }
        None => session
            .generate(&args.app_name, &args.store_url, &NoContextProvider)
            .await
            .map(|_| ()),
    };
    if let Err(e) = generated {
        eprintln!("{}", e.user_message());
        return Err(e.into());
    }

    if let Some(report) = session.report() {
        println!();
        output::print_report_output(report);
        if let Some(html) = &args.html {
            write_html(report, html)?;
            println!("HTML report \u{2192} {}", html.display());
        }
    }
    Ok(())
}

async fn export(
    session: &Session,
    engine: RenderEngine,
    out_dir: &Path,
) -> Result<ExportedDocument, Box<dyn std::error::Error>> {
    let render = &session.config().render;
    let result = match engine {
        RenderEngine::Layout => {
            session
                .export(&LayoutRasterizer::from_config(render), out_dir)
                .await
        }
        #[cfg(feature = "chrome")]
        RenderEngine::Chrome => {
            session
                .export(&ChromeRasterizer::from_config(render), out_dir)
                .await
        }
        #[cfg(not(feature = "chrome"))]
        RenderEngine::Chrome => {
            return Err("the chrome renderer needs a build with `--features chrome`".into());
        }
    };
    result.map_err(|e| {
        eprintln!("{}", e.user_message());
        Box::new(e) as Box<dyn std::error::Error>
    })
}
