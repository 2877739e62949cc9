mod error;

use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use rasterpdf_config::Config;
use rasterpdf_render::{DimensionUnit, GenerationParameters, Orientation, PageFormat, PdfGenerator};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

/// Convert an HTML document to PDF and print the path of the result.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// HTML file to convert, or `-` to read from standard input.
    input: PathBuf,
    /// Folder to write the PDF to (defaults to the provisioning root).
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Configuration file (toml, yaml or json).
    #[arg(short, long, env = "RASTERPDF_CONFIG")]
    config: Option<PathBuf>,
    /// Provisioning root for the renderer and staged HTML.
    #[arg(long)]
    root: Option<PathBuf>,
    /// Provision the renderer for this operating system instead of the host.
    #[arg(long)]
    platform: Option<String>,
    /// Directory to provision the renderer from instead of the built-in copy.
    #[arg(long)]
    resources: Option<PathBuf>,
    /// Renderer deadline in seconds; 0 waits forever.
    #[arg(long)]
    timeout: Option<u64>,
    #[arg(short, long, value_parser = parse::<PageFormat>)]
    format: Option<PageFormat>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    /// Unit of --width and --height (mm, cm, in, px).
    #[arg(long, value_parser = parse::<DimensionUnit>)]
    unit: Option<DimensionUnit>,
    #[arg(long, value_parser = parse::<Orientation>)]
    orientation: Option<Orientation>,
    /// Scaling factor, where 1.0 is 100%.
    #[arg(long)]
    zoom: Option<f64>,
}

fn parse<T: FromStr<Err = rasterpdf_render::error::Error>>(s: &str) -> std::result::Result<T, String> {
    s.parse::<T>().map_err(|e| (*e).to_string())
}

impl Args {
    fn configure(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref()).or_raise(|| ErrorKind::Config)?;
        if let Some(root) = &self.root {
            config.root = Some(root.clone());
        }
        if let Some(platform) = &self.platform {
            config.platform = Some(platform.clone());
        }
        if let Some(resources) = &self.resources {
            config.resources = Some(resources.clone());
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        Ok(config)
    }

    fn parameters(&self, defaults: &GenerationParameters) -> GenerationParameters {
        let mut params = defaults.clone();
        params.page_width = self.width.unwrap_or(params.page_width);
        params.page_height = self.height.unwrap_or(params.page_height);
        params.dimension_unit = self.unit.unwrap_or(params.dimension_unit);
        params.format = self.format.unwrap_or(params.format);
        params.orientation = self.orientation.unwrap_or(params.orientation);
        params.zoom_factor = self.zoom.unwrap_or(params.zoom_factor);
        params
    }

    fn html(&self) -> Result<Vec<u8>> {
        if self.input.as_os_str() == "-" {
            let mut html = Vec::new();
            std::io::stdin().read_to_end(&mut html).or_raise(|| ErrorKind::Input)?;
            Ok(html)
        } else {
            std::fs::read(&self.input).or_raise(|| ErrorKind::Input)
        }
    }
}

fn run(args: &Args) -> Result<PathBuf> {
    let config = args.configure()?;
    let params = args.parameters(&config.defaults);
    params.validate().or_raise(|| ErrorKind::Render)?;
    let generator = PdfGenerator::new(config.into_generator_config().or_raise(|| ErrorKind::Config)?)
        .or_raise(|| ErrorKind::Config)?;
    let html = args.html()?;
    tracing::debug!(input = %args.input.display(), size = html.len(), "HTML read");
    generator.generate(html, args.output.as_deref(), Some(&params)).or_raise(|| ErrorKind::Render)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(pdf) => {
            println!("{}", pdf.display());
            ExitCode::SUCCESS
        },
        Err(err) => {
            eprintln!("{err:?}");
            ExitCode::FAILURE
        },
    }
}
