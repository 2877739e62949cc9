use crate::error::{ErrorKind, Result};
use crate::layout::renderer_args;
use crate::params::GenerationParameters;
use crate::platform::Platform;
use crate::process::Invocation;
use crate::staging::StagedHtml;
use exn::{OptionExt, ResultExt};
use rasterpdf_provision::{EmbeddedSource, Provisioner, Resource, SourceHandle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Companion script the renderer executable is driven by.
pub const RASTERIZE_SCRIPT: &str = "rasterize.js";
/// Default upper bound on a single render.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Everything a [`PdfGenerator`] needs to know about its environment.
///
/// Nothing is looked up implicitly once the generator is built: the root
/// folder, the platform and the resource source are all fixed here.
#[derive(Clone)]
pub struct GeneratorConfig {
    /// Provisioning root. Defaults to the directory of the running executable.
    pub root: Option<PathBuf>,
    /// Operating system name to resolve the renderer for, instead of the host's.
    pub platform: Option<String>,
    /// Deadline for a single render; `None` waits forever.
    pub timeout: Option<Duration>,
    /// Where renderer resources are provisioned from. Defaults to the
    /// resources compiled into the binary.
    pub source: Option<SourceHandle>,
    /// Fail instead of falling back to the root when the output folder is missing.
    pub strict_output: bool,
    /// Parameters used when a call supplies none.
    pub defaults: GenerationParameters,
}
impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            root: None,
            platform: None,
            timeout: Some(DEFAULT_TIMEOUT),
            source: None,
            strict_output: false,
            defaults: GenerationParameters::default(),
        }
    }
}
impl GeneratorConfig {
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_source(mut self, source: SourceHandle) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_strict_output(mut self, strict: bool) -> Self {
        self.strict_output = strict;
        self
    }

    pub fn with_defaults(mut self, defaults: GenerationParameters) -> Self {
        self.defaults = defaults;
        self
    }
}

/// Converts HTML documents to PDF by running the bundled renderer.
///
/// Each call to [`generate`](Self::generate) stages the HTML in the root,
/// provisions the renderer for the configured platform if this is the first
/// use, runs it once, and removes the staged HTML again, whether or not the
/// render succeeded. A generator can be shared between threads.
///
/// # Example
///
/// ```no_run
/// use rasterpdf_render::{GenerationParameters, GeneratorConfig, PageFormat, PdfGenerator};
/// use std::path::Path;
///
/// # fn example() -> rasterpdf_render::error::Result<()> {
/// let generator = PdfGenerator::new(GeneratorConfig::default().with_root("/opt/rasterpdf"))?;
/// let params = GenerationParameters::default().with_format(PageFormat::Letter);
/// let pdf = generator.generate("<h1>Hello</h1>", Some(Path::new("/tmp")), Some(&params))?;
/// println!("{}", pdf.display());
/// # Ok(())
/// # }
/// ```
pub struct PdfGenerator {
    root: PathBuf,
    os: String,
    provisioner: Provisioner,
    timeout: Option<Duration>,
    strict_output: bool,
    defaults: GenerationParameters,
}

impl PdfGenerator {
    /// Build a generator. Fails if the root folder does not exist.
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let root = match config.root {
            Some(root) => root,
            None => Self::program_dir()?,
        };
        if !root.is_dir() {
            exn::bail!(ErrorKind::Configuration(root));
        }
        let root = std::path::absolute(&root).or_raise(|| ErrorKind::Configuration(root.clone()))?;
        let source = config.source.unwrap_or_else(|| Arc::new(EmbeddedSource));
        let provisioner = Provisioner::new(&root, source).or_raise(|| ErrorKind::Configuration(root.clone()))?;
        let os = config.platform.unwrap_or_else(|| std::env::consts::OS.to_string());
        tracing::debug!(root = %root.display(), os = %os, "PDF generator ready");
        Ok(Self {
            root,
            os,
            provisioner,
            timeout: config.timeout,
            strict_output: config.strict_output,
            defaults: config.defaults,
        })
    }

    fn program_dir() -> Result<PathBuf> {
        let exe = std::env::current_exe().or_raise(|| ErrorKind::Configuration(PathBuf::new()))?;
        exe.parent().map(Path::to_path_buf).ok_or_raise(|| ErrorKind::Configuration(exe.clone()))
    }

    /// The provisioning root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the renderer platform this generator targets.
    pub fn platform(&self) -> Result<Platform> {
        Platform::from_os(&self.os)
    }

    /// Render `html` to a PDF and return the PDF's absolute path.
    ///
    /// The PDF is written to `output_folder`; a missing or non-existent
    /// folder falls back to the root (or fails in strict mode). `params`
    /// falls back to the generator's defaults.
    #[instrument(skip_all, fields(html_size = html.as_ref().len()))]
    pub fn generate(
        &self,
        html: impl AsRef<[u8]>,
        output_folder: Option<&Path>,
        params: Option<&GenerationParameters>,
    ) -> Result<PathBuf> {
        let output_folder = self.output_folder(output_folder)?;
        let params = params.unwrap_or(&self.defaults);
        params.validate()?;
        // Before any file I/O: an unsupported platform must leave nothing behind.
        let platform = self.platform()?;

        let staged = StagedHtml::write(&self.root, html.as_ref())?;
        let output = output_folder.join(staged.pdf_name());

        let executable = self
            .provisioner
            .ensure(&Resource::executable(platform.executable()))
            .or_raise(|| ErrorKind::Provisioning)?;
        self.provisioner.ensure(&Resource::file(RASTERIZE_SCRIPT)).or_raise(|| ErrorKind::Provisioning)?;

        tracing::info!(%platform, layout = %params.layout(), output = %output.display(), "Rendering PDF");
        let invocation = Invocation {
            executable: &executable,
            working_dir: &self.root,
            args: renderer_args(RASTERIZE_SCRIPT, staged.file_name(), &output, params),
            timeout: self.timeout,
        };
        invocation.run(&output)
        // `staged` is dropped here on every path, removing the HTML file.
    }

    /// Read an HTML file and render it like [`generate`](Self::generate).
    pub fn generate_file(
        &self,
        input: impl AsRef<Path>,
        output_folder: Option<&Path>,
        params: Option<&GenerationParameters>,
    ) -> Result<PathBuf> {
        let html = std::fs::read(input.as_ref()).or_raise(|| ErrorKind::Io)?;
        self.generate(html, output_folder, params)
    }

    fn output_folder(&self, requested: Option<&Path>) -> Result<PathBuf> {
        match requested.filter(|folder| !folder.as_os_str().is_empty()) {
            Some(folder) if folder.is_dir() => std::path::absolute(folder).or_raise(|| ErrorKind::Io),
            Some(folder) if self.strict_output => exn::bail!(ErrorKind::InvalidOutputFolder(folder.to_path_buf())),
            Some(folder) => {
                tracing::warn!(requested = %folder.display(), root = %self.root.display(), "Output folder does not exist; using root");
                Ok(self.root.clone())
            },
            None => Ok(self.root.clone()),
        }
    }
}
