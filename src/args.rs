use clap::Parser;
use fps_analyzer::analysis::{SampleMode, UniquenessMethod};
use fps_analyzer::capture::RawFormat;
use fps_analyzer::config::{self, AnalyzerConfig, Config};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "fps-analyzer")]
#[command(author = "Selkies Team")]
#[command(version)]
#[command(about = "Measure effective FPS, frametime and tearing of a raw video stream", long_about = None)]
pub struct Args {
    /// Raw frame file to analyze ("-" for stdin)
    pub input: PathBuf,

    /// Configuration file path
    #[arg(short, long, default_value = "/etc/fps-analyzer.toml")]
    pub config: PathBuf,

    /// Frame width
    #[arg(long, default_value = "1920")]
    pub width: u32,

    /// Frame height
    #[arg(long, default_value = "1080")]
    pub height: u32,

    /// Raw pixel format of the input
    #[arg(short, long, value_enum, default_value_t = RawFormat::Yuy2)]
    pub format: RawFormat,

    /// Frame rate the input was captured at
    #[arg(long, default_value = "60")]
    pub rate: f64,

    /// Feed frames at capture pace against the wall clock instead of replaying instantly
    #[arg(long, action)]
    pub realtime: bool,

    /// Uniqueness method override
    #[arg(short, long, value_enum)]
    pub method: Option<UniquenessMethod>,

    /// Sample mode override
    #[arg(long, value_enum)]
    pub sample_mode: Option<SampleMode>,

    /// Sensitivity threshold override (percent)
    #[arg(short, long)]
    pub sensitivity: Option<f64>,

    /// Enable tearing detection
    #[arg(long, action)]
    pub tearing: bool,

    /// Base path for the status and history files
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print every flushed snapshot to stdout as JSON
    #[arg(long, action)]
    pub json: bool,

    /// Reload the configuration file when it changes
    #[arg(long, action)]
    pub watch_config: bool,

    /// Verbose logging
    #[arg(short, long, action)]
    pub verbose: bool,
}

impl Args {
    pub fn load_config(&self) -> fps_analyzer::Result<Config> {
        config::Config::load(&self.config)
    }

    /// Apply command line overrides on top of the file configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(method) = self.method {
            config.analyzer.method = method;
        }
        if let Some(mode) = self.sample_mode {
            config.analyzer.sample_mode = mode;
        }
        if let Some(sensitivity) = self.sensitivity {
            config.analyzer.sensitivity_percent = sensitivity;
        }
        if self.tearing {
            config.analyzer.tearing_enabled = true;
        }
        if let Some(ref output) = self.output {
            config.output.path = Some(output.clone());
        }
    }

    /// Analyzer settings from a reloaded file, with command line overrides
    /// still taking precedence
    pub fn reloaded_analyzer_config(&self, mut config: Config) -> AnalyzerConfig {
        self.apply_overrides(&mut config);
        config.analyzer
    }
}
