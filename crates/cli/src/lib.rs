use bootshim_api::Platform;
use bootshim_core::BootstrapConfig;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "bootshim",
    version,
    about = "Launches an installed server in-process from its generated launch script",
    long_about = "Reads the launch script an installer generated (run.sh / run.bat), rebuilds the command \
                  line it would run, composes the component graph from its module path and hands control \
                  to the entry point in this process. When the script is missing, or stale with \
                  --reconcile, the installer is run first."
)]
pub struct Cli {
    /// Installer to use: a path, a URL, or a version substituted into the download template
    #[arg(long, value_name = "SOURCE")]
    pub installer: Option<String>,

    /// Re-run the installer when its version differs from the installed one
    #[arg(long)]
    pub reconcile: bool,

    /// Directory holding the launch script. Defaults to the current directory.
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Launch script flavour (unix or windows). Detected from the host by default.
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Option<Platform>,

    /// Resolve everything, print the launch plan as JSON and exit without launching
    #[arg(long)]
    pub print_plan: bool,

    /// Arguments appended to the launched program's command line
    #[arg(
        value_name = "ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub args: Vec<String>,
}

impl Cli {
    pub fn base_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Lays the command line flags over a loaded config.
    pub fn apply(&self, mut config: BootstrapConfig) -> BootstrapConfig {
        if let Some(installer) = &self.installer {
            config.installer = Some(installer.clone());
        }
        if let Some(platform) = self.platform {
            config.platform = Some(platform);
        }
        config.reconcile |= self.reconcile;
        config
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let _guard = bootshim_runtime::init_logging("bootshim");

    let config = cli.apply(BootstrapConfig::load(cli.base_dir())?);
    info!(
        "Bootstrapping from {} ({})",
        config.base_dir.display(),
        config.platform()
    );
    let mut bootstrap = bootshim_runtime::build_default_bootstrap(config);

    if cli.print_plan {
        let prepared = bootstrap.prepare(cli.args)?;
        println!("{}", serde_json::to_string_pretty(&prepared.plan)?);
        return Ok(());
    }

    bootstrap.run(cli.args)?;
    Ok(())
}
