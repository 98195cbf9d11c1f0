use clap::Parser;
use hvswitch::{ConsoleReporter, Options, Settings, Switch, System};
use tracing_subscriber::EnvFilter;

/// Stop KVM and hand CPU virtualization over to VirtualBox.
#[derive(Parser, Debug)]
#[command(name = "hvswitch")]
#[command(about = "Unload KVM and load VirtualBox kernel modules (run as root)")]
#[command(args_override_self = true)]
struct Cli {
    /// Blacklist KVM modules so they stay unloaded after reboot
    #[arg(long)]
    persist: bool,

    /// Remove the KVM blacklist written by --persist
    #[arg(long)]
    revert: bool,

    /// Do not load the VirtualBox kernel modules
    #[arg(long)]
    no_vbox: bool,

    /// Do not stop libvirt services or QEMU processes
    #[arg(long)]
    no_stop: bool,

    /// Only print warnings and errors
    #[arg(long)]
    quiet: bool,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            persist: self.persist,
            revert: self.revert,
            load_vbox: !self.no_vbox,
            stop_services: !self.no_stop,
            quiet: self.quiet,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Exits 2 on unknown arguments and 0 on --help.
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli.options()).await {
        eprintln!("[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(options: Options) -> anyhow::Result<()> {
    let system = System::linux();
    let settings = Settings::from_env();
    let mut reporter = ConsoleReporter::stdio(options.quiet);

    let report = Switch::new(&system, &settings, &mut reporter)
        .run(&options)
        .await?;

    tracing::debug!(vendor = report.cpu_vendor.name(), "Switch finished");
    for (step, reason) in report.degraded() {
        tracing::warn!(?step, reason, "Step needs attention");
    }
    Ok(())
}
