use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use wobsite::{config, generate, output, scan};

#[derive(Parser)]
#[command(name = "wobsite")]
#[command(about = "Static site generator driven by TOML manifests")]
#[command(long_about = "\
Static site generator driven by TOML manifests

A site is a directory with a wobsite.toml manifest. Templates and pages are
described by their own small manifests, discovered in the directories the
site manifest lists.

Site structure:

  site/
  ├── wobsite.toml                 # [site] directories, [macros], [compile]
  ├── templates/
  │   ├── base.template.toml       # [template] file = \"base.html\"
  │   └── base.html                # contains <wobsite-page-placeholder>
  ├── pages/
  │   ├── index.page.toml          # [page] file, template, output
  │   └── index.md                 # HTML or Markdown body
  └── static/                      # copied to output/static/

Macros: <wobsite-macro key=\"name\"></wobsite-macro> expands to the value of
`name`, looked up in the page, then the template, then the site [macros].

Run 'wobsite gen-config' to print a documented wobsite.toml.")]
#[command(version)]
struct Cli {
    /// Site directory (holds wobsite.toml)
    #[arg(long, default_value = ".", global = true)]
    site: PathBuf,

    /// Log progress (overridden by WOBSITE_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site into its output directory
    Build,
    /// Validate manifests and directories without building
    Check,
    /// Print a stock wobsite.toml with all options documented
    GenConfig,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "wobsite=info" } else { "wobsite=warn" };
    let filter = EnvFilter::try_from_env("WOBSITE_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Build => {
            println!("==> Building {}", cli.site.display());
            let site = scan::scan(&cli.site)?;
            let report = generate::generate(&site)?;
            output::print_build_output(&report, &site.manifest.root);
            if !report.succeeded() {
                return Ok(ExitCode::FAILURE);
            }
            println!("==> Build complete: {}", report.output_dir.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.site.display());
            let site = scan::scan(&cli.site)?;
            output::print_scan_output(&site);
            println!("==> Site is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(ExitCode::SUCCESS)
}
