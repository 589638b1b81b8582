use clap::Parser;
use remora::shell::Shell;

/// A shell that provides access to NFS file systems.
#[derive(Parser, Debug)]
#[command(name = "remora")]
struct Args {
    /// Verbose off
    #[arg(short = 'v')]
    quiet: bool,

    /// Interactive mode off (line-oriented stdin)
    #[arg(short = 'i')]
    batch: bool,
}

fn main() -> anyhow::Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if err.use_stderr() => {
            eprint!("{err}");
            std::process::exit(1);
        }
        Err(err) => {
            // --help / --version
            print!("{err}");
            return Ok(());
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let mut shell = Shell::new(!args.quiet, !args.batch);
        shell.run().await;
    });
    Ok(())
}
