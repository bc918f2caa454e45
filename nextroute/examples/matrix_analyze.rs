use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use nextroute::{BackendConfig, RelayBackend, logging, unix_now};
use nextroute_core::geo::Location;
use std::{fs::File, io, path::PathBuf};

#[derive(Parser)]
struct Command {
    /// encoded route matrix
    matrix: PathBuf,

    /// backend configuration, defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// refuse the matrix if it is stale
    #[arg(long)]
    check_stale: bool,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Print the route matrix analysis.
    Analysis {
        #[arg(long)]
        json: bool,
    },
    /// Print the near relays between two locations.
    Near {
        /// `"<latitude>, <longitude>"`
        #[arg(long)]
        source: Location,
        #[arg(long)]
        destination: Location,
        /// direct latency in milliseconds, estimated when 0
        #[arg(long, default_value = "0")]
        direct_latency: f32,
        #[arg(long, default_value = "32")]
        max: usize,
    },
}

fn main() -> Result<()> {
    logging::init("nextroute=info")?;
    let cmd = Command::parse();

    let config = match &cmd.config {
        Some(path) => BackendConfig::load(path)?,
        None => BackendConfig::default(),
    };
    let backend = RelayBackend::new(config);

    let file = File::open(&cmd.matrix)
        .with_context(|| format!("failed to open {}", cmd.matrix.display()))?;
    let now = if cmd.check_stale { unix_now()? } else { 0 };
    let matrix = backend.load_route_matrix(io::BufReader::new(file), now)?;

    match cmd.action {
        Action::Analysis { json: false } => {
            println!("{}", String::from_utf8_lossy(&matrix.analysis_data()));
        }
        Action::Analysis { json: true } => {
            println!("{}", serde_json::to_string_pretty(&matrix.analysis())?);
        }
        Action::Near {
            source,
            destination,
            direct_latency,
            max,
        } => {
            for relay in backend.near_relays(direct_latency, source, destination, max)? {
                let name = matrix
                    .topology()
                    .relay_index(relay.id)
                    .and_then(|index| matrix.topology().relay(index))
                    .map(|relay| relay.name.as_str())
                    .unwrap_or_default();
                println!("{} {} {name}", relay.id, relay.address);
            }
        }
    }

    Ok(())
}
