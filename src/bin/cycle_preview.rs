use anyhow::{anyhow, bail, Result};
use clap::Parser;
use pix_relay::integrations::CATALOG;
use pix_relay::router::cycle::{CycleConfig, GatewaySelector, RouteTarget};

#[derive(Parser)]
#[command(name = "cycle_preview")]
#[command(about = "Print the routing schedule a cycle configuration produces", long_about = None)]
struct Cli {
    /// Cycle as `M:K` or `M:K:O`. Read from the integration's env var when omitted.
    cycle: Option<String>,

    /// Integration slug whose ROUTING_CYCLE_* variable supplies the cycle.
    #[arg(short, long)]
    integration: Option<String>,

    /// Sales already recorded for the offer.
    #[arg(short, long, default_value_t = 0)]
    prior: u64,

    #[arg(short, long, default_value_t = 20)]
    count: usize,

    /// Preview an offer that has not opted into fee sharing.
    #[arg(long)]
    no_use_tax: bool,
}

fn resolve_cycle(cli: &Cli) -> Result<CycleConfig> {
    let raw = match (&cli.cycle, &cli.integration) {
        (Some(raw), _) => raw.clone(),
        (None, Some(slug)) => {
            let spec = CATALOG
                .iter()
                .find(|s| s.slug == slug.as_str())
                .ok_or_else(|| anyhow!("unknown integration '{slug}'"))?;
            let key = spec.cycle_env_key();
            std::env::var(&key).map_err(|_| anyhow!("{key} is not set"))?
        }
        (None, None) => bail!("pass a cycle like 11:7:3 or --integration <slug>"),
    };
    raw.parse::<CycleConfig>().map_err(|e| anyhow!("{raw}: {e}"))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let cycle = resolve_cycle(&cli)?;
    let selector = GatewaySelector::new(cycle);
    let use_tax = !cli.no_use_tax;

    println!("cycle {cycle} use_tax={use_tax} prior_sales={}", cli.prior);
    let mut operator = 0usize;
    for decision in selector.schedule(cli.prior, use_tax, cli.count) {
        let target = match decision.target {
            RouteTarget::ClientGateway => "client",
            RouteTarget::OperatorGateway => {
                operator += 1;
                "operator"
            }
        };
        println!(
            "#{:<5} position={:<3} {:<8} {}",
            decision.ordinal, decision.position, target, decision.reason
        );
    }
    println!("{} of {} to operator", operator, cli.count);
    Ok(())
}
