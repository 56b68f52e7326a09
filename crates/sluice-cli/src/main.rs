use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use sluice_core::event::StationEvent;
use sluice_core::level::Level;
use sluice_core::mesh::Mesh;
use sluice_core::placement::{BlockPos, Facing, Placement};
use sluice_core::serialize::encode_station;
use sluice_core::station::Station;
use sluice_core::tap::Tap;
use sluice_core::tier::Tier;
use sluice_core::upgrade::UpgradeKind;
use sluice_data::{SluiceData, load_sluice_data};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "sluice", about = "Headless sluice station runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one station fed by a tap for a fixed number of ticks.
    Run(RunArgs),
    /// List what a data directory defines.
    Info {
        #[arg(long, default_value = "./data")]
        data: PathBuf,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    #[arg(long, default_value = "./data")]
    data: PathBuf,
    #[arg(long, default_value = "iron")]
    tier: String,
    #[arg(long, default_value = "cloth")]
    mesh: String,
    #[arg(long, default_value = "water")]
    fluid: String,
    #[arg(long, default_value = "gravel")]
    input: String,
    /// Inputs to feed, one at a time as the slot empties.
    #[arg(long, default_value_t = 10)]
    count: u32,
    #[arg(long, default_value_t = 10_000)]
    ticks: u64,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Installed upgrades as `luck,consumption,speed`.
    #[arg(long)]
    upgrades: Option<String>,
    /// Fluid the tap pours per tick.
    #[arg(long, default_value_t = 100)]
    fluid_rate: u32,
    /// Energy offered per tick to energy-gated tiers.
    #[arg(long, default_value_t = 10_000)]
    energy_rate: u32,
    /// Write a station snapshot here when the run ends.
    #[arg(long)]
    save: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Summary {
    inputs_fed: u32,
    finished: u32,
    cancelled: u32,
    rejected: u32,
    fluid_used: u64,
    energy_used: u64,
    ticks: u64,
}

fn parse_upgrades(spec: &str) -> Result<[u32; 3]> {
    let parts: Vec<&str> = spec.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        bail!("--upgrades expects luck,consumption,speed, got '{spec}'");
    }
    let mut counts = [0; 3];
    for (slot, part) in parts.iter().enumerate() {
        counts[slot] = part
            .parse()
            .with_context(|| format!("invalid upgrade count '{part}'"))?;
    }
    Ok(counts)
}

fn build_station(data: &SluiceData, args: &RunArgs, placement: Placement) -> Result<Station> {
    let tier = Tier::from_name(&args.tier).with_context(|| format!("unknown tier '{}'", args.tier))?;
    let mesh = Mesh::from_name(&args.mesh).with_context(|| format!("unknown mesh '{}'", args.mesh))?;

    let mut station =
        Station::new(data.tier_config(tier), data.global.clone(), placement).with_mesh(mesh)?;

    if let Some(spec) = &args.upgrades {
        let counts = parse_upgrades(spec)?;
        for kind in UpgradeKind::ALL {
            let wanted = counts[kind.slot_index()];
            if wanted == 0 {
                continue;
            }
            let overflow = station.install_upgrade(kind, wanted)?;
            if overflow > 0 {
                bail!("{kind:?} slot overflowed by {overflow}");
            }
        }
    }
    Ok(station)
}

fn run(args: RunArgs) -> Result<()> {
    let data = load_sluice_data(&args.data)
        .with_context(|| format!("loading data from {}", args.data.display()))?;
    let fluid = data
        .fluid_id(&args.fluid)
        .with_context(|| format!("unknown fluid '{}'", args.fluid))?;
    let input = data
        .item_id(&args.input)
        .with_context(|| format!("unknown item '{}'", args.input))?;

    let placement = Placement::new(BlockPos::new(0, 0, 0), Facing::East);
    let station = build_station(&data, &args, placement)?;
    info!(
        tier = station.tier().name(),
        power_cost = station.power_cost(),
        energy_capacity = station.energy().capacity(),
        "station built"
    );

    let mut level = Level::new(args.seed, data.recipes.clone());
    let pos = level.place_station(station)?;
    level.place_tap(pos.above(), Tap::infinite(fluid, args.fluid_rate))?;
    level.place_container(placement.output_container(), u32::MAX)?;

    let mut summary = Summary::default();
    for _ in 0..args.ticks {
        if let Some(station) = level.station_mut(pos)
            && let Some(mut energy) = station.energy_handler()
        {
            energy.receive(args.energy_rate, false);
        }

        let idle = level
            .station(pos)
            .is_some_and(|s| s.cycle().is_none() && s.input().is_none());
        if idle && summary.inputs_fed < args.count && level.insert_input(pos, input)? {
            summary.inputs_fed += 1;
        }

        level.step();
        summary.ticks += 1;

        for event in level.drain_events() {
            match event {
                StationEvent::CycleFinished {
                    fluid_used,
                    energy_used,
                    ..
                } => {
                    summary.finished += 1;
                    summary.fluid_used += u64::from(fluid_used);
                    summary.energy_used += u64::from(energy_used);
                }
                StationEvent::CycleCancelled { .. } => summary.cancelled += 1,
                StationEvent::InputRejected { .. } => summary.rejected += 1,
                _ => {}
            }
        }

        let settled = summary.finished + summary.cancelled + summary.rejected;
        if summary.inputs_fed == args.count && settled == args.count {
            break;
        }
    }

    if args.count > 0 && summary.inputs_fed == 0 {
        bail!("the {} mesh does not take '{}'", args.mesh, args.input);
    }

    print_summary(&data, &level, placement, &summary);

    if let Some(path) = &args.save {
        let station = level.station(pos).context("station missing after run")?;
        let bytes = encode_station(station, level.time())?;
        std::fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), bytes = bytes.len(), "snapshot saved");
    }
    Ok(())
}

fn print_summary(data: &SluiceData, level: &Level, placement: Placement, summary: &Summary) {
    let mut collected: BTreeMap<&str, u64> = BTreeMap::new();
    let name_of = |id| data.item_name(id).unwrap_or("?");
    if let Some(chest) = level.container(placement.output_container()) {
        for stack in &chest.stacks {
            *collected.entry(name_of(stack.item_type)).or_default() += u64::from(stack.quantity);
        }
    }
    for drop in level.drops() {
        *collected.entry(name_of(drop.stack.item_type)).or_default() +=
            u64::from(drop.stack.quantity);
    }

    println!("ticks run:        {}", summary.ticks);
    println!("inputs fed:       {}", summary.inputs_fed);
    println!("cycles finished:  {}", summary.finished);
    println!("cycles cancelled: {}", summary.cancelled);
    println!("inputs rejected:  {}", summary.rejected);
    println!("fluid used:       {}", summary.fluid_used);
    println!("energy used:      {}", summary.energy_used);
    println!("collected:");
    if collected.is_empty() {
        println!("  (nothing)");
    }
    for (name, quantity) in collected {
        println!("  {name:<20} {quantity}");
    }
}

fn info(data_dir: PathBuf) -> Result<()> {
    let data = load_sluice_data(&data_dir)
        .with_context(|| format!("loading data from {}", data_dir.display()))?;
    println!("items:   {}", data.item_names.join(", "));
    println!("fluids:  {}", data.fluid_names.join(", "));
    println!("recipes: {}", data.recipes.len());
    println!("tiers:");
    for (tier, config) in &data.tiers {
        println!(
            "  {:<10} tank {:>6}  cost {:>4}  io {:<5}  upgrades {}",
            tier.name(),
            config.tank_capacity,
            config.energy_cost_per_use,
            config.allows_io,
            config.upgradeable,
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Info { data } => info(data),
    }
}
