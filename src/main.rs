//! vrf-wager simulator
//!
//! Plays rounds of either game against in-memory collaborators and a local
//! VRF oracle, printing every engine notification as a JSON line.

use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use vrf_wager::common::memory::{
    InMemoryAssetSupport, InMemoryPauseGate, InMemoryRegistry, NativeLedger, RecordingReferral,
    StaticAccessControl,
};
use vrf_wager::common::traits::{AssetLedger, AssetLedgers, Collaborators, SystemClock};
use vrf_wager::config::generate_sample_config;
use vrf_wager::events::{FanoutEventSink, TracingEventSink};
use vrf_wager::games::{dice::ROLL_SIDES, grid};
use vrf_wager::{
    AccountId, Asset, BetRequest, ConfigLoader, DiceSelection, EngineEvent, EventSink, FulfillmentDriver,
    GameVariant, VrfRandomnessOracle, WagerEngine, WagerResult,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Game {
    Dice,
    Grid,
}

#[derive(Parser, Debug)]
#[command(name = "vrf-wager-sim")]
#[command(about = "Play simulated rounds against the wagering engine", long_about = None)]
struct Args {
    /// Game variant to play
    #[arg(long, value_enum, default_value = "dice")]
    game: Game,

    /// Number of bets to place
    #[arg(long, default_value = "10")]
    rounds: u32,

    /// Number of distinct players taking turns
    #[arg(long, default_value = "3")]
    players: u32,

    /// Stake per bet (native units)
    #[arg(long, default_value = "1000")]
    stake: u64,

    /// Initial engine custody balance
    #[arg(long, default_value = "100000000")]
    bankroll: u64,

    /// Seed for player selections
    #[arg(long)]
    seed: Option<u64>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Write the default configuration to this path and exit
    #[arg(long)]
    write_config: Option<String>,

    /// Also log every notification through tracing
    #[arg(long)]
    log_events: bool,
}

/// Prints each notification as one JSON line on stdout
struct JsonLinesSink;

impl<S: Serialize, O: Serialize> EventSink<S, O> for JsonLinesSink {
    fn emit(&self, event: EngineEvent<S, O>) {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!("Failed to serialize {} event: {}", event.name(), e),
        }
    }
}

fn event_sink<S, O>(log_events: bool) -> Arc<dyn EventSink<S, O>>
where
    S: Serialize + Clone + Send + Sync + 'static,
    O: Serialize + Clone + Send + Sync + 'static,
{
    if log_events {
        let sinks: Vec<Arc<dyn EventSink<S, O>>> = vec![Arc::new(JsonLinesSink), Arc::new(TracingEventSink)];
        Arc::new(FanoutEventSink::new(sinks))
    } else {
        Arc::new(JsonLinesSink)
    }
}

fn random_dice_selection(rng: &mut StdRng) -> DiceSelection {
    let target = rng.gen_range(2..ROLL_SIDES as u8);
    if rng.gen_bool(0.5) {
        DiceSelection::over(target)
    } else {
        DiceSelection::under(target)
    }
}

fn random_grid_selection(rng: &mut StdRng) -> WagerResult<grid::CellMask> {
    let cells: Vec<u8> = rand::seq::index::sample(rng, grid::GRID_CELLS as usize, grid::GRID_PICKS as usize)
        .into_iter()
        .map(|cell| cell as u8)
        .collect();
    grid::pack(&cells)
}

struct Simulation {
    rounds: u32,
    players: Vec<AccountId>,
    stake: u64,
    rng: StdRng,
    native: Arc<NativeLedger>,
}

impl Simulation {
    async fn run<G, F>(
        mut self,
        engine: WagerEngine<G>,
        oracle: Arc<VrfRandomnessOracle>,
        requests: mpsc::UnboundedReceiver<vrf_wager::RequestId>,
        mut pick: F,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        G: GameVariant + 'static,
        F: FnMut(&mut StdRng) -> WagerResult<G::Selection>,
    {
        let engine_id = engine.id().clone();
        let engine = Arc::new(Mutex::new(engine));
        let (delivery_tx, mut deliveries) = mpsc::unbounded_channel();
        let driver = FulfillmentDriver::new(engine.clone(), oracle)
            .with_deliveries(delivery_tx)
            .spawn(requests);

        for round in 0..self.rounds {
            let player = self.players[round as usize % self.players.len()].clone();
            let selection = pick(&mut self.rng)?;

            let admitted = {
                let mut engine = engine.lock().await;
                engine.place_bet(BetRequest::native(player.clone(), self.stake, selection))
            };
            if let Err(e) = admitted {
                tracing::warn!("Round {}: bet for {} rejected: {}", round, player, e);
                continue;
            }

            match deliveries.recv().await {
                Some(delivery) => {
                    if let Err(e) = delivery.result {
                        tracing::warn!("Round {}: settlement failed: {}", round, e);
                    }
                }
                None => break,
            }
        }

        let stats = engine.lock().await.stats();
        tracing::info!(
            "🏁 {} rounds done: {} settled, {} won, custody now {}",
            self.rounds,
            stats.bets_settled,
            stats.bets_won,
            self.native.balance_of(&engine_id)
        );
        println!("{}", serde_json::to_string(&stats)?);

        driver.abort();
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    vrf_wager::logging::init("vrf_wager=info,vrf_wager_sim=info");

    if let Some(path) = &args.write_config {
        generate_sample_config(path)?;
        println!("✅ Wrote default configuration to {}", path);
        return Ok(());
    }

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    let config = loader.load()?;

    let engine_id = AccountId::from(match args.game {
        Game::Dice => config.dice.engine_id.as_str(),
        Game::Grid => config.grid.engine_id.as_str(),
    });
    let players: Vec<AccountId> = (0..args.players.max(1))
        .map(|i| AccountId::new(format!("player-{}", i + 1)))
        .collect();

    let registry = Arc::new(InMemoryRegistry::new());
    registry.register(engine_id.clone());

    let native = Arc::new(NativeLedger::new());
    native.mint(&engine_id, args.bankroll)?;
    let player_funds = args.stake.saturating_mul(args.rounds as u64);
    for player in &players {
        native.mint(player, player_funds)?;
    }

    let (notifier, requests) = mpsc::unbounded_channel();
    let oracle = Arc::new(VrfRandomnessOracle::new_random("vrf-oracle").with_notifier(notifier));
    tracing::info!("🔑 Oracle public key {}", oracle.public_key_hex());

    let collaborators = Collaborators {
        registry,
        pause_gate: Arc::new(InMemoryPauseGate::new()),
        asset_support: Arc::new(InMemoryAssetSupport::new([Asset::Native])),
        ledgers: AssetLedgers::new(native.clone()),
        oracle: oracle.clone(),
        referral: Arc::new(RecordingReferral::new()),
        access: Arc::new(StaticAccessControl::new()),
        clock: Arc::new(SystemClock),
    };

    let simulation = Simulation {
        rounds: args.rounds,
        players,
        stake: args.stake,
        rng: match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        },
        native,
    };

    match args.game {
        Game::Dice => {
            let engine = WagerEngine::dice(&config, collaborators, event_sink(args.log_events))?;
            simulation
                .run(engine, oracle, requests, |rng| Ok(random_dice_selection(rng)))
                .await
        }
        Game::Grid => {
            let engine = WagerEngine::grid(&config, collaborators, event_sink(args.log_events))?;
            simulation.run(engine, oracle, requests, random_grid_selection).await
        }
    }
}
