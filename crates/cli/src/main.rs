use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use fra_core::RecordStore;
use fra_core::config::AtlasConfig;
use fra_core::db::SqliteBackend;
use fra_core::clock::{Clock, SystemClock};
use fra_core::layers::{self, Layer, LayerSet};
use fra_core::query::{ClaimFilter, ClaimStatistics, Selector};
use fra_core::schema::{
    Claim, ClaimDraft, ClaimPatch, ClaimStatus, ClaimType, Coordinate, FeatureType,
    SelectionMetadata,
};
use fra_core::seed::Seed;
use schemars::schema_for;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

type Store = RecordStore<SqliteBackend, SystemClock>;

#[derive(Parser)]
#[command(name = "fra")]
#[command(about = "Forest Rights Act claims atlas CLI", long_about = None)]
struct Cli {
    /// Config file (default: ./fra.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path, overrides the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the database with the default dataset where empty
    Init,
    /// Browse and edit FRA claims
    Claims {
        #[command(subcommand)]
        command: ClaimCommands,
    },
    /// Claim statistics
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// List villages
    Villages {
        /// Normalized state key, e.g. madhya_pradesh, or "all"
        #[arg(long, default_value = "all")]
        state: String,
    },
    /// List geographical features of one type
    Features {
        #[arg(long = "type")]
        feature_type: FeatureType,
    },
    /// Show which claims and features the given layer toggles reveal
    Layers {
        /// Layer ids to turn on, e.g. fraCR
        #[arg(long)]
        on: Vec<Layer>,
        /// Layer ids to turn off
        #[arg(long)]
        off: Vec<Layer>,
    },
    /// Print the values accepted by the claim filters
    Filters,
    /// Record a map selection
    Select {
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        claim_id: Option<String>,
    },
    /// List recent map selections
    Selections {
        /// Remove all selections instead of listing them
        #[arg(long)]
        clear: bool,
    },
    /// Export all collections as JSON
    Export {
        /// Output file (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Import collections from an export file
    Import { file: PathBuf },
    /// Remove all stored collections
    Clear,
    /// Write claim notes and analytics into an Obsidian vault
    Vault {
        /// Vault root, overrides the config
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Export canonical JSON Schemas to the ./schemas directory
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
}

#[derive(Subcommand)]
enum ClaimCommands {
    /// List claims, filtered or searched
    List {
        #[arg(long, default_value = "all")]
        state: String,
        #[arg(long, default_value = "all")]
        district: String,
        #[arg(long = "type", default_value = "all")]
        claim_type: Selector<ClaimType>,
        #[arg(long, default_value = "all")]
        status: Selector<ClaimStatus>,
        /// Free-text search; when given, the filters are ignored
        #[arg(long, short)]
        query: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show one claim
    Show { id: String },
    /// Add a claim
    Add {
        #[arg(long)]
        name: String,
        #[arg(long = "type")]
        claim_type: ClaimType,
        #[arg(long, default_value = "pending")]
        status: ClaimStatus,
        #[arg(long)]
        state: String,
        #[arg(long)]
        district: String,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Hectares
        #[arg(long, allow_negative_numbers = true)]
        area: f64,
        #[arg(long = "document")]
        documents: Vec<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Change fields of a claim
    Update(UpdateArgs),
    /// Delete a claim
    Delete { id: String },
}

#[derive(Args)]
struct UpdateArgs {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long = "type")]
    claim_type: Option<ClaimType>,
    #[arg(long)]
    status: Option<ClaimStatus>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    district: Option<String>,
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lng: Option<f64>,
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    lat: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    area: Option<f64>,
    /// Replaces the document list; repeat for several
    #[arg(long = "document")]
    documents: Vec<String>,
    #[arg(long)]
    description: Option<String>,
}

impl UpdateArgs {
    fn into_patch(self) -> (String, ClaimPatch) {
        let patch = ClaimPatch {
            name: self.name,
            claim_type: self.claim_type,
            status: self.status,
            state: self.state,
            district: self.district,
            coordinates: self.lng.zip(self.lat).map(|(lng, lat)| Coordinate(lng, lat)),
            area: self.area,
            documents: (!self.documents.is_empty()).then_some(self.documents),
            description: self.description,
        };
        (self.id, patch)
    }
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Export JSON Schema files for canonical types
    Export {
        /// Output directory (default: ./schemas)
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AtlasConfig::load(cli.config.as_deref())?;
    init_tracing(&config.log.filter);

    let mut session = Session {
        config: &config,
        db: cli.db.as_deref(),
        store: None,
    };
    run(&mut session, cli.command)
}

/// Opens and initializes the store on first use, so `schema` and `filters`
/// never create a database file.
struct Session<'a> {
    config: &'a AtlasConfig,
    db: Option<&'a Path>,
    store: Option<Store>,
}

impl Session<'_> {
    fn store(&mut self) -> Result<&mut Store> {
        let store = match self.store.take() {
            Some(store) => store,
            None => {
                let mut store = open_store(self.config, self.db)?;
                store.initialize()?;
                store
            }
        };
        Ok(self.store.insert(store))
    }
}

fn run(session: &mut Session<'_>, command: Commands) -> Result<()> {
    match command {
        Commands::Init => {
            let snapshot = session.store()?.snapshot()?;
            println!(
                "Ready: {} claims, {} villages, {} features",
                snapshot.claims.len(),
                snapshot.villages.len(),
                snapshot.features.len()
            );
            Ok(())
        }
        Commands::Claims { command } => claims(session.store()?, command),
        Commands::Stats { json } => {
            let stats = session.store()?.get_claim_statistics()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats);
            }
            Ok(())
        }
        Commands::Villages { state } => {
            for village in session.store()?.get_villages_by_state(&Selector::from(state.as_str()))? {
                println!(
                    "{}\t{}\t{}, {}\tpop. {}",
                    village.id, village.name, village.district, village.state, village.population
                );
            }
            Ok(())
        }
        Commands::Features { feature_type } => {
            for feature in session.store()?.get_features_by_type(feature_type)? {
                let props: Vec<String> = feature
                    .properties
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect();
                println!(
                    "{}\t{}\t{:.1}\t{}",
                    feature.id,
                    feature.name,
                    feature.area,
                    props.join(", ")
                );
            }
            Ok(())
        }
        Commands::Layers { on, off } => {
            let mut set = LayerSet::default();
            for layer in on {
                set.set(layer, true);
            }
            for layer in off {
                set.set(layer, false);
            }
            let snapshot = session.store()?.snapshot()?;
            println!("Visible layers: {}", set.visible_count());
            for claim in layers::visible_claims(&snapshot.claims, &set) {
                println!("claim\t{}\t{}", claim.id, claim.claim_type);
            }
            for feature in layers::visible_features(&snapshot.features, &set) {
                println!("feature\t{}\t{}", feature.id, feature.feature_type);
            }
            Ok(())
        }
        Commands::Filters => {
            for (title, options) in [
                ("state", layers::state_options()),
                ("district", layers::district_options()),
                ("type", layers::claim_type_options()),
                ("status", layers::status_options()),
            ] {
                println!("{title}:");
                for option in options {
                    println!("  {}\t{}", option.value, option.label);
                }
            }
            Ok(())
        }
        Commands::Select {
            lng,
            lat,
            label,
            claim_id,
        } => {
            let metadata = (label.is_some() || claim_id.is_some()).then(|| SelectionMetadata {
                label,
                claim_id,
                ..SelectionMetadata::default()
            });
            let selection = session.store()?.save_user_selection(Coordinate(lng, lat), metadata)?;
            println!("Saved {}", selection.id);
            Ok(())
        }
        Commands::Selections { clear } => {
            let store = session.store()?;
            if clear {
                store.clear_user_selections()?;
                println!("Selections cleared");
                return Ok(());
            }
            for selection in store.get_user_selections()? {
                let label = selection
                    .metadata
                    .as_ref()
                    .and_then(|m| m.label.as_deref())
                    .unwrap_or("");
                println!(
                    "{}\t{}\t{:.6}, {:.6}\t{}",
                    selection.id,
                    selection.timestamp,
                    selection.coordinates.lat(),
                    selection.coordinates.lng(),
                    label
                );
            }
            Ok(())
        }
        Commands::Export { out } => {
            let data = session.store()?.export_data()?;
            match out {
                Some(path) => {
                    fs::write(&path, data)?;
                    println!("Exported to {}", path.display());
                }
                None => println!("{data}"),
            }
            Ok(())
        }
        Commands::Import { file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            if !session.store()?.import_data(&raw)? {
                bail!("{} is not a valid export file", file.display());
            }
            println!("Imported {}", file.display());
            Ok(())
        }
        Commands::Clear => {
            session.store()?.clear_all_data()?;
            println!("All data cleared");
            Ok(())
        }
        Commands::Vault { out } => {
            let root = out.unwrap_or_else(|| session.config.vault.root.clone());
            let snapshot = session.store()?.snapshot()?;
            let stats = fra_core::query::claim_statistics(&snapshot.claims);
            obsidian::build_vault(&snapshot, &stats, &root, SystemClock.now())?;
            println!("Vault written to {}", root.display());
            Ok(())
        }
        Commands::Schema { command } => match command {
            SchemaCommands::Export { out_dir } => schema_export(&out_dir),
        },
    }
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(config: &AtlasConfig, db_override: Option<&Path>) -> Result<Store> {
    let db_path = db_override.unwrap_or(&config.storage.db_path);
    let db_path = db_path
        .to_str()
        .ok_or_else(|| anyhow!("database path is not valid UTF-8: {}", db_path.display()))?;
    let seed = match &config.storage.seed_file {
        Some(path) => Seed::load_yaml(path)?,
        None => Seed::builtin(),
    };
    debug!(db_path, "opening store");
    Ok(RecordStore::with_parts(
        SqliteBackend::open(db_path)?,
        SystemClock,
        seed,
    ))
}

fn claims(store: &mut Store, command: ClaimCommands) -> Result<()> {
    match command {
        ClaimCommands::List {
            state,
            district,
            claim_type,
            status,
            query,
            json,
        } => {
            let filter = ClaimFilter {
                state: Selector::from(state.as_str()),
                district: Selector::from(district.as_str()),
                claim_type,
                status,
            };
            let total = store.get_claims()?.len();
            let claims = store.browse_claims(query.as_deref().unwrap_or(""), &filter)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&claims)?);
            } else {
                for claim in &claims {
                    print_claim_row(claim);
                }
                println!("Showing {} of {} claims", claims.len(), total);
            }
            Ok(())
        }
        ClaimCommands::Show { id } => {
            let claim = store
                .get_claim(&id)?
                .ok_or_else(|| anyhow!("claim not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(&claim)?);
            Ok(())
        }
        ClaimCommands::Add {
            name,
            claim_type,
            status,
            state,
            district,
            lng,
            lat,
            area,
            documents,
            description,
        } => {
            let claim = store.add_claim(ClaimDraft {
                name,
                claim_type,
                status,
                state,
                district,
                coordinates: Coordinate(lng, lat),
                area,
                documents: (!documents.is_empty()).then_some(documents),
                description,
            })?;
            println!("Added {}", claim.id);
            Ok(())
        }
        ClaimCommands::Update(args) => {
            let (id, patch) = args.into_patch();
            let claim = store
                .update_claim(&id, patch)?
                .ok_or_else(|| anyhow!("claim not found: {id}"))?;
            println!("Updated {} (last updated {})", claim.id, claim.last_updated);
            Ok(())
        }
        ClaimCommands::Delete { id } => {
            if !store.delete_claim(&id)? {
                bail!("claim not found: {id}");
            }
            println!("Deleted {id}");
            Ok(())
        }
    }
}

fn print_claim_row(claim: &Claim) {
    println!(
        "{}\t{}\t{}\t{}\t{}, {}\t{:.1} ha\t{}",
        claim.id,
        claim.name,
        claim.claim_type,
        claim.status,
        claim.district,
        claim.state,
        claim.area,
        claim.last_updated
    );
}

fn print_stats(stats: &ClaimStatistics) {
    println!("Total claims: {}", stats.total);
    println!("Total area:   {:.1} ha", stats.total_area);
    println!("Average area: {:.1} ha", stats.avg_area);
    println!();
    for status in ClaimStatus::ALL {
        println!(
            "{:<13}{:>4} ({:.1}%)",
            status.label(),
            stats.by_status.get(status),
            stats.status_percentage(status)
        );
    }
    println!();
    for claim_type in ClaimType::ALL {
        println!("{:<4}{:>4}", claim_type.as_str(), stats.by_type.get(claim_type));
    }
    println!();
    for entry in &stats.by_state {
        println!("{:<16}{:>4}", entry.state, entry.count);
    }
}

fn schema_export(out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)?;

    let schemas = [
        ("Claim", schema_for!(fra_core::schema::Claim)),
        ("Village", schema_for!(fra_core::schema::Village)),
        (
            "GeographicalFeature",
            schema_for!(fra_core::schema::GeographicalFeature),
        ),
        ("UserSelection", schema_for!(fra_core::schema::UserSelection)),
        ("ExportDocument", schema_for!(fra_core::schema::ExportDocument)),
    ];
    for (name, schema) in schemas {
        let json = serde_json::to_string_pretty(&schema)?;
        fs::write(out_dir.join(format!("{name}.schema.json")), json)?;
    }

    println!("Exported schemas to {}", out_dir.display());
    Ok(())
}
