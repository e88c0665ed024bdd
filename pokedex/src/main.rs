use std::io;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pokedex::config::{
    DEFAULT_CACHE_TTL, DEFAULT_GRAPHQL_URL, DEFAULT_LISTING_LIMIT, DEFAULT_REST_BASE,
};
use pokedex::filter::{move_types, ListingFilter, MoveFilter, MoveSort};
use pokedex::state::{CreatureDetail, MoveDetail};
use pokedex::team::{Team, TeamStats};
use pokedex::{Catalog, CatalogConfig, CatalogError, TeamBuilder, TeamUpdate, TransportKind};

#[derive(Parser, Debug)]
#[command(name = "pokedex")]
#[command(about = "Browse PokeAPI over REST or GraphQL and build a team")]
struct Args {
    #[arg(long, value_enum, env = "POKEDEX_TRANSPORT", default_value = "rest", global = true)]
    transport: TransportKind,
    #[arg(long, env = "POKEDEX_REST_BASE", default_value = DEFAULT_REST_BASE, global = true)]
    rest_base: String,
    #[arg(long, env = "POKEDEX_GRAPHQL_URL", default_value = DEFAULT_GRAPHQL_URL, global = true)]
    graphql_url: String,
    #[arg(
        long,
        env = "POKEDEX_CACHE_TTL_SECS",
        default_value_t = DEFAULT_CACHE_TTL.as_secs(),
        global = true
    )]
    ttl_secs: u64,
    #[arg(long, default_value_t = DEFAULT_LISTING_LIMIT, global = true)]
    limit: usize,
    /// Only allow moves the creature can learn
    #[arg(long, global = true)]
    strict_moves: bool,
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List creatures, optionally filtered
    List {
        #[arg(long)]
        search: Option<String>,
        /// Needs full listing data, i.e. --transport graphql
        #[arg(long = "type")]
        type_name: Option<String>,
    },
    /// Show one creature
    Show {
        name: String,
        /// Merge in species details
        #[arg(long)]
        species: bool,
    },
    /// Show a species by its resource URL
    Species { url: String },
    /// Show one move
    Move { name: String },
    /// List the moves a creature can learn
    Moves {
        name: String,
        /// Matches move name, type or effect
        #[arg(long)]
        search: Option<String>,
        #[arg(long = "type")]
        type_name: Option<String>,
        #[arg(long, value_enum, default_value = "name")]
        sort: MoveSort,
        #[arg(long)]
        desc: bool,
    },
    /// Build a team from `name` or `name:move1,move2` entries
    Team {
        #[arg(long)]
        name: Option<String>,
        #[arg(required = true)]
        members: Vec<String>,
    },
}

impl Args {
    fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig {
            rest_base: self.rest_base.clone(),
            graphql_url: self.graphql_url.clone(),
            listing_limit: self.limit,
            cache_ttl: Duration::from_secs(self.ttl_secs),
            transport: self.transport,
            strict_moves: self.strict_moves,
        }
    }
}

#[derive(Serialize)]
struct TeamReport<'a> {
    team: &'a Team,
    stats: TeamStats,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "pokedex=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    let config = args.catalog_config();
    let catalog = Catalog::new(&config);

    match &args.command {
        Command::List { search, type_name } => {
            let filter = ListingFilter {
                search: search.clone(),
                type_name: type_name.clone(),
            };
            run_list(&catalog, &filter, args.json).await
        }
        Command::Show { name, species } => run_show(&catalog, name, *species, args.json).await,
        Command::Species { url } => {
            let species = catalog.get_species_detail(url).await.map_err(catalog_error)?;
            if args.json {
                return print_json(&species);
            }
            println!("#{} {}", species.id, species.name);
            println!(
                "capture rate {}, legendary {}, mythical {}, baby {}",
                species.capture_rate, species.is_legendary, species.is_mythical, species.is_baby
            );
            if let Some(text) = species.flavor_text("en") {
                println!("{text}");
            }
            Ok(())
        }
        Command::Move { name } => {
            let found = catalog.get_move_detail(name).await.map_err(catalog_error)?;
            if args.json {
                return print_json(&found);
            }
            print_move(&found);
            if let Some(effect) = &found.effect {
                println!("  {effect}");
            }
            Ok(())
        }
        Command::Moves {
            name,
            search,
            type_name,
            sort,
            desc,
        } => {
            let filter = MoveFilter {
                search: search.clone(),
                type_name: type_name.clone(),
                sort: *sort,
                descending: *desc,
            };
            run_moves(&catalog, name, &filter, args.json).await
        }
        Command::Team { name, members } => {
            let mut builder = TeamBuilder::new(config.strict_moves);
            run_team(&catalog, &mut builder, name.as_deref(), members, args.json).await
        }
    }
}

async fn run_list(catalog: &Catalog, filter: &ListingFilter, json: bool) -> io::Result<()> {
    let payload = catalog.list_summaries().await.map_err(catalog_error)?;
    if filter.type_name.is_some() && payload.full_data().is_none() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "type filtering needs --transport graphql",
        ));
    }

    let found = filter.apply(&payload);
    if json {
        return print_json(&found);
    }
    for summary in &found {
        println!("#{:>4} {}", summary.id, summary.name);
    }
    if filter.is_empty() {
        println!("{} via {}", payload.count(), payload.transport);
    } else {
        println!(
            "{} of {} via {}",
            found.len(),
            payload.count(),
            payload.transport
        );
    }
    Ok(())
}

async fn run_moves(
    catalog: &Catalog,
    name: &str,
    filter: &MoveFilter,
    json: bool,
) -> io::Result<()> {
    let detail = catalog.resolve_detail(name).await.map_err(catalog_error)?;
    let moves = catalog.learnable_moves(&detail).await;
    let found = filter.apply(&moves);
    if json {
        return print_json(&found);
    }
    for entry in &found {
        print_move(entry);
    }
    println!(
        "{} of {} moves, types: {}",
        found.len(),
        moves.len(),
        move_types(&moves).join(", ")
    );
    Ok(())
}

async fn run_show(catalog: &Catalog, name: &str, species: bool, json: bool) -> io::Result<()> {
    let detail = if species {
        catalog.get_detail_with_species(name).await
    } else {
        catalog.get_detail(name).await
    }
    .map_err(catalog_error)?;

    if json {
        return print_json(&detail);
    }
    print_detail(&detail);
    Ok(())
}

async fn run_team(
    catalog: &Catalog,
    builder: &mut TeamBuilder,
    name: Option<&str>,
    members: &[String],
    json: bool,
) -> io::Result<()> {
    if let Some(name) = name {
        builder.rename(name);
    }
    if catalog.transport() == TransportKind::Graphql {
        // One batched call usually covers every member.
        catalog.list_summaries().await.map_err(catalog_error)?;
    }

    for entry in members {
        let (creature, moves) = parse_member(entry);
        let detail = catalog
            .resolve_detail(&creature)
            .await
            .map_err(catalog_error)?;
        let id = detail.id;
        if let TeamUpdate::Rejected(reason) = builder.add_member(detail) {
            eprintln!("skipped {creature}: {reason}");
            continue;
        }
        for move_name in moves {
            if let TeamUpdate::Rejected(reason) = builder.select_move(id, &move_name) {
                eprintln!("skipped {move_name}: {reason}");
            }
        }
    }

    let team = builder.team();
    let stats = builder.stats();
    if json {
        return print_json(&TeamReport {
            team: &team,
            stats,
        });
    }
    println!("{} ({})", team.name, team.id);
    for member in &team.members {
        println!(
            "  #{:>4} {:<14} {}",
            member.id,
            member.name,
            member.selected_moves.join(", ")
        );
    }
    println!(
        "{} members, {} moves, {}% complete",
        stats.total_members, stats.total_moves_selected, stats.completion_percentage
    );
    Ok(())
}

fn print_detail(detail: &CreatureDetail) {
    println!("#{} {}", detail.id, detail.name);
    println!("types: {}", detail.type_names().join("/"));
    let abilities: Vec<String> = detail
        .abilities
        .iter()
        .map(|ability| {
            if ability.is_hidden {
                format!("{} (hidden)", ability.name)
            } else {
                ability.name.clone()
            }
        })
        .collect();
    println!("abilities: {}", abilities.join(", "));
    println!("height {} / weight {}", detail.height, detail.weight);
    for stat in &detail.stats {
        println!("  {:<16} {:>3}", stat.name, stat.base_stat);
    }
    println!("{} learnable moves", detail.moves.len());
    if let Some(text) = detail
        .species_details
        .as_ref()
        .and_then(|species| species.flavor_text("en"))
    {
        println!("{text}");
    }
}

fn print_move(detail: &MoveDetail) {
    let number = |value: Option<u16>| value.map_or_else(|| "-".to_string(), |v| v.to_string());
    println!(
        "{:<18} {:<9} {:<8} pow {:>3} acc {:>3} pp {:>2}",
        detail.name,
        detail.type_name,
        detail.damage_class,
        number(detail.power),
        number(detail.accuracy),
        number(detail.pp)
    );
}

fn parse_member(entry: &str) -> (String, Vec<String>) {
    match entry.split_once(':') {
        Some((name, moves)) => (
            name.trim().to_string(),
            moves
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        None => (entry.trim().to_string(), Vec::new()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    println!("{json}");
    Ok(())
}

fn catalog_error(error: CatalogError) -> io::Error {
    io::Error::other(error.to_string())
}
