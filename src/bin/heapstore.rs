//! heapstore CLI
//!
//! Operator tool for heap files in a data directory.

use std::process;

use clap::{Parser, Subcommand};
use heapstore::storage::{FileBlockDevice, HeapFile};
use heapstore::{
    Config, DataType, HeapError, Relation, Result, Row, Schema, StorageEnv, SyncStrategy,
};
use tracing_subscriber::{fmt, EnvFilter};

/// heapstore CLI
#[derive(Parser, Debug)]
#[command(name = "heapstore")]
#[command(about = "Slotted-page heap storage engine tools")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./heapstore_data")]
    data_dir: String,

    /// fsync after every block write instead of at close
    #[arg(long)]
    sync_every_put: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the create/insert/select/project/delete/drop round trip
    Selftest,

    /// Insert demo rows (a INT, b TEXT) into a table, creating it if needed
    Fill {
        /// Table name
        table: String,

        /// Number of rows to insert
        #[arg(short, long, default_value = "100")]
        rows: usize,
    },

    /// Print per-block statistics of a heap file
    Inspect {
        /// Heap file (table) name
        table: String,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,heapstore=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    tracing::info!("heapstore v{}", heapstore::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);

    let sync_strategy = if args.sync_every_put {
        SyncStrategy::EveryPut
    } else {
        SyncStrategy::OnClose
    };
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .sync_strategy(sync_strategy)
        .build();

    let result = StorageEnv::open(config).and_then(|env| match args.command {
        Commands::Selftest => selftest(&env),
        Commands::Fill { table, rows } => fill(&env, &table, rows),
        Commands::Inspect { table } => inspect(&env, &table),
    });

    if let Err(e) = result {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn demo_schema() -> Schema {
    Schema::default()
        .with_column("a", DataType::Int)
        .with_column("b", DataType::Text)
}

/// The `i`-th row written by `fill`
fn demo_row(i: usize) -> Result<Row> {
    let a = i32::try_from(i)
        .map_err(|_| HeapError::Validation(format!("row number {} exceeds INT range", i)))?;
    Ok(Row::new().with("a", a).with("b", format!("row-{:06}", i)))
}

/// Create, drop, then exercise a scratch table end to end
fn selftest(env: &StorageEnv) -> Result<()> {
    let mut scratch = env.table("_test_create_drop", demo_schema())?;
    scratch.create()?;
    tracing::info!("create ok");
    scratch.drop_table()?;
    tracing::info!("drop ok");

    let mut table = env.table("_test_data", demo_schema())?;
    table.create_if_not_exists()?;
    tracing::info!("create_if_not_exists ok");

    let row = Row::new().with("a", 12).with("b", "Hello!");
    let handle = table.insert(&row)?;
    tracing::info!("insert ok: {}", handle);

    let handles = table.select(None)?;
    tracing::info!("select ok: {} handle(s)", handles.len());

    let first = handles
        .first()
        .copied()
        .ok_or_else(|| HeapError::NotFound("inserted row".to_string()))?;
    let projected = table.project(first, None)?;
    if projected != row {
        table.drop_table()?;
        return Err(HeapError::Validation(format!(
            "projected {} but inserted {}",
            projected, row
        )));
    }
    tracing::info!("project ok: {}", projected);

    table.delete(first)?;
    let remaining = table.select(None)?.len();
    if remaining != 0 {
        table.drop_table()?;
        return Err(HeapError::Validation(format!(
            "{} handle(s) left after delete",
            remaining
        )));
    }
    tracing::info!("delete ok");

    table.drop_table()?;
    println!("selftest passed");
    Ok(())
}

fn fill(env: &StorageEnv, name: &str, rows: usize) -> Result<()> {
    let mut table = env.table(name, demo_schema())?;
    table.create_if_not_exists()?;

    let start = table.file().last_block_id();
    for i in 0..rows {
        table.insert(&demo_row(i)?)?;
    }
    let end = table.file().last_block_id();
    table.close()?;

    println!(
        "inserted {} rows into {} (blocks {} -> {})",
        rows, name, start, end
    );
    Ok(())
}

fn inspect(env: &StorageEnv, name: &str) -> Result<()> {
    let mut file: HeapFile<FileBlockDevice> = env.heap_file(name)?;
    file.open()?;

    println!("heap file {} ({})", name, file.device().path().display());
    println!("{:>8} {:>8} {:>8} {:>10}", "block", "slots", "live", "free");

    let mut live_total = 0;
    for block_id in file.block_ids() {
        let page = file.get(block_id)?;
        let live = page.ids().len();
        live_total += live;
        println!(
            "{:>8} {:>8} {:>8} {:>10}",
            block_id,
            page.num_records(),
            live,
            page.free_space()
        );
    }

    println!(
        "{} block(s), {} live record(s)",
        file.last_block_id(),
        live_total
    );
    file.close()
}
