// Asset Shelf CLI binary

use std::path::{Path, PathBuf};
use std::time::Duration;
use clap::{Parser, Subcommand};
use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use asset_shelf_lib::config::{config_file, default_app_root, ShelfConfig};
use asset_shelf_lib::db::schema::{self, Asset};
use asset_shelf_lib::ingest::{ImportOutcome, ScanControl, ScanOptions};
use asset_shelf_lib::library::{self, CategoryNode};
use asset_shelf_lib::preview::FfmpegTool;
use asset_shelf_lib::{tools, Shelf};

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Asset Shelf - a catalog for footage, stills, audio, LUTs and macros", long_about = None)]
#[command(version)]
struct Cli {
    /// App-data folder (defaults to $SHELF_HOME or the platform data dir)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy files into storage and catalog them
    Import {
        /// Files to import (.drfx archives are expanded)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Category path, e.g. Textures/Wood
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Import every supported file under a folder
    Scan {
        /// Folder to scan
        path: PathBuf,
        /// Category prefix for everything found
        #[arg(short, long)]
        category: Option<String>,
    },

    /// List assets
    List {
        /// Only this category and its subfolders
        #[arg(short, long, conflicts_with_all = ["favorites", "search"])]
        category: Option<String>,
        /// Only favorites
        #[arg(long, conflicts_with = "search")]
        favorites: bool,
        /// Case-insensitive name search
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show asset details
    Show {
        /// Asset ID
        id: i64,
    },

    /// Toggle the favorite flag
    Favorite {
        /// Asset ID
        id: i64,
    },

    /// Delete an asset and its stored file
    Delete {
        /// Asset ID
        id: i64,
    },

    /// Show the category tree
    Categories,

    /// Create a category folder
    Mkdir {
        /// Category path
        path: String,
    },

    /// Delete a category folder and every asset in it
    Rmdir {
        /// Category path
        path: String,
    },

    /// Drop catalog entries whose files are gone
    Sync,

    /// Render an asset's preview again, or set one by hand
    Preview {
        /// Asset ID
        id: i64,
        /// Use this image instead of rendering one
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Write settings to the app-data folder
    Config {
        /// Folder that holds imported files
        #[arg(long)]
        storage: Option<PathBuf>,
        /// Seconds before a preview render is killed
        #[arg(long)]
        timeout: Option<u64>,
        /// Drop records for missing files whenever the shelf opens
        #[arg(long)]
        sync_on_open: Option<bool>,
    },

    /// Report configuration and tool availability
    Doctor,
}

fn main() -> Result<()> {
    // `log` records from the library are bridged into this subscriber
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let root = cli.home.unwrap_or_else(default_app_root);

    match cli.command {
        Commands::Import { files, category } => cmd_import(&root, files, category),
        Commands::Scan { path, category } => cmd_scan(&root, path, category),
        Commands::List { category, favorites, search } => cmd_list(&root, category, favorites, search),
        Commands::Show { id } => cmd_show(&root, id),
        Commands::Favorite { id } => cmd_favorite(&root, id),
        Commands::Delete { id } => cmd_delete(&root, id),
        Commands::Categories => cmd_categories(&root),
        Commands::Mkdir { path } => cmd_mkdir(&root, &path),
        Commands::Rmdir { path } => cmd_rmdir(&root, &path),
        Commands::Sync => cmd_sync(&root),
        Commands::Preview { id, image } => cmd_preview(&root, id, image),
        Commands::Config { storage, timeout, sync_on_open } => cmd_config(&root, storage, timeout, sync_on_open),
        Commands::Doctor => cmd_doctor(&root),
    }
}

fn cmd_import(root: &Path, files: Vec<PathBuf>, category: Option<String>) -> Result<()> {
    let shelf = Shelf::open_at(root)?;
    let ingestor = shelf.ingestor();
    let mut failed = 0;

    for file in &files {
        match ingestor.import_file(file, category.as_deref()) {
            Ok(ImportOutcome::Asset { id, storage_path }) => {
                println!("#{:<5} {}  ->  {}", id, file.display(), storage_path.display());
            }
            Ok(ImportOutcome::AlreadyCataloged { storage_path }) => {
                println!("       {} already cataloged at {}", file.display(), storage_path.display());
            }
            Ok(ImportOutcome::Archive(expansion)) => {
                println!(
                    "       {} expanded into {} ({} macros registered)",
                    file.display(),
                    expansion.extract_dir.display(),
                    expansion.registered
                );
            }
            Err(e) => {
                failed += 1;
                eprintln!("Failed to import {}: {}", file.display(), e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} files failed to import", failed, files.len());
    }
    Ok(())
}

fn cmd_scan(root: &Path, path: PathBuf, category: Option<String>) -> Result<()> {
    let shelf = Shelf::open_at(root)?;

    let source = path.canonicalize()
        .map_err(|_| anyhow::anyhow!("Scan path does not exist: {}", path.display()))?;

    println!("Scanning {}...", source.display());

    let options = ScanOptions {
        base_category: category,
        cancel: None,
    };
    let summary = shelf.ingestor().scan_directory(&source, &options, |progress| {
        let name = progress.file
            .as_ref()
            .and_then(|f| f.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let status = if progress.is_error { "FAILED" } else { "ok" };
        println!("[{}/{}] {} {}", progress.current, progress.total, name, status);
        ScanControl::Continue
    })?;

    println!();
    println!("Scan complete:");
    println!("  Total files:        {}", summary.total);
    println!("  Imported:           {}", summary.imported);
    println!("  Already cataloged:  {}", summary.already_cataloged);
    println!("  Failed:             {}", summary.failed);

    Ok(())
}

fn cmd_list(root: &Path, category: Option<String>, favorites: bool, search: Option<String>) -> Result<()> {
    let shelf = Shelf::open_at(root)?;
    let conn = shelf.conn();

    let assets = if let Some(category) = category {
        library::assets_in_category(conn, &category)?
    } else if favorites {
        schema::list_favorite_assets(conn)?
    } else if let Some(query) = search {
        schema::search_assets(conn, &query)?
    } else {
        schema::list_assets(conn)?
    };

    let total = schema::count_assets(conn)?;
    println!("{} assets shown ({} in catalog)", assets.len(), total);
    println!();

    if assets.is_empty() {
        println!("Nothing here. Use 'shelf import <files>' or 'shelf scan <dir>' to add assets.");
        return Ok(());
    }

    println!("{:>5}  {:>10}  {:>1}  {:<24}  {}", "ID", "Kind", "*", "Category", "Name");
    println!("{}", "-".repeat(70));

    for asset in assets {
        print_row(&asset);
    }

    Ok(())
}

fn print_row(asset: &Asset) {
    let category = asset.category_path.as_deref().unwrap_or("-");
    let category = if category.chars().count() > 24 {
        let tail: String = category.chars().rev().take(21).collect::<Vec<_>>().into_iter().rev().collect();
        format!("...{}", tail)
    } else {
        category.to_string()
    };

    println!("{:>5}  {:>10}  {:>1}  {:<24}  {}",
        asset.id,
        asset.kind,
        if asset.is_favorite { "*" } else { "" },
        category,
        asset.display_name
    );
}

fn cmd_show(root: &Path, id: i64) -> Result<()> {
    let shelf = Shelf::open_at(root)?;

    let asset = schema::get_asset(shelf.conn(), id)?
        .ok_or_else(|| anyhow::anyhow!("Asset {} not found", id))?;

    println!("Asset #{}", asset.id);
    println!();
    println!("Name:      {}", asset.display_name);
    println!("Kind:      {}", asset.kind);
    println!("Category:  {}", asset.category_path.as_deref().unwrap_or("-"));
    println!("Stored at: {}", asset.storage_path);
    println!("Preview:   {}", asset.preview_path.as_deref().unwrap_or("-"));
    println!("Added:     {}", asset.added_at);
    if asset.is_favorite {
        println!("Tags:      [favorite]");
    }

    if !Path::new(&asset.storage_path).exists() {
        println!();
        println!("Warning: the stored file is missing. Run 'shelf sync' to clean up.");
    }

    Ok(())
}

fn cmd_favorite(root: &Path, id: i64) -> Result<()> {
    let shelf = Shelf::open_at(root)?;
    let now_favorite = schema::toggle_favorite(shelf.conn(), id)?;
    println!("Asset {} is {} a favorite", id, if now_favorite { "now" } else { "no longer" });
    Ok(())
}

fn cmd_delete(root: &Path, id: i64) -> Result<()> {
    let shelf = Shelf::open_at(root)?;
    if library::delete_asset_with_file(shelf.conn(), id)? {
        println!("Deleted asset {}", id);
    } else {
        println!("Deleted asset {} (its file could not be removed, see log)", id);
    }
    Ok(())
}

fn cmd_categories(root: &Path) -> Result<()> {
    let shelf = Shelf::open_at(root)?;
    let tree = library::category_tree(shelf.conn(), shelf.storage_root())?;

    if tree.is_empty() {
        println!("No categories yet.");
        return Ok(());
    }

    for node in &tree {
        print_node(node, 0);
    }
    Ok(())
}

fn print_node(node: &CategoryNode, depth: usize) {
    println!("{}{} ({})", "  ".repeat(depth), node.name, node.total);
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

fn cmd_mkdir(root: &Path, path: &str) -> Result<()> {
    let shelf = Shelf::open_at(root)?;
    let dir = library::create_category(shelf.storage_root(), path)?;
    println!("Created {}", dir.display());
    Ok(())
}

fn cmd_rmdir(root: &Path, path: &str) -> Result<()> {
    let shelf = Shelf::open_at(root)?;
    let result = library::delete_category(shelf.conn(), shelf.storage_root(), path)?;

    println!("Removed {} assets from {}", result.records_removed, path);
    for file in &result.files_failed {
        println!("  could not delete {}", file.display());
    }
    if !result.directory_removed {
        println!("  folder was not removed");
    }
    Ok(())
}

fn cmd_sync(root: &Path) -> Result<()> {
    let mut config = ShelfConfig::load(root)?;
    // The explicit sync below reports the count
    config.sync_on_open = false;
    let shelf = Shelf::open(config)?;

    let removed = shelf.ingestor().sync_with_storage()?;
    println!("Removed {} stale catalog entries", removed);
    Ok(())
}

fn cmd_preview(root: &Path, id: i64, image: Option<PathBuf>) -> Result<()> {
    let shelf = Shelf::open_at(root)?;
    if let Some(image) = image {
        let stored = shelf.set_preview(id, &image)?;
        println!("Preview for {}: {}", id, stored.display());
        return Ok(());
    }
    match shelf.regenerate_preview(id)? {
        Some(path) => println!("Preview for {}: {}", id, path.display()),
        None => println!("No preview available for {}", id),
    }
    Ok(())
}

fn cmd_config(root: &Path, storage: Option<PathBuf>, timeout: Option<u64>, sync_on_open: Option<bool>) -> Result<()> {
    let mut config = ShelfConfig::load(root)?;
    if let Some(storage) = storage {
        config.storage_path = storage;
    }
    if let Some(timeout) = timeout {
        config.tool_timeout_secs = timeout;
    }
    if let Some(sync_on_open) = sync_on_open {
        config.sync_on_open = sync_on_open;
    }

    config.save(root)?;
    println!("Wrote {}", config_file(root).display());
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_doctor(root: &Path) -> Result<()> {
    let config = ShelfConfig::load(root)?;

    println!("App root:       {}", root.display());
    println!("Catalog:        {}", config.catalog_path.display());
    println!("Storage:        {}", config.storage_path.display());
    println!("Preview cache:  {}", config.preview_cache_path.display());
    println!("Cache key:      {:?}", config.preview_cache_key);
    println!("Tool timeout:   {}s", config.tool_timeout_secs);
    println!();

    let tool = FfmpegTool::new(Duration::from_secs(config.tool_timeout_secs));
    let ffmpeg = tool.binary();
    let status = if tools::is_ffmpeg_available() { "OK" } else { "NOT FOUND (previews disabled)" };
    println!("ffmpeg:         {} [{}]", ffmpeg.display(), status);

    Ok(())
}
