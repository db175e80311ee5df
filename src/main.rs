use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use symdex::{dbpath, logging, IndexDb};

#[derive(Parser, Debug)]
#[command(name = "symdex")]
#[command(version, about = "Per-translation-unit symbol index inspection")]
struct Cli {
    /// Store name (no slashes) or path to a store directory.
    ///
    /// If it contains no path separators, it is treated as a name and placed
    /// under the default symdex data directory (platform-specific).
    #[arg(long, default_value = "default")]
    db: String,

    /// Increase logging verbosity (use together with RUST_LOG for fine control).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dump store contents (all sections, or one of
    /// symbolnames|targets|usrs|symbols|tokens)
    Status {
        /// Section to dump; omit for everything
        section: Option<String>,
    },

    /// Print basic store info
    Info,

    /// Remove every row belonging to one compilation unit
    DeleteUnit {
        /// Unit file id (non-zero)
        file_id: u32,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let db_dir = dbpath::resolve_db_dir(&cli.db)
        .with_context(|| format!("Failed to resolve --db {}", cli.db))?;

    match cli.cmd {
        Command::Status { section } => {
            let db = IndexDb::open(&db_dir)
                .with_context(|| format!("Failed to open store in {}", db_dir.display()))?;
            let mut stdout = std::io::stdout().lock();
            symdex::status::dump(&db, section.as_deref().unwrap_or(""), &mut stdout)?;
            Ok(())
        }

        Command::Info => {
            let db = IndexDb::open(&db_dir)
                .with_context(|| format!("Failed to open store in {}", db_dir.display()))?;
            println!("Store directory: {}", db.dir().display());
            Ok(())
        }

        Command::DeleteUnit { file_id } => {
            anyhow::ensure!(file_id != 0, "file id must be non-zero");
            let db = IndexDb::open(&db_dir)
                .with_context(|| format!("Failed to open store in {}", db_dir.display()))?;
            db.delete_unit(file_id)
                .with_context(|| format!("Failed to delete unit {file_id}"))?;
            println!("Deleted unit {file_id}");
            Ok(())
        }
    }
}
