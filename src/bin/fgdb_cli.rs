use clap::Parser;
use comfy_table::{presets::UTF8_FULL, Cell, Table as ComfyTable};
use config::{Config, Environment, File};
use fgdb_sql::{Connection, ConnectionOptions, FileEngine, ResultSet};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde::Deserialize;

/// fgdb interactive SQL shell
#[derive(Parser, Debug)]
#[command(name = "fgdb_cli")]
#[command(about = "Interactive SQL shell over a file geodatabase", long_about = None)]
struct Args {
    /// Database directory
    #[arg(short = 'd', long)]
    database: Option<String>,

    /// Create the database when it does not exist
    #[arg(long)]
    create: bool,

    /// Run one statement and exit
    #[arg(short = 'c', long)]
    command: Option<String>,
}

/// Shell configuration
#[derive(Debug, Deserialize)]
struct CliConfig {
    #[serde(default = "default_database")]
    database: String,
    #[serde(default)]
    create: bool,
    #[serde(default = "default_sample_limit")]
    sample_limit: usize,
}

fn default_database() -> String { "./data.gdb".to_string() }
fn default_sample_limit() -> usize { fgdb_sql::catalog::DEFAULT_SAMPLE_ROWS }

/// `FGDB_*` variables; the rest of the name is the key, so
/// `FGDB_SAMPLE_LIMIT` sets `sample_limit`.
fn environment() -> Environment {
    Environment::with_prefix("FGDB").prefix_separator("_")
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            create: false,
            sample_limit: default_sample_limit(),
        }
    }
}

impl CliConfig {
    fn from_sources(builder: config::ConfigBuilder<config::builder::DefaultState>, env: Environment) -> Self {
        builder
            .add_source(env)
            .build()
            .ok()
            .and_then(|c| c.try_deserialize::<Self>().ok())
            .unwrap_or_default()
    }

    /// Load configuration with priority: CLI args > ENV > config file > defaults
    fn load(args: &Args) -> Self {
        let mut builder = Config::builder();

        // 1. Optional config file in the home directory
        if let Some(path) = dirs::home_dir().map(|p| p.join(".fgdb_cli.toml")) {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
                log::debug!("loaded config from {}", path.display());
            }
        }

        // 2. Environment variables (FGDB_*) over the file, 3. defaults for the rest
        let base = Self::from_sources(builder, environment());

        // 4. CLI args override everything
        Self {
            database: args.database.clone().unwrap_or(base.database),
            create: args.create || base.create,
            sample_limit: base.sample_limit,
        }
    }
}

fn render(rs: &mut ResultSet) -> String {
    let md = rs.metadata();
    let mut table = ComfyTable::new();
    table.load_preset(UTF8_FULL);
    table.set_header((1..=md.column_count()).map(|i| Cell::new(md.column_label(i).unwrap_or_default())));

    let mut rows = 0;
    while rs.next() {
        let cells: Vec<Cell> = (1..=md.column_count())
            .map(|i| match rs.get_string(i) {
                Ok(Some(text)) => Cell::new(text),
                Ok(None) => Cell::new("NULL"),
                Err(e) => Cell::new(format!("<{e}>")),
            })
            .collect();
        table.add_row(cells);
        rows += 1;
    }
    if md.column_count() == 0 || rows == 0 {
        return "(0 rows)".to_string();
    }
    format!("{table}\n({rows} rows)")
}

fn print_help() {
    println!("Meta-commands:");
    println!("  \\q              - Quit");
    println!("  \\dt             - List tables");
    println!("  \\d <table>      - Describe table");
    println!("  \\begin          - Start a transaction (autocommit off)");
    println!("  \\commit         - Commit the open transaction");
    println!("  \\rollback       - Roll back the open transaction");
    println!("  \\?              - Show this help");
    println!("\nSQL: SELECT (joins, UNION, LIMIT/OFFSET), CREATE/DROP TABLE, INSERT, UPDATE, DELETE");
}

/// Runs one SQL statement and prints its outcome.
fn run_sql(conn: &Connection, sql: &str) -> fgdb_sql::Result<()> {
    let mut stmt = conn.create_statement()?;
    if stmt.execute(sql)? {
        if let Some(rs) = stmt.result_set() {
            println!("{}", render(rs));
        }
    } else {
        println!("OK");
    }
    for warning in stmt.warnings() {
        eprintln!("WARNING: {warning}");
    }
    Ok(())
}

/// Handles a backslash command. Returns false when the shell should exit.
fn run_meta(conn: &Connection, command: &str) -> fgdb_sql::Result<bool> {
    let mut parts = command.split_whitespace();
    match (parts.next().unwrap_or_default(), parts.next()) {
        ("\\q" | "\\quit", _) => return Ok(false),
        ("\\?" | "\\h" | "\\help", _) => print_help(),
        ("\\dt", _) => {
            let mut rs = conn.metadata()?.tables(None)?;
            println!("{}", render(&mut rs));
        }
        ("\\d", Some(table)) => {
            let mut rs = conn.metadata()?.columns(Some(table), None)?;
            println!("{}", render(&mut rs));
        }
        ("\\begin", _) => {
            conn.set_auto_commit(false)?;
            println!("BEGIN");
        }
        ("\\commit", _) => {
            conn.commit()?;
            println!("COMMIT");
        }
        ("\\rollback", _) => {
            conn.rollback()?;
            println!("ROLLBACK");
        }
        _ => println!("Unknown meta-command: {command}. Use \\? for help."),
    }
    Ok(true)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = CliConfig::load(&args);
    let options = ConnectionOptions {
        create_if_missing: config.create,
        sample_limit: config.sample_limit,
    };
    let conn = Connection::open(&config.database, Box::new(FileEngine::new()), options)?;

    if let Some(sql) = &args.command {
        let outcome = if sql.trim_start().starts_with('\\') {
            run_meta(&conn, sql.trim()).map(|_| ())
        } else {
            run_sql(&conn, sql)
        };
        conn.close()?;
        return outcome.map_err(Into::into);
    }

    println!("fgdb_cli {} on {}", env!("CARGO_PKG_VERSION"), config.database);
    println!("Type \\? for help, \\q to quit.\n");

    let mut rl = DefaultEditor::new()?;
    let history_file = dirs::home_dir().map(|p| p.join(".fgdb_cli_history"));
    if let Some(ref path) = history_file {
        let _ = rl.load_history(path); // Ignore error if file doesn't exist
    }

    loop {
        let prompt = if conn.auto_commit() { "fgdb> " } else { "fgdb*> " };
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                let result = if line.starts_with('\\') {
                    run_meta(&conn, line)
                } else if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
                    Ok(false)
                } else {
                    run_sql(&conn, line).map(|()| true)
                };
                match result {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => eprintln!("ERROR: {e}"),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {err:?}");
                break;
            }
        }
    }

    if let Some(ref path) = history_file {
        let _ = rl.save_history(path);
    }
    // An open transaction is rolled back on close
    conn.close()?;
    Ok(())
}
