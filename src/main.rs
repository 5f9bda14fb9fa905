use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use typeboard::{
    config::{FileSettingsStore, Settings, SettingsStore},
    leaderboard::{aggregate_filtered, distinct_usernames, CollegeFilter},
    score::{ranked, RankedRow},
    store::{entries, MemoryScoreStore, ScoreStore, SqliteScoreStore},
    submission::SubmitPolicy,
    web::{run_server, AppState},
};

/// typing-test results service with a moderated leaderboard
#[derive(Parser, Debug)]
#[clap(version, about)]
pub struct Cli {
    /// settings file (defaults to the platform config dir)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// sqlite database holding the scores
    #[clap(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// run the web server
    Serve(ServeArgs),
    /// print the leaderboard
    Leaderboard {
        /// only show this college
        #[clap(long)]
        college: Option<String>,
        /// maximum number of rows
        #[clap(long)]
        limit: Option<usize>,
        /// write CSV instead of a table
        #[clap(long)]
        csv: bool,
    },
    /// run a username through the moderation rules
    CheckUsername { name: String },
    /// delete every score belonging to the given users
    RemoveUser {
        #[clap(required = true)]
        usernames: Vec<String>,
    },
    /// delete all scores
    Clear {
        #[clap(long)]
        yes: bool,
    },
    /// remove every stored user the moderation rules now reject
    Purge {
        #[clap(long)]
        dry_run: bool,
    },
    /// write a settings file with the defaults
    InitConfig {
        /// overwrite an existing file
        #[clap(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    #[clap(long)]
    bind: Option<String>,

    #[clap(long)]
    port: Option<u16>,

    /// keep scores in memory only; nothing is written to disk
    #[clap(long)]
    in_memory: bool,

    #[clap(long, value_enum)]
    policy: Option<SubmitPolicy>,

    /// drop the Secure flag from the session cookie (plain-http development)
    #[clap(long)]
    insecure_cookies: bool,
}

impl ServeArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(bind) = &self.bind {
            settings.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(policy) = self.policy {
            settings.submit_policy = policy;
        }
        if self.insecure_cookies {
            settings.secure_cookies = false;
        }
    }
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    rank: usize,
    username: &'a str,
    college: &'a str,
    best_wpm: f64,
    avg_accuracy: f64,
    tests_taken: u32,
}

impl<'a> From<&'a RankedRow> for CsvRow<'a> {
    fn from(r: &'a RankedRow) -> Self {
        Self {
            rank: r.rank,
            username: &r.row.username,
            college: &r.row.college,
            best_wpm: r.row.best_wpm,
            avg_accuracy: r.row.avg_accuracy,
            tests_taken: r.row.tests_taken,
        }
    }
}

fn settings_store(cli: &Cli) -> FileSettingsStore {
    match &cli.config {
        Some(path) => FileSettingsStore::with_path(path),
        None => FileSettingsStore::new(),
    }
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let store = settings_store(cli);
    let mut settings = store
        .load_strict()
        .with_context(|| format!("loading settings from {}", store.path().display()))?;
    settings
        .apply_env()
        .context("applying environment overrides")?;
    if let Some(db) = &cli.database {
        settings.database_path = Some(db.clone());
    }
    Ok(settings)
}

fn open_store(settings: &Settings) -> anyhow::Result<SqliteScoreStore> {
    let path = settings.database_path();
    SqliteScoreStore::open(&path).with_context(|| format!("opening {}", path.display()))
}

fn serve(mut settings: Settings, args: &ServeArgs) -> anyhow::Result<()> {
    args.apply(&mut settings);

    let store: Arc<dyn ScoreStore> = if args.in_memory {
        log::warn!("serving from an in-memory store; scores are lost on exit");
        Arc::new(MemoryScoreStore::new())
    } else {
        log::info!("using database {}", settings.database_path().display());
        Arc::new(open_store(&settings)?)
    };

    let state = AppState::new(&settings, store).context("building moderation rules")?;
    if state.admin_token.is_none() {
        log::warn!("no admin token configured; /admin endpoints are disabled");
    }
    log::info!("submit policy: {}", settings.submit_policy);

    let address = settings.server_address();
    actix_web::rt::System::new()
        .block_on(run_server(state, address.clone()))
        .with_context(|| format!("serving on {}", address))
}

fn print_leaderboard(
    settings: &Settings,
    college: Option<&str>,
    limit: Option<usize>,
    csv: bool,
) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let rows = store.scan()?;
    let filter = CollegeFilter::parse(college);
    let limit = limit.unwrap_or(settings.leaderboard_limit);
    let board = ranked(aggregate_filtered(entries(&rows), limit, &filter));

    if csv {
        let mut wtr = csv::Writer::from_writer(io::stdout());
        for row in &board {
            wtr.serialize(CsvRow::from(row))?;
        }
        wtr.flush()?;
        return Ok(());
    }

    if board.is_empty() {
        println!("No results yet.");
        return Ok(());
    }

    println!(
        "{:>4}  {:<30}  {:<16}  {:>8}  {:>8}  {:>5}",
        "#", "user", "college", "best", "acc", "tests"
    );
    for r in &board {
        println!(
            "{:>4}  {:<30}  {:<16}  {:>8.0}  {:>7.1}%  {:>5}",
            r.rank, r.row.username, r.row.college, r.row.best_wpm, r.row.avg_accuracy, r.row.tests_taken
        );
    }
    Ok(())
}

fn purge(settings: &Settings, dry_run: bool) -> anyhow::Result<()> {
    let policy = settings.moderation_policy()?;
    let store = open_store(settings)?;
    let rows = store.scan()?;

    let mut flagged = 0;
    for username in distinct_usernames(entries(&rows)) {
        let Err(reason) = policy.validate(&username) else {
            continue;
        };
        flagged += 1;
        if dry_run {
            println!("would remove {}: {}", username, reason);
        } else {
            let removed = store.delete_user(&username)?;
            log::info!("purged {} ({} rows): {}", username, removed, reason);
            println!("removed {} ({} score(s)): {}", username, removed, reason);
        }
    }

    println!("{} username(s) flagged", flagged);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    pretty_env_logger::formatted_builder()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let cli = Cli::parse();

    if let Command::InitConfig { force } = cli.command {
        let store = settings_store(&cli);
        if store.path().exists() && !force {
            bail!("{} already exists (use --force to overwrite)", store.path().display());
        }
        store
            .save(&Settings::default())
            .with_context(|| format!("writing {}", store.path().display()))?;
        println!("{}", store.path().display());
        return Ok(());
    }

    let settings = load_settings(&cli)?;

    match &cli.command {
        Command::Serve(args) => serve(settings, args)?,
        Command::Leaderboard {
            college,
            limit,
            csv,
        } => print_leaderboard(&settings, college.as_deref(), *limit, *csv)?,
        Command::CheckUsername { name } => {
            let policy = settings.moderation_policy()?;
            if let Err(reason) = policy.validate(name) {
                println!("rejected: {}", reason);
                std::process::exit(1);
            }
            println!("accepted");
        }
        Command::RemoveUser { usernames } => {
            let store = open_store(&settings)?;
            for username in usernames {
                let removed = store.delete_user(username)?;
                log::info!("removed {} ({} rows)", username, removed);
                println!("removed {} score(s) for {}", removed, username);
            }
        }
        Command::Clear { yes } => {
            if !yes {
                bail!("refusing to delete every score without --yes");
            }
            let removed = open_store(&settings)?.clear()?;
            log::info!("cleared {} rows", removed);
            println!("removed {} score(s)", removed);
        }
        Command::Purge { dry_run } => purge(&settings, *dry_run)?,
        Command::InitConfig { .. } => unreachable!("handled before settings are loaded"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn serve_defaults() {
        let cli = Cli::parse_from(["typeboard", "serve"]);
        assert_matches!(cli.command, Command::Serve(ref args) if !args.in_memory && args.port.is_none());
        assert_eq!(cli.config, None);
    }

    #[test]
    fn serve_flags_override_settings() {
        let cli = Cli::parse_from([
            "typeboard",
            "serve",
            "--bind",
            "0.0.0.0",
            "--port",
            "9090",
            "--policy",
            "replace",
            "--insecure-cookies",
            "--database",
            "/tmp/t.db",
        ]);
        let Command::Serve(args) = &cli.command else {
            panic!("expected serve");
        };

        let mut settings = Settings::default();
        args.apply(&mut settings);
        assert_eq!(settings.server_address(), "0.0.0.0:9090");
        assert_eq!(settings.submit_policy, SubmitPolicy::Replace);
        assert!(!settings.secure_cookies);
        assert_eq!(cli.database, Some(PathBuf::from("/tmp/t.db")));
    }

    #[test]
    fn leaderboard_flags() {
        let cli = Cli::parse_from([
            "typeboard",
            "leaderboard",
            "--college",
            "NMIMS",
            "--limit",
            "5",
            "--csv",
        ]);
        assert_matches!(
            cli.command,
            Command::Leaderboard { college: Some(ref c), limit: Some(5), csv: true } if c == "NMIMS"
        );
    }

    #[test]
    fn remove_user_needs_a_name() {
        assert!(Cli::try_parse_from(["typeboard", "remove-user"]).is_err());
        let cli = Cli::parse_from(["typeboard", "remove-user", "a", "b"]);
        assert_matches!(cli.command, Command::RemoveUser { ref usernames } if usernames.len() == 2);
    }

    #[test]
    fn global_config_after_subcommand() {
        let cli = Cli::parse_from(["typeboard", "purge", "--dry-run", "--config", "/tmp/s.json"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.json")));
        assert_matches!(cli.command, Command::Purge { dry_run: true });
    }

    #[test]
    fn csv_row_flattens_ranked_row() {
        let board = ranked(vec![typeboard::score::LeaderboardRow {
            username: "alice".into(),
            college: "NMIMS".into(),
            best_wpm: 70.0,
            avg_accuracy: 85.0,
            tests_taken: 2,
        }]);
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.serialize(CsvRow::from(&board[0])).unwrap();
        let out = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert_eq!(
            out,
            "rank,username,college,best_wpm,avg_accuracy,tests_taken\n1,alice,NMIMS,70.0,85.0,2\n"
        );
    }
}
