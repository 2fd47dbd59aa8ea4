use clap::Args;
use pomobot_core::storage::database::DEFAULT_HISTORY_LIMIT;
use pomobot_core::{Config, Database, UserId};

#[derive(Args)]
pub struct HistoryArgs {
    /// User whose sessions to list (defaults to the configured account)
    #[arg(long)]
    user: Option<String>,
    /// Maximum number of sessions, newest first
    #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
    limit: usize,
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

pub fn run(args: HistoryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let user = match args.user {
        Some(id) => UserId::new(id)?,
        None => Config::load()?
            .user_id()
            .ok_or("not signed in; pass --user or set account.user_id")?,
    };

    let db = Database::open()?;
    let sessions = db.recent_sessions(&user, args.limit)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("no rated sessions for {user}");
        return Ok(());
    }
    for session in &sessions {
        let rating = session
            .rating
            .map(|r| format!("{r}/5"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {:<5}  {:>3} min  {}",
            session.completed_at.format("%Y-%m-%d %H:%M"),
            session.session_type,
            session.duration_secs / 60,
            rating
        );
    }
    Ok(())
}
