//! services/client/src/bin/weave.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weave_client::{
    config::Config, error::ClientError, state::AppState, ClientResult, SessionState, VideoUpload,
};
use weave_core::LocalVideo;

#[derive(Parser, Debug)]
#[command(name = "weave", about = "Command-line client for the Weave backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the backend is reachable
    Ping,
    Login {
        email: String,
        password: String,
    },
    Signup {
        email: String,
        username: String,
        password: String,
    },
    Logout,
    /// Show the signed-in user, optionally re-checking the token with the server
    Whoami {
        #[arg(long)]
        check: bool,
    },
    DeleteAccount {
        password: String,
    },
    /// List your groups
    Groups,
    /// List users that can be invited
    Users,
    /// Show the current prompt
    Prompt,
    CreateGroup {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Join a group by id or, with --code, by invite code
    Join {
        group_id: Option<i64>,
        #[arg(long)]
        code: Option<String>,
    },
    Leave {
        group_id: i64,
    },
    Invite {
        group_id: i64,
        usernames: Vec<String>,
    },
    /// List pending invites, or accept/decline one
    Invites {
        #[arg(long, conflicts_with = "decline")]
        accept: Option<i64>,
        #[arg(long)]
        decline: Option<i64>,
    },
    Submissions {
        group_id: i64,
    },
    /// Print a download link for a submission
    Download {
        submission_id: i64,
    },
    /// Upload a recorded video to a group
    Upload {
        group_id: i64,
        file: PathBuf,
        #[arg(long)]
        duration: f64,
        #[arg(long)]
        prompt: Option<i64>,
    },
    Compilations {
        group_id: i64,
    },
    /// Start a compilation for a group
    Generate {
        group_id: i64,
    },
    /// Show a compilation's status, optionally polling until it settles
    Status {
        compilation_id: i64,
        #[arg(long)]
        wait: bool,
        #[arg(long, default_value_t = 5)]
        interval_secs: u64,
    },
    Music,
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let cli = Cli::parse();
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded. API at {}", config.base_url);

    // --- 2. Build the Shared AppState & Restore the Session ---
    let app = AppState::new(config)?;
    let session = app.start().await;

    // --- 3. Run the Command ---
    let result = run(&app, session, cli.command).await;
    app.shutdown();
    result
}

async fn run(app: &AppState, session: SessionState, command: Command) -> ClientResult<()> {
    match command {
        Command::Ping => {
            let health = app.api.health().await?;
            println!("{} ({})", health.status, app.api.base_url());
        }
        Command::Login { email, password } => {
            let user = app.session.login(&email, &password).await?;
            println!("Logged in as {}", user.display_name());
        }
        Command::Signup {
            email,
            username,
            password,
        } => {
            let user = app.session.signup(&email, &username, &password).await?;
            println!("Welcome, {}", user.display_name());
        }
        Command::Logout => {
            app.session.logout().await;
            println!("Logged out");
        }
        Command::Whoami { check } => {
            if check && !app.session.verify().await {
                println!("Session expired, logged out");
                return Ok(());
            }
            match app.session.state() {
                SessionState::Authenticated(user) => {
                    println!("{} <{}> (id {})", user.display_name(), user.email, user.id)
                }
                _ => println!("Not logged in"),
            }
        }
        Command::DeleteAccount { password } => {
            app.session.delete_account(&password).await?;
            println!("Account deleted");
        }
        Command::Groups => {
            require_login(&session)?;
            app.groups.refresh().await?;
            for group in app.groups.groups() {
                let stats = group
                    .video_stats
                    .as_ref()
                    .map(|s| format!("{}/{} posted", s.unique_submitters, s.total_members))
                    .unwrap_or_default();
                println!(
                    "{:>5}  {:<24} {:>3} members  {}",
                    group.id,
                    group.name,
                    group.members.len(),
                    stats
                );
            }
        }
        Command::Users => {
            require_login(&session)?;
            for user in app.api.list_users().await? {
                println!("{:>5}  {:<16} {}", user.id, user.username, user.email);
            }
        }
        Command::Prompt => {
            require_login(&session)?;
            let prompt = app.api.current_prompt().await?;
            println!("{}", prompt.text);
            if let Some(expires_at) = prompt.expires_at {
                println!("  closes {}", expires_at);
            }
        }
        Command::CreateGroup { name, description } => {
            require_login(&session)?;
            let group = app.groups.create(&name, description.as_deref()).await?;
            println!("Created group {} ({})", group.id, group.name);
        }
        Command::Join { group_id, code } => {
            require_login(&session)?;
            match (group_id, code) {
                (_, Some(code)) => {
                    let group = app.groups.join_with_code(&code).await?;
                    println!("Joined {}", group.name);
                }
                (Some(group_id), None) => {
                    app.groups.join(group_id).await?;
                    println!("Joined group {}", group_id);
                }
                (None, None) => {
                    return Err(ClientError::Internal(
                        "pass a group id or --code".to_string(),
                    ))
                }
            }
        }
        Command::Leave { group_id } => {
            require_login(&session)?;
            app.groups.leave(group_id).await?;
            println!("Left group {}", group_id);
        }
        Command::Invite {
            group_id,
            usernames,
        } => {
            require_login(&session)?;
            let response = app.api.invite_users(group_id, &usernames).await?;
            println!("{}", response.message);
            for name in response.failed_invites {
                println!("  failed: {}", name);
            }
        }
        Command::Invites { accept, decline } => {
            require_login(&session)?;
            if let Some(id) = accept {
                println!("{}", app.api.accept_invite(id).await?.message);
            } else if let Some(id) = decline {
                println!("{}", app.api.decline_invite(id).await?.message);
            } else {
                for invite in app.api.pending_invites().await? {
                    println!(
                        "{:>5}  {} invited you to {}",
                        invite.id, invite.invited_by_user.username, invite.group.name
                    );
                }
            }
        }
        Command::Submissions { group_id } => {
            require_login(&session)?;
            for s in app.groups.submissions(group_id).await? {
                let who = s.user.as_ref().map(|u| u.display_name()).unwrap_or("?");
                println!("{:>5}  {:<16} {:>6.1}s  {}", s.id, who, s.duration, s.created_at);
            }
        }
        Command::Download { submission_id } => {
            require_login(&session)?;
            let link = app.api.submission_download_url(submission_id).await?;
            println!("{}", link.download_url);
        }
        Command::Upload {
            group_id,
            file,
            duration,
            prompt,
        } => {
            require_login(&session)?;
            app.videos.add(
                group_id.to_string(),
                LocalVideo::new(file.display().to_string(), duration),
            );
            let mut upload = VideoUpload::from_path(&file, duration).await?;
            if let Some(prompt_id) = prompt {
                upload = upload.with_prompt(prompt_id);
            }
            let submission = app.api.submit_video(group_id, upload).await?;
            app.videos.remove(&group_id.to_string());
            println!("Uploaded submission {}", submission.id);
        }
        Command::Compilations { group_id } => {
            require_login(&session)?;
            for c in app.groups.compilations(group_id).await? {
                println!(
                    "{:>5}  {} .. {}  {}",
                    c.id,
                    c.week_start.date_naive(),
                    c.week_end.date_naive(),
                    c.status
                );
            }
        }
        Command::Generate { group_id } => {
            require_login(&session)?;
            let job = app.groups.generate_compilation(group_id).await?;
            println!("{} (compilation {}, {})", job.message, job.compilation_id, job.status);
        }
        Command::Status {
            compilation_id,
            wait,
            interval_secs,
        } => {
            require_login(&session)?;
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            loop {
                interval.tick().await;
                let report = app.groups.compilation_status(compilation_id).await?;
                if !wait || report.status.is_terminal() {
                    println!("{}", report.status);
                    if let Some(url) = report.download_url {
                        println!("{}", url);
                    }
                    if let Some(error) = report.error {
                        println!("error: {}", error);
                    }
                    break;
                }
                info!("Compilation {} still {}", compilation_id, report.status);
            }
        }
        Command::Music => {
            for track in app.api.music_tracks().await? {
                println!("{:>5}  {}", track.id, track.name);
            }
        }
    }
    Ok(())
}

fn require_login(session: &SessionState) -> ClientResult<()> {
    match session {
        SessionState::Authenticated(_) => Ok(()),
        _ => Err(ClientError::Internal(
            "not logged in; run `weave login` first".to_string(),
        )),
    }
}
