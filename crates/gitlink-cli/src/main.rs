mod app;
mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gitlink_api::RetryConfig;
use gitlink_core::{
    auth::{self, SignUp},
    ideas::ideas_for,
    popular_languages,
    providers::github::github_to_listing,
    submissions::SubmissionDraft,
    user_repos::Source,
    BookmarkService, Config, ControllerSettings, Difficulty, HomeController, Language,
    ReviewStatus, SearchFilters, SortKey, SortOrder, SubmissionService, ToggleStatus, TokenStore,
    UserRepositories, View,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::App;
use output::Printer;

#[derive(Parser)]
#[command(name = "gitlink")]
#[command(version, about = "Discover beginner-friendly and trending GitHub repositories", long_about = None)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Config file (defaults to the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// GitHub token; overrides config and environment
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search repositories
    Search {
        /// Free-text query; empty means "anything with a star"
        query: Vec<String>,
        #[arg(short, long, default_value = "all")]
        language: Language,
        #[arg(short, long, default_value = "stars")]
        sort: SortKey,
        #[arg(short, long, default_value = "desc")]
        order: SortOrder,
        /// Bias toward approachable projects
        #[arg(short, long)]
        beginner: bool,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 30)]
        per_page: u32,
        /// Retry transient failures this many times
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
    /// Recently active repositories
    Trending {
        #[arg(short, long, default_value = "all")]
        language: Language,
    },
    /// Recently active educational repositories
    Educational,
    /// Trending and educational listings together
    Home,
    /// Keep the home listings fresh until Ctrl-C
    Watch {
        /// Minutes between refreshes (config default: 30)
        #[arg(long)]
        interval_minutes: Option<u64>,
    },
    /// Language tags accepted by --language
    Languages,
    /// Starter project ideas
    Ideas {
        #[arg(short, long)]
        difficulty: Option<Difficulty>,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long, env = "GITLINK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in with e-mail and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "GITLINK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Manage bookmarks
    Bookmarks {
        #[command(subcommand)]
        action: BookmarkAction,
    },
    /// Submit a repository for review
    Submit {
        /// https://github.com/<owner>/<repo>
        url: String,
        #[arg(short, long)]
        description: String,
        /// Technology tag, repeatable
        #[arg(short, long = "tech")]
        tech: Vec<String>,
        #[arg(long, default_value = "beginner")]
        difficulty: Difficulty,
    },
    /// Browse or remove submissions
    Submissions {
        #[command(subcommand)]
        action: SubmissionAction,
    },
    /// Your own public repositories (cached for a few minutes)
    MyRepos {
        /// Ignore the cached copy
        #[arg(long)]
        refresh: bool,
    },
    /// Submit one of your own repositories
    Upload {
        /// Repository name or owner/name
        name: String,
    },
}

#[derive(Subcommand)]
enum BookmarkAction {
    List,
    /// Bookmark owner/repo
    Add { repo: String },
    /// Remove by owner/repo or numeric id
    Remove { repo: String },
}

#[derive(Subcommand)]
enum SubmissionAction {
    List {
        #[arg(short, long)]
        status: Option<ReviewStatus>,
    },
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so --json output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gitlink=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if cli.config.is_some() {
        config.apply_env(|name| std::env::var(name).ok());
    }
    if let Some(token) = cli.token.clone() {
        config.github.token = Some(token);
    }

    let app = App::new(config)?;
    let out = Printer { json: cli.json };

    let Some(command) = cli.command else {
        println!("No command specified. Try --help");
        return Ok(());
    };

    match command {
        Commands::Search {
            query,
            language,
            sort,
            order,
            beginner,
            page,
            per_page,
            retries,
        } => {
            let filters = SearchFilters {
                query: query.join(" "),
                language,
                sort,
                order,
                beginner_mode: beginner,
            };
            tracing::info!("Searching for: {:?}", filters.query);

            let settings = ControllerSettings {
                search_retry: RetryConfig::with_max_retries(retries),
                ..ControllerSettings::from_config(&app.config)
            };
            let controller = HomeController::new(app.provider(), app.store()?, settings);
            controller.search_page(filters, page, per_page).await;

            let state = controller.snapshot().await;
            out.banner(state.api_error.as_deref());
            if out.json {
                out.emit_json(&serde_json::json!({
                    "total_count": state.total_count,
                    "items": state.search_results,
                }))?;
            } else {
                out.listings(
                    &format!("Search results, {} total", state.total_count),
                    &state.search_results,
                )?;
            }
        }
        Commands::Trending { language } => {
            let controller = app.controller()?;
            controller.load_trending_with(&language).await;
            let state = controller.snapshot().await;
            out.banner(state.api_error.as_deref());
            out.listings("Trending today", &state.trending)?;
        }
        Commands::Educational => {
            let controller = app.controller()?;
            controller.load_educational().await;
            let state = controller.snapshot().await;
            out.banner(state.api_error.as_deref());
            out.listings("Educational resources", &state.educational)?;
        }
        Commands::Home => {
            let controller = app.controller()?;
            controller.refresh_home().await;
            print_home(&controller, &out).await?;
        }
        Commands::Watch { interval_minutes } => {
            let period = interval_minutes
                .map(|m| Duration::from_secs(m.max(1) * 60))
                .unwrap_or_else(|| app.config.refresh_interval());
            watch(&app, &out, period).await?;
        }
        Commands::Languages => {
            if out.json {
                out.emit_json(popular_languages())?;
            } else {
                println!("{}", popular_languages().join(" "));
            }
        }
        Commands::Ideas { difficulty } => {
            out.ideas(&ideas_for(difficulty))?;
        }
        Commands::Signup { email, password } => {
            let backend = app.backend(None)?;
            match auth::sign_up(&backend, &email, &password).await? {
                SignUp::SignedIn(session, profile) => {
                    remember(&session)?;
                    out.profile(&profile)?;
                }
                SignUp::AwaitingConfirmation(_) => {
                    out.message("Check your inbox to confirm the account, then run `gitlink login`.");
                }
            }
        }
        Commands::Login { email, password } => {
            let backend = app.backend(None)?;
            let (session, profile) = auth::sign_in(&backend, &email, &password).await?;
            remember(&session)?;
            out.profile(&profile)?;
        }
        Commands::Logout => {
            if let Some(token) = app.stored_token() {
                if let Err(e) = app.backend(Some(token))?.sign_out().await {
                    tracing::warn!("Remote sign-out failed: {}", e);
                }
            }
            let mut store = TokenStore::load()?;
            store.clear();
            store.save()?;
            out.message("Signed out.");
        }
        Commands::Whoami => match app.current_user().await? {
            Some(profile) => out.profile(&profile)?,
            None => out.message("Not signed in."),
        },
        Commands::Bookmarks { action } => bookmarks(&app, &out, action).await?,
        Commands::Submit {
            url,
            description,
            tech,
            difficulty,
        } => {
            let user = app.current_user().await?;
            let service = SubmissionService::new(app.store()?, app.provider());
            let draft = SubmissionDraft {
                github_url: url,
                description,
                tech_stack: tech,
                difficulty,
            };
            let submitted = service.submit(draft, user.as_ref()).await?;
            if out.json {
                out.emit_json(&submitted)?;
            } else {
                println!("Submitted {} for review.", submitted.github_url);
            }
        }
        Commands::Submissions { action } => {
            let service = SubmissionService::new(app.store()?, app.provider());
            match action {
                SubmissionAction::List { status } => {
                    out.submissions(&service.list(status).await?)?;
                }
                SubmissionAction::Delete { id } => {
                    let user = app.require_user().await?;
                    let all = service.list(None).await?;
                    let submission = all
                        .iter()
                        .find(|s| s.id.as_deref() == Some(id.as_str()))
                        .with_context(|| format!("No submission with id {}", id))?;
                    service.delete(submission, &user).await?;
                    out.message("Submission deleted.");
                }
            }
        }
        Commands::MyRepos { refresh } => {
            let user = app.require_user().await?;
            let login = require_login(&user)?;
            let loader = UserRepositories::new(app.provider(), app.cache()?);
            if refresh {
                loader.invalidate(login)?;
            }
            let (repos, source) = loader.load(login).await?;
            if source == Source::Cache {
                tracing::debug!("Served {} repositories from cache", repos.len());
            }
            out.listings(&format!("Repositories of {}", login), &repos)?;
        }
        Commands::Upload { name } => {
            let user = app.require_user().await?;
            let login = require_login(&user)?;
            let loader = UserRepositories::new(app.provider(), app.cache()?);
            let (repos, _) = loader.load(login).await?;
            let listing = repos
                .iter()
                .find(|r| r.name.eq_ignore_ascii_case(&name) || r.full_name.eq_ignore_ascii_case(&name))
                .with_context(|| format!("{} is not one of your public repositories", name))?;

            let service = SubmissionService::new(app.store()?, app.provider());
            let submitted = service.upload_own(listing, &user).await?;
            if out.json {
                out.emit_json(&submitted)?;
            } else {
                println!("Uploaded {} for review.", submitted.github_url);
            }
        }
    }

    Ok(())
}

async fn print_home(controller: &HomeController, out: &Printer) -> anyhow::Result<()> {
    let state = controller.snapshot().await;
    out.banner(state.api_error.as_deref());
    if out.json {
        return out.emit_json(&serde_json::json!({
            "trending": state.trending,
            "educational": state.educational,
            "last_updated": state.last_updated,
        }));
    }
    out.listings("Trending today", &state.trending)?;
    println!();
    out.listings("Educational resources", &state.educational)?;
    out.updated(state.last_updated);
    Ok(())
}

/// Refresh once, then let the auto-refresh task run and reprint on every update
async fn watch(app: &App, out: &Printer, period: Duration) -> anyhow::Result<()> {
    let controller = app.controller()?;
    controller.set_view(View::Home).await;
    controller.refresh_home().await;
    print_home(&controller, out).await?;

    let refresher = controller.start_auto_refresh(period);
    let mut seen = controller.snapshot().await.last_updated;
    let mut poll = tokio::time::interval(Duration::from_secs(5));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = poll.tick() => {
                let current = controller.snapshot().await.last_updated;
                if current != seen {
                    seen = current;
                    print_home(&controller, out).await?;
                }
            }
        }
    }

    refresher.cancel();
    out.message("Stopped.");
    Ok(())
}

async fn bookmarks(app: &App, out: &Printer, action: BookmarkAction) -> anyhow::Result<()> {
    let user = app.require_user().await?;
    let controller = app.controller()?;
    controller.set_view(View::Bookmarks).await;
    controller.set_user(Some(user.clone())).await;
    let current = controller.snapshot().await.bookmarks;

    match action {
        BookmarkAction::List => {
            // read straight from the backend so failures surface here
            let listed = BookmarkService::new(app.store()?).list(&user.id).await?;
            out.listings("Bookmarks", &listed)?;
        }
        BookmarkAction::Add { repo } => {
            let (owner, name) = repo
                .split_once('/')
                .with_context(|| format!("Expected owner/repo, got {}", repo))?;
            let listing = github_to_listing(app.github.client().get_repository(owner, name).await?);
            if current.iter().any(|b| b.id == listing.id) {
                out.message("Already bookmarked.");
                return Ok(());
            }
            report_toggle(out, controller.toggle_bookmark(&listing).await)?;
        }
        BookmarkAction::Remove { repo } => {
            let listing = current
                .iter()
                .find(|b| b.full_name.eq_ignore_ascii_case(&repo) || b.id.to_string() == repo)
                .with_context(|| format!("{} is not bookmarked", repo))?;
            report_toggle(out, controller.toggle_bookmark(listing).await)?;
        }
    }
    Ok(())
}

fn report_toggle(out: &Printer, status: ToggleStatus) -> anyhow::Result<()> {
    match status {
        ToggleStatus::Added => out.message("Bookmarked."),
        ToggleStatus::Removed => out.message("Bookmark removed."),
        ToggleStatus::RolledBack => anyhow::bail!("Bookmark change failed and was rolled back"),
        ToggleStatus::Unavailable => anyhow::bail!("Bookmarks need a signed-in user and a configured backend"),
        ToggleStatus::Idle | ToggleStatus::Pending => {}
    }
    if out.json {
        out.emit_json(&status)?;
    }
    Ok(())
}

fn remember(session: &gitlink_api::AuthSession) -> anyhow::Result<()> {
    let mut store = TokenStore::load()?;
    store.set_session(session, chrono::Utc::now());
    store.save()?;
    Ok(())
}

fn require_login(user: &gitlink_core::UserProfile) -> anyhow::Result<&str> {
    if user.has_login() {
        Ok(user.login.as_str())
    } else {
        anyhow::bail!("Your account has no GitHub login attached")
    }
}
