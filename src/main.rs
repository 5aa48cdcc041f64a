//! War room terminal front-end.
//!
//! Usage:
//!   warroom [PAGE]                  render a page once (default: war room)
//!   warroom [PAGE] --watch          keep re-rendering as data arrives
//!   warroom ecosystem --svg FILE    export the partnership graph
//!   warroom dev-login               development sign-in, remembered in config
//!   warroom logout

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;

use warroom_lib::error::ClientError;
use warroom_lib::pages::ecosystem::EcosystemPage;
use warroom_lib::pages::login::LoginPage;
use warroom_lib::pages::{expire_on_unauthenticated, mount, Layout, Page};
use warroom_lib::render::Screen;
use warroom_lib::routes::{guard, Guard, Route};
use warroom_lib::state::{config_path, load_config, save_config_to, AppState};
use warroom_lib::types::{Config, DevLoginConfig, Role};

/// How long the cache must stay quiet before a one-shot render is printed.
const SETTLE: Duration = Duration::from_millis(300);
/// Upper bound on waiting for a page's first data.
const SETTLE_LIMIT: Duration = Duration::from_secs(15);
const WATCH_TICK: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "warroom")]
#[command(about = "Competitive intelligence war room")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// API base URL (overrides config and WARROOM_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    show: ShowArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args)]
struct ShowArgs {
    /// Page path, e.g. "signals" or "dossiers/42"
    #[arg(default_value = "war-room")]
    page: String,

    /// Re-render on every data change until interrupted
    #[arg(short, long)]
    watch: bool,

    /// Write the partnership graph as SVG (ecosystem page only)
    #[arg(long, value_name = "FILE")]
    svg: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in through the development login and remember the identity
    DevLogin {
        #[arg(long, default_value = "dev@distyl.ai")]
        email: String,
        #[arg(long, default_value = "analyst", value_parser = parse_role)]
        role: Role,
    },
    /// Sign out and forget the development identity
    Logout,
}

fn parse_role(value: &str) -> Result<Role, String> {
    match Role::parse(value) {
        Role::Unknown => Err(format!("unknown role '{}'", value)),
        role => Ok(role),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("warroom: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("warroom: {}", e);
            eprintln!("{}", e.recovery_suggestion());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let config = load_config(cli.base_url)?;
    match cli.command {
        Some(Command::DevLogin { email, role }) => dev_login(config, email, role).await,
        Some(Command::Logout) => logout(config).await,
        None => show(config, cli.show).await,
    }
}

async fn dev_login(mut config: Config, email: String, role: Role) -> Result<(), ClientError> {
    let state = AppState::connect(config.clone())?;
    let identity = DevLoginConfig { email, role };
    let user = LoginPage::new(state)
        .dev_login(Some(identity.clone()))
        .await?;
    config.dev_login = Some(identity);
    save_config_to(&config_path()?, &config)?;
    println!("Signed in as {} ({})", user.display_name(), user.role);
    Ok(())
}

async fn logout(mut config: Config) -> Result<(), ClientError> {
    let state = AppState::connect(config.clone())?;
    state.session.logout(&state.cache).await;
    if config.dev_login.take().is_some() {
        save_config_to(&config_path()?, &config)?;
    }
    println!("Signed out");
    Ok(())
}

/// Resolve the session; a remembered development identity signs in again,
/// since cookies do not outlive the process.
async fn sign_in(state: &Arc<AppState>) -> Result<(), ClientError> {
    if state.session.init(&state.cache).await?.is_some() {
        return Ok(());
    }
    if state.config.dev_login.is_some() {
        LoginPage::new(Arc::clone(state)).dev_login(None).await?;
    }
    Ok(())
}

async fn show(config: Config, args: ShowArgs) -> Result<(), ClientError> {
    let requested: Route = args.page.parse()?;
    let state = AppState::connect(config)?;
    sign_in(&state).await?;

    let route = resolve(requested, &state);

    if let Some(path) = args.svg {
        if route != Route::Ecosystem {
            return Err(ClientError::InvalidInput(
                "--svg is only available on the ecosystem page".to_string(),
            ));
        }
        return export_svg(&state, &path).await;
    }

    let (layout, page) = mount_with_layout(route, &state);
    if args.watch {
        watch(&state, layout, page).await;
    } else {
        settle(&state).await;
        print!("{}", frame(&state, layout.as_ref(), page.as_ref()));
    }
    Ok(())
}

/// Where the guard lets the current session go for `requested`.
fn resolve(requested: Route, state: &AppState) -> Route {
    match guard(requested, &state.session.state()) {
        Guard::Allow(route) => route,
        Guard::Redirect(route) => {
            log::info!("WarRoom: {} requires sign-in, showing {}", requested, route);
            route
        }
        Guard::Pending => Route::Login,
    }
}

fn mount_with_layout(route: Route, state: &Arc<AppState>) -> (Option<Layout>, Box<dyn Page>) {
    let page = mount(route, Arc::clone(state));
    // The login screen has no navigation chrome.
    let layout = state
        .session
        .is_authenticated()
        .then(|| Layout::new(Arc::clone(state)));
    (layout, page)
}

fn frame(state: &AppState, layout: Option<&Layout>, page: &dyn Page) -> Screen {
    match layout {
        Some(layout) => layout.frame(page),
        None => {
            let mut screen = Screen::new(state.color());
            page.render(&mut screen);
            screen
        }
    }
}

/// Wait until the cache has been quiet for `SETTLE` with nothing in flight.
async fn settle(state: &AppState) {
    let mut events = state.cache.subscribe();
    let deadline = tokio::time::Instant::now() + SETTLE_LIMIT;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return,
            },
            _ = tokio::time::sleep(SETTLE) => {
                if state.cache.pending_fetches() == 0 {
                    return;
                }
            }
            _ = tokio::time::sleep_until(deadline) => {
                log::warn!("WarRoom: data still loading after {:?}", SETTLE_LIMIT);
                return;
            }
        }
    }
}

/// Redraw until interrupted. A session the server stops accepting sends the
/// view back through the guard to the login page.
async fn watch(state: &Arc<AppState>, mut layout: Option<Layout>, mut page: Box<dyn Page>) {
    let mut events = state.cache.subscribe();
    let mut tick = tokio::time::interval(WATCH_TICK);
    loop {
        print!("\x1b[2J\x1b[H{}", frame(state, layout.as_ref(), page.as_ref()));
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) if expire_on_unauthenticated(state, &event) => {
                    let route = resolve(page.route(), state);
                    // Drop the old page first so its queries stop.
                    drop(page);
                    drop(layout);
                    (layout, page) = mount_with_layout(route, state);
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return,
            },
            _ = tick.tick() => {}
            _ = tokio::signal::ctrl_c() => return,
        }
    }
}

async fn export_svg(state: &Arc<AppState>, path: &std::path::Path) -> Result<(), ClientError> {
    let page = EcosystemPage::new(Arc::clone(state));
    settle(state).await;
    let svg = page
        .svg()
        .ok_or_else(|| ClientError::NotFound("partnership graph did not load".to_string()))?;
    std::fs::write(path, svg)
        .map_err(|e| ClientError::Config(format!("Failed to write {}: {}", path.display(), e)))?;
    println!("Wrote {}", path.display());
    Ok(())
}
