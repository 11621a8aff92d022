use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use dreamyfocus_client::auth::guard::{self, Decision};
use dreamyfocus_client::avatar::AvatarFile;
use dreamyfocus_client::config::Config;
use dreamyfocus_client::dto::RegisterRequest;
use dreamyfocus_client::models::diary::DiaryPatch;
use dreamyfocus_client::models::habit::Frequency;
use dreamyfocus_client::models::EntityId;
use dreamyfocus_client::routes::{NavigationLog, Route};
use dreamyfocus_client::storage::FileStorage;
use dreamyfocus_client::views::admin::AdminView;
use dreamyfocus_client::views::auth::AuthView;
use dreamyfocus_client::views::diary::DiaryView;
use dreamyfocus_client::views::focus::FocusTimer;
use dreamyfocus_client::views::habits::HabitsView;
use dreamyfocus_client::views::profile::ProfileView;
use dreamyfocus_client::views::{AutoConfirm, Confirm, Outcome, ViewState};
use dreamyfocus_client::AppState;

#[derive(Parser)]
#[command(name = "dreamyfocus", version, about = "Habit tracker and diary client")]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "API_BASE")]
    api_base: Option<String>,

    /// Where the session and local diary are kept
    #[arg(long, env = "STORAGE_PATH")]
    storage: Option<PathBuf>,

    /// Answer yes to every confirmation prompt
    #[arg(short, long)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
        #[arg(long)]
        city_id: Option<i64>,
        #[arg(long)]
        avatar: Option<PathBuf>,
    },
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List the cities accepted by register and profile
    Cities,
    Habits {
        #[command(subcommand)]
        action: Option<HabitCommand>,
    },
    Diary {
        /// Day to work on (YYYY-MM-DD), today by default
        #[arg(long)]
        date: Option<NaiveDate>,
        #[command(subcommand)]
        action: Option<DiaryCommand>,
    },
    Profile {
        #[command(subcommand)]
        action: Option<ProfileCommand>,
    },
    Admin {
        #[command(subcommand)]
        action: Option<AdminCommand>,
    },
    /// Run a focus countdown
    Focus {
        #[arg(long, default_value_t = 25)]
        minutes: u32,
    },
}

#[derive(Subcommand)]
enum HabitCommand {
    List,
    Add {
        #[arg(short, long)]
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, default_value = "daily")]
        frequency: String,
    },
    Toggle {
        id: String,
    },
    Log {
        id: String,
        /// Record the day as missed instead of completed
        #[arg(long)]
        missed: bool,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
enum DiaryCommand {
    List,
    Add {
        #[arg(short, long, default_value = "")]
        title: String,
        #[arg(short, long, default_value = "")]
        body: String,
    },
    Show {
        id: String,
    },
    Edit {
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        body: Option<String>,
    },
    Delete {
        id: String,
    },
    Calendar,
}

#[derive(Subcommand)]
enum ProfileCommand {
    Show,
    Update {
        #[arg(short, long)]
        username: Option<String>,
        #[arg(long)]
        city_id: Option<i64>,
        #[arg(long)]
        avatar: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum AdminCommand {
    Overview,
    DeleteHabit { id: String },
    DeleteDiary { id: String },
}

impl Command {
    /// The screen a command belongs to, if it is gated.
    fn route(&self) -> Option<Route> {
        match self {
            Command::Login { .. } => Some(Route::Login),
            Command::Register { .. } => Some(Route::Register),
            Command::Logout | Command::Whoami | Command::Cities => None,
            Command::Habits { .. } => Some(Route::Habits),
            Command::Diary { .. } => Some(Route::Diary),
            Command::Profile { .. } => Some(Route::Profile),
            Command::Admin { .. } => Some(Route::Admin),
            Command::Focus { .. } => Some(Route::Home),
        }
    }
}

struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(base) = cli.api_base.clone() {
        config.api_base = base;
    }
    if let Some(path) = cli.storage.clone() {
        config.storage_path = path;
    }

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dreamyfocus_client=info,dreamyfocus=info".into());
    if config.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }

    let storage = Arc::new(FileStorage::new(config.storage_path.clone()));
    let navigation = Arc::new(NavigationLog::new());
    let state = AppState::new(config, storage, navigation.clone()).context("failed to start client")?;
    let confirm: Arc<dyn Confirm> = if cli.yes {
        Arc::new(AutoConfirm(true))
    } else {
        Arc::new(StdinConfirm)
    };

    if let Some(route) = cli.command.route() {
        if let Decision::Redirect(target) = guard::authorize_session(&state.session.snapshot(), &route) {
            bail!("{} is not available right now, go to {} instead", route, target);
        }
    }

    let result = run(cli.command, &state, confirm).await;

    for route in navigation.drain() {
        if route == Route::Login {
            eprintln!("Your session has ended. Log in again to continue.");
        } else {
            eprintln!("Redirected to {}", route);
        }
    }

    result
}

async fn run(command: Command, state: &AppState, confirm: Arc<dyn Confirm>) -> anyhow::Result<()> {
    let today = Local::now().date_naive();

    match command {
        Command::Login { username, password } => {
            let mut view = AuthView::new(state.api.clone());
            report(view.login(&username, &password).await)?;
            println!("Welcome back, {}. Continue at {}", username.trim(), Route::Home);
        }
        Command::Register {
            username,
            password,
            city_id,
            avatar,
        } => {
            let avatar = match avatar {
                Some(path) => Some(
                    AvatarFile::from_path(&path)
                        .await
                        .map_err(|e| anyhow::anyhow!(e.user_message()))?,
                ),
                None => None,
            };
            let mut view = AuthView::new(state.api.clone());
            report(view.register(RegisterRequest::new(&username, &password, city_id, avatar)).await)?;
            println!("Account created. Continue at {}", Route::Profile);
        }
        Command::Logout => {
            let route = AuthView::new(state.api.clone()).logout();
            println!("Logged out. Continue at {}", route);
        }
        Command::Whoami => match state.session.user() {
            Some(user) => {
                println!("{} (id {}, {:?})", user.username, user.id, user.role);
                if let Some(city) = user.city_name() {
                    println!("City: {}", city);
                }
            }
            None => println!("Not logged in"),
        },
        Command::Cities => {
            let view = AuthView::new(state.api.clone());
            view.load_cities().await;
            match view.cities() {
                ViewState::Success(cities) if cities.is_empty() => println!("No cities available"),
                ViewState::Success(cities) => {
                    for city in cities {
                        println!("{:>4}  {}", city.id, city.name);
                    }
                }
                ViewState::Error(message) => bail!(message),
                _ => {}
            }
        }
        Command::Habits { action } => {
            let mut view = HabitsView::new(state.habits(), state.session.clone(), confirm);
            view.load().await;
            match action.unwrap_or(HabitCommand::List) {
                HabitCommand::List => {}
                HabitCommand::Add {
                    title,
                    description,
                    frequency,
                } => report(view.create(&title, &description, Frequency::from(frequency.as_str())).await)?,
                HabitCommand::Toggle { id } => report(view.toggle_active(&EntityId::parse(&id)).await)?,
                HabitCommand::Log { id, missed } => report(view.log(&EntityId::parse(&id), !missed).await)?,
                HabitCommand::Delete { id } => report(view.delete(&EntityId::parse(&id)).await)?,
            }
            print_habits(&view, today)?;
        }
        Command::Diary { date, action } => {
            let mut view = DiaryView::new(state.diary(), state.session.clone(), confirm, today);
            view.select_date(date.unwrap_or(today)).await;
            match action.unwrap_or(DiaryCommand::List) {
                DiaryCommand::List => {}
                DiaryCommand::Add { title, body } => report(view.create(&title, &body).await)?,
                DiaryCommand::Show { id } => {
                    let day = view.date();
                    let entry = view
                        .open(&EntityId::parse(&id))
                        .with_context(|| format!("no entry {} on {}", id, day))?;
                    println!("{}\n{}\n\n{}", entry.display_title(), entry.author_label(), entry.body);
                    return Ok(());
                }
                DiaryCommand::Edit { id, title, body } => {
                    report(view.update(&EntityId::parse(&id), DiaryPatch { title, body }).await)?
                }
                DiaryCommand::Delete { id } => report(view.delete(&EntityId::parse(&id)).await)?,
                DiaryCommand::Calendar => {
                    print_calendar(&view);
                    return Ok(());
                }
            }
            print_diary(&view)?;
        }
        Command::Profile { action } => {
            let mut view = ProfileView::new(state.api.clone(), state.object_urls.clone());
            match action.unwrap_or(ProfileCommand::Show) {
                ProfileCommand::Show => {}
                ProfileCommand::Update {
                    username,
                    city_id,
                    avatar,
                } => {
                    if let Some(username) = username {
                        view.set_username(&username);
                    }
                    if city_id.is_some() {
                        view.set_city(city_id);
                    }
                    if let Some(path) = avatar {
                        report(view.select_avatar(&path).await)?;
                    }
                    report(view.submit().await)?;
                    println!("Profile saved");
                }
            }
            println!("Username: {}", view.username());
            match view.city_id() {
                Some(id) => println!("City:     #{}", id),
                None => println!("City:     —"),
            }
            println!("Avatar:   {}", view.preview_url().unwrap_or_else(|| "(placeholder)".into()));
        }
        Command::Admin { action } => {
            let mut view = AdminView::new(state.admin(), confirm);
            view.load_all().await;
            match action.unwrap_or(AdminCommand::Overview) {
                AdminCommand::Overview => {}
                AdminCommand::DeleteHabit { id } => report(view.delete_habit(&EntityId::parse(&id)).await)?,
                AdminCommand::DeleteDiary { id } => report(view.delete_diary(&EntityId::parse(&id)).await)?,
            }
            print_admin(&view);
        }
        Command::Focus { minutes } => run_focus(minutes).await,
    }

    Ok(())
}

fn report(outcome: Outcome) -> anyhow::Result<()> {
    match outcome {
        Outcome::Completed => Ok(()),
        Outcome::Declined => {
            println!("Cancelled");
            Ok(())
        }
        Outcome::Failed(message) => bail!(message),
    }
}

fn print_habits(view: &HabitsView, today: NaiveDate) -> anyhow::Result<()> {
    if let Some(message) = view.state().error() {
        bail!(message.to_string());
    }
    if view.habits().is_empty() {
        println!("No habits yet");
        return Ok(());
    }

    for habit in view.habits() {
        let marker = if view.selected().map(|h| &h.id) == Some(&habit.id) { '>' } else { ' ' };
        let status = if habit.is_active { "active" } else { "paused" };
        print!("{} [{}] {} ({}, {})", marker, habit.id, habit.title, habit.frequency.label(), status);
        if let Some(progress) = view.progress(&habit.id, today) {
            print!(
                "  7d {}%  streak {}  best {}",
                progress.weekly_percent, progress.current_streak, progress.longest_streak
            );
        }
        println!();
    }
    Ok(())
}

fn print_diary(view: &DiaryView) -> anyhow::Result<()> {
    if let Some(message) = view.state().error() {
        bail!(message.to_string());
    }
    println!("{}", view.date().format("%A, %d %B %Y"));
    if view.entries().is_empty() {
        println!("  No entries for this day");
    }
    for entry in view.entries() {
        println!("  [{}] {}  {}", entry.id, entry.display_title(), entry.excerpt(60));
    }
    Ok(())
}

fn print_calendar(view: &DiaryView) {
    println!("{}", view.date().format("%B %Y"));
    println!(" Mo  Tu  We  Th  Fr  Sa  Su");
    for week in view.calendar().chunks(7) {
        let line: Vec<String> = week
            .iter()
            .map(|day| {
                let n = day.date.format("%e").to_string();
                match (day.selected, day.in_month) {
                    (true, _) => format!("[{}]", n.trim()),
                    (false, true) => format!(" {} ", n),
                    (false, false) => "    ".to_string(),
                }
            })
            .collect();
        println!("{}", line.join(""));
    }
}

fn print_admin(view: &AdminView) {
    if let Some(message) = view.first_error() {
        eprintln!("Some data could not be loaded: {}", message);
    }

    if let Some(users) = view.users.data() {
        println!("Users ({})", users.len());
        for user in users {
            println!("  [{}] {:<16} {:<6?} {}", user.id, user.username, user.role, user.city_label());
        }
    }
    if let Some(habits) = view.habits.data() {
        println!("Habits ({})", habits.len());
        for habit in habits {
            println!("  [{}] {} by {}", habit.id, habit.title, habit.author().unwrap_or("—"));
        }
    }
    if let Some(entries) = view.diaries.data() {
        println!("Diary entries ({})", entries.len());
        for entry in entries {
            println!("  [{}] {} by {}", entry.id, entry.display_title(), entry.author_label());
        }
    }
    if let Some(logs) = view.logs.data() {
        println!("Audit log ({})", logs.len());
        for log in logs {
            println!("  {}  {:<8} {}", log.timestamp, log.action, log.actor);
        }
    }
}

async fn run_focus(minutes: u32) {
    let mut timer = FocusTimer::new(minutes.saturating_mul(60));
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    timer.toggle();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                print!("\r{} ", timer.label());
                let _ = io::stdout().flush();
                if timer.is_finished() {
                    println!("\nFocus session complete");
                    return;
                }
                timer.tick();
            }
            _ = tokio::signal::ctrl_c() => {
                timer.reset();
                println!("\nFocus session stopped");
                return;
            }
        }
    }
}
