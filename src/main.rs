use std::io::{self, Write};
use std::sync::Arc;

use video_shorts::api_client::{VideoService, VideoServiceClient};
use video_shorts::auth;
use video_shorts::config::ClientConfig;
use video_shorts::error::ClientError;
use video_shorts::guard::{AccessGuard, Navigation, Route};
use video_shorts::library::{LibraryState, VideoLibrary};
use video_shorts::models::subtitle::{weight_label, SubtitleStyleEditor};
use video_shorts::models::video::{FilterName, VideoJob};
use video_shorts::models::FontFamily;
use video_shorts::session::{FileKeyValueStore, SessionStore};
use video_shorts::workflow::VideoWorkflowController;

const USAGE: &str = "\
Usage: shorts <command> [args]

Commands:
  register <username>                 Create an account
  login <username>                    Log in and remember the session
  logout                              Forget the session
  whoami                              Show the logged-in user
  list                                List your shorts, newest first
  create <url>                        Convert a video into a short
  filter <job-id> <filter>            Apply a filter to one of your shorts
  subtitles <job-id> [--font F] [--size N] [--weight N] [--color #RRGGBB]
                                      Burn styled subtitles into a short
  filters                             Show available filters
  fonts                               Show available subtitle fonts";

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || matches!(args[0].as_str(), "-h" | "--help" | "help") {
        println!("{}", USAGE);
        return;
    }

    if let Err(e) = run(&args).await {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

struct App {
    session: Arc<SessionStore>,
    service: Arc<VideoServiceClient>,
    guard: AccessGuard,
}

impl App {
    fn from_env() -> Result<Self, ClientError> {
        let config = ClientConfig::from_env()?;
        tracing::debug!(
            "Using {} (timeout {:?}, session file {})",
            config.base_url,
            config.request_timeout,
            config.session_file.display()
        );

        let session = Arc::new(SessionStore::new(FileKeyValueStore::open(&config.session_file)));
        let service = Arc::new(VideoServiceClient::new(&config, session.clone())?);
        let guard = AccessGuard::new(session.clone());
        Ok(Self {
            session,
            service,
            guard,
        })
    }

    /// Protected commands need a session; otherwise point at `login`.
    fn enter(&self, route: Route) -> bool {
        match self.guard.navigate(route) {
            Navigation::Render(_) => true,
            Navigation::Redirect(target) => {
                eprintln!(
                    "🔐 You are not logged in. Run `shorts login <username>` first ({}).",
                    target.path()
                );
                false
            }
        }
    }

    fn controller(&self) -> VideoWorkflowController {
        let service: Arc<dyn VideoService> = self.service.clone();
        VideoWorkflowController::new(service, self.session.clone())
    }
}

async fn run(args: &[String]) -> Result<(), ClientError> {
    match args[0].as_str() {
        "filters" => {
            for filter in FilterName::ALL {
                println!("{:<12} {}", filter.as_str(), filter.label());
            }
            return Ok(());
        }
        "fonts" => {
            for font in FontFamily::ALL {
                println!("{:<10} {}", font.as_str(), font.stylesheet_url());
            }
            return Ok(());
        }
        _ => {}
    }

    let app = App::from_env()?;

    match (args[0].as_str(), &args[1..]) {
        ("register", [username]) => {
            let password = prompt_new_password()?;
            let registration = auth::sign_up(app.service.as_ref(), username, &password).await?;
            println!("✅ Account '{}' created. You can now log in.", registration.username);
        }
        ("login", [username]) => {
            print!("Password: ");
            io::stdout().flush().map_err(io_error)?;
            let password = rpassword::read_password().map_err(io_error)?;
            let session = auth::sign_in(app.service.as_ref(), &app.session, username, &password).await?;
            println!("✅ Logged in as {}", session.user.username);
        }
        ("logout", []) => {
            auth::sign_out(&app.session);
            println!("👋 Logged out");
        }
        ("whoami", []) => match app.session.get_session() {
            Some(session) => println!("{}", session.user.username),
            None => println!("Not logged in"),
        },
        ("list", []) => {
            if !app.enter(Route::MyVideos) {
                return Ok(());
            }
            let library = VideoLibrary::new(app.service.clone(), app.session.clone());
            match library.load().await {
                LibraryState::Loaded(jobs) => {
                    for job in &jobs {
                        print_job(job);
                    }
                }
                LibraryState::Empty => println!("You have not created any shorts yet."),
                LibraryState::Unavailable(message) => eprintln!("⚠️  {}", message),
            }
        }
        ("create", [url]) => {
            if !app.enter(Route::CreateShort) {
                return Ok(());
            }
            println!("⏳ Generating short, this can take a few minutes...");
            let job = app.controller().submit(url).await?;
            println!("✅ Short video created successfully!");
            print_job(&job);
        }
        ("filter", [job_id, filter]) => {
            if !app.enter(Route::CreateShort) {
                return Ok(());
            }
            let controller = app.controller();
            controller.resume(find_job(&app, job_id).await?);
            println!("⏳ Applying filter...");
            let job = controller.apply_filter(filter).await?;
            print_job(&job);
        }
        ("subtitles", [job_id, options @ ..]) => {
            if !app.enter(Route::CreateShort) {
                return Ok(());
            }
            let mut editor = SubtitleStyleEditor::new();
            apply_style_options(&mut editor, options)?;
            let style = editor.submit();
            println!(
                "💬 {} {}px, weight {} ({}), {}",
                style.font_family,
                style.font_size_px,
                style.font_weight,
                weight_label(style.font_weight),
                style.color_hex
            );

            let controller = app.controller();
            controller.resume(find_job(&app, job_id).await?);
            let job = controller.apply_subtitles(style).await?;
            print_job(&job);
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}

async fn find_job(app: &App, job_id: &str) -> Result<VideoJob, ClientError> {
    let jobs = app.service.list_jobs().await.map_err(|e| {
        if e.is_auth() {
            app.session.clear();
        }
        e
    })?;
    jobs.into_iter()
        .find(|job| job.id == job_id)
        .ok_or_else(|| video_shorts::ApiError::validation(format!("No video with id {}", job_id)).into())
}

fn apply_style_options(editor: &mut SubtitleStyleEditor, options: &[String]) -> Result<(), ClientError> {
    let mut iter = options.iter();
    while let Some(flag) = iter.next() {
        let value = iter.next().ok_or_else(|| {
            video_shorts::ApiError::validation(format!("Missing value for {}", flag))
        })?;
        match flag.as_str() {
            "--font" => {
                editor.select_font_family(value)?;
            }
            "--size" => {
                editor.set_font_size(parse_number(flag, value)?);
            }
            "--weight" => {
                editor.set_font_weight(parse_number(flag, value)?);
            }
            "--color" => editor.set_color(value)?,
            other => {
                return Err(video_shorts::ApiError::validation(format!("Unknown option {}", other)).into())
            }
        }
    }
    Ok(())
}

fn parse_number(flag: &str, value: &str) -> Result<i64, ClientError> {
    value.trim().parse().map_err(|_| {
        video_shorts::ApiError::validation(format!("{} expects a number, got '{}'", flag, value)).into()
    })
}

fn prompt_new_password() -> Result<String, ClientError> {
    print!("Password: ");
    io::stdout().flush().map_err(io_error)?;
    let password = rpassword::read_password().map_err(io_error)?;

    print!("Password (again): ");
    io::stdout().flush().map_err(io_error)?;
    let confirm = rpassword::read_password().map_err(io_error)?;

    if password != confirm {
        return Err(video_shorts::ApiError::validation("Passwords don't match").into());
    }
    Ok(password)
}

fn io_error(e: io::Error) -> ClientError {
    ClientError::Session(e.into())
}

fn print_job(job: &VideoJob) {
    println!(
        "#{:<6} {:<40} {}",
        job.id,
        job.title.as_deref().unwrap_or("Untitled"),
        job.created_at.format("%Y-%m-%d %H:%M")
    );
    println!("        source:   {}", job.source_url);
    if let Some(uri) = &job.rendered_asset_uri {
        println!("        download: {}", uri);
    }
    if let Some(filter) = &job.applied_filter {
        println!("        filter:   {}", filter);
    }
    if let Some(style) = &job.subtitle_style {
        println!(
            "        subtitles: {} {}px/{} {}",
            style.font_family, style.font_size_px, style.font_weight, style.color_hex
        );
    }
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Get log level from environment or default to quiet output for the CLI
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "info,video_shorts=debug,reqwest=info,hyper=info".to_string()
        } else {
            "warn,video_shorts=info,reqwest=warn,hyper=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    // Logs go to stderr so command output stays pipeable
    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_writer(io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_writer(io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::debug!("shorts {} ({})", env!("CARGO_PKG_VERSION"), log_level);
    Ok(())
}
