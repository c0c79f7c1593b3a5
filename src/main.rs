use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use veritas_client::{
    audio::{self, AudioSource, Recorder, WavFileSource},
    booking::{self, BookingPage, BookingView},
    config::Config,
    controllers::checkout::BrowserPaymentWidget,
    controllers::oauth::sign_in_with_browser,
    error::AppError,
    middleware::redirect_for,
    models::{
        concert::ConcertForm,
        ticket::TicketTypeDraft,
        user::{ForgotPasswordForm, ResetPasswordForm, SignInForm, SignUpForm},
        ChartType, Concert, MatchOutcome, TicketPageType, TicketVerification,
    },
    server::CallbackServer,
    session::SignUpOutcome,
    staff,
    AppState,
};

#[derive(Parser)]
#[command(name = "veritas", version, about = "Concerts, tickets and song matching from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account and sign in
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "VERITAS_PASSWORD")]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    Signin {
        #[arg(long)]
        email: String,
        #[arg(long, env = "VERITAS_PASSWORD")]
        password: String,
    },
    /// Sign in through an OAuth provider in the browser
    Oauth {
        #[arg(default_value = "google")]
        provider: String,
    },
    Logout,
    Whoami,
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    ResetPassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        otp: String,
        #[arg(long, env = "VERITAS_NEW_PASSWORD")]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// Send a reset code to the signed-in user's email
    ChangePassword,
    #[command(subcommand)]
    Concerts(ConcertsCommand),
    #[command(subcommand)]
    Admin(AdminCommand),
    /// Open a booking page and optionally pay for the selection
    Book {
        ticket_page_id: String,
        /// TYPE=QUANTITY, repeatable
        #[arg(long = "select", value_parser = parse_selection)]
        selections: Vec<(String, u32)>,
        #[arg(long)]
        checkout: bool,
    },
    /// Show a booking confirmation and optionally save the tickets PDF
    Confirmation {
        #[arg(long)]
        order_id: Option<String>,
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    Charts {
        #[arg(default_value = "global")]
        chart: ChartType,
    },
    /// Record audio and identify the song
    Record {
        /// Read audio from a WAV file instead of the microphone
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        seconds: Option<u64>,
        /// Keep the converted WAV
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConcertsCommand {
    List,
    Show { slug: String },
    Search { query: String },
    Refresh,
    Tickets { concert_id: String },
}

#[derive(Subcommand)]
enum AdminCommand {
    Create(ConcertArgs),
    Update {
        id: String,
        #[command(flatten)]
        args: ConcertArgs,
    },
    Delete { id: String },
    Verify { ticket_code: String },
    MarkUsed { ticket_code: String },
}

#[derive(Args, Default)]
struct ConcertArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(long)]
    time: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    short_description: Option<String>,
    #[arg(long)]
    artists: Option<String>,
    #[arg(long)]
    image: Option<String>,
    #[arg(long, value_delimiter = ',')]
    gradient: Option<Vec<String>>,
    #[arg(long)]
    ticket_link: Option<String>,
    #[arg(long)]
    page_type: Option<TicketPageType>,
    /// Local time, e.g. 2026-05-01T18:00:00
    #[arg(long)]
    available_from: Option<NaiveDateTime>,
    /// NAME:PRICE:QUANTITY, repeatable
    #[arg(long = "ticket-type")]
    ticket_types: Vec<TicketTypeDraft>,
}

impl ConcertArgs {
    /// Заданные флаги поверх текущих значений формы.
    fn apply(self, form: &mut ConcertForm) {
        let ConcertArgs {
            name,
            location,
            date,
            time,
            description,
            short_description,
            artists,
            image,
            gradient,
            ticket_link,
            page_type,
            available_from,
            ticket_types,
        } = self;

        for (value, field) in [
            (name, &mut form.name),
            (location, &mut form.location),
            (time, &mut form.time),
            (description, &mut form.description),
            (short_description, &mut form.short_description),
            (artists, &mut form.artists),
            (image, &mut form.image),
        ] {
            if let Some(value) = value {
                *field = value;
            }
        }
        if date.is_some() {
            form.date = date;
        }
        if gradient.is_some() {
            form.gradient = gradient;
        }
        if ticket_link.is_some() {
            form.ticket_link = ticket_link;
        }
        if page_type.is_some() {
            form.ticket_page_type = page_type;
        }
        if available_from.is_some() {
            form.available_from = available_from;
        }
        if !ticket_types.is_empty() {
            form.ticket_types = ticket_types;
        }
    }
}

fn parse_selection(raw: &str) -> Result<(String, u32), String> {
    let (name, quantity) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected TYPE=QUANTITY, got '{}'", raw))?;
    let quantity = quantity
        .trim()
        .parse()
        .map_err(|_| format!("invalid quantity in '{}'", raw))?;
    Ok((name.trim().to_string(), quantity))
}

fn init_tracing(config: &Config) {
    let json = config.app.log_format.eq_ignore_ascii_case("json");
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

/// Ошибка для пользователя плюс подсказка, куда идти дальше.
fn report(error: AppError) -> anyhow::Error {
    if let Some(redirect) = redirect_for(&error) {
        warn!("Redirecting to {}", redirect.path());
        eprintln!("→ {}", redirect.path());
    }
    anyhow::anyhow!(error.user_message())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config);

    let cli = Cli::parse();
    info!("Starting veritas ({})", config.app.environment);

    let app = AppState::new(config).await.map_err(report)?;
    if let Err(e) = app.session.restore().await {
        warn!("Session restore failed: {}", e);
    }

    run(&app, cli.command).await.map_err(report)
}

async fn run(app: &Arc<AppState>, command: Command) -> Result<(), AppError> {
    match command {
        Command::Signup { name, email, password, confirm_password } => {
            let form = SignUpForm { full_name: name, email, password, confirm_password };
            match app.session.sign_up(&form).await? {
                SignUpOutcome::LoggedIn(user) => println!("Welcome, {}!", user.full_name),
                SignUpOutcome::CreatedButSignInFailed { message } => println!("{}", message),
            }
            after_sign_in(app).await;
        }
        Command::Signin { email, password } => {
            let user = app.session.sign_in(&SignInForm { email, password }).await?;
            println!("Signed in as {} ({:?})", user.email, user.role);
            after_sign_in(app).await;
        }
        Command::Oauth { provider } => {
            let server = CallbackServer::start(&app.config.callback).await?;
            let result = sign_in_with_browser(app, &server, &provider, |url| {
                println!("Open this URL to sign in:\n  {}", url);
                println!("The provider must redirect to {}", server.url("/oauth-success"));
            })
            .await;
            server.shutdown().await;
            let user = result?;
            println!("Signed in as {}", user.email);
            after_sign_in(app).await;
        }
        Command::Logout => {
            app.session.logout().await?;
            println!("Signed out");
        }
        Command::Whoami => match app.session.current_user().await {
            Some(user) => println!("{} <{}> {:?}", user.full_name, user.email, user.role),
            None => println!("Not signed in"),
        },
        Command::ForgotPassword { email } => {
            app.session.forgot_password(&ForgotPasswordForm { email }).await?;
            println!("A reset code has been sent to your email");
        }
        Command::ResetPassword { email, otp, password, confirm_password } => {
            let form = ResetPasswordForm {
                email,
                otp,
                new_password: password,
                confirm_password,
            };
            app.session.reset_password(&form).await?;
            println!("Password reset. Please sign in with your new password");
        }
        Command::ChangePassword => {
            let email = app.session.change_password().await?;
            println!("A reset code has been sent to {}", email);
        }
        Command::Concerts(command) => concerts(app, command).await?,
        Command::Admin(command) => admin(app, command).await?,
        Command::Book { ticket_page_id, selections, checkout } => {
            book(app, &ticket_page_id, selections, checkout).await?
        }
        Command::Confirmation { order_id, pdf } => confirmation(app, order_id.as_deref(), pdf).await?,
        Command::Charts { chart } => {
            let songs = app.api.chart(chart).await?;
            println!("{}", chart.label());
            for (idx, song) in songs.iter().enumerate() {
                println!("{:>3}. {} - {}  {}", idx + 1, song.title, song.artist, song.link);
            }
        }
        Command::Record { file, seconds, save } => record(app, file, seconds, save).await?,
    }
    Ok(())
}

async fn after_sign_in(app: &AppState) {
    if let Err(e) = app.catalog.fetch().await {
        warn!("Concert refresh after sign-in failed: {}", e);
    }
    if let Some(path) = app.session.take_redirect().await {
        println!("Continue at {}", path);
    }
}

fn print_concert(concert: &Concert) {
    println!(
        "[{}] {} | {} | {} {} | {}",
        concert.id, concert.name, concert.location, concert.date, concert.time, concert.artists
    );
    if let Some(link) = &concert.ticket_link {
        println!("      tickets: {}", link);
    }
}

async fn concerts(app: &AppState, command: ConcertsCommand) -> Result<(), AppError> {
    match command {
        ConcertsCommand::List => app.catalog.concerts().await.iter().for_each(print_concert),
        ConcertsCommand::Search { query } => app.catalog.search(&query).await.iter().for_each(print_concert),
        ConcertsCommand::Show { slug } => {
            let concert = app
                .catalog
                .by_slug(&slug)
                .await
                .ok_or_else(|| AppError::NotFound(format!("concert '{}'", slug)))?;
            print_concert(&concert);
            if let Some(description) = &concert.description {
                println!("\n{}", description);
            }
        }
        ConcertsCommand::Refresh => {
            if app.catalog.fetch().await? {
                println!("{} concerts", app.catalog.concerts().await.len());
            } else {
                println!("Sign in to load concerts from the server");
            }
        }
        ConcertsCommand::Tickets { concert_id } => match app.catalog.ticket_details(&concert_id).await? {
            Some(page) => {
                println!("{:?} {}", page.page_type, page.booking_url.unwrap_or_default());
                for t in page.ticket_types {
                    println!("  {} ₹{} ({} left)", t.type_name, t.price, t.quantity);
                }
            }
            None => println!("No ticket page for concert {}", concert_id),
        },
    }
    Ok(())
}

fn print_verification(result: &TicketVerification) {
    println!("{:?}", result.status);
    if let Some(message) = &result.message {
        println!("  {}", message);
    }
    for (label, value) in [
        ("Ticket", &result.ticket_code),
        ("Holder", &result.user_name),
        ("Email", &result.user_email),
        ("Type", &result.ticket_type),
        ("Issued", &result.issued_at),
    ] {
        if let Some(value) = value {
            println!("  {}: {}", label, value);
        }
    }
}

async fn admin(app: &AppState, command: AdminCommand) -> Result<(), AppError> {
    match command {
        AdminCommand::Create(args) => {
            let mut form = ConcertForm::default();
            args.apply(&mut form);
            let concert = app.catalog.add(&form).await?;
            println!("Concert created");
            print_concert(&concert);
        }
        AdminCommand::Update { id, args } => {
            let current = match app.catalog.by_id(&id).await {
                Some(concert) => concert,
                None => app.catalog.fetch_one(&id).await?,
            };
            let mut form = ConcertForm::from(&current);
            args.apply(&mut form);
            let concert = app.catalog.update(&id, &form).await?;
            println!("Concert updated");
            print_concert(&concert);
        }
        AdminCommand::Delete { id } => {
            app.catalog.remove(&id).await?;
            println!("Concert deleted");
        }
        AdminCommand::Verify { ticket_code } => {
            let result = staff::verify_ticket(app, &ticket_code).await?;
            print_verification(&result);
        }
        AdminCommand::MarkUsed { ticket_code } => {
            let result = staff::mark_ticket_used(app, &ticket_code).await?;
            print_verification(&result);
        }
    }
    Ok(())
}

async fn book(
    app: &AppState,
    ticket_page_id: &str,
    selections: Vec<(String, u32)>,
    checkout: bool,
) -> Result<(), AppError> {
    let mut page = BookingPage::open(app, ticket_page_id).await?;
    println!("{} | {} | {} {}", page.concert.name, page.concert.location, page.concert.date, page.concert.time);

    match &page.view {
        BookingView::ComingSoon => {
            println!("Tickets coming soon");
            return Ok(());
        }
        BookingView::AvailableLater { available_from } => {
            println!("Tickets available from {}", available_from);
            return Ok(());
        }
        BookingView::Bookable => {}
    }

    for (name, quantity) in selections {
        page.set_quantity(&name, quantity).await?;
    }
    for view in page.ticket_views() {
        let hint = if view.sold_out {
            " (sold out)"
        } else if view.selling_fast {
            " (selling fast)"
        } else {
            ""
        };
        println!("  {:<12} ₹{:<8} x{}{}", view.name, view.price, view.selected, hint);
    }
    let totals = page.totals();
    println!("Subtotal ₹{}  Tax ₹{}  Total ₹{}", totals.subtotal, totals.tax, totals.total);

    if !checkout {
        return Ok(());
    }

    let server = CallbackServer::start(&app.config.callback).await?;
    let widget = BrowserPaymentWidget::new(server.state(), server.url("/checkout"), |url| {
        println!("Open this URL to complete payment:\n  {}", url);
    });
    let result = booking::run_checkout(app, &page, &widget).await;
    server.shutdown().await;

    let receipt = result?;
    println!("✅ Payment Successful! Order {}", receipt.order_id);
    confirmation(app, Some(&receipt.order_id), None).await
}

async fn confirmation(app: &AppState, order_id: Option<&str>, pdf: Option<PathBuf>) -> Result<(), AppError> {
    let details = booking::load_confirmation(app, order_id).await?;
    println!("Order {} | {} | INR {:.2}", details.order_id, details.concert_name, details.amount);
    for ticket in &details.tickets {
        println!("  {} {}", ticket.ticket_type, ticket.code);
    }

    if let Some(dir) = pdf {
        let path = booking::save_receipt(&details, &dir).await?;
        println!("Tickets saved to {}", path.display());
    }
    Ok(())
}

async fn record(
    app: &AppState,
    file: Option<PathBuf>,
    seconds: Option<u64>,
    save: Option<PathBuf>,
) -> Result<(), AppError> {
    match file {
        Some(path) => identify(app, WavFileSource::open(path)?, seconds, save).await,
        #[cfg(feature = "microphone")]
        None => {
            let source = audio::microphone::MicrophoneSource::default_input()?;
            identify(app, source, seconds, save).await
        }
        #[cfg(not(feature = "microphone"))]
        None => Err(AppError::Validation(
            "Microphone support is not built in, pass --file".to_string(),
        )),
    }
}

async fn identify<S: AudioSource>(
    app: &AppState,
    source: S,
    seconds: Option<u64>,
    save: Option<PathBuf>,
) -> Result<(), AppError> {
    let mut recorder = match seconds {
        Some(s) => Recorder::with_max_duration(source, Duration::from_secs(s)),
        None => Recorder::new(source, &app.config.recording),
    };

    let stop = CancellationToken::new();
    let ctrl_c = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });
    println!("Listening for up to {}s, press Ctrl+C to stop", recorder.max_duration().as_secs());

    let result = audio::identify(&app.api, &mut recorder, stop).await?;
    println!(
        "Recording quality: {} Hz, {}-bit, {} ch",
        result.quality.sample_rate, result.quality.bits_per_sample, result.quality.channels
    );
    if let Some(path) = save {
        tokio::fs::write(&path, &result.wav).await?;
        println!("WAV saved to {}", path.display());
    }

    match result.outcome {
        MatchOutcome::Matched(song) => {
            println!("{} - {}", song.title, song.artist);
            if let Some(album) = song.album {
                println!("  Album: {}", album);
            }
            if let Some(url) = song.song_url {
                println!("  {}", url);
            }
        }
        MatchOutcome::NoMatch => println!("No match found. Try recording again."),
    }
    Ok(())
}
