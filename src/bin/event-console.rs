use std::error::Error;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use clap::Parser;

use event_console::client::Client;
use event_console::config::{parse_backend_url, Settings};
use event_console::event::{parse_date, parse_time, EventId, EventType, LessonType};
use event_console::form::{AddEventForm, EditForm, SendForm, TransferForm};
use event_console::list::EventsList;
use event_console::month::MonthWindow;
use event_console::recurrence::Repeat;
use event_console::session::{AdminSession, FileTokenStore};
use event_console::traits::EventSource;
use event_console::utils::{render_day, render_event_line, render_month};
use event_console::view::CalendarView;

#[derive(Parser)]
#[command(name = "event-console")]
#[command(about = "Manage the events of the notification backend", long_about = None)]
struct Cli {
    /// URL of the backend (defaults to $EVENT_CONSOLE_BACKEND, then http://127.0.0.1:8000)
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Profile whose admin token is used
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Do not use colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show a month (the current one by default)
    Month {
        year: Option<i32>,
        /// 1 to 12
        #[arg(value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },

    /// Show the events of a day
    Day {
        #[arg(value_parser = date_arg)]
        date: NaiveDate,
    },

    /// Show the events of the current month that have no date
    Undated,

    /// List every event, except those created from the calendar
    List,

    /// Check an admin token and remember it
    Login { token: String },

    /// Forget the admin token
    Logout,

    /// Tell whether an admin token is set
    Whoami,

    /// Add an event (or a series of events) to a day
    Add {
        #[arg(value_parser = date_arg)]
        date: NaiveDate,
        #[arg(long = "type", default_value = "schedule")]
        event_type: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
        #[arg(long, value_parser = time_arg)]
        time: Option<NaiveTime>,
        #[arg(long, value_parser = time_arg)]
        end_time: Option<NaiveTime>,
        /// none, daily, weekly or biweekly
        #[arg(long, default_value = "none")]
        repeat: Repeat,
        #[arg(long, value_parser = date_arg)]
        until: Option<NaiveDate>,
    },

    /// Create an event and send its notification right away
    Send {
        message: String,
        #[arg(long = "type", default_value = "announcement")]
        event_type: String,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
        #[arg(long, value_parser = time_arg)]
        time: Option<NaiveTime>,
        #[arg(long)]
        reminder_hours: Option<i64>,
    },

    /// Change an event. Fields that are not given keep their current value
    Edit {
        id: String,
        #[arg(long = "type")]
        event_type: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
        #[arg(long, value_parser = time_arg)]
        time: Option<NaiveTime>,
        #[arg(long, value_parser = time_arg)]
        end_time: Option<NaiveTime>,
        #[arg(long)]
        room: Option<String>,
        #[arg(long)]
        teacher: Option<String>,
        /// lecture or practice
        #[arg(long)]
        lesson_type: Option<LessonType>,
        /// Apply to every event of the same series
        #[arg(long)]
        series: bool,
    },

    /// Move an event to another day
    Transfer {
        id: String,
        #[arg(value_parser = date_arg)]
        date: NaiveDate,
        #[arg(long, value_parser = time_arg)]
        time: Option<NaiveTime>,
        #[arg(long, value_parser = time_arg)]
        end_time: Option<NaiveTime>,
        #[arg(long)]
        series: bool,
    },

    /// Delete an event
    Delete { id: String },

    /// Delete every event of a day
    DeleteDay {
        #[arg(value_parser = date_arg)]
        date: NaiveDate,
    },

    /// Delete every event of a month
    DeleteMonth {
        year: i32,
        #[arg(value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
    },

    /// Send the notification of an event now
    SendNow { id: String },

    /// Show where the notifications of an event go
    ResolveChat { id: String },
}

fn date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).ok_or_else(|| format!("invalid date {:?} (expected YYYY-MM-DD)", s))
}

fn time_arg(s: &str) -> Result<NaiveTime, String> {
    parse_time(s).ok_or_else(|| format!("invalid time {:?} (expected HH:MM)", s))
}


#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut settings = Settings::from_env()?;
    if let Some(backend) = &cli.backend {
        settings.backend_url = parse_backend_url(backend)?;
    }
    if let Some(profile) = cli.profile {
        settings.profile = profile;
    }
    log::debug!("Using backend {} with profile {}", settings.backend_url, settings.profile);

    let color = cli.no_color == false;
    let session = AdminSession::new(FileTokenStore::for_profile(&settings.state_dir, &settings.profile))?;
    let client = Arc::new(Client::from_settings(&settings, session.clone())?);

    match cli.command {
        Commands::Month { year, month } => {
            let window = match (year, month) {
                (Some(y), Some(m)) => MonthWindow::new(y, m as i32 - 1),
                (Some(y), None) => MonthWindow::new(y, MonthWindow::today().month0() as i32),
                _ => MonthWindow::today(),
            };
            let mut view = CalendarView::new(client, session, window);
            let result = view.load().await;
            print!("{}", render_month(&view, color));
            result?;
        },
        Commands::Day { date } => {
            let mut view = CalendarView::new(client, session, MonthWindow::containing(date));
            view.load().await?;
            print!("{}", render_day(date, view.events_on(date), color));
        },
        Commands::Undated => {
            let mut view = CalendarView::new(client, session, MonthWindow::today());
            view.load().await?;
            for ev in view.undated() {
                println!("{}", render_event_line(ev, color));
            }
        },
        Commands::List => {
            let mut list = EventsList::new(client, session);
            list.load().await?;
            for ev in list.events() {
                println!("{}", render_event_line(ev, color));
            }
        },
        Commands::Login { token } => {
            session.login(&token, client.as_ref()).await?;
            println!("Admin token accepted.");
        },
        Commands::Logout => {
            session.clear()?;
            println!("Admin token forgotten.");
        },
        Commands::Whoami => {
            if session.is_admin() {
                println!("Admin ({:?})", session.privileges());
            } else {
                println!("Anonymous");
            }
        },
        Commands::Add { date, event_type, title, body, time, end_time, repeat, until } => {
            let form = AddEventForm {
                event_type: EventType::from(event_type),
                title,
                body,
                time,
                end_time,
                repeat,
                repeat_until: until,
                ..AddEventForm::new(date)
            };
            let mut view = CalendarView::new(client, session, MonthWindow::containing(date));
            let created = view.create(&form).await?;
            println!("Created {} event(s)", created.len());
            for ev in &created {
                println!("{}", render_event_line(ev, color));
            }
        },
        Commands::Send { message, event_type, subject, title, date, time, reminder_hours } => {
            let form = SendForm {
                event_type: EventType::from(event_type),
                subject,
                title,
                message,
                date,
                time,
                reminder_offset_hours: reminder_hours,
            };
            let created = client.create_and_send(&form.to_payload()?).await?;
            println!("Sent {}", render_event_line(&created, color).trim_start());
        },
        Commands::Edit { id, event_type, title, body, time, end_time, room, teacher, lesson_type, series } => {
            let id = EventId::from(id);
            let current = client.events().await?
                .into_iter()
                .find(|ev| ev.id() == &id)
                .ok_or_else(|| format!("no event with ID {}", id))?;

            let mut form = EditForm::from_event(&current);
            if let Some(t) = event_type { form.event_type = EventType::from(t); }
            if title.is_some() { form.title = title; }
            if body.is_some() { form.body = body; }
            if time.is_some() { form.time = time; }
            if end_time.is_some() { form.end_time = end_time; }
            if room.is_some() { form.room = room; }
            if teacher.is_some() { form.teacher = teacher; }
            if let Some(l) = lesson_type { form.lesson_type = l; }
            form.apply_to_series = series;

            let window = current.date().map(MonthWindow::containing).unwrap_or_else(MonthWindow::today);
            let mut view = CalendarView::new(client, session, window);
            let updated = view.edit(&id, &form).await?;
            println!("Updated {}", render_event_line(&updated, color).trim_start());
        },
        Commands::Transfer { id, date, time, end_time, series } => {
            let form = TransferForm { date: Some(date), time, end_time, apply_to_series: series };
            let mut view = CalendarView::new(client, session, MonthWindow::containing(date));
            let moved = view.transfer(&EventId::from(id), &form).await?;
            println!("Moved {}", render_event_line(&moved, color).trim_start());
        },
        Commands::Delete { id } => {
            let mut list = EventsList::new(client, session);
            let deleted = list.delete(&EventId::from(id)).await?;
            println!("Deleted {} event(s)", deleted);
        },
        Commands::DeleteDay { date } => {
            let mut view = CalendarView::new(client, session, MonthWindow::containing(date));
            let deleted = view.delete_day(date).await?;
            println!("Deleted {} event(s) on {}", deleted, date);
        },
        Commands::DeleteMonth { year, month } => {
            let mut view = CalendarView::new(client, session, MonthWindow::new(year, month as i32 - 1));
            let deleted = view.delete_month().await?;
            println!("Deleted {} event(s) in {}", deleted, view.window().label());
        },
        Commands::SendNow { id } => {
            let mut list = EventsList::new(client, session);
            list.send_now(&EventId::from(id)).await?;
            println!("Sent.");
        },
        Commands::ResolveChat { id } => {
            let list = EventsList::new(client, session);
            let target = list.resolve_chat(&EventId::from(id)).await?;
            println!("type:      {}", target.kind.as_deref().unwrap_or("-"));
            println!("chat_id:   {}", target.chat_id.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()));
            println!("thread_id: {}", target.thread_id.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string()));
        },
    }

    Ok(())
}
