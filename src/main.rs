mod calendar;
mod config;
mod error;
mod geo;
mod maps;
mod models;
mod paging;
mod payload;

use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::calendar::client::CalendarClient;
use crate::calendar::CalendarReport;
use crate::geo::geocode::{NominatimClient, RetryPolicy};
use crate::geo::{LocationGuess, Locator};
use crate::maps::client::MapsClient;
use crate::maps::preferences::{self, Preferences};
use crate::maps::{MapsReport, MapsStatus};
use crate::paging::Pager;

#[derive(Parser)]
#[command(name = "geotrace", about = "Profile contributions and calendar dump with location inference")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Page through a profile's maps reviews and photos and guess where they live
    Maps {
        /// 21-digit account id
        gaia_id: String,
        /// Cluster radius in km (default: GEOTRACE_RADIUS_KM or 30)
        #[arg(short, long)]
        radius: Option<f64>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Dump the public calendar of an address
    Calendar {
        email: String,
        /// Events to show (0 for all)
        #[arg(short = 'n', long, default_value = "5")]
        limit: usize,
        /// Known display name, left out of the other-names list
        #[arg(long)]
        name: Option<String>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Type codes with a readable label; anything else is listed as unknown.
const KNOWN_KINDS: &[(&str, &str)] = &[
    ("bakery", "Bakery"),
    ("bar", "Bar"),
    ("cafe", "Café"),
    ("coffee_shop", "Coffee shop"),
    ("fast_food_restaurant", "Fast food"),
    ("gas_station", "Gas station"),
    ("gym", "Gym"),
    ("hotel", "Hotel"),
    ("museum", "Museum"),
    ("park", "Park"),
    ("pharmacy", "Pharmacy"),
    ("restaurant", "Restaurant"),
    ("supermarket", "Supermarket"),
    ("tourist_attraction", "Tourist attraction"),
];

fn kind_label(code: &str) -> Option<String> {
    KNOWN_KINDS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| label.to_string())
}

#[derive(Serialize)]
struct MapsOutput<'a> {
    gaia_id: &'a str,
    #[serde(flatten)]
    report: &'a MapsReport,
    average_rating: Option<f64>,
    preferences: Preferences,
    location: Option<LocationGuess>,
}

#[derive(Serialize)]
struct CalendarOutput<'a> {
    email: &'a str,
    #[serde(flatten)]
    report: &'a CalendarReport,
    other_names: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = config::load()?;

    // Ctrl-c stops paging; pages already read are kept.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let result = match cli.command {
        Commands::Maps { gaia_id, radius, json } => {
            if !maps::client::is_gaia_id(&gaia_id) {
                bail!("'{}' is not a 21-digit account id", gaia_id);
            }
            let pager = Pager::new(settings.maps.prefix_len, cancel);
            let mut client = MapsClient::new(settings.maps.clone(), &gaia_id)?;

            let pb = spinner("Fetching maps contributions...");
            let report = maps::collect(&mut client, &pager)
                .await
                .context("Failed to fetch maps contributions")?;
            pb.finish_and_clear();

            let average_rating = maps::reviews::average_rating(&report.reviews.records);
            let preferences = preferences::summarize(report.places(), kind_label);

            let location = if report.status == MapsStatus::Ok {
                let sightings = geo::sightings(&report.reviews.records, &report.photos.records);
                let geocoder = NominatimClient::new(&settings.geocode)?;
                let locator = Locator::new(
                    geocoder,
                    radius.unwrap_or(settings.radius_km),
                    RetryPolicy::from(&settings.geocode),
                );
                let pb = spinner("Calculating probable location...");
                let guess = locator.locate(&sightings).await;
                pb.finish_and_clear();
                guess
            } else {
                None
            };

            let out = MapsOutput {
                gaia_id: &gaia_id,
                report: &report,
                average_rating,
                preferences,
                location,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print_maps(&out);
            }
            Ok(())
        }
        Commands::Calendar { email, limit, name, json } => {
            let pager = Pager::new(0, cancel).raw_tokens().follow_empty_pages();
            let mut client = CalendarClient::new(settings.calendar.clone(), &email)?;

            let pb = spinner("Dumping calendar events...");
            let report = calendar::collect(&mut client, &pager)
                .await
                .context("Failed to fetch calendar")?;
            pb.finish_and_clear();

            let Some(report) = report else {
                println!("No public calendar found for {}.", email);
                return Ok(());
            };
            let other_names = calendar::other_names(&report.events.records, &email, name.as_deref());
            let out = CalendarOutput {
                email: &email,
                report: &report,
                other_names,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print_calendar(&out, limit);
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn spinner(msg: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn print_maps(out: &MapsOutput) {
    let report = out.report;
    match report.status {
        MapsStatus::Failed => {
            println!("Blocked by the maps service (redirected to its block page). Try again later.");
            return;
        }
        MapsStatus::Empty => {
            println!("No reviews, ratings or photos on this profile.");
            return;
        }
        MapsStatus::Private => {
            println!("This profile has contributions, but they are private.");
            return;
        }
        MapsStatus::Ok => {}
    }

    println!("Profile {}", out.gaia_id);
    println!("https://www.google.com/maps/contrib/{}/reviews\n", out.gaia_id);
    println!("--- Statistics ---");
    for (name, count) in report.stats.nonzero() {
        println!("  {:<16} {:>6}", name, count);
    }

    println!(
        "\nReviews: {} ({} pages, {} skipped, {:?})",
        report.reviews.records.len(),
        report.reviews.pages,
        report.reviews.skipped,
        report.reviews.end
    );
    println!(
        "Photos:  {} ({} pages, {} skipped, {:?})",
        report.photos.records.len(),
        report.photos.pages,
        report.photos.skipped,
        report.photos.end
    );
    if let Some(avg) = out.average_rating {
        println!("Average rating: {:.1}/5", avg);
    }

    let with_cost: Vec<u8> = report.places().filter_map(|p| p.cost_level).collect();
    if !with_cost.is_empty() {
        let mean = with_cost.iter().map(|c| *c as f64).sum::<f64>() / with_cost.len() as f64;
        println!("Average cost level: {}", "$".repeat(mean.round() as usize));
    }

    if !out.preferences.kinds.is_empty() {
        println!("\n--- Preferences ---");
        for kind in &out.preferences.kinds {
            let label = kind.label.as_deref().unwrap_or(&kind.code);
            let tags: Vec<&str> = kind.tags.iter().map(|(t, _)| t.as_str()).collect();
            println!("  {:<24} {:>4}  {}", truncate(label, 24), kind.count, tags.join(", "));
        }
        if !out.preferences.unknown.is_empty() {
            println!("  (no label for: {})", out.preferences.unknown.join(", "));
        }
    }

    match &out.location {
        None => println!("\nNo located contributions, no location guess."),
        Some(guess) => {
            println!(
                "\nProbable location (confidence => {}, {:.0}%):",
                guess.confidence.label(),
                guess.percent
            );
            for c in &guess.clusters {
                let place = match c.resolution.place() {
                    Some(p) => format!(
                        "{} / {}",
                        p.town.as_deref().unwrap_or("?"),
                        p.country.as_deref().unwrap_or("?")
                    ),
                    None => format!("{:?}", c.resolution),
                };
                let span = Duration::from_secs(c.span_secs.max(0) as u64);
                println!(
                    "  {:<32} {:>4} places over {:<10} ({:.4}, {:.4})",
                    truncate(&place, 32),
                    c.members_count,
                    format_duration(span),
                    c.centroid.latitude,
                    c.centroid.longitude
                );
            }
        }
    }
}

fn print_calendar(out: &CalendarOutput, limit: usize) {
    let cal = &out.report.calendar;
    println!("Calendar ID: {}", cal.id);
    if cal.summary != cal.id {
        println!("Summary:     {}", cal.summary);
    }
    println!("Time zone:   {}\n", cal.time_zone.as_deref().unwrap_or("?"));

    let events = &out.report.events.records;
    let kept = calendar::dedup::latest_confirmed(events);
    if kept.is_empty() {
        println!("No events dumped ({} raw, {:?}).", events.len(), out.report.events.end);
    } else {
        let shown = if limit == 0 { kept.len() } else { limit.min(kept.len()) };
        println!(
            "{} events, {} distinct confirmed. Showing the last {}:\n",
            events.len(),
            kept.len(),
            shown
        );
        println!("{:<40} | {:<19} | {:<12}", "Name", "Datetime (UTC)", "Duration");
        println!("{}", "-".repeat(77));
        for e in &kept[kept.len() - shown..] {
            let title = if e.summary.is_empty() { "/" } else { e.summary.as_str() };
            let date = e
                .start
                .date_time
                .map(|d| d.format("%Y/%m/%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "?".into());
            let duration = match (e.start.date_time, e.end.date_time) {
                (Some(start), Some(end)) => (end - start)
                    .to_std()
                    .map(format_duration)
                    .unwrap_or_else(|_| "?".into()),
                _ => "?".into(),
            };
            println!("{:<40} | {:<19} | {:<12}", truncate(title, 40), date, duration);
        }
        println!(
            "\nDownload: https://calendar.google.com/calendar/ical/{}/public/basic.ics",
            out.email
        );
    }

    if !out.other_names.is_empty() {
        println!("\nOther names used by the target:");
        for name in &out.other_names {
            println!("  - {}", name);
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}
