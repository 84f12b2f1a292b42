//! CineLock demo binary.
//!
//! Walks through the concurrent booking simulation end to end: show
//! selection, primary-user locking and payment, a competing bot session, a
//! conflicting acquisition, and the scripted deadlock narrative, then dumps
//! the event log.

use cinelock::actors::{acquire_selected, commit_booking, run_bot_session, run_deadlock_narrative};
use cinelock::{
    BookingAction, BookingEnvironment, BookingReducer, BookingState, BookingStore, Catalog,
    Config, ExpiryScheduler, UserSession,
};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinelock=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== CineLock: Concurrent Booking Simulation ===\n");

    let config = Config::from_env();
    let catalog = Catalog::builtin();
    let session = UserSession::main();

    let store: BookingStore = BookingStore::new(
        BookingState::new(config.log.capacity),
        BookingReducer,
        BookingEnvironment::live(&config),
    );

    let show = catalog
        .show("s1")
        .ok_or("catalog is missing its built-in shows")?
        .clone();
    let movie_title = catalog
        .movie(&show.movie_id)
        .map_or("<unknown>", |m| m.title.as_str());
    println!(
        ">>> Selecting show: {movie_title} at {} ({}), ${}",
        show.time, show.theater, show.price
    );
    store
        .send(BookingAction::SelectShow(show))
        .await?
        .wait()
        .await;

    let scheduler = ExpiryScheduler::spawn(store.clone(), config.reclaim_interval());

    println!(">>> {} selects seats A1, A2 and locks them", session.user_name);
    for seat in ["A1", "A2"] {
        store
            .send(BookingAction::ToggleSeat(seat.parse()?))
            .await?
            .wait()
            .await;
    }
    acquire_selected(&store, &session).await?;

    println!(">>> A bot session grabs two random seats concurrently");
    let mut rng = rand::thread_rng();
    if let Some(bot) = run_bot_session(&store, &mut rng).await? {
        let held = store.state(move |s| s.seats_locked_by(&bot)).await;
        println!(
            "    bot locked: {}",
            held.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );

        println!(">>> {} tries to take the bot's seats (conflict)", session.user_name);
        store
            .send(BookingAction::Acquire {
                requester: session.user_id.clone(),
                seat_ids: held,
            })
            .await?
            .wait()
            .await;
    }

    println!(">>> {} pays and commits", session.user_name);
    commit_booking(&store, &session).await?;

    println!(">>> Forcing the deadlock narrative");
    run_deadlock_narrative(&store, &config.latency).await?;

    println!("\n--- Event log ---");
    for entry in store.state(|s| s.log.snapshot()).await {
        let kind = format!("{:?}", entry.kind).to_uppercase();
        match &entry.simulated_query {
            Some(sql) => println!(
                "{} [{kind}] {}\n         `{sql}`",
                entry.timestamp.format("%H:%M:%S"),
                entry.message
            ),
            None => println!(
                "{} [{kind}] {}",
                entry.timestamp.format("%H:%M:%S"),
                entry.message
            ),
        }
    }

    println!("\n--- Insight ---");
    println!("{}", store.state(|s| s.insight.clone()).await);

    drop(scheduler);
    store.shutdown(Duration::from_secs(5)).await?;
    println!("\n=== Simulation complete ===");
    Ok(())
}
