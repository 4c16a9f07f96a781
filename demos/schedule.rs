use chrono::{Duration, Utc};
use sm2::{
    CardProgress, CardState, DueQueue, NextStates, Rating, ReviewScheduler, SchedulerConfig,
    SessionStats, Status,
};
use strum::IntoEnumIterator;

fn setup_logger() -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}

fn print_next_states(next_states: &NextStates) {
    for rating in Rating::iter() {
        let state = next_states.get(rating);
        println!(
            "{rating} interval: {} days (ease {:.2}, {})",
            state.interval, state.ease_factor, state.status
        );
    }
}

fn schedule_new_card(scheduler: &ReviewScheduler) -> Result<(), Box<dyn std::error::Error>> {
    // A card nobody has reviewed yet has no progress record
    let progress: Option<CardProgress> = None;
    println!("State: {}", CardState::of(progress.as_ref()));

    print_next_states(&scheduler.next_states(progress.as_ref())?);

    // Assume the learner pressed `good`
    let progress = scheduler.review(Rating::Good.quality().into(), None, Utc::now())?;

    println!("Next review due: {}", progress.next_review());
    println!("State: {}", CardState::of(Some(&progress)));
    Ok(())
}

fn schedule_existing_card(scheduler: &ReviewScheduler) -> Result<(), Box<dyn std::error::Error>> {
    // Reviewed a week ago with a 6 day interval, so it is overdue by a day
    let progress = CardProgress::restore(
        2.5,
        6,
        0,
        Status::Mastered,
        Utc::now() - Duration::days(7),
    )?;
    println!("Overdue by: {} days", progress.overdue_by(Utc::now()).num_days());

    print_next_states(&scheduler.next_states(Some(&progress))?);

    // Assume the learner forgot it
    let progress = scheduler.review(Rating::Again.quality().into(), Some(&progress), Utc::now())?;

    println!("Next review due: {}", progress.next_review());
    println!("Lapses: {}", progress.lapses());
    println!("State: {}", CardState::of(Some(&progress)));
    Ok(())
}

fn review_session(scheduler: &ReviewScheduler) -> Result<(), Box<dyn std::error::Error>> {
    let now = Utc::now();
    let words = [("kitab", 3), ("qalam", 1), ("bayt", -2), ("madrasa", 10)]
        .into_iter()
        .map(|(word, days_ago)| {
            let progress = CardProgress::restore(
                2.5,
                1,
                0,
                Status::Learning,
                now - Duration::days(days_ago),
            )?;
            Ok((word, progress))
        })
        .collect::<sm2::Result<Vec<_>>>()?;
    let mut queue = DueQueue::from_cards(words.iter().map(|(word, p)| (*word, p)), now);
    println!("{} words due", queue.len());

    let mut stats = SessionStats::default();
    for rating in [Rating::Good, Rating::Again, Rating::Easy] {
        let Some(word) = queue.pop() else { break };
        let Some((_, progress)) = words.iter().find(|(w, _)| *w == word) else {
            continue;
        };
        let progress = scheduler.review(rating.quality().into(), Some(progress), now)?;
        stats.record(rating.quality());
        println!("{word}: {rating}, next in {} days", progress.interval());
    }
    println!(
        "Reviewed {}, streak {}, best streak {}",
        stats.reviewed, stats.streak, stats.best_streak
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logger()?;
    let scheduler = ReviewScheduler::new(SchedulerConfig::default())?;

    println!("Scheduling a new card:");
    schedule_new_card(&scheduler)?;

    println!("\nScheduling an existing card:");
    schedule_existing_card(&scheduler)?;

    println!("\nReview session:");
    review_session(&scheduler)?;

    Ok(())
}
