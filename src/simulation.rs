use crate::error::{Result, SM2Error};
use crate::progress::Status;
use crate::quality::Rating;
use crate::scheduler::ReviewScheduler;
use log::info;
use priority_queue::PriorityQueue;
use rand::SeedableRng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::cmp::Reverse;

const RATINGS: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub review_cnt_per_day: Vec<usize>,
    pub learn_cnt_per_day: Vec<usize>,
    pub lapse_cnt_per_day: Vec<usize>,
    // Cards whose latest review left them mastered, at the end of each day.
    pub mastered_cnt_per_day: Vec<usize>,
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    pub deck_size: usize,
    pub learn_span: usize,
    /// New cards introduced per day.
    pub learn_limit: usize,
    pub review_limit: usize,
    /// Weights for again, hard, good, easy on a card's first review.
    pub first_rating_prob: [f32; 4],
    /// Weights for again, hard, good, easy on later reviews.
    pub review_rating_prob: [f32; 4],
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            deck_size: 1000,
            learn_span: 365,
            learn_limit: 20,
            review_limit: 200,
            first_rating_prob: [0.24, 0.094, 0.495, 0.171],
            review_rating_prob: [0.1, 0.2, 0.55, 0.15],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub id: usize,
    pub ease_factor: f32,
    pub interval: u32,
    pub lapses: u32,
    /// `None` until the card has been reviewed once.
    pub status: Option<Status>,
    pub last_day: Option<usize>,
    pub due: usize,
}

impl Card {
    fn new(id: usize, due: usize) -> Self {
        Self {
            id,
            ease_factor: 0.0,
            interval: 0,
            lapses: 0,
            status: None,
            last_day: None,
            due,
        }
    }

    pub fn is_new(&self) -> bool {
        self.last_day.is_none()
    }
}

fn rating_dist(weights: [f32; 4], name: &str) -> Result<WeightedIndex<f32>> {
    WeightedIndex::new(weights).map_err(|err| SM2Error::InvalidInput {
        reason: format!("{name} {weights:?}: {err}"),
    })
}

// reviews before new cards on the same day, then by id
fn card_priority(card: &Card) -> Reverse<(usize, bool, usize)> {
    Reverse((card.due, card.is_new(), card.id))
}

/// Simulates a learner working through a deck for `learn_span` days, with
/// grades drawn from the configured rating weights.
pub fn simulate(
    config: &SimulatorConfig,
    scheduler: &ReviewScheduler,
    seed: Option<u64>,
) -> Result<SimulationResult> {
    if config.deck_size == 0 {
        return Err(SM2Error::InvalidInput {
            reason: "deck_size must be positive".to_string(),
        });
    }
    let first_rating_dist = rating_dist(config.first_rating_prob, "first_rating_prob")?;
    let review_rating_dist = rating_dist(config.review_rating_prob, "review_rating_prob")?;
    let mut rng = StdRng::seed_from_u64(seed.unwrap_or(42));

    let mut review_cnt_per_day = vec![0; config.learn_span];
    let mut learn_cnt_per_day = vec![0; config.learn_span];
    let mut lapse_cnt_per_day = vec![0; config.learn_span];
    // signed so demotions can be recorded before the running sum is taken
    let mut mastered_delta_per_day = vec![0i64; config.learn_span];

    let mut cards: Vec<Card> = if config.learn_limit > 0 {
        (0..config.deck_size)
            .map(|i| Card::new(i, i / config.learn_limit))
            .collect()
    } else {
        Vec::new()
    };

    let mut card_priorities = PriorityQueue::new();
    for card in &cards {
        card_priorities.push(card.id, card_priority(card));
    }

    while let Some((&card_index, _)) = card_priorities.peek() {
        let card = &mut cards[card_index];
        let day_index = card.due;

        if day_index >= config.learn_span {
            card_priorities.pop();
            continue;
        }

        let is_learn = card.is_new();
        let over_limit = if is_learn {
            learn_cnt_per_day[day_index] + 1 > config.learn_limit
        } else {
            review_cnt_per_day[day_index] + 1 > config.review_limit
        };
        if over_limit {
            card.due = day_index + 1;
            card_priorities.change_priority(&card_index, card_priority(card));
            continue;
        }

        let rating = if is_learn {
            learn_cnt_per_day[day_index] += 1;
            RATINGS[first_rating_dist.sample(&mut rng)]
        } else {
            review_cnt_per_day[day_index] += 1;
            RATINGS[review_rating_dist.sample(&mut rng)]
        };

        let ease_factor = if is_learn {
            scheduler.config().default_ease_factor
        } else {
            card.ease_factor
        };
        let result = scheduler.schedule(rating.quality(), card.interval, ease_factor, card.lapses);

        if result.lapses > card.lapses {
            lapse_cnt_per_day[day_index] += 1;
        }
        match (card.status, result.status) {
            (Some(Status::Mastered), Status::Learning) => mastered_delta_per_day[day_index] -= 1,
            (None | Some(Status::Learning), Status::Mastered) => {
                mastered_delta_per_day[day_index] += 1
            }
            _ => {}
        }

        card.ease_factor = result.ease_factor;
        card.interval = result.interval;
        card.lapses = result.lapses;
        card.status = Some(result.status);
        card.last_day = Some(day_index);
        card.due = day_index + result.interval as usize;

        card_priorities.change_priority(&card_index, card_priority(card));
    }

    let mastered_cnt_per_day = mastered_delta_per_day
        .iter()
        .scan(0i64, |mastered, delta| {
            *mastered += delta;
            Some(*mastered as usize)
        })
        .collect::<Vec<_>>();

    info!(
        "simulated {} days: {} learned, {} reviews, {} lapses, {} mastered",
        config.learn_span,
        learn_cnt_per_day.iter().sum::<usize>(),
        review_cnt_per_day.iter().sum::<usize>(),
        lapse_cnt_per_day.iter().sum::<usize>(),
        mastered_cnt_per_day.last().copied().unwrap_or_default(),
    );

    Ok(SimulationResult {
        review_cnt_per_day,
        learn_cnt_per_day,
        lapse_cnt_per_day,
        mastered_cnt_per_day,
        cards,
    })
}

/// Runs [`simulate`] once per seed, in parallel.
pub fn simulate_seeds(
    config: &SimulatorConfig,
    scheduler: &ReviewScheduler,
    seeds: &[u64],
) -> Result<Vec<SimulationResult>> {
    seeds
        .par_iter()
        .map(|&seed| simulate(config, scheduler, Some(seed)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MasteryRule, SchedulerConfig};
    use itertools::izip;

    #[test]
    fn simulate_is_deterministic_per_seed() -> Result<()> {
        let config = SimulatorConfig {
            deck_size: 200,
            learn_span: 60,
            ..Default::default()
        };
        let scheduler = ReviewScheduler::default();
        let first = simulate(&config, &scheduler, Some(7))?;
        let second = simulate(&config, &scheduler, Some(7))?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn simulate_with_learn_limit() -> Result<()> {
        let config = SimulatorConfig {
            deck_size: 100,
            learn_span: 30,
            learn_limit: 7,
            ..Default::default()
        };
        let SimulationResult {
            learn_cnt_per_day, ..
        } = simulate(&config, &ReviewScheduler::default(), None)?;
        assert!(learn_cnt_per_day.iter().all(|&cnt| cnt <= 7));
        assert_eq!(learn_cnt_per_day[..3], [7, 7, 7]);
        assert_eq!(learn_cnt_per_day[14], 2);
        assert_eq!(learn_cnt_per_day.iter().sum::<usize>(), 100);
        Ok(())
    }

    #[test]
    fn simulate_with_review_limit() -> Result<()> {
        let config = SimulatorConfig {
            deck_size: 500,
            learn_span: 40,
            learn_limit: 50,
            review_limit: 30,
            ..Default::default()
        };
        let SimulationResult {
            review_cnt_per_day, ..
        } = simulate(&config, &ReviewScheduler::default(), None)?;
        assert!(review_cnt_per_day.iter().all(|&cnt| cnt <= 30));
        assert!(review_cnt_per_day.contains(&30));
        Ok(())
    }

    #[test]
    fn always_easy_masters_every_card() -> Result<()> {
        let config = SimulatorConfig {
            deck_size: 40,
            learn_span: 20,
            learn_limit: 10,
            first_rating_prob: [0.0, 0.0, 0.0, 1.0],
            review_rating_prob: [0.0, 0.0, 0.0, 1.0],
            ..Default::default()
        };
        let result = simulate(&config, &ReviewScheduler::default(), None)?;
        assert_eq!(result.mastered_cnt_per_day[..4], [10, 20, 30, 40]);
        assert_eq!(result.mastered_cnt_per_day.last(), Some(&40));
        assert_eq!(result.lapse_cnt_per_day.iter().sum::<usize>(), 0);
        assert!(result.cards.iter().all(|card| card.interval >= 6));
        Ok(())
    }

    #[test]
    fn always_again_lapses_every_review() -> Result<()> {
        let config = SimulatorConfig {
            deck_size: 10,
            learn_span: 15,
            learn_limit: 10,
            first_rating_prob: [0.0, 0.0, 1.0, 0.0],
            review_rating_prob: [1.0, 0.0, 0.0, 0.0],
            ..Default::default()
        };
        let result = simulate(&config, &ReviewScheduler::default(), None)?;
        // every card is seen daily after day 0
        assert_eq!(result.learn_cnt_per_day[0], 10);
        for (day, (review, lapse)) in
            izip!(&result.review_cnt_per_day, &result.lapse_cnt_per_day).enumerate()
        {
            assert_eq!(review, lapse);
            assert_eq!(*review, if day == 0 { 0 } else { 10 });
        }
        assert_eq!(result.mastered_cnt_per_day[0], 10);
        assert_eq!(result.mastered_cnt_per_day[1], 0);
        assert!(result.cards.iter().all(|card| card.lapses == 14));
        Ok(())
    }

    #[test]
    fn interval_rule_masters_later() -> Result<()> {
        let config = SimulatorConfig {
            deck_size: 300,
            learn_span: 120,
            ..Default::default()
        };
        let by_quality = simulate(&config, &ReviewScheduler::default(), Some(3))?;
        let by_interval = simulate(
            &config,
            &ReviewScheduler::new(SchedulerConfig {
                mastery_rule: MasteryRule::IntervalThreshold { days: 30 },
                ..Default::default()
            })?,
            Some(3),
        )?;
        // identical grades and schedules, only the classification differs
        assert_eq!(by_quality.review_cnt_per_day, by_interval.review_cnt_per_day);
        assert!(by_quality.mastered_cnt_per_day[10] > by_interval.mastered_cnt_per_day[10]);
        assert_eq!(by_interval.mastered_cnt_per_day[0], 0);
        Ok(())
    }

    #[test]
    fn simulate_with_zero_cards() {
        let config = SimulatorConfig {
            deck_size: 0,
            ..Default::default()
        };
        assert!(simulate(&config, &ReviewScheduler::default(), None).is_err());
    }

    #[test]
    fn simulate_with_zero_learn_limit() -> Result<()> {
        let config = SimulatorConfig {
            learn_limit: 0,
            learn_span: 10,
            ..Default::default()
        };
        let result = simulate(&config, &ReviewScheduler::default(), None)?;
        assert!(result.cards.is_empty());
        assert_eq!(result.review_cnt_per_day, vec![0; 10]);
        Ok(())
    }

    #[test]
    fn simulate_with_bad_weights() {
        let config = SimulatorConfig {
            review_rating_prob: [0.0; 4],
            ..Default::default()
        };
        assert!(matches!(
            simulate(&config, &ReviewScheduler::default(), None),
            Err(SM2Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn seeds_run_independently() -> Result<()> {
        let config = SimulatorConfig {
            deck_size: 100,
            learn_span: 30,
            ..Default::default()
        };
        let scheduler = ReviewScheduler::default();
        let results = simulate_seeds(&config, &scheduler, &[1, 2, 1])?;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], results[2]);
        assert_eq!(results[0], simulate(&config, &scheduler, Some(1))?);
        Ok(())
    }
}
