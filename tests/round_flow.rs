use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;

use gridrush::config::RoomConfig;
use gridrush::dict::Dictionary;
use gridrush::error::SubmitError;
use gridrush::events::{Event, EventBus};
use gridrush::game::{solve_grid, Grid, ScoreRules};
use gridrush::room::RoomManager;
use gridrush::search::RoundKind;
use gridrush::worker::SearchPool;

const WORDS: &[&str] = &[
    "ate", "eat", "tea", "sea", "see", "set", "net", "ten", "tan", "ant", "rat",
    "tar", "art", "ear", "era", "are", "air", "ria", "sir", "its", "sit", "tis",
    "son", "nos", "ton", "not", "note", "tone", "rose", "sore", "eros", "ores",
    "rate", "tare", "tear", "near", "earn", "nest", "sent", "tens", "rent",
    "lane", "lean", "real", "sale", "seal", "tale", "late", "east", "seat",
    "teas", "oats", "toes", "nose", "ones", "line", "lien", "nile", "ride",
    "dire", "dear", "read", "dare", "aide", "idea", "side", "dies", "ties",
    "tide", "diet", "edit", "site", "rise", "sire", "ires", "oar", "ore", "roe",
    "toe", "tie", "die", "lie", "lei", "ale", "lea", "eel", "lee", "ole", "ode",
    "doe", "den", "end", "ned", "red", "rid", "nod", "don", "dot", "tod", "tin",
    "nit", "pin", "nip", "pen", "pea", "ape", "nap", "pan", "par", "rap", "tap",
    "pat", "apt", "sap", "spa", "asp", "ins", "sin", "is", "relates", "entires",
];

fn fast_room() -> RoomConfig {
    RoomConfig {
        id: "test".to_string(),
        label: "Test 4x4".to_string(),
        grid_size: 4,
        round_ms: 500,
        break_ms: 150,
        min_words: 1,
        special_every: 0,
        special_kinds: [RoundKind::Speed, RoundKind::TargetLong],
    }
}

async fn next_matching<F, T>(rx: &mut broadcast::Receiver<Event>, mut pick: F) -> T
where
    F: FnMut(Event) -> Option<T>,
{
    timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(found) = pick(event) {
                        return found;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

#[tokio::test]
async fn test_full_round_lifecycle() {
    let dict = Arc::new(Dictionary::from(WORDS.to_vec()));
    let pool = SearchPool::spawn(dict.clone());
    let events = EventBus::new(1024);
    let mut rx = events.subscribe();

    let manager = RoomManager::start(vec![fast_room()], dict.clone(), pool, events.clone());
    let room = manager.get("test").expect("room exists");
    room.join("alice".to_string()).await;

    // first round goes live
    let (round_id, grid): (String, Grid) = next_matching(&mut rx, |event| match event {
        Event::RoundStarted {
            round_id,
            round_number,
            grid,
            ..
        } if round_number == 1 => Some((round_id, grid)),
        _ => None,
    })
    .await;

    // the broadcast grid is the same ground truth the room scores against
    let solved = solve_grid(&grid, &dict, &ScoreRules::Standard);
    let (word, expected) = solved
        .iter()
        .max_by_key(|(_, s)| s.points)
        .map(|(w, s)| (w.clone(), s.points))
        .expect("generated grid has at least one playable word");

    let outcome = manager
        .submit("test", round_id.clone(), "alice".to_string(), word.clone())
        .await
        .expect("submission accepted");
    assert_eq!(outcome.word, word);
    assert_eq!(outcome.word_score, expected);
    assert_eq!(outcome.total_score, expected);

    // ranking reflects the accepted word
    let ranking = next_matching(&mut rx, |event| match event {
        Event::RankingUpdate { ranking, .. } => Some(ranking),
        _ => None,
    })
    .await;
    assert_eq!(ranking[0].nick, "alice");
    assert_eq!(ranking[0].rank, 1);

    // the same word again is rejected and the score stays put
    let err = manager
        .submit("test", round_id.clone(), "alice".to_string(), word.clone())
        .await
        .unwrap_err();
    assert_eq!(err, SubmitError::AlreadyPlayed);

    // a garbage word is rejected
    let err = manager
        .submit("test", round_id.clone(), "alice".to_string(), "zzzzzz".to_string())
        .await
        .unwrap_err();
    assert_eq!(err, SubmitError::InvalidWord);

    // the round ends on its own with alice's result
    let results = next_matching(&mut rx, |event| match event {
        Event::RoundEnded { results, .. } => Some(results),
        _ => None,
    })
    .await;
    assert_eq!(results[0].nick, "alice");
    assert_eq!(results[0].score, expected);
    assert_eq!(results[0].words, vec![word.clone()]);

    // submissions against the finished round are stale now
    let err = manager
        .submit("test", round_id.clone(), "alice".to_string(), "tea".to_string())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SubmitError::RoundInvalid | SubmitError::NoRoundSubs
    ));

    // break, then the next round starts with a fresh id
    next_matching(&mut rx, |event| match event {
        Event::BreakStarted { .. } => Some(()),
        _ => None,
    })
    .await;

    let second_round = next_matching(&mut rx, |event| match event {
        Event::RoundStarted {
            round_id,
            round_number,
            ..
        } if round_number == 2 => Some(round_id),
        _ => None,
    })
    .await;
    assert_ne!(second_round, round_id);
}

#[tokio::test]
async fn test_rooms_tick_independently() {
    let dict = Arc::new(Dictionary::from(WORDS.to_vec()));
    let pool = SearchPool::spawn(dict.clone());
    let events = EventBus::new(1024);
    let mut rx = events.subscribe();

    let mut second = fast_room();
    second.id = "other".to_string();
    second.grid_size = 5;
    let manager = RoomManager::start(
        vec![fast_room(), second],
        dict.clone(),
        pool,
        events.clone(),
    );
    assert_eq!(manager.iter().count(), 2);

    let mut seen_test = false;
    let mut seen_other = false;
    while !(seen_test && seen_other) {
        let room_id = next_matching(&mut rx, |event| match event {
            Event::RoundStarted { room_id, .. } => Some(room_id),
            _ => None,
        })
        .await;
        match room_id.as_str() {
            "test" => seen_test = true,
            "other" => seen_other = true,
            other => panic!("unexpected room {other}"),
        }
    }
}
