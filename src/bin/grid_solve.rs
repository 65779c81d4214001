use std::env;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_seeder::Seeder;
use tracing::info;

use gridrush::config::ServerConfig;
use gridrush::dict::Dictionary;
use gridrush::game::board::Grid;
use gridrush::search::GridSearch;

/// Offline grid analysis: generate the grid a string seed maps to, solve it
/// against the wordlist and print the most rewarding words.
fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = env::args().skip(1);
    let seed = args.next().unwrap_or_else(|| "gridrush".to_string());
    let size: usize = args.next().map(|s| s.parse()).transpose()?.unwrap_or(4);

    let config = ServerConfig::from_env();
    info!("Loading dictionary from {:?}", config.wordlist);
    let dict = Arc::new(Dictionary::load_or_empty(&config.wordlist));

    let rng_seed: [u8; 32] = Seeder::from(seed.as_str()).make_seed();
    let mut rng = StdRng::from_seed(rng_seed);
    let mut grid = Grid::sample(size, &mut rng);
    grid.place_bonuses(&mut rng);

    let (solved, quality) = GridSearch::new(dict).analyze(&grid);

    println!("seed {:?}, {}x{} grid:", seed, size, size);
    println!("{}", grid);
    println!(
        "{} words, longest {}, total score {}",
        quality.words, quality.longest, quality.total_score
    );

    let mut ranked: Vec<(&String, u32)> = solved.iter().map(|(w, s)| (w, s.points)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    for (word, points) in ranked.into_iter().take(15) {
        println!("{:>4}  {}", points, word);
    }

    Ok(())
}
