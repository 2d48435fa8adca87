use frontier_life::{Config, NaiveEngine, NiceInt, Simulation};
use std::time::Instant;

const TICKS: u64 = 20;

fn main() {
    let mut args = std::env::args().skip(1).map(|arg| arg.parse::<usize>().ok());
    let side = args.next().flatten().unwrap_or(Config::DEFAULT_SIDE);
    let settle = args.next().flatten().unwrap_or(200);

    let timer = Instant::now();
    let seed = Some(Config::DEFAULT_SEED);
    let mut frontier = Simulation::random(side, side, Config::DEFAULT_FILL_RATE, seed).unwrap();
    let mut naive = Simulation::random(side, side, Config::DEFAULT_FILL_RATE, seed)
        .unwrap()
        .with_engine(NaiveEngine);
    println!("Time to seed {}x{} twice: {:?}", side, side, timer.elapsed());

    for simulation in [&mut frontier, &mut naive] {
        let timer = Instant::now();
        for _ in 0..TICKS {
            simulation.step().unwrap();
        }
        println!(
            "{:>8}: {:?} per tick, population {}, frontier {}",
            simulation.engine_name(),
            timer.elapsed() / TICKS as u32,
            NiceInt::from(simulation.population()),
            NiceInt::from_usize(simulation.frontier().len()),
        );
    }
    assert!(frontier.grid() == naive.grid(), "engines diverged");

    // most of a soup settles into still lifes; only the frontier engine profits
    for _ in 0..settle {
        frontier.step().unwrap();
    }
    let timer = Instant::now();
    for _ in 0..TICKS {
        frontier.step().unwrap();
    }
    println!(
        "{:>8}: {:?} per tick after {} more ticks, frontier {}",
        frontier.engine_name(),
        timer.elapsed() / TICKS as u32,
        settle,
        NiceInt::from_usize(frontier.frontier().len()),
    );
}
