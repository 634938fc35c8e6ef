use std::{error::Error, fs, time::Instant};

use adp::{
    algo::{AdpLearner, AdpLearnerConfig},
    decay,
    env::Environment,
    exploration::EpsilonGreedy,
    gym::{GridWorld, RewardTable},
};

const EPOCHS: usize = 1000;
const SEGMENTS: usize = 10;

fn main() -> Result<(), Box<dyn Error>> {
    let mut env = GridWorld::from_csv_reader(
        include_str!("world.csv").as_bytes(),
        RewardTable {
            step: -0.04,
            win: 10.0,
            lose: -2.5,
            blocked: -0.04,
        },
        0.2,
    )?;
    let start = env.state_from_pos((5, 3));

    let mut learner = AdpLearner::new(
        env.num_states(),
        env.num_actions(),
        AdpLearnerConfig {
            gamma: 0.9,
            exploration: EpsilonGreedy::new(decay::Geometric::new(0.99, 1.0, 0.0).unwrap()),
            tolerance: 1e-4,
            max_sweeps: 10_000,
        },
    );

    let mut rewards = Vec::with_capacity(EPOCHS);
    let mut wins = Vec::with_capacity(EPOCHS);
    let mut total_reward = 0.0;

    let training_start = Instant::now();
    for epoch in 0..EPOCHS {
        let summary = learner.go(&mut env, start)?;
        total_reward += summary.reward;
        rewards.push((summary.reward, total_reward));
        wins.push(summary.won);

        if (epoch + 1) % 100 == 0 {
            println!(
                "epoch {:4}: reward {:7.2}, total {:9.2}, epsilon {:.3}",
                epoch + 1,
                summary.reward,
                total_reward,
                learner.epsilon(),
            );
        }
    }
    println!("time used = {:?}", training_start.elapsed());
    println!("final reward = {total_reward}");

    let per_segment = EPOCHS / SEGMENTS;
    let win_rates = wins
        .chunks(per_segment)
        .map(|chunk| chunk.iter().filter(|&&w| w).count() as f64 / per_segment as f64)
        .collect::<Vec<_>>();
    println!("winning percentage per segment = {win_rates:?}");

    // Write data to CSV

    fs::create_dir_all("demos/adp_grid_world/out")?;

    let mut wtr = csv::Writer::from_path("demos/adp_grid_world/out/history.csv")?;
    wtr.write_record(["episode", "reward", "total_reward", "win"])?;
    for (i, ((reward, total), won)) in rewards.iter().zip(&wins).enumerate() {
        wtr.write_record([
            i.to_string(),
            reward.to_string(),
            total.to_string(),
            (*won as u8).to_string(),
        ])?;
    }
    wtr.flush()?;

    // Plot data

    std::process::Command::new("python")
        .arg("demos/adp_grid_world/plot.py")
        .spawn()?
        .wait()?;

    Ok(())
}
