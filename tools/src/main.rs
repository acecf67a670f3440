//! rm-runner: headless Monte Carlo runner for the railway revenue model.
//!
//! Usage:
//!   rm-runner --seed 42 --trials 100 --data-dir ./data
//!   rm-runner --seed 7 --trials 500 --json > result.json
//!   rm-runner --log          # also print the baseline execution log

use anyhow::Result;
use railrm_core::{
    config::{RmConfig, CONFIG_FILE},
    monte_carlo::{MonteCarloDriver, MonteCarloResult, RunEvent},
};
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].as_str())
        .unwrap_or("./data");
    let json_mode = args.iter().any(|a| a == "--json");
    let print_log = args.iter().any(|a| a == "--log");

    let mut config = if Path::new(data_dir).join(CONFIG_FILE).exists() {
        RmConfig::load(data_dir)?
    } else {
        log::warn!("{data_dir}/{CONFIG_FILE} not found; using reference configuration");
        RmConfig::reference()
    };
    config.settings.seed = parse_arg(&args, "--seed", config.settings.seed);
    config.settings.n_simulations = parse_arg(&args, "--trials", config.settings.n_simulations);

    if !json_mode {
        println!("Railway RM: rm-runner");
        println!("  seed:      {}", config.settings.seed);
        println!("  trials:    {}", config.settings.n_simulations);
        println!("  data_dir:  {data_dir}");
        println!("  classes:   {}", config.classes.len());
        println!();
    }

    let driver = MonteCarloDriver::new(&config)?;
    let result = driver.run(|event| {
        if json_mode {
            return;
        }
        match event {
            RunEvent::Status(msg) => println!("  {msg}"),
            RunEvent::Progress { completed, total } => {
                println!("  progress: {completed}/{total} trials")
            }
        }
    })?;

    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!();
    print_summary(&result);
    if print_log {
        println!();
        println!("=== BASELINE LOG ===");
        print!("{}", result.baseline_log);
    }
    Ok(())
}

fn print_summary(result: &MonteCarloResult) {
    println!("=== RUN SUMMARY ===");
    println!("  trials:         {}", result.n_simulations);
    println!("  seed:           {}", result.seed);
    println!("  baseline:       {:.2}", result.baseline_revenue);
    println!("  mean revenue:   {:.2}", result.mean_revenue);
    println!("  std dev:        {:.2}", result.std_dev);
    println!("  min / max:      {:.2} / {:.2}", result.min_revenue, result.max_revenue);
    println!(
        "  p10 / p50 / p90: {:.2} / {:.2} / {:.2}",
        result.p10_revenue, result.p50_revenue, result.p90_revenue
    );
    println!("  mean accepted:  {:.1}", result.mean_accepted);
    println!("  mean rejected:  {:.1}", result.mean_rejected);

    println!();
    println!("=== BASELINE BREAKDOWN ===");
    for class in &result.baseline_breakdown {
        println!(
            "  {} | sold {}/{} ({:.1}%) | revenue {:.2} | rejected {}",
            class.class,
            class.seats_sold,
            class.capacity,
            class.load_factor * 100.0,
            class.revenue,
            class.rejected
        );
        for quota in &class.quotas {
            let buckets: Vec<String> = quota
                .bucket_names
                .iter()
                .zip(&quota.sold)
                .zip(&quota.allocated)
                .map(|((name, sold), alloc)| format!("{name} {sold}/{alloc}"))
                .collect();
            println!(
                "      {:<3} revenue {:>10.2} | {}",
                quota.quota,
                quota.revenue,
                buckets.join(", ")
            );
        }
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
