//! CLI inspection entry point.
//!
//! # Responsibility
//! - Open the store configured by `MYDISHES_*` environment variables.
//! - Print the core version and a one-line summary per stored dish.

use log::error;
use mydishes_core::{core_version, init_logging, CoreConfig, DishRepository};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = CoreConfig::from_env();
    if let Some(log_dir) = &config.log_dir {
        if let Err(err) = init_logging(&config.log_level, log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    println!("mydishes_core version={}", core_version());
    println!("db_path={}", config.db_path.display());

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error_code={}", err.kind());
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &CoreConfig) -> mydishes_core::RepoResult<()> {
    let repository = DishRepository::open(config)?;
    let dishes = repository.get_all_dishes_with_details().wait()?;

    println!("dishes={}", dishes.len());
    for dish in dishes {
        let nutrition = dish.nutrition.unwrap_or_default();
        println!(
            "{}\t{}\tproducts={}\tmass={:.1}g\tkcal={:.2}\tprotein={:.2}\tfat={:.2}\tcarb={:.2}",
            dish.id,
            dish.name.as_deref().unwrap_or("<unnamed>"),
            dish.products.len(),
            dish.total_mass(),
            nutrition.calories,
            nutrition.protein,
            nutrition.fat,
            nutrition.carb,
        );
    }
    Ok(())
}
