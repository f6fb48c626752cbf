//! Recompute labeling for products from the command line
//! Usage: cargo run --bin batch_labeling -- [product_id ...]
//!
//! Without ids, every product with labeling enabled is processed.

use tracing_subscriber::EnvFilter;

use mrp_labeling::{config, db, tools};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mrp_labeling=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let ids = std::env::args()
        .skip(1)
        .map(|arg| {
            arg.parse::<i64>()
                .map_err(|_| format!("Not a product id: '{}'", arg))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let db_path = config::database_path();
    println!("Database: {}", db_path.display());

    let database = db::Database::new(&db_path)?;
    database.with_conn(|conn| db::migrations::run_migrations(conn))?;

    let report = tools::labeling::batch_labeling(&database, config::labeling_options(), ids)?;

    for item in &report.succeeded {
        println!(
            "  OK   {:>6}  {:<40} {:>10.2} g  {:>+8.2}%",
            item.product_id, item.product_name, item.calculated_norm_weight, item.deviation
        );
    }
    for failure in &report.failed {
        println!(
            "  FAIL {:>6}  {:<40} [{}] {}",
            failure.product_id.0, failure.product_name, failure.kind, failure.message
        );
    }

    println!(
        "\nProcessed {} products: {} labeled, {} failed",
        report.processed,
        report.succeeded.len(),
        report.failed.len()
    );

    if report.failed.is_empty() {
        Ok(())
    } else {
        std::process::exit(1)
    }
}
