mod check;
mod cli;
mod infra;
mod routes;
mod server;

use ad_compliance::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
