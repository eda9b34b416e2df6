use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    cli::run_cli(paydesk_billing_migration::Migrator).await;
}
