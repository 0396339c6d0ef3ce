use std::{error::Error, sync::Arc};

use chrono::{DateTime, Utc};
use chrono_tz::Asia::Ho_Chi_Minh;
use clap::{Args, Parser, Subcommand};
use engine::{Inventory, QrGenerator, Shop, store::GistStore};

#[derive(Parser, Debug)]
#[command(name = "shop_admin")]
#[command(about = "Admin utilities for the VietQR shop (orders and stock)")]
struct Cli {
    /// Gist holding the shop documents (also read from `GIST_ID`).
    #[arg(long, env = "GIST_ID")]
    gist_id: String,

    /// GitHub token with gist scope (also read from `GIST_TOKEN`).
    #[arg(long, env = "GIST_TOKEN", hide_env_values = true)]
    gist_token: String,

    #[arg(long, env = "BANK_ID", default_value = "970436")]
    bank_id: String,

    #[arg(long, env = "BANK_ACCOUNT", default_value = "")]
    bank_account: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List orders waiting for payment.
    Pending,
    /// List completed orders.
    Orders,
    Stock(Stock),
    /// Fulfil an order as paid in full, without chat notifications.
    Confirm { code: String },
}

#[derive(Args, Debug)]
struct Stock {
    #[command(subcommand)]
    command: StockCommand,
}

#[derive(Subcommand, Debug)]
enum StockCommand {
    /// Credentials left per package.
    Show,
    /// Append credentials to a package list.
    Add(StockAddArgs),
}

#[derive(Args, Debug)]
struct StockAddArgs {
    /// `free` or `shop`.
    #[arg(long)]
    inventory: Inventory,
    #[arg(long)]
    package: String,
    #[arg(required = true)]
    credentials: Vec<String>,
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Ho_Chi_Minh)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let store = GistStore::new(&cli.gist_id, &cli.gist_token)?;
    let shop = Shop::builder()
        .store(Arc::new(store))
        .qr(QrGenerator::new(&cli.bank_id, &cli.bank_account))
        .build()?;

    match cli.command {
        Command::Pending => {
            let orders = shop.pending_orders().await?;
            if orders.is_empty() {
                println!("no pending orders");
            }
            for order in orders {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    order.payment_code,
                    order.status.as_str(),
                    local_time(order.created_at),
                    order.username.as_deref().unwrap_or("-"),
                    order.info
                );
            }
        }
        Command::Orders => {
            let orders = shop.completed_orders().await?;
            if orders.is_empty() {
                println!("no completed orders");
            }
            for (user_id, order) in orders {
                println!(
                    "{user_id}\t{}\t{}\t{}\t{}",
                    order.payment_code,
                    order.amount,
                    local_time(order.paid_at),
                    order.credential.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Stock(Stock {
            command: StockCommand::Show,
        }) => {
            for inventory in [Inventory::Shop, Inventory::Free] {
                println!("[{inventory}]");
                for (package, count) in shop.stock_levels(inventory).await? {
                    println!("{package}\t{count}");
                }
            }
        }
        Command::Stock(Stock {
            command: StockCommand::Add(args),
        }) => {
            let level = shop
                .restock(args.inventory, &args.package, args.credentials)
                .await?;
            println!("{} {}: {level} left", args.inventory, args.package);
        }
        Command::Confirm { code } => {
            let fulfillment = shop.confirm(&code).await?;
            println!(
                "fulfilled {} for user {}",
                fulfillment.order.payment_code, fulfillment.user_id
            );
            match (&fulfillment.order.credential, fulfillment.stock_out) {
                (Some(credential), _) => println!("credential: {credential}"),
                (None, true) => {
                    eprintln!("no {} credential left, send one by hand", fulfillment.order.package)
                }
                (None, false) => {}
            }
        }
    }

    Ok(())
}
