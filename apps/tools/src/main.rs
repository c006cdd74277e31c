use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use shared::domain::ScanId;
use storage::{Storage, StoredScan};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/scans.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    CreateScan {
        image_url: String,
        #[arg(long)]
        user_id: Option<String>,
    },
    ShowScan {
        scan_id: String,
    },
    ListScans {
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

fn print_scan(scan: &StoredScan) {
    let prediction = match (&scan.prediction_label, scan.prediction_score) {
        (Some(label), Some(score)) => format!("{label} ({score:.2})"),
        (Some(label), None) => label.clone(),
        _ => "-".to_string(),
    };
    println!(
        "{} {} status={} prediction={} image={}",
        scan.scan_id,
        scan.created_at.format("%Y-%m-%d %H:%M:%S"),
        scan.status.as_str(),
        prediction,
        scan.image_url
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::CreateScan { image_url, user_id } => {
            let scan_id = storage.create_scan(user_id.as_deref(), &image_url).await?;
            println!("created scan_id={scan_id}");
        }
        Command::ShowScan { scan_id } => {
            let Some(scan) = storage.get_scan(&ScanId::new(scan_id.clone())).await? else {
                bail!("scan {scan_id} not found");
            };
            print_scan(&scan);
            if let Some(probs) = &scan.prediction_json {
                for (class, prob) in probs {
                    println!("  {class}: {prob:.4}");
                }
            }
        }
        Command::ListScans { user_id, limit } => {
            for scan in storage.list_scans(user_id.as_deref(), limit).await? {
                print_scan(&scan);
            }
        }
    }

    Ok(())
}
