use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;

use kiosk_atm::{Money, open_db, seed_account};

/// A utility for registering the demonstration cards in a kiosk_atm database.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the SQLite database, created if it does not exist.
    #[arg(long, short)]
    db_path: String,
}

/// (name, tag, balance in cents, PIN) for each demonstration card.
const DEMO_CARDS: [(&str, &str, i64, &str); 2] = [
    ("Jomar", "49375347824", 500_00, "1234"),
    ("User2", "983933453559", 300_00, "5678"),
];

/// Register the demonstration cards, leaving existing cards untouched.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let db_path = Path::new(&args.db_path);

    match db_path.extension() {
        Some(extension) if !extension.is_empty() => {}
        _ => {
            eprintln!("Database path must include a file extension (e.g., 'atm.db').");
            exit(1);
        }
    }

    println!("Opening database at {db_path:#?}");
    let conn = open_db(db_path)?;

    for (name, tag, cents, pin) in DEMO_CARDS {
        if seed_account(tag, name, Money::from_cents(cents), pin, &conn)? {
            println!("Added card {tag} for {name}");
        } else {
            println!("Card {tag} is already registered, skipping");
        }
    }

    println!("Success!");

    Ok(())
}
