//! A minimal interactive shell over the client API, for manual testing
//! against a running server.

use anyhow::{bail, Context, Result};
use clap::Parser;
use ledgerd::Client;
use std::io::{self, BufRead, Write};

/// Interactive client shell for ledgerd.
#[derive(Parser, Debug)]
struct Cli {
    /// Server host.
    #[arg(default_value = "127.0.0.1")]
    host: String,

    /// Server port.
    #[arg(default_value_t = 12345)]
    port: u16,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let client = Client::connect((cli.host.as_str(), cli.port))
        .with_context(|| format!("failed to connect to {}:{}", cli.host, cli.port))?;

    let stdin = io::stdin();
    print!("ledgerd> ");
    io::stdout().flush().ok();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            print!("ledgerd> ");
            io::stdout().flush().ok();
            continue;
        }
        match run_command(&client, line) {
            Ok(()) => {}
            Err(e) => println!("error: {e}"),
        }
        print!("ledgerd> ");
        io::stdout().flush().ok();
    }
    Ok(())
}

fn run_command(client: &Client, line: &str) -> Result<()> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["register", user, pass] => {
            let created = client.register(user, pass)?;
            println!("{}", if created { "created" } else { "already exists" });
        }
        ["login", user, pass] => {
            let ok = client.login(user, pass)?;
            println!("{}", if ok { "ok" } else { "denied" });
        }
        ["add", product, qty, price] => {
            client.add_event(product, qty.parse()?, price.parse()?)?;
            println!("ok");
        }
        ["newday"] => {
            client.new_day()?;
            println!("ok");
        }
        ["aggr", kind, product, days] => {
            let days: i32 = days.parse()?;
            let result = match *kind {
                "qty" => client.aggregate_qty(product, days)?,
                "vol" => client.aggregate_volume(product, days)?,
                "avg" => client.aggregate_avg(product, days)?,
                "max" => client.aggregate_max(product, days)?,
                other => bail!("unknown aggregate kind: {other}"),
            };
            println!("{result}");
        }
        ["filter", day, products @ ..] => {
            let products: Vec<String> = products.iter().map(|s| s.to_string()).collect();
            let sales = client.filter(day.parse()?, &products)?;
            for sale in sales {
                println!("{}\t{}\t{}", sale.product, sale.quantity, sale.price);
            }
        }
        ["waitsimul", p1, p2] => {
            let satisfied = client.wait_simultaneous(p1, p2)?;
            println!("{}", if satisfied { "satisfied" } else { "day ended" });
        }
        ["waitconsec", n] => match client.wait_consecutive(n.parse()?)? {
            Some(product) => println!("{product}"),
            None => println!("day ended"),
        },
        ["day"] => println!("{}", client.get_current_day()?),
        other => bail!("unrecognized command: {other:?}"),
    }
    Ok(())
}
