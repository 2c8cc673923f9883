use clap::Parser;
use log::{info, Level, Metadata, Record};
use sourcon::{client::Client, config::with_default_port};
use std::error::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    signal,
};

struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{} - {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Basic RCON CLI interface
#[derive(Parser, Debug)]
#[command(name = "sourcon", version, about)]
struct Cli {
    /// Remote host, host:port format
    #[arg(short = 'H', long, env = "RCON_HOST", default_value = "localhost:27015")]
    host: String,

    /// RCON password
    #[arg(short, long, env = "RCON_PASSWORD", hide_env_values = true)]
    password: String,

    /// Log more (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Command to run once. Starts a prompt when left out.
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::Info,
        1 => Level::Debug,
        _ => Level::Trace,
    };
    let _ = log::set_logger(&SimpleLogger).map(|()| log::set_max_level(level.to_level_filter()));

    if cli.password.is_empty() {
        return Err("password cannot be empty".into());
    }

    let host = with_default_port(&cli.host);
    let client = Client::connect(&host, &cli.password).await?;

    let command = cli.command.join(" ");
    if !command.is_empty() {
        let response = client.exec(&command).await?;
        println!("{}", response.body());
        return Ok(client.close().await?);
    }

    tokio::select!(
        res = repl(&client) => res?,
        _ = signal::ctrl_c() => {}
    );

    info!("bye");
    Ok(client.close().await?)
}

async fn repl(client: &Client) -> Result<(), Box<dyn Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"rcon> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            stdout.write_all(b"\n").await?;
            return Ok(());
        };

        let command = line.trim().to_lowercase();
        match command.as_str() {
            "" => continue,
            "quit" | "exit" => {
                info!("exiting (user initiated)");
                return Ok(());
            }
            _ => {}
        }

        let response = client.exec(&command).await?;
        stdout.write_all(response.body().as_bytes()).await?;
        if !response.body().ends_with('\n') {
            stdout.write_all(b"\n").await?;
        }
    }
}
