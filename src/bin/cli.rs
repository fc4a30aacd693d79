//! beanwire CLI Client
//!
//! Command-line interface for interacting with a beanstalkd server.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use beanwire::client::Client;
use beanwire::config::DEFAULT_SERVER_ADDR;
use beanwire::protocol::{Job, Stats};
use beanwire::{Config, Result};

/// beanwire CLI
#[derive(Parser, Debug)]
#[command(name = "beanwire-cli")]
#[command(about = "CLI for beanstalkd work queues")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = DEFAULT_SERVER_ADDR)]
    server: String,

    /// Tube to use (for put) and watch (for reserve)
    #[arg(short, long)]
    tube: Option<String>,

    /// Connect timeout in milliseconds
    #[arg(long, default_value = "5000")]
    connect_timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Queue a job
    Put {
        /// Job body
        body: String,

        #[arg(short, long, default_value = "1024")]
        priority: u32,

        #[arg(short, long, default_value = "0")]
        delay: u32,

        /// Seconds a worker may hold the job
        #[arg(long, default_value = "60")]
        ttr: u32,
    },

    /// Reserve a job
    Reserve {
        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u32>,
    },

    /// Delete a job
    Delete { id: u64 },

    /// Bury a job
    Bury {
        id: u64,

        #[arg(short, long, default_value = "1024")]
        priority: u32,
    },

    /// Kick buried or delayed jobs
    Kick { bound: u64 },

    /// Show a job by id
    Peek { id: u64 },

    /// Show the next ready job
    PeekReady,

    /// Server statistics
    Stats,

    /// Tube statistics
    StatsTube { name: String },

    /// Job statistics
    StatsJob { id: u64 },

    /// List existing tubes
    ListTubes,

    /// Pause a tube for some seconds
    PauseTube { name: String, delay: u32 },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,beanwire=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = Config::builder()
        .server_addr(&args.server)
        .connect_timeout_ms(args.connect_timeout_ms)
        .build();

    let client = Client::connect(config)?;

    if let Some(tube) = &args.tube {
        match &args.command {
            Commands::Reserve { .. } => {
                client.watch(tube)?;
                if tube != "default" {
                    client.ignore("default")?;
                }
            }
            _ => {
                client.use_tube(tube)?;
            }
        }
    }

    match args.command {
        Commands::Put { body, priority, delay, ttr } => {
            let id = client.put(priority, delay, ttr, body.into_bytes())?;
            println!("INSERTED {}", id);
        }
        Commands::Reserve { timeout } => {
            let job = match timeout {
                Some(seconds) => client.reserve_with_timeout(seconds)?,
                None => client.reserve()?,
            };
            print_job(&job);
        }
        Commands::Delete { id } => {
            client.delete(id)?;
            println!("DELETED {}", id);
        }
        Commands::Bury { id, priority } => {
            client.bury(id, priority)?;
            println!("BURIED {}", id);
        }
        Commands::Kick { bound } => {
            println!("KICKED {}", client.kick(bound)?);
        }
        Commands::Peek { id } => print_job(&client.peek(id)?),
        Commands::PeekReady => print_job(&client.peek_ready()?),
        Commands::Stats => print_stats(&client.stats()?),
        Commands::StatsTube { name } => print_stats(&client.stats_tube(&name)?),
        Commands::StatsJob { id } => print_stats(&client.stats_job(id)?),
        Commands::ListTubes => {
            for tube in client.list_tubes()? {
                println!("{}", tube);
            }
        }
        Commands::PauseTube { name, delay } => {
            client.pause_tube(&name, delay)?;
            println!("PAUSED {} for {}s", name, delay);
        }
    }

    client.quit()
}

fn print_job(job: &Job) {
    println!("id: {}", job.id);
    println!("{}", String::from_utf8_lossy(&job.body));
}

fn print_stats(stats: &Stats) {
    for (key, value) in stats.iter() {
        println!("{}: {}", key, value);
    }
}
