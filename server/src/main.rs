use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::Server;
use server::room::SpawnStrategy;
use server::session::RoomConfig;
use shared::{WorldBounds, DEFAULT_BOUND, DEFAULT_GROUND_Y};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "3001")]
    port: u16,

    /// Half extent of the square play area
    #[arg(long, default_value_t = DEFAULT_BOUND)]
    bound: f32,

    /// Height every entity is kept at
    #[arg(long, default_value_t = DEFAULT_GROUND_Y, allow_hyphen_values = true)]
    ground_y: f32,

    /// Maximum connections per room
    #[arg(long, default_value = "64")]
    max_clients: usize,

    /// Where new entities appear
    #[arg(long, value_enum, default_value_t = SpawnStrategy::Origin)]
    spawn: SpawnStrategy,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = ServerConfig {
        address: format!("{}:{}", args.host, args.port),
        room: RoomConfig {
            bounds: WorldBounds::new(args.bound, args.ground_y)?,
            spawn: args.spawn,
            max_clients: args.max_clients,
        },
    };
    info!("Starting server with {:?}", config);

    let server = Server::bind(config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
