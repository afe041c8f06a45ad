use clap::Parser;
use client::input::InputManager;
use client::interpolation::Interpolator;
use client::network::{run_session, Client};
use client::rendering::{RenderEntity, Renderer, StatusLine};
use client::shadow::{self, SharedShadow, ShadowState};
use log::{error, info};
use macroquad::prelude::*;
use shared::{Packet, WorldBounds, DEFAULT_BOUND, DEFAULT_GROUND_Y, INTERPOLATION_FACTOR};
use std::thread;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:3001")]
    server: String,

    /// Room to join (created if it does not exist)
    #[arg(short = 'r', long, default_value = "my_room")]
    room: String,

    /// Fraction of the remaining distance covered per frame
    #[arg(long, default_value_t = INTERPOLATION_FACTOR)]
    smoothing: f32,

    /// Half extent of the play area, must match the server
    #[arg(long, default_value_t = DEFAULT_BOUND)]
    bound: f32,

    /// Window width
    #[arg(short = 'w', long, default_value = "800")]
    width: i32,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "600")]
    height: i32,
}

fn window_conf() -> Conf {
    let args = Args::parse();
    Conf {
        window_title: "Shared World".to_owned(),
        window_width: args.width,
        window_height: args.height,
        ..Default::default()
    }
}

/// Runs the network session on its own runtime so the window thread only
/// ever touches the shared shadow state.
fn spawn_network(
    address: String,
    room: String,
    shadow: SharedShadow,
    outbox: mpsc::UnboundedReceiver<Packet>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                error!("Failed to start network runtime: {}", e);
                return;
            }
        };

        match runtime.block_on(run_session(address, room, shadow, outbox)) {
            Ok(()) => info!("Disconnected"),
            Err(e) => error!("Session ended: {}", e),
        }
    })
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let bounds = match WorldBounds::new(args.bound, DEFAULT_GROUND_Y) {
        Ok(bounds) => bounds,
        Err(e) => {
            error!("Invalid --bound: {}", e);
            return;
        }
    };

    info!("Connecting to {} (room {})", args.server, args.room);

    let shadow = ShadowState::shared();
    let (client, outbox) = Client::new(shadow.clone(), bounds);
    let network = spawn_network(args.server.clone(), args.room.clone(), shadow.clone(), outbox);

    let interpolator = Interpolator::new(args.smoothing);
    let mut renderer = Renderer::new(bounds);
    let mut input = InputManager::new();

    loop {
        if is_key_pressed(KeyCode::Escape) {
            break;
        }

        if let Some(target) = input.update(&renderer.view(), &bounds) {
            client.request_move(target);
        }

        let (entities, local_id) = {
            let mut shadow = shadow::lock(&shadow);
            interpolator.tick(&mut shadow);
            let entities: Vec<RenderEntity> = shadow
                .iter()
                .map(|(id, entity)| RenderEntity {
                    id,
                    position: entity.current,
                    is_self: entity.is_self,
                })
                .collect();
            (entities, shadow.local_id())
        };

        renderer.render(
            &entities,
            &StatusLine {
                room: args.room.clone(),
                local_id,
                connected: !network.is_finished(),
            },
        );

        next_frame().await;
    }

    client.leave();
}
