//! Performance benchmarks for the hot paths of a room

use assert_approx_eq::assert_approx_eq;
use client::interpolation::Interpolator;
use client::shadow::ShadowState;
use server::publisher::Outbox;
use server::session::{RoomConfig, RoomMessage, RoomSession};
use shared::{read_packet, write_packet, Packet, Position, PublicationEvent, WorldBounds};
use std::time::Instant;
use tokio::sync::mpsc;

/// Benchmarks bounds clamping
#[test]
fn benchmark_clamp() {
    let bounds = WorldBounds::default();
    let iterations = 100_000;
    let start = Instant::now();

    for i in 0..iterations {
        let offset = (i % 1000) as f32;
        let _ = bounds.clamp(Position::new(offset - 500.0, offset, 500.0 - offset));
    }

    let duration = start.elapsed();
    println!(
        "Clamp: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 100ms for 100k iterations
    assert!(duration.as_millis() < 100);
}

/// Benchmarks fan-out of move intents to a full room
#[test]
fn benchmark_broadcast() {
    let config = RoomConfig::default();
    let mut session = RoomSession::new("bench", &config);
    let mut receivers = Vec::new();

    for id in 1..=config.max_clients as u32 {
        let (outbox, rx): (Outbox, _) = mpsc::unbounded_channel();
        session.handle(RoomMessage::Opened { id, outbox });
        receivers.push(rx);
    }

    let intents = 1_000;
    let start = Instant::now();

    for i in 0..intents {
        let id = (i % config.max_clients) as u32 + 1;
        session.handle(RoomMessage::PacketReceived {
            id,
            packet: Packet::move_intent(Position::new(i as f32, 0.0, -(i as f32))),
        });
    }

    let duration = start.elapsed();
    println!(
        "Broadcast: {} intents to {} clients in {:?} ({:.2} μs/intent)",
        intents,
        config.max_clients,
        duration,
        duration.as_micros() as f64 / intents as f64
    );

    // Every client saw every move
    for rx in receivers.iter_mut() {
        let mut moves = 0;
        while let Ok(packet) = rx.try_recv() {
            if let Packet::Event(PublicationEvent::EntityChanged { .. }) = packet {
                moves += 1;
            }
        }
        assert_eq!(moves, intents);
    }

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks joining a crowded room, where each join sends a full snapshot
#[test]
fn benchmark_join_snapshot() {
    let clients = 256;
    let config = RoomConfig {
        max_clients: clients,
        ..RoomConfig::default()
    };
    let mut session = RoomSession::new("bench", &config);
    let mut receivers = Vec::new();

    let start = Instant::now();

    for id in 1..=clients as u32 {
        let (outbox, rx) = mpsc::unbounded_channel();
        session.handle(RoomMessage::Opened { id, outbox });
        receivers.push(rx);
    }

    let duration = start.elapsed();
    println!("Join snapshot: {} joins in {:?}", clients, duration);

    assert_eq!(session.len(), clients);

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks smoothing a crowded shadow state
#[test]
fn benchmark_interpolation() {
    let mut shadow = ShadowState::new();
    let entities = 1_000;
    for id in 0..entities {
        shadow.apply(&PublicationEvent::EntityAdded {
            id,
            position: Position::ORIGIN,
            is_self: false,
        });
        shadow.apply(&PublicationEvent::EntityChanged {
            id,
            position: Position::new(100.0, 0.0, 0.0),
        });
    }

    let interpolator = Interpolator::default();
    let frames = 100;
    let start = Instant::now();

    for _ in 0..frames {
        interpolator.tick(&mut shadow);
    }

    let duration = start.elapsed();
    println!(
        "Interpolation: {} frames of {} entities in {:?} ({:.2} μs/frame)",
        frames,
        entities,
        duration,
        duration.as_micros() as f64 / frames as f64
    );

    // 100 * (1 - 0.95^100)
    assert_approx_eq!(shadow.get(0).unwrap().current.x, 99.408, 0.01);

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks framing a burst of events through the codec
#[test]
fn benchmark_codec() {
    let packets = 10_000;
    let mut buffer = Vec::new();

    let start = Instant::now();

    tokio_test::block_on(async {
        for id in 0..packets {
            let packet = Packet::Event(PublicationEvent::EntityChanged {
                id,
                position: Position::new(id as f32, -1.0, 0.0),
            });
            write_packet(&mut buffer, &packet).await.unwrap();
        }

        let mut reader = buffer.as_slice();
        let mut decoded = 0;
        while let Some(_) = read_packet(&mut reader).await.unwrap() {
            decoded += 1;
        }
        assert_eq!(decoded, packets);
    });

    let duration = start.elapsed();
    println!(
        "Codec: {} packets written and read in {:?} ({:.2} μs/packet)",
        packets,
        duration,
        duration.as_micros() as f64 / packets as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}
