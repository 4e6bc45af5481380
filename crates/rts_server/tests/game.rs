//! Full server over loopback TCP: lobby, hand-off, ticks, mirrors.

use std::time::Duration;

use rts_client::game::GameClient;
use rts_client::lobby::LobbyClient;
use rts_client::mirror::Mirror;
use rts_core::config::SimConfig;
use rts_core::entity::{EntityCategory, EntityId, PlayerId};
use rts_core::simulation::Simulation;
use rts_net::Acceptor;
use rts_server::game::GameServer;
use rts_server::lobby::LobbyHost;
use rts_server::scenario::{BaseSetup, Placement, Scenario};
use rts_test_utils::fixtures::{sample_registry, tile};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

/// Small map where player 1's worker starts next to a gold deposit and
/// player 2 has an archer in reach of player 1's swordsman.
fn duel() -> Scenario {
    let stock = |gold| {
        [("gold".to_string(), gold), ("wood".to_string(), 300)]
            .into_iter()
            .collect()
    };
    Scenario {
        name: "duel".into(),
        map_size: (24, 24),
        bases: vec![
            BaseSetup {
                starting_stock: stock(100),
                starting_buildings: vec![Placement::new("town_center", 1, 1)],
                starting_units: vec![
                    Placement::new("peasant", 8, 4),
                    Placement::new("swordsman", 14, 14),
                ],
            },
            BaseSetup {
                starting_stock: stock(0),
                starting_buildings: vec![],
                starting_units: vec![Placement::new("archer", 16, 14)],
            },
        ],
        deposits: vec![Placement::new("gold", 10, 4)],
    }
}

async fn start_game(players: usize) -> (GameServer, Vec<GameClient>) {
    let acceptor = Acceptor::bind("127.0.0.1:0").await.unwrap();
    let addr = acceptor.local_addr().unwrap();
    let lobby = tokio::spawn(LobbyHost::new(4).run(acceptor));

    let mut lobbies = Vec::new();
    for _ in 0..players {
        let mut client = LobbyClient::connect(addr, WAIT).await.unwrap();
        assert!(timeout(WAIT, client.join()).await.unwrap().unwrap());
        lobbies.push(client);
    }
    lobbies[0].request_start().unwrap();
    let session = timeout(WAIT, lobby).await.unwrap().unwrap().unwrap().unwrap();

    let mut clients = Vec::new();
    for mut client in lobbies {
        assert!(timeout(WAIT, client.wait_for_start()).await.unwrap().unwrap());
        clients.push(client.into_game(sample_registry()).unwrap());
    }
    let simulation = duel()
        .build(sample_registry(), SimConfig::default(), &session.players())
        .unwrap();
    (GameServer::new(simulation, session), clients)
}

async fn tick_all(server: &mut GameServer, clients: &mut [GameClient], ticks: u32) {
    for _ in 0..ticks {
        let report = server.step();
        for client in clients.iter_mut() {
            let seen = timeout(WAIT, client.next_tick()).await.unwrap().unwrap();
            assert_eq!(seen, report.tick);
        }
    }
}

fn find(mirror: &Mirror, name: &str, owner: PlayerId) -> EntityId {
    mirror
        .entities()
        .find(|e| e.type_name == name && e.owner == owner)
        .map(|e| e.id)
        .unwrap()
}

fn assert_converged(sim: &Simulation, mirror: &Mirror) {
    let world = sim.world();
    assert_eq!(mirror.len(), world.len());
    for entity in world.entities() {
        let shadow = mirror.entity(entity.id()).unwrap();
        assert_eq!(shadow.category, entity.category());
        assert_eq!(shadow.type_name, entity.type_name());
        assert_eq!(shadow.position, entity.position(), "entity {}", entity.id());
        assert_eq!(shadow.owner, entity.owner());
        assert_eq!(shadow.moving, entity.flags().moving);
        assert_eq!(shadow.attacking, entity.flags().working);
        if let Some(health) = entity.health() {
            assert_eq!(shadow.hitpoints, health.current, "entity {}", entity.id());
        }
        if let Some(building) = entity.as_building() {
            assert_eq!(shadow.built, building.built);
        }
        if let Some(resource) = entity.as_resource() {
            assert_eq!(shadow.amount, resource.amount);
        }
    }
    for player in [1, 2] {
        for resource in ["gold", "wood", "stone"] {
            assert_eq!(mirror.stock(player, resource), world.stock(player, resource));
        }
    }
}

#[tokio::test]
async fn test_mirrors_converge_over_tcp() {
    let (mut server, mut clients) = start_game(2).await;
    assert_eq!(clients[0].player(), 1);
    assert_eq!(clients[1].player(), 2);

    // The first tick carries the whole starting layout.
    tick_all(&mut server, &mut clients, 1).await;
    for client in &clients {
        assert_converged(server.simulation(), client.mirror());
    }

    let mirror = clients[0].mirror();
    let peasant = find(mirror, "peasant", 1);
    let swordsman = find(mirror, "swordsman", 1);
    let gold = mirror
        .entities()
        .find(|e| e.category == EntityCategory::Resource)
        .map(|e| e.id)
        .unwrap();
    let archer = find(mirror, "archer", 2);
    let town_center = find(mirror, "town_center", 1);

    clients[0].gather(peasant, gold).unwrap();
    clients[0].attack(swordsman, archer).unwrap();
    clients[0].place("barracks", tile(4, 12)).unwrap();
    clients[1].move_to(archer, tile(20, 20)).unwrap();
    // Someone else's entity: rejected by the server, nothing replicates.
    clients[1].delete(town_center).unwrap();

    tick_all(&mut server, &mut clients, 40).await;
    for client in &clients {
        assert_converged(server.simulation(), client.mirror());
    }

    let world = server.simulation().world();
    assert!(world.contains(town_center));
    assert!(world.stock(1, "gold") > 100);
    assert_eq!(world.stock(1, "wood"), 150);
    assert!(world
        .entities()
        .any(|e| e.type_name() == "barracks" && e.as_building().is_some_and(|b| !b.built)));
}

#[tokio::test]
async fn test_disconnect_leaves_the_game_running() {
    let (mut server, mut clients) = start_game(2).await;
    tick_all(&mut server, &mut clients, 1).await;

    let leaver = clients.pop().unwrap();
    let archer = find(leaver.mirror(), "archer", 2);
    leaver.move_to(archer, tile(20, 20)).unwrap();
    leaver.close();
    drop(leaver);

    // Keep ticking until the server notices the closed connection.
    for _ in 0..50 {
        if server.connected() == 1 {
            break;
        }
        tick_all(&mut server, &mut clients, 1).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(server.connected(), 1);

    tick_all(&mut server, &mut clients, 5).await;
    assert!(server.simulation().world().contains(archer));
    assert_converged(server.simulation(), clients[0].mirror());
}
