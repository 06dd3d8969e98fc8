//! Property-based checks of the round arithmetic and benchmark store.

use beer_game::simulation::benchmark::{Benchmark, BenchmarkStore, MemoryBenchmarkStore};
use beer_game::simulation::processor::fulfil;
use beer_game::{optimal_costs, GameConfig, GameId, GameMode, GameService, PerRole, Role};
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

fn arb_config() -> impl Strategy<Value = GameConfig> {
    (
        proptest::collection::vec(0u32..20, 1..12),
        4u32..16,
        0u32..30,
        1u32..4,
        1u32..4,
    )
        .prop_map(|(demand, total_rounds, starting_inventory, order_delay, shipping_delay)| {
            GameConfig {
                demand,
                total_rounds,
                starting_inventory,
                order_delay,
                shipping_delay,
                ..GameConfig::default()
            }
        })
}

fn arb_orders(rounds: usize) -> impl Strategy<Value = Vec<[i64; 4]>> {
    proptest::collection::vec(proptest::array::uniform4(0i64..25), rounds)
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #[test]
    fn fulfil_conserves_units(
        inventory in 0u32..10_000,
        backlog in 0u32..10_000,
        shipment in 0u32..10_000,
        order in 0u32..10_000,
    ) {
        let f = fulfil(inventory, backlog, shipment, order);
        prop_assert_eq!(f.inventory_before, inventory + shipment);
        prop_assert_eq!(f.shipment_sent, f.inventory_before.min(order + backlog));
        prop_assert_eq!(f.inventory_after, f.inventory_before - f.shipment_sent);
        prop_assert_eq!(f.backlog_after, order + backlog - f.shipment_sent);
        prop_assert!(f.inventory_after == 0 || f.backlog_after == 0);
    }

    #[test]
    fn played_games_conserve_units_and_never_lower_cost(
        (config, orders) in arb_config().prop_flat_map(|c| {
            let rounds = c.total_rounds as usize;
            (Just(c), arb_orders(rounds))
        })
    ) {
        let service = GameService::in_memory();
        let id = service.create_game(config, GameMode::Test).unwrap();
        for round in &orders {
            service.submit_round(&id, PerRole::new(*round)).unwrap();
        }
        let store = service.with_snapshots(&id, |_, s| s.clone()).unwrap();

        for role in Role::ALL {
            let history = store.history(role);
            prop_assert_eq!(history.len(), orders.len() + 1);
            for pair in history.windows(2) {
                let (prev, s) = (&pair[0], &pair[1]);
                prop_assert_eq!(s.inventory_before, prev.inventory_after + s.incoming_shipment);
                prop_assert_eq!(s.backlog_before, prev.backlog_after);
                prop_assert_eq!(s.shipment_sent, s.inventory_before.min(s.incoming_order + s.backlog_before));
                prop_assert_eq!(s.inventory_after, s.inventory_before - s.shipment_sent);
                prop_assert_eq!(s.backlog_after, s.incoming_order + s.backlog_before - s.shipment_sent);
                prop_assert!(s.total_cost_cumulative >= prev.total_cost_cumulative);
            }
        }
    }

    #[test]
    fn orders_surface_upstream_after_the_order_delay(
        order_delay in 1u32..5,
        shipping_delay in 1u32..5,
        quantity in 100i64..1000,
    ) {
        let config = GameConfig {
            demand: vec![4],
            total_rounds: 10,
            order_delay,
            shipping_delay,
            ..GameConfig::default()
        };
        let service = GameService::in_memory();
        let id = service.create_game(config, GameMode::Test).unwrap();
        service.submit_round(&id, PerRole::new([4, quantity, 4, 4])).unwrap();
        for _ in 0..order_delay {
            service.play_bot_round(&id).unwrap();
        }
        let store = service.with_snapshots(&id, |_, s| s.clone()).unwrap();

        for round in 1..=order_delay {
            prop_assert_eq!(store.get(Role::Distributor, round).unwrap().incoming_order, 4);
        }
        let arrival = store.get(Role::Distributor, 1 + order_delay).unwrap();
        prop_assert_eq!(i64::from(arrival.incoming_order), quantity);
    }

    #[test]
    fn stored_benchmark_is_the_running_minimum(costs in proptest::collection::vec(0.0f64..1_000.0, 1..20)) {
        let config = GameConfig { total_rounds: 4, ..GameConfig::default() }.validated().unwrap();
        let base = optimal_costs(&config).unwrap();
        let store = MemoryBenchmarkStore::new();
        let mut best = f64::INFINITY;

        for (i, cost) in costs.into_iter().enumerate() {
            let mut result = base.clone();
            result.total_chain_cost = cost;
            let candidate = Benchmark::from_result("cfg".to_string(), GameId::new(format!("BEER-{i}")), result);
            let accepted = store.offer(candidate).unwrap();
            prop_assert_eq!(accepted, cost < best);
            best = best.min(cost);
            let stored = store.get("cfg").unwrap().unwrap();
            prop_assert_eq!(stored.total_chain_cost, best);
        }
    }
}
