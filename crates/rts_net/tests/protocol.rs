//! Wire format properties over generated requests and positions.

use proptest::prelude::*;
use rts_core::delta::{Delta, EntityRef};
use rts_core::entity::EntityCategory;
use rts_net::protocol::{ClientMessage, ServerMessage};
use rts_test_utils::determinism::strategies::{arb_position, arb_request};

proptest! {
    #[test]
    fn prop_requests_survive_the_wire(request in arb_request(50, 64, 64)) {
        let line = ClientMessage(request.clone()).to_string();
        prop_assert!(!line.contains('\n'));
        let parsed: ClientMessage = line.parse().unwrap();
        prop_assert_eq!(parsed.0, request);
    }

    #[test]
    fn prop_positions_are_exact_in_decimal(position in arb_position(256, 256, 1), id in 1u64..10_000) {
        let added = ServerMessage::Delta(Delta::EntityAdded {
            entity: EntityRef { category: EntityCategory::Unit, id },
            name: "archer".into(),
            position,
            owner: 3,
        });
        let parsed: ServerMessage = added.to_string().parse().unwrap();
        prop_assert_eq!(parsed, added);
    }
}
