//! Property check: however reserve/release/extend/finalize/sweep calls
//! interleave, every stock item's available quantity plus its reserved and
//! finalized ledger quantities equals the starting capacity, and the
//! available quantity never goes negative.

use chrono::{DateTime, Duration, TimeZone, Utc};
use inventory::ledger;
use inventory::memory::MemoryStore;
use inventory::{ReservationError, ReservationLine, ReservationStatus};
use proptest::prelude::*;
use uuid::Uuid;

const CAPACITY: i32 = 10;
const ITEMS: usize = 3;
const ORDERS: usize = 4;

#[derive(Debug, Clone)]
enum Op {
    Reserve {
        order: usize,
        item: usize,
        quantity: i32,
        minutes_valid: i64,
    },
    Release {
        order: usize,
    },
    Extend {
        order: usize,
        minutes_valid: i64,
    },
    Finalize {
        order: usize,
    },
    Sweep {
        minutes_ahead: i64,
    },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..ORDERS, 0..ITEMS, -2..8i32, 1..30i64).prop_map(
            |(order, item, quantity, minutes_valid)| Op::Reserve {
                order,
                item,
                quantity,
                minutes_valid,
            }
        ),
        (0..ORDERS).prop_map(|order| Op::Release { order }),
        (0..ORDERS, 1..30i64).prop_map(|(order, minutes_valid)| Op::Extend {
            order,
            minutes_valid,
        }),
        (0..ORDERS).prop_map(|order| Op::Finalize { order }),
        (0..60i64).prop_map(|minutes_ahead| Op::Sweep { minutes_ahead }),
    ]
}

async fn apply(
    store: &MemoryStore,
    orders: &[Uuid],
    items: &[Uuid],
    op: Op,
    now: &mut DateTime<Utc>,
) -> Result<(), ReservationError> {
    let mut session = store.session().await;
    match op {
        Op::Reserve {
            order,
            item,
            quantity,
            minutes_valid,
        } => {
            ledger::reserve_for_order(
                &mut session,
                orders[order],
                &[ReservationLine::new(items[item], quantity)],
                *now,
                *now + Duration::minutes(minutes_valid),
            )
            .await
        }
        Op::Release { order } => ledger::release_reservation(&mut session, orders[order], *now)
            .await
            .map(|_| ()),
        Op::Extend {
            order,
            minutes_valid,
        } => ledger::extend_reservation(
            &mut session,
            orders[order],
            *now + Duration::minutes(minutes_valid),
            *now,
        )
        .await
        .map(|_| ()),
        Op::Finalize { order } => ledger::finalize_reservation(&mut session, orders[order], *now)
            .await
            .map(|_| ()),
        Op::Sweep { minutes_ahead } => {
            *now = *now + Duration::minutes(minutes_ahead);
            ledger::release_expired_reservations(&mut session, *now)
                .await
                .map(|_| ())
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn conservation_holds_across_op_sequences(
        ops in proptest::collection::vec(op_strategy(), 1..40)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let store = MemoryStore::new();
            let items: Vec<Uuid> = (0..ITEMS).map(|_| Uuid::new_v4()).collect();
            let orders: Vec<Uuid> = (0..ORDERS).map(|_| Uuid::new_v4()).collect();
            for item in &items {
                store.put_stock_item(*item, CAPACITY).await;
            }
            let mut now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();

            for op in ops {
                now = now + Duration::minutes(1);
                match apply(&store, &orders, &items, op, &mut now).await {
                    Ok(())
                    | Err(ReservationError::InsufficientStock { .. })
                    | Err(ReservationError::NoActiveReservation { .. })
                    | Err(ReservationError::AlreadyFinalized { .. }) => {}
                    Err(e) => panic!("unexpected error: {e}"),
                }

                let records = store.records().await;
                for item in &items {
                    let available = store.available(*item).await.unwrap();
                    assert!(available >= 0, "available quantity went negative");

                    let held: i32 = records
                        .iter()
                        .filter(|r| {
                            r.stock_item_id == *item
                                && matches!(
                                    r.status,
                                    ReservationStatus::Reserved | ReservationStatus::Finalized
                                )
                        })
                        .map(|r| r.quantity)
                        .sum();
                    assert_eq!(
                        available + held,
                        CAPACITY,
                        "conservation violated for item {item}"
                    );
                }
            }
        });
    }
}
