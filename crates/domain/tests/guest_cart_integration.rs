//! Integration tests for guest carts.
//!
//! These tests drive the service end to end over the in-memory key-value
//! store and the in-memory user cart store.

use std::time::Duration;

use common::{CartId, MealId, RestaurantId, UserId};
use domain::{
    CartError, GuestCartError, GuestCartRepository, GuestCartService, ItemPatch, LeaseExtension,
    MergeOutcome, MergeStrategy, NewCartItem, Note, Quantity,
};
use kv_store::{InMemoryKeyValueStore, KeyValueStore, Ttl};
use user_cart::{InMemoryUserCartStore, NewUserCartItem, UserCartStore};

type Service = GuestCartService<InMemoryKeyValueStore, InMemoryUserCartStore>;

/// Helper to create a test guest cart service
fn create_service() -> Service {
    GuestCartService::new(InMemoryKeyValueStore::new(), InMemoryUserCartStore::new())
}

fn item(restaurant: &str, meal: &str, quantity: u32) -> NewCartItem {
    NewCartItem::new(restaurant, meal, Quantity::new(quantity).unwrap())
}

fn cart_key(cart_id: CartId) -> String {
    GuestCartRepository::<InMemoryKeyValueStore>::cart_key(cart_id)
}

mod cart_lifecycle {
    use super::*;

    #[tokio::test]
    async fn add_update_remove_clear() {
        let service = create_service();
        let cart_id = service.generate_cart_id();

        service
            .add_to_cart(cart_id, item("r1", "A", 2))
            .await
            .unwrap();
        let cart = service
            .add_to_cart(cart_id, item("r1", "B", 1))
            .await
            .unwrap();
        assert_eq!(cart.item_count(), 3);

        let cart = service
            .update_item(
                cart_id,
                &MealId::new("B"),
                ItemPatch::new()
                    .quantity(Quantity::new(4).unwrap())
                    .note(Note::new("no sauce").unwrap()),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cart.item_count(), 6);

        let cart = service
            .remove_item(cart_id, &MealId::new("A"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.restaurant_id(), Some(&RestaurantId::new("r1")));

        let cart = service.clear_cart(cart_id).await.unwrap().unwrap();
        assert!(cart.is_empty());
        assert!(cart.restaurant_id().is_none());

        // the cleared cart is still stored
        let stored = service.get_cart(cart_id).await.unwrap().unwrap();
        assert_eq!(stored, cart);
    }

    #[tokio::test]
    async fn distinct_meals_sum_into_item_count() {
        let service = create_service();
        let cart_id = CartId::new();

        for (meal, quantity) in [("A", 1), ("B", 2), ("C", 3), ("D", 4)] {
            service
                .add_to_cart(cart_id, item("r1", meal, quantity))
                .await
                .unwrap();
        }

        let cart = service.get_cart(cart_id).await.unwrap().unwrap();
        assert_eq!(cart.item_count(), 10);
        assert_eq!(cart.items().len(), 4);
    }

    #[tokio::test]
    async fn same_meal_twice_is_one_item() {
        let service = create_service();
        let cart_id = CartId::new();

        service
            .add_to_cart(cart_id, item("r1", "A", 2))
            .await
            .unwrap();
        let cart = service
            .add_to_cart(cart_id, item("r1", "A", 3))
            .await
            .unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity.get(), 5);
    }

    #[tokio::test]
    async fn different_restaurant_rejected_and_stored_cart_unchanged() {
        let service = create_service();
        let cart_id = CartId::new();
        let before = service
            .add_to_cart(cart_id, item("r1", "A", 1))
            .await
            .unwrap();

        let result = service.add_to_cart(cart_id, item("r2", "B", 1)).await;

        assert!(matches!(
            result,
            Err(GuestCartError::Validation(CartError::CrossRestaurant { .. }))
        ));
        assert!(result.unwrap_err().is_validation());
        let after = service.get_cart(cart_id).await.unwrap().unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn removing_last_item_clears_restaurant() {
        let service = create_service();
        let cart_id = CartId::new();
        service
            .add_to_cart(cart_id, item("r1", "A", 1))
            .await
            .unwrap();

        let cart = service
            .remove_item(cart_id, &MealId::new("A"))
            .await
            .unwrap()
            .unwrap();

        assert!(cart.restaurant_id().is_none());
        service
            .add_to_cart(cart_id, item("r2", "B", 1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stored_cart_roundtrips_exactly() {
        let service = create_service();
        let cart_id = CartId::new();
        let cart = service
            .add_to_cart(
                cart_id,
                item("r1", "A", 2)
                    .with_note(Note::new("ring the bell").unwrap())
                    .with_schedule_date(chrono::Utc::now()),
            )
            .await
            .unwrap();

        let loaded = service.get_cart(cart_id).await.unwrap().unwrap();
        assert_eq!(loaded, cart);
    }

    #[tokio::test]
    async fn delete_cart() {
        let service = create_service();
        let cart_id = CartId::new();
        service
            .add_to_cart(cart_id, item("r1", "A", 1))
            .await
            .unwrap();

        assert!(service.delete_cart(cart_id).await.unwrap());
        assert!(!service.delete_cart(cart_id).await.unwrap());
        assert!(service.get_cart(cart_id).await.unwrap().is_none());
    }
}

mod leases {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn every_save_resets_lease_to_full_default() {
        let service = create_service();
        let cart_id = CartId::new();
        service
            .add_to_cart(cart_id, item("r1", "A", 1))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(10 * 24 * 3600)).await;
        let ttl = service.repository().get_cart_ttl(cart_id).await;
        assert_eq!(ttl, Ttl::Expires(20 * 24 * 3600));

        service
            .update_item(
                cart_id,
                &MealId::new("A"),
                ItemPatch::new().quantity(Quantity::new(2).unwrap()),
            )
            .await
            .unwrap();
        let ttl = service.repository().get_cart_ttl(cart_id).await;
        assert_eq!(ttl, Ttl::Expires(2_592_000));
    }

    #[tokio::test(start_paused = true)]
    async fn cart_disappears_when_lease_runs_out() {
        let service = create_service();
        let cart_id = CartId::new();
        service
            .add_to_cart(cart_id, item("r1", "A", 1))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(2_592_000)).await;

        assert!(service.get_cart(cart_id).await.unwrap().is_none());
        assert!(!service.validate_cart(cart_id).await.unwrap().exists);
    }

    #[tokio::test(start_paused = true)]
    async fn extend_expiry_replaces_lease() {
        let service = create_service();
        let cart_id = CartId::new();
        service
            .add_to_cart(cart_id, item("r1", "A", 1))
            .await
            .unwrap();

        let extension = LeaseExtension::from_days(90).unwrap();
        assert!(service.extend_expiry(cart_id, extension).await);
        assert_eq!(
            service.repository().get_cart_ttl(cart_id).await,
            Ttl::Expires(90 * 24 * 3600)
        );

        assert!(!service.extend_expiry(CartId::new(), extension).await);
    }

    #[test]
    fn extension_outside_range_is_validation_error() {
        let err: GuestCartError = LeaseExtension::from_days(400).unwrap_err().into();
        assert!(err.is_validation());
    }
}

mod cleanup {
    use super::*;

    #[tokio::test]
    async fn never_deletes_live_carts() {
        let service = create_service();
        let store = service.repository().store().clone();

        let mut live = Vec::new();
        for _ in 0..5 {
            let cart_id = CartId::new();
            service
                .add_to_cart(cart_id, item("r1", "A", 1))
                .await
                .unwrap();
            live.push(cart_id);
        }

        let stale = CartId::new();
        store.set_wire(&cart_key(stale), "{\"broken\":", None).await;

        let report = service.cleanup_expired_carts().await.unwrap();

        assert_eq!(report.cleaned_up, 1);
        assert_eq!(report.stats.total_carts, 5);
        assert_eq!(report.stats.active_carts, 5);
        assert_eq!(report.stats.expired_carts, 0);
        for cart_id in live {
            assert!(service.get_cart(cart_id).await.unwrap().is_some());
        }
        assert!(!store.exists(&cart_key(stale)).await.unwrap());
    }

    #[tokio::test]
    async fn second_pass_finds_nothing() {
        let service = create_service();
        let store = service.repository().store().clone();
        store.set_wire(&cart_key(CartId::new()), "{}", None).await;

        assert_eq!(service.cleanup_expired_carts().await.unwrap().cleaned_up, 1);
        assert_eq!(service.cleanup_expired_carts().await.unwrap().cleaned_up, 0);
    }
}

mod merge {
    use super::*;

    async fn seed(service: &Service, user: &UserId, meal: &str, quantity: u32) {
        service
            .user_carts()
            .insert_item(NewUserCartItem {
                user_id: user.clone(),
                restaurant_id: RestaurantId::new("r1"),
                meal_id: MealId::new(meal),
                quantity,
                note: None,
                schedule_date: None,
            })
            .await
            .unwrap();
    }

    async fn durable_lines(service: &Service, user: &UserId) -> Vec<(String, u32)> {
        service
            .user_carts()
            .get_items(user)
            .await
            .unwrap()
            .into_iter()
            .map(|i| (i.meal_id.to_string(), i.quantity))
            .collect()
    }

    #[tokio::test]
    async fn add_quantities_scenario() {
        let service = create_service();
        let user = UserId::new("user-42");
        seed(&service, &user, "A", 2).await;

        let guest = CartId::new();
        service
            .add_to_cart(guest, item("r1", "A", 3))
            .await
            .unwrap();
        service
            .add_to_cart(guest, item("r1", "B", 1))
            .await
            .unwrap();

        let strategy: MergeStrategy = "add_quantities".parse().unwrap();
        let outcome = service
            .merge_guest_cart_to_user(guest, &user, strategy)
            .await
            .unwrap();

        assert_eq!(outcome.merged_items_count, 2);
        assert_eq!(outcome.conflicts_resolved, 1);
        assert_eq!(outcome.message, "Successfully merged 2 items to user cart");
        assert_eq!(
            durable_lines(&service, &user).await,
            vec![("A".to_string(), 5), ("B".to_string(), 1)]
        );
        assert!(service.get_cart(guest).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replace_scenario() {
        let service = create_service();
        let user = UserId::new("user-42");
        seed(&service, &user, "A", 2).await;

        let guest = CartId::new();
        service
            .add_to_cart(guest, item("r1", "A", 2))
            .await
            .unwrap();
        service
            .add_to_cart(guest, item("r1", "B", 1))
            .await
            .unwrap();

        let outcome = service
            .merge_guest_cart_to_user(guest, &user, MergeStrategy::Replace)
            .await
            .unwrap();

        assert_eq!(outcome.merged_items_count, 2);
        assert_eq!(outcome.conflicts_resolved, 1);
        assert_eq!(
            durable_lines(&service, &user).await,
            vec![("A".to_string(), 2), ("B".to_string(), 1)]
        );
        assert_eq!(outcome.user_cart_items.len(), 2);
    }

    #[tokio::test]
    async fn empty_or_missing_guest_cart_leaves_user_cart_untouched() {
        let service = create_service();
        let user = UserId::new("user-42");
        seed(&service, &user, "A", 2).await;

        let missing = service
            .merge_guest_cart_to_user(CartId::new(), &user, MergeStrategy::AddQuantities)
            .await
            .unwrap();
        assert_eq!(missing, MergeOutcome::empty());

        let emptied = CartId::new();
        service
            .add_to_cart(emptied, item("r1", "B", 1))
            .await
            .unwrap();
        service.clear_cart(emptied).await.unwrap();

        let outcome = service
            .merge_guest_cart_to_user(emptied, &user, MergeStrategy::Replace)
            .await
            .unwrap();
        assert_eq!(outcome.merged_items_count, 0);
        assert_eq!(outcome.conflicts_resolved, 0);

        assert_eq!(
            durable_lines(&service, &user).await,
            vec![("A".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn unknown_strategy_is_rejected_before_merging() {
        let result: Result<MergeStrategy, GuestCartError> =
            "keep_both".parse::<MergeStrategy>().map_err(Into::into);

        assert!(matches!(
            result,
            Err(GuestCartError::Validation(CartError::UnknownMergeStrategy { .. }))
        ));
    }

    #[tokio::test]
    async fn durable_failure_aborts_and_keeps_guest_cart() {
        let service = create_service();
        let user = UserId::new("user-42");
        let guest = CartId::new();
        service
            .add_to_cart(guest, item("r1", "A", 1))
            .await
            .unwrap();
        service.user_carts().set_fail_on_write(true).await;

        let err = service
            .merge_guest_cart_to_user(guest, &user, MergeStrategy::AddQuantities)
            .await
            .unwrap_err();

        assert!(matches!(err, GuestCartError::Merge { ref user_id, .. } if user_id == &user));
        assert!(service.get_cart(guest).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn guest_items_from_another_restaurant_fail_the_merge() {
        let service = create_service();
        let user = UserId::new("user-42");
        seed(&service, &user, "A", 1).await;

        let guest = CartId::new();
        service
            .add_to_cart(guest, item("r2", "X", 1))
            .await
            .unwrap();

        let result = service
            .merge_guest_cart_to_user(guest, &user, MergeStrategy::AddQuantities)
            .await;

        assert!(matches!(result, Err(GuestCartError::Merge { .. })));
        assert!(service.get_cart(guest).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn guest_notes_and_schedule_are_carried_over() {
        let service = create_service();
        let user = UserId::new("user-42");
        let guest = CartId::new();
        let when = chrono::Utc::now();
        service
            .add_to_cart(
                guest,
                item("r1", "A", 1)
                    .with_note(Note::new("leave at door").unwrap())
                    .with_schedule_date(when),
            )
            .await
            .unwrap();

        let outcome = service
            .merge_guest_cart_to_user(guest, &user, MergeStrategy::AddQuantities)
            .await
            .unwrap();

        let line = &outcome.user_cart_items[0];
        assert_eq!(line.note.as_deref(), Some("leave at door"));
        assert_eq!(line.schedule_date, Some(when));
        assert_eq!(line.restaurant_id, RestaurantId::new("r1"));
    }
}
