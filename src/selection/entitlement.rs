use std::collections::HashSet;

/// Everything the entitlement decision needs to know about the requesting
/// viewer. Derived per request and never stored; when a lookup fails upstream
/// the caller builds this with the affected field at its default, so missing
/// data always degrades toward denial.
#[derive(Debug, Clone, Default)]
pub struct ViewerAccess {
    pub is_logged_in: bool,
    pub is_subscriber: bool,
    pub purchased: HashSet<String>,
}

impl ViewerAccess {
    /// A logged-out visitor: no subscription, no purchases.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn subscriber() -> Self {
        ViewerAccess {
            is_logged_in: true,
            is_subscriber: true,
            purchased: HashSet::new(),
        }
    }
}

/// Decides whether a viewer may play one content item right now.
///
/// The branches form an ordered disjunction and the order is product behavior,
/// not an implementation detail:
///
/// 1. today's free pick plays for everyone, logged in or not;
/// 2. free catalog items always play;
/// 3. paid content requires an account;
/// 4. an active subscription unlocks all paid content;
/// 5. a one-off purchase unlocks that specific item;
/// 6. otherwise the paywall stands.
///
/// Pure and total: no I/O, no panics, same inputs same answer.
pub fn can_access(
    content_id: &str,
    price: u32,
    is_daily_free: bool,
    viewer: &ViewerAccess,
) -> bool {
    if is_daily_free {
        return true;
    }
    if price == 0 {
        return true;
    }
    if !viewer.is_logged_in {
        return false;
    }
    if viewer.is_subscriber {
        return true;
    }
    viewer.purchased.contains(content_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEM: &str = "11111111-2222-3333-4444-555555555555";
    const PAID: u32 = 5_000;

    fn viewer(is_logged_in: bool, is_subscriber: bool, purchased_this: bool) -> ViewerAccess {
        let mut purchased = HashSet::new();
        if purchased_this {
            purchased.insert(ITEM.to_string());
        }
        ViewerAccess {
            is_logged_in,
            is_subscriber,
            purchased,
        }
    }

    #[test]
    fn daily_free_overrides_everything_even_for_guests() {
        assert!(can_access(ITEM, PAID, true, &ViewerAccess::anonymous()));
    }

    #[test]
    fn free_items_play_without_login() {
        assert!(can_access(ITEM, 0, false, &ViewerAccess::anonymous()));
    }

    #[test]
    fn paid_content_is_locked_for_guests() {
        assert!(!can_access(ITEM, PAID, false, &ViewerAccess::anonymous()));
    }

    #[test]
    fn paid_content_is_locked_by_default_when_logged_in() {
        assert!(!can_access(ITEM, PAID, false, &viewer(true, false, false)));
    }

    #[test]
    fn subscription_unlocks_paid_content() {
        assert!(can_access(ITEM, PAID, false, &viewer(true, true, false)));
    }

    #[test]
    fn purchase_unlocks_that_item_only() {
        let v = viewer(true, false, true);
        assert!(can_access(ITEM, PAID, false, &v));
        assert!(!can_access("some-other-item", PAID, false, &v));
    }

    #[test]
    fn purchase_does_not_unlock_while_logged_out() {
        // A stale purchase set without a session must still deny.
        assert!(!can_access(ITEM, PAID, false, &viewer(false, false, true)));
    }

    /// Sweeps the full boolean input space and checks the two monotonicity
    /// guarantees: turning on the subscription never revokes access, and adding
    /// the item to the purchase set never revokes access.
    #[test]
    fn access_is_monotone_in_subscription_and_purchases() {
        for &is_daily_free in &[false, true] {
            for &price in &[0u32, PAID] {
                for &is_logged_in in &[false, true] {
                    for &purchased_this in &[false, true] {
                        let base = can_access(
                            ITEM,
                            price,
                            is_daily_free,
                            &viewer(is_logged_in, false, purchased_this),
                        );
                        let with_sub = can_access(
                            ITEM,
                            price,
                            is_daily_free,
                            &viewer(is_logged_in, true, purchased_this),
                        );
                        assert!(!base || with_sub, "subscription revoked access");

                        let without_purchase = can_access(
                            ITEM,
                            price,
                            is_daily_free,
                            &viewer(is_logged_in, false, false),
                        );
                        let with_purchase = can_access(
                            ITEM,
                            price,
                            is_daily_free,
                            &viewer(is_logged_in, false, true),
                        );
                        assert!(!without_purchase || with_purchase, "purchase revoked access");
                    }
                }
            }
        }
    }
}
