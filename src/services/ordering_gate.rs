use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use crate::errors::ServiceError;
use crate::models::settings::{CheckoutAvailability, OrderingFlags};

pub const ORDERING_DISABLED_MESSAGE: &str =
    "Ordering is currently disabled. Please try again later.";
pub const OUTSIDE_SCHEDULE_MESSAGE: &str =
    "We are outside our usual ordering hours. Your order may take longer to process.";

/// Source of the admin and schedule ordering flags.
#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn fetch_ordering_flags(&self) -> Result<OrderingFlags, ServiceError>;
}

/// Decision table:
///
/// | admin   | schedule disabled | allowed | message          |
/// |---------|-------------------|---------|------------------|
/// | `false` | any               | no      | disabled notice  |
/// | `true`  | any               | yes     | none             |
/// | unset   | `true`            | yes     | schedule warning |
/// | unset   | `false` / unset   | yes     | none             |
pub fn can_checkout(admin_enabled: Option<bool>, schedule_disabled: Option<bool>) -> CheckoutAvailability {
    match (admin_enabled, schedule_disabled) {
        (Some(false), _) => CheckoutAvailability {
            allowed: false,
            message: Some(ORDERING_DISABLED_MESSAGE.to_string()),
        },
        (Some(true), _) => CheckoutAvailability {
            allowed: true,
            message: None,
        },
        (None, Some(true)) => CheckoutAvailability {
            allowed: true,
            message: Some(OUTSIDE_SCHEDULE_MESSAGE.to_string()),
        },
        (None, _) => CheckoutAvailability {
            allowed: true,
            message: None,
        },
    }
}

impl OrderingFlags {
    /// Applies [`can_checkout`]; an admin-supplied message replaces the default notice.
    pub fn decision(&self) -> CheckoutAvailability {
        let mut availability = can_checkout(self.admin_enabled, self.schedule_disabled);
        if availability.message.is_some() {
            if let Some(custom) = self.message.as_deref().filter(|m| !m.trim().is_empty()) {
                availability.message = Some(custom.to_string());
            }
        }
        availability
    }
}

/// Consumer side of a live ordering-flags subscription.
#[derive(Clone, Debug)]
pub struct OrderingGate {
    flags: watch::Receiver<OrderingFlags>,
}

impl OrderingGate {
    pub fn new(flags: watch::Receiver<OrderingFlags>) -> Self {
        Self { flags }
    }

    /// Gate plus the sender the subscription owner pushes updates into.
    pub fn channel(initial: OrderingFlags) -> (watch::Sender<OrderingFlags>, Self) {
        let (tx, rx) = watch::channel(initial);
        (tx, Self::new(rx))
    }

    pub fn current(&self) -> CheckoutAvailability {
        self.flags.borrow().decision()
    }

    /// Waits for the next flag update. `None` once the publisher is gone.
    pub async fn changed(&mut self) -> Option<CheckoutAvailability> {
        self.flags.changed().await.ok()?;
        let availability = self.flags.borrow_and_update().decision();
        debug!(allowed = availability.allowed, "Ordering availability changed");
        Some(availability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some(false), None, false, true)]
    #[case(Some(false), Some(false), false, true)]
    #[case(Some(true), Some(true), true, false)]
    #[case(None, Some(true), true, true)]
    #[case(None, Some(false), true, false)]
    #[case(None, None, true, false)]
    fn decision_table(
        #[case] admin: Option<bool>,
        #[case] schedule_disabled: Option<bool>,
        #[case] allowed: bool,
        #[case] has_message: bool,
    ) {
        let availability = can_checkout(admin, schedule_disabled);
        assert_eq!(availability.allowed, allowed);
        assert_eq!(availability.message.is_some(), has_message);
    }

    #[test]
    fn admin_message_overrides_default_notice() {
        let flags = OrderingFlags {
            admin_enabled: Some(false),
            schedule_disabled: None,
            message: Some("Closed for inventory".into()),
        };
        let decision = flags.decision();
        assert!(!decision.allowed);
        assert_eq!(decision.message.as_deref(), Some("Closed for inventory"));

        let open = OrderingFlags {
            admin_enabled: Some(true),
            message: Some("ignored".into()),
            ..Default::default()
        };
        assert_eq!(open.decision().message, None);
    }

    #[tokio::test]
    async fn gate_recomputes_on_change() {
        let (tx, mut gate) = OrderingGate::channel(OrderingFlags::default());
        assert!(gate.current().allowed);

        tx.send(OrderingFlags {
            admin_enabled: Some(false),
            ..Default::default()
        })
        .unwrap();
        let updated = gate.changed().await.unwrap();
        assert!(!updated.allowed);
        assert!(!gate.current().allowed);

        drop(tx);
        assert_eq!(gate.changed().await, None);
    }
}
