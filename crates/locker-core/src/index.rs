//! Active ticket index
//!
//! Maps each outstanding access code to its ticket. Presence in the index is
//! the only definition of "this code is valid".

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::code::AccessCode;
use crate::tier::CompartmentId;

/// Reservation handed to a depositor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Compartment holding the package
    pub compartment: CompartmentId,
    /// Code that opens it
    pub code: AccessCode,
    /// Deposit time, milliseconds
    pub created_at_ms: u64,
}

impl Ticket {
    /// Milliseconds elapsed since deposit; zero if `now_ms` is earlier
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.created_at_ms)
    }

    /// Whether the ticket has been outstanding for at least `retention`
    pub fn is_expired(&self, now_ms: u64, retention: Duration) -> bool {
        u128::from(self.age_ms(now_ms)) >= retention.as_millis()
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ticket{{lockerId='{}', code='{}', creationTime={}}}",
            self.compartment, self.code, self.created_at_ms
        )
    }
}

/// Outstanding tickets keyed by access code
#[derive(Debug, Clone, Default)]
pub struct ReservationIndex {
    tickets: HashMap<AccessCode, Ticket>,
}

impl ReservationIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly issued ticket
    ///
    /// # Panics
    ///
    /// If a ticket with the same code is already active.
    pub fn insert(&mut self, ticket: Ticket) {
        let code = ticket.code.clone();
        if let Some(previous) = self.tickets.insert(code, ticket) {
            panic!(
                "access code {} issued while still active for {}",
                previous.code, previous.compartment
            );
        }
    }

    /// Remove and return the ticket for `code`
    pub fn remove(&mut self, code: &str) -> Option<Ticket> {
        self.tickets.remove(code)
    }

    /// Whether `code` is currently valid
    pub fn contains(&self, code: &str) -> bool {
        self.tickets.contains_key(code)
    }

    /// Remove every ticket at least `retention` old, oldest first
    pub fn drain_expired(&mut self, now_ms: u64, retention: Duration) -> Vec<Ticket> {
        let mut expired = Vec::new();
        self.tickets.retain(|_, ticket| {
            if ticket.is_expired(now_ms, retention) {
                expired.push(ticket.clone());
                false
            } else {
                true
            }
        });
        expired.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.compartment.cmp(&b.compartment))
        });
        expired
    }

    /// Number of active tickets
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    /// Whether no tickets are active
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// Iterate over active tickets in arbitrary order
    pub fn tickets(&self) -> impl Iterator<Item = &Ticket> + '_ {
        self.tickets.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::SizeTier;

    fn ticket(index: u32, created_at_ms: u64) -> Ticket {
        let compartment = CompartmentId::new(SizeTier::Small, index);
        Ticket {
            compartment,
            code: AccessCode::new(format!("{compartment}-{created_at_ms}")),
            created_at_ms,
        }
    }

    #[test]
    fn test_remove_is_one_shot() {
        let mut index = ReservationIndex::new();
        let t = ticket(0, 1000);
        index.insert(t.clone());

        assert!(index.contains("S-0-1000"));
        assert_eq!(index.remove("S-0-1000"), Some(t));
        assert_eq!(index.remove("S-0-1000"), None);
        assert!(index.is_empty());
    }

    #[test]
    fn test_expiry_boundary() {
        let retention = Duration::from_millis(100);
        let t = ticket(0, 1000);

        assert!(!t.is_expired(1099, retention));
        assert!(t.is_expired(1100, retention));
        // Clock behind the ticket counts as age zero
        assert!(!t.is_expired(10, retention));
    }

    #[test]
    fn test_drain_expired_keeps_young_tickets() {
        let mut index = ReservationIndex::new();
        index.insert(ticket(2, 500));
        index.insert(ticket(0, 100));
        index.insert(ticket(1, 900));

        let expired = index.drain_expired(1000, Duration::from_millis(400));
        let created: Vec<_> = expired.iter().map(|t| t.created_at_ms).collect();
        assert_eq!(created, vec![100, 500]);
        assert_eq!(index.len(), 1);
        assert!(index.contains("S-1-900"));
    }

    #[test]
    fn test_ticket_display() {
        assert_eq!(
            ticket(0, 1000).to_string(),
            "Ticket{lockerId='S-0', code='S-0-1000', creationTime=1000}"
        );
    }

    #[test]
    #[should_panic(expected = "still active")]
    fn test_duplicate_code_panics() {
        let mut index = ReservationIndex::new();
        index.insert(ticket(0, 1000));
        index.insert(ticket(0, 1000));
    }
}
