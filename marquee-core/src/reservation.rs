use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The checkout identity owning a hold. A hold always belongs to a session;
/// the user id is attached once the session is authenticated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Holder {
    pub session_id: String,
    pub user_id: Option<Uuid>,
}

impl Holder {
    pub fn session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: None,
        }
    }

    pub fn user(session_id: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: Some(user_id),
        }
    }

    /// Two holders are the same party when they share a session.
    pub fn same_party(&self, other: &Holder) -> bool {
        self.session_id == other.session_id
    }

    /// An anonymous hold may be confirmed by any user of the session;
    /// an authenticated hold only by its user.
    pub fn owned_by(&self, user_id: Uuid) -> bool {
        self.user_id.map_or(true, |owner| owner == user_id)
    }
}

/// A temporary, time-limited claim on one seat for one show schedule.
/// Per (seat_id, schedule_id) at most one unexpired reservation exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub seat_id: Uuid,
    pub schedule_id: Uuid,
    pub holder: Holder,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Reservation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let reservation = Reservation {
            id: Uuid::new_v4(),
            seat_id: Uuid::new_v4(),
            schedule_id: Uuid::new_v4(),
            holder: Holder::session("sess-1"),
            created_at: now,
            expires_at: now,
        };

        // expires_at < now is expired, the boundary instant is not
        assert!(!reservation.is_expired(now));
        assert!(reservation.is_expired(now + Duration::seconds(1)));
    }

    #[test]
    fn test_holder_ownership() {
        let user = Uuid::new_v4();
        let anonymous = Holder::session("sess-1");
        let authenticated = Holder::user("sess-1", user);

        assert!(anonymous.same_party(&authenticated));
        assert!(anonymous.owned_by(user));
        assert!(authenticated.owned_by(user));
        assert!(!authenticated.owned_by(Uuid::new_v4()));
    }
}
