//! Data models for visitgate storage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use visitgate_core::Schedule;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub company_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BlacklistEntry {
    pub id: String,
    pub company_id: String,
    pub email: String,
    pub reason: Option<String>,
    pub created_by: Option<String>,
    pub created_at: i64,
}

/// A time-boxed entry permit.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Access {
    pub id: String,
    pub company_id: String,
    pub creator_id: String,
    pub code: String,
    pub qr_payload: Option<String>,
    pub name: String,
    pub start_date: String,
    pub end_date: String,
    pub start_time: String,
    pub end_time: String,
    pub recurrence: String,
    pub auto_approval: bool,
    pub max_uses: i64,
    pub allow_guests: bool,
    pub require_approval: bool,
    pub status: String,
    pub usage_count: i64,
    pub reminder_sent: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Access {
    /// The stored window. Unknown recurrences read as `none`.
    pub fn schedule(&self) -> visitgate_core::Result<Schedule> {
        Schedule::from_stored(
            &self.start_date,
            &self.end_date,
            &self.start_time,
            &self.end_time,
            &self.recurrence,
        )
    }

    pub fn status(&self) -> AccessStatus {
        AccessStatus::parse_lenient(&self.status)
    }

    /// `max_uses == 0` means unlimited.
    pub const fn has_uses_left(&self) -> bool {
        self.max_uses == 0 || self.usage_count < self.max_uses
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InvitedGuest {
    pub access_id: String,
    pub email: String,
    pub status: String,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Visit {
    pub id: String,
    pub company_id: String,
    pub access_id: Option<String>,
    pub visitor_email: String,
    pub visitor_name: Option<String>,
    pub host_id: Option<String>,
    pub status: String,
    pub created_at: i64,
    pub decided_at: Option<i64>,
    pub decided_by: Option<String>,
}

/// Defines a text-backed status enum with `as_str`, `FromStr` and `Display`.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!(concat!("unknown ", stringify!($name), " '{}'"), other)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(
    /// Lifecycle state of an access. Only `active` admits entry.
    AccessStatus {
        Active => "active",
        Expired => "expired",
        Cancelled => "cancelled",
        Finalized => "finalized",
    }
);

impl AccessStatus {
    /// Unknown stored values are treated as terminal.
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or(Self::Expired)
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

text_enum!(
    /// Delivery state of an invitation. Moves forward only.
    GuestStatus {
        Sent => "sent",
        Opened => "opened",
        Redeemed => "redeemed",
    }
);

text_enum!(
    VisitStatus {
        Pending => "pending",
        Approved => "approved",
        Denied => "denied",
    }
);

text_enum!(
    UserRole {
        Admin => "admin",
        Host => "host",
        Receptionist => "receptionist",
    }
);

/// Trim and lower-case an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
