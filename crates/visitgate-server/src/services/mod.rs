//! Domain services behind the HTTP routes.

pub mod access_svc;
pub mod admin_svc;
pub mod redeem_svc;

#[cfg(test)]
mod access_svc_tests;
#[cfg(test)]
mod test_helpers;

pub use access_svc::{AccessService, AccessView, NewAccess};
pub use admin_svc::{
    AdminService, Decision, NewBlacklistEntry, NewCompany, NewUser, VisitDecision, VisitFilter,
};
pub use redeem_svc::{RedeemRequest, Redemption, RedemptionOutcome, RedemptionService};
