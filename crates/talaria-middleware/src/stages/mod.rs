//! Built-in middleware stages.
//!
//! The default chain, in order: [`SslCheck`], [`RequestVerification`], one
//! authorization stage ([`MultiTeamsAuthorization`] for distributed apps,
//! [`SingleTeamAuthorization`] otherwise), then [`IgnoringSelfEvents`].
//! User middleware appends after these.

pub mod ignoring_self_events;
pub mod multi_teams_authorization;
pub mod request_verification;
pub mod single_team_authorization;
pub mod ssl_check;

pub use ignoring_self_events::IgnoringSelfEvents;
pub use multi_teams_authorization::MultiTeamsAuthorization;
pub use request_verification::RequestVerification;
pub use single_team_authorization::SingleTeamAuthorization;
pub use ssl_check::SslCheck;
