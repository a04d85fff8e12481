pub mod classify;
pub mod filter;
pub mod injector;
pub mod page;
pub mod script;
pub mod session;
pub mod stats;
pub mod strategy;

pub use classify::{Candidate, ClickCooldown, Decision};
pub use filter::{BannedPattern, is_banned};
pub use page::{CdpPage, Overlay, PageDriver};
pub use session::{AgentHandle, AgentSnapshot, SessionContext};
pub use stats::{CollectedStats, SessionStats, SessionSummary};
