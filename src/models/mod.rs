pub mod analytics;
pub mod funnel;
pub mod session;

pub use analytics::{
    ClickEvent, ClickKind, Device, EnvSnapshot, NewClickEvent, SessionAggregate, TrafficSummary,
};
pub use funnel::{
    Category, LandingContent, NewEmailCapture, NewPrelanderPage, NewWebResult, PrelanderPage,
    WebResult,
};
pub use session::{opaque_id, SessionId};
