mod portal_link;
mod validation;

pub use portal_link::{PortalLinkRequest, PortalLinkService};
