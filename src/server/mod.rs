pub mod dto;
mod portal_links;
pub mod response;
mod router;

pub use portal_links::portal_link_router;
pub use router::{AppState, create_router};
