pub mod movie;
pub mod order;

pub use movie::{ListingKind, MovieRepository, PAGE_SIZE};
pub use order::{NewOrder, OrderRepository};
