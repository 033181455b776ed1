pub mod movie;
pub mod order;

pub use movie::{CastMember, Genre, Movie};
pub use order::{
    Cinema, Location, MovieSummary, Order, OrderDetail, PaymentMethod, Schedule, Seat, TimeSlot,
};
