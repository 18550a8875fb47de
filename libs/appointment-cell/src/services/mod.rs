// libs/appointment-cell/src/services/mod.rs
pub mod booking;
pub mod conflict;
pub mod slots;
pub mod timeslot;

pub use booking::{authorize_transition, BookingService};
pub use conflict::{slots_overlap, ConflictDetectionService};
pub use slots::{day_slot_starts, SlotGeneratorService};
pub use timeslot::{format_slot_time, parse_time_slot};
