// libs/appointment-cell/src/lib.rs
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    Appointment, AppointmentError, AppointmentStatus, AvailabilityCheck, BookAppointmentRequest,
    CheckAvailabilityRequest, ConflictingAppointment, DaySlots, StatusUpdateRequest, TimeSlotView,
};
pub use router::appointment_routes;
pub use services::{
    authorize_transition, slots_overlap, BookingService, ConflictDetectionService,
    SlotGeneratorService,
};
