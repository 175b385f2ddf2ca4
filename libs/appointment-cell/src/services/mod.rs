pub mod access;
pub mod booking;
pub mod conflict;
pub mod lifecycle;
pub mod notification;
pub mod slots;
pub mod stats;
pub mod store;
pub mod supabase;

pub use access::AccessScope;
pub use booking::AppointmentBookingService;
pub use conflict::{Candidate, OverlapValidator, ValidationMode};
pub use notification::{AppointmentEvent, Notification, NotificationService, NotificationSink};
pub use slots::{SlotEnumerator, SlotPolicy};
pub use store::{AppointmentFilter, AppointmentStore, InMemoryAppointmentStore, SortOrder, StatusUpdate};
pub use supabase::SupabaseAppointmentStore;
