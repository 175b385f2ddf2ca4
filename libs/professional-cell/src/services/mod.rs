pub mod availability;
pub mod directory;
pub mod locks;
pub mod store;
pub mod supabase;

pub use availability::AvailabilityService;
pub use directory::{InMemoryUserDirectory, UserDirectory};
pub use locks::ProfessionalLocks;
pub use store::{AvailabilityStore, InMemoryAvailabilityStore};
pub use supabase::{SupabaseAvailabilityStore, SupabaseUserDirectory};
