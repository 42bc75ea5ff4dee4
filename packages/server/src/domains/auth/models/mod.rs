mod admin_record;
mod session;

pub use admin_record::{AdminRecord, AdminRecordUpdate};
pub use session::{Session, SessionRecord, VerifiedOtp};
