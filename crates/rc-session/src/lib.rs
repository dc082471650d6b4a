pub mod cancel;
pub mod debounce;
pub mod lock;
pub mod session;
pub mod sinks;

pub use cancel::CancelMap;
pub use debounce::Debouncer;
pub use lock::{SessionBusy, SessionLockMap};
pub use session::{CallSession, SessionDeps, SessionIo};
pub use sinks::{BookingRequest, BookingSink, LoggingBookingSink, LoggingSmsSink, SmsSink};
