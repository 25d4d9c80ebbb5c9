pub mod picker;
pub mod review;
pub mod selector;
pub mod session;
pub mod sm2;
pub mod user_locks;

pub use picker::{ItemPicker, LowestIdPicker, SeededPicker, UniformPicker};
pub use review::ReviewService;
pub use session::{GradeOutcome, ReviewSession, SessionPhase};
pub use sm2::{apply_grade, preview_intervals, Grade};
pub use user_locks::UserLocks;
