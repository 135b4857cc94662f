pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod exif;
pub mod linear;
pub mod media;
pub mod prompt;
pub mod relocate;
pub mod report;
pub mod scan;
pub mod session;
pub mod state;
pub mod timestamp;
pub mod tournament;

pub use batch::{Batch, BatchStatus, BatchSummary, build_batches};
pub use cli::{Cli, Commands};
pub use config::{CullConfig, MediaFilter, OrderingMode, QUARANTINE_DIR_NAME};
pub use error::CullError;
pub use linear::LinearCull;
pub use media::{MediaItem, Partition, TimestampSource};
pub use relocate::{FileMover, FsMover, QuarantineRecord, Relocator};
pub use session::{Session, SessionSummary, restore_all};
pub use state::{SessionDocument, SessionStore};
pub use tournament::{Side, Tournament, TournamentPhase};
