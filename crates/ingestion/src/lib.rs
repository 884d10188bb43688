mod cursor;
mod decoder;
mod poller;
mod registry;

pub use self::cursor::SignatureCursor;
pub use self::decoder::{decode_swap, DecodeReject};
pub use self::poller::{Poller, PollerConfig, DELAY_BETWEEN_TX, SIGNATURE_BATCH_SIZE};
pub use self::registry::{program_by_address, resolve_symbol, DexProgram, WATCHED_PROGRAMS};
