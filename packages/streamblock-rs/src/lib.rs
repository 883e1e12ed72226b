pub mod block;
pub mod clock;
pub mod error;
pub mod ids;
pub mod path;
pub mod rule;
pub mod settings;
pub mod spectrum;
pub mod ticker;
pub mod timeseries;
pub mod types;
pub mod window;

pub use block::{spawn_block, Block, BlockFault, BlockHandle, BlockOutputs, InRoute, Outbound, QueryRoute};
pub use error::{BlockError, Result};
pub use ids::{BlockId, IdAllocator};
pub use settings::{BlockSettings, OverflowStrategy};
pub use ticker::Ticker;
pub use timeseries::Timeseries;
pub use types::*;
