//! Tool adapters
//!
//! Each adapter drives one external NLP tool and writes what it reports
//! (terms, dependencies, coreference, frames) into a `Document`.

mod cancel;
mod error;
pub mod features;
pub mod interactive;
pub mod pos;
mod session;
pub mod socket;
pub mod streaming;
mod traits;

pub use cancel::CancellationToken;
pub use error::{AdapterError, AdapterResult};
pub use interactive::{parse_transcript, InteractiveParserAdapter};
pub use session::InteractiveSession;
pub use socket::SocketFrameAdapter;
pub use streaming::{parse_stream, StreamingDependencyAdapter};
pub use traits::{Adapter, AdapterInput};
