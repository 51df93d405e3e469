//! # relay-core
//!
//! The screen streaming pipeline shared by the relay host and relay viewer
//! binaries.
//!
//! Dataflow on the sender: capture -> [`resize`] -> [`quantise`] ->
//! `session::delta` -> [`pack`] -> [`compress`] -> `session::transport`.
//! The receiver reverses the order, and both sides feed the encoded/decoded
//! delta back into their `DeltaEngine` so the two reference frames stay in
//! lockstep. See [`session`] for the types that tie the pipeline to a live
//! connection.
//!
//! | Module       | Purpose                                               |
//! |--------------|--------------------------------------------------------|
//! | `frame`      | `Frame` / `QuantisedFrame` working buffers              |
//! | `resize`     | Integer-percent resampling, symmetric inverse           |
//! | `quantise`   | Pixel-depth reduction (greyscale or RGB palette)        |
//! | `pack`       | n-bit bitstream packing with a self-describing header  |
//! | `compress`   | Generic deflate-family byte-stream codec                |
//! | `session`    | `DeltaEngine`, `FrameTransport`, encoder/decoder sessions |
//! | `error`      | The `RelayError` taxonomy                               |

pub mod compress;
pub mod error;
pub mod frame;
pub mod pack;
pub mod quantise;
pub mod resize;
pub mod session;

pub use compress::Compressor;
pub use error::RelayError;
pub use frame::{Frame, QuantisedFrame};
pub use quantise::Quantiser;
pub use resize::Resizer;
pub use session::collab::{Renderer, ScreenCapture};
pub use session::decoder::DecoderSession;
pub use session::delta::DeltaEngine;
pub use session::mailbox::{channel as frame_mailbox, FrameMailboxRx, FrameMailboxTx, MailboxFrame};
pub use session::encoder::EncoderSession;
pub use session::pipeline::{PipelineCoordinator, PipelineStats};
pub use session::transport::FrameTransport;
pub use session::types::{CursorPosition, SessionConfig};
pub use session::ShutdownFlag;
