pub mod envelope;
pub mod transport;

pub use envelope::{parse_envelope, ChatEnvelope, ControlSignal, EnvelopeError};
pub use transport::{Channel, ChannelError, ScriptedChannel};
