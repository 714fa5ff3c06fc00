/// Command types queued on input sources
///
/// Commands represent requests to perform actions (imperative).
/// They are appended to a source's queue by producers and handed to the
/// source's handler, in order, when the source fires.

/// Payload carried by a command.
///
/// Replaces an untyped "anything" slot with a small tagged variant, so
/// handlers can match on the shape without downcasting.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandData {
    /// No payload
    Empty,

    /// Integer payload
    Integer(i64),

    /// Floating-point payload
    Float(f64),

    /// Textual payload
    Text(String),

    /// Raw byte payload
    Bytes(Vec<u8>),
}

impl Default for CommandData {
    fn default() -> Self {
        CommandData::Empty
    }
}

/// A tagged unit of work: an integer kind plus an optional payload.
///
/// Immutable once created; owned by the queue from submission until the
/// firing path drains it.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    kind: i64,
    data: CommandData,
}

impl Command {
    /// Create a command with no payload
    pub fn new(kind: i64) -> Self {
        Self {
            kind,
            data: CommandData::Empty,
        }
    }

    /// Create a command carrying a payload
    pub fn with_data(kind: i64, data: CommandData) -> Self {
        Self { kind, data }
    }

    /// The command's integer tag
    pub fn kind(&self) -> i64 {
        self.kind
    }

    /// Borrow the payload
    pub fn data(&self) -> &CommandData {
        &self.data
    }

    /// Consume the command, keeping only the payload
    pub fn into_data(self) -> CommandData {
        self.data
    }

    /// Get a human-readable description of the command
    pub fn description(&self) -> String {
        match &self.data {
            CommandData::Empty => format!("command {}", self.kind),
            CommandData::Integer(value) => format!("command {} (int {})", self.kind, value),
            CommandData::Float(value) => format!("command {} (float {})", self.kind, value),
            CommandData::Text(text) => format!("command {} ({:?})", self.kind, text),
            CommandData::Bytes(bytes) => format!("command {} ({} bytes)", self.kind, bytes.len()),
        }
    }
}
