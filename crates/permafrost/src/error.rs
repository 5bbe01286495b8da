use thiserror::Error;

/// All fatal outcomes of a serialization or deserialization call.
///
/// Structural problems (a type or member that cannot be resolved locally)
/// are deliberately *not* represented here: they degrade into placeholder
/// values and [lost-data entries](crate::de::LostMember) instead of
/// aborting the operation. An `Error` always means the whole call failed
/// and the stream is not resumable.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying transport failed or the stream was truncated.
    #[error("i/o failure in serialized stream")]
    Io(#[from] std::io::Error),

    /// The stream header carries a version this build does not speak.
    ///
    /// Raised at stream-open time, before any object data is touched.
    #[error("unsupported stream version {found:#06x}, expected {expected:#06x}")]
    Version { found: u64, expected: u64 },

    /// A variable-length integer ran past 64 bits of payload.
    #[error("malformed variable-length integer")]
    MalformedVarint,

    /// A structural element of the stream could not be decoded.
    #[error("malformed {what}: {detail}")]
    Malformed { what: &'static str, detail: String },

    /// An id was registered twice with different values.
    #[error("id {id} is already registered in this context")]
    IdInUse { id: u64 },

    /// An object was registered under two different ids.
    #[error("object is already registered under id {id}")]
    AlreadyRegistered { id: u64 },

    /// The stream back-referenced an id that was never defined.
    #[error("back-reference to unknown id {id}")]
    UnknownBackReference { id: u64 },

    /// The stream back-referenced a value that cannot be shared.
    #[error("back-reference to id {id}, which does not denote a shareable value")]
    NotShareable { id: u64 },

    /// A surrogate conversion produced a value that is itself being
    /// converted, which would recurse forever.
    #[error("surrogate for `{type_path}` recursively serializes itself")]
    SurrogateCycle { type_path: String },

    /// A collection reported one length and yielded another.
    #[error("collection reported {reported} elements but yielded {actual}")]
    CountMismatch { reported: usize, actual: usize },

    /// A fixed-size array in the stream does not fit the local array type.
    #[error("array length mismatch: stream has {stream}, local type holds {local}")]
    ArrayLength { stream: usize, local: usize },

    /// A converter, surrogate or custom-protocol hook rejected a value.
    #[error("cannot convert value of `{type_path}`: {message}")]
    Conversion { type_path: String, message: String },

    /// `read_into` was handed an instance the stream data cannot populate.
    #[error("cannot repopulate an instance of `{type_path}` from this stream")]
    Repopulate { type_path: String },
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
