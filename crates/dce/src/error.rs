use thiserror::Error;

/// An error raised while eliminating dead code.
///
/// Every variant means the built-in call graph, the symbol table and the
/// compiled module disagree with each other. None of them is recoverable;
/// the module is left untouched when one is returned.
#[derive(Error, Debug)]
pub enum DceError {
    /// The call graph is not well-formed CSV.
    #[error("failed to read the built-in call graph")]
    Csv(#[from] csv::Error),

    /// A call graph record does not have exactly two fields.
    #[error("call graph record on line {line} has {fields} fields, expected 2")]
    MalformedRecord {
        /// Line the record starts on.
        line: u64,
        /// Number of fields found.
        fields: usize,
    },

    /// A name in the call graph has an invalid escape sequence.
    #[error("unquote {role} name {raw}")]
    Unescape {
        /// Whether the name is the caller or the callee.
        role: Role,
        /// The name as it appears in the call graph.
        raw: String,
        /// What is wrong with it.
        #[source]
        source: UnescapeError,
    },

    /// A caller in the call graph has no function index.
    #[error("caller not found: {raw} ({name})")]
    UnknownCaller {
        /// The name as it appears in the call graph.
        raw: String,
        /// The unescaped name.
        name: String,
    },

    /// A callee in the call graph has no function index.
    #[error("callee not found: {raw} ({name})")]
    UnknownCallee {
        /// The name as it appears in the call graph.
        raw: String,
        /// The unescaped name.
        name: String,
    },

    /// A compiled function or configured root has no function index.
    #[error("no function index for `{0}`")]
    UnresolvedFunction(String),
}

/// Position of a name in a call graph record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The first field.
    Caller,
    /// The second field.
    Callee,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Caller => f.write_str("caller"),
            Role::Callee => f.write_str("callee"),
        }
    }
}

/// An invalid escaped name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnescapeError {
    /// A backslash not followed by two hex digits.
    #[error("invalid escape sequence at byte {0}")]
    InvalidEscape(usize),
    /// A `"` that is not escaped.
    #[error("unescaped quote at byte {0}")]
    UnescapedQuote(usize),
    /// The unescaped bytes are not UTF-8.
    #[error("unescaped name is not valid UTF-8")]
    InvalidUtf8,
}
