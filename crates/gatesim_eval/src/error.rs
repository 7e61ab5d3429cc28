//! Error types produced while resolving modules and evaluating a design.

/// Errors that can occur while resolving, evaluating, or stepping a design.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// A referenced module could not be found under any configured search
    /// directory.
    #[error("module '{0}' not found")]
    ModuleNotFound(String),

    /// A module's source file failed to parse (diagnostics were already
    /// reported to the sink; this variant just aborts evaluation).
    #[error("module '{0}' failed to parse")]
    ParseFailed(String),

    /// A module named like a ROM primitive (`rom_*`) did not have the
    /// one-input, one-output port shape a ROM requires.
    #[error("'{module}' looks like a ROM primitive but {reason}")]
    RomPortShape {
        /// The module name.
        module: String,
        /// Why the port shape was rejected.
        reason: String,
    },

    /// No data file could be found for a ROM primitive under any of its
    /// three search locations.
    #[error("no data file found for ROM '{0}'")]
    RomDataNotFound(String),

    /// A ROM data file existed but could not be parsed as one hex word per
    /// line.
    #[error("ROM '{module}' data file is invalid: {reason}")]
    RomDataInvalid {
        /// The module name.
        module: String,
        /// What was wrong with the file.
        reason: String,
    },

    /// An identifier referenced in an expression is not a port or net of
    /// the enclosing module.
    #[error("undefined identifier '{0}'")]
    UndefinedIdentifier(String),

    /// A bit-select or part-select index fell outside the signal's width.
    #[error("index {index} out of range for {width}-bit signal '{signal}'")]
    IndexOutOfRange {
        /// The signal being indexed.
        signal: String,
        /// The offending index.
        index: i64,
        /// The signal's width.
        width: u32,
    },

    /// A concatenation would exceed the 64-bit value representation.
    #[error("concatenation width {attempted} exceeds the {max}-bit value limit")]
    WidthOverflow {
        /// The width the concatenation would have produced.
        attempted: u32,
        /// The maximum representable width.
        max: u32,
    },

    /// A port connection names a port the instantiated module does not
    /// have, or omits a port with no connection at all.
    #[error("port mismatch instantiating '{module}': {reason}")]
    PortMismatch {
        /// The instantiated module's name.
        module: String,
        /// What was wrong with the connection list.
        reason: String,
    },

    /// A value supplied to a port (a top-level input or a connection into
    /// an instantiated module) does not match that port's declared width.
    #[error("port '{port}' of '{module}' expects a {expected}-bit value, got {actual} bits")]
    PortWidthMismatch {
        /// The module declaring the port.
        module: String,
        /// The port's name.
        port: String,
        /// The port's declared width.
        expected: u32,
        /// The width of the value supplied.
        actual: u32,
    },

    /// The combinational fixpoint iteration did not converge, indicating a
    /// combinational (zero-delay) cycle in the design.
    #[error("combinational cycle detected while evaluating '{0}'")]
    CombinationalCycle(String),

    /// A construct outside gatesim's accepted subset was used in a position
    /// the evaluator must actually execute (as opposed to merely parse).
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),

    /// The enumeration facade was asked to exhaustively enumerate a module
    /// with too many input bits to be tractable.
    #[error("module '{module}' has {bits} input bits, exceeding the enumeration limit of {limit}")]
    TooManyInputsToEnumerate {
        /// The module name.
        module: String,
        /// The total input bit count.
        bits: u32,
        /// The configured limit.
        limit: u32,
    },
}
