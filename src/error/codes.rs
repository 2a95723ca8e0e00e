/// Error code registry for mapmul
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Operand registration errors (shape and protocol)
/// - 3000-3999: Storage errors
/// - 4000-4999: Execution errors
/// - 5000-5999: Join integrity errors
/// - 7000-7999: Validation errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_INVALID_TOML: u16 = 1002;
    pub const CONFIG_INVALID_VALUE: u16 = 1005;
    pub const CONFIG_INVALID_ENV: u16 = 1006;

    // Operand registration errors (2000-2999)
    pub const SHAPE_MISMATCH: u16 = 2000;
    pub const PROTOCOL_GENERIC: u16 = 2100;
    pub const PROTOCOL_TOO_MANY_OPERANDS: u16 = 2101;
    pub const PROTOCOL_TOO_FEW_OPERANDS: u16 = 2102;
    pub const PROTOCOL_DUPLICATE_OPERAND: u16 = 2103;
    pub const PROTOCOL_UNKNOWN_OPERAND: u16 = 2104;

    // Storage errors (3000-3999)
    pub const STORAGE_GENERIC: u16 = 3000;
    pub const STORAGE_IO_ERROR: u16 = 3001;
    pub const STORAGE_PERMISSION_DENIED: u16 = 3002;
    pub const STORAGE_NOT_FOUND: u16 = 3004;
    pub const STORAGE_TEMPORARY: u16 = 3009;

    // Execution errors (4000-4999)
    pub const EXEC_GENERIC: u16 = 4000;
    pub const EXEC_WORKER_PANICKED: u16 = 4001;
    pub const EXEC_CANCELLED: u16 = 4003;

    // Join integrity errors (5000-5999)
    pub const JOIN_GENERIC: u16 = 5000;
    pub const JOIN_MISSING_INDEX: u16 = 5002;
    pub const JOIN_DUPLICATE_INDEX: u16 = 5003;
    pub const JOIN_INDEX_OUT_OF_RANGE: u16 = 5004;
    pub const JOIN_MISROUTED_ENTRY: u16 = 5005;

    // Validation errors (7000-7999)
    pub const VALIDATION_GENERIC: u16 = 7000;
    pub const VALIDATION_PARSE: u16 = 7001;
    pub const VALIDATION_RAGGED_ROW: u16 = 7002;
    pub const VALIDATION_OUT_OF_BOUNDS: u16 = 7003;
    pub const VALIDATION_DUPLICATE_ENTRY: u16 = 7004;
    pub const VALIDATION_INVALID_SHAPE: u16 = 7005;
    pub const VERIFICATION_MISMATCH: u16 = 7100;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        1000 => "Generic configuration error",
        1001 => "Configuration file not found",
        1002 => "Invalid TOML syntax in configuration",
        1005 => "Invalid value in configuration",
        1006 => "Invalid configuration environment variable",

        2000 => "Operand shapes cannot be multiplied in either order",
        2100 => "Generic operand protocol error",
        2101 => "More than two operands registered",
        2102 => "Fewer than two operands registered",
        2103 => "Operand registered twice",
        2104 => "Element belongs to an unregistered operand",

        3000 => "Generic storage error",
        3001 => "Storage I/O error",
        3002 => "Storage permission denied",
        3004 => "Storage item not found",
        3009 => "Temporary storage error",

        4000 => "Generic execution error",
        4001 => "Worker task panicked",
        4003 => "Worker task was cancelled",

        5000 => "Generic join integrity error",
        5002 => "Pairing index missing for a destination cell",
        5003 => "Pairing index duplicated for a destination cell",
        5004 => "Pairing index outside the shared dimension",
        5005 => "Entry routed to the wrong destination cell",

        7000 => "Generic validation error",
        7001 => "Malformed matrix text",
        7002 => "Dense matrix rows have different lengths",
        7003 => "Matrix coordinate outside the declared shape",
        7004 => "Matrix coordinate given twice",
        7005 => "Invalid shape specification",
        7100 => "Result differs from the reference product",

        _ => "Unknown error code",
    }
}
