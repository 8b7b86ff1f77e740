/// Error code registry for the occurrence join
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Identity resolution errors
/// - 3000-3999: Storage errors
/// - 4000-4999: Execution errors
/// - 5000-5999: Marking errors
/// - 6000-6999: Join key errors
/// - 9000-9999: Other errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_INVALID_YAML: u16 = 1002;
    pub const CONFIG_INVALID_VALUE: u16 = 1005;
    pub const CONFIG_VALIDATION_FAILED: u16 = 1008;

    // Identity resolution errors (2000-2999)
    pub const IDENTITY_GENERIC: u16 = 2000;
    pub const IDENTITY_SAMPLE_NOT_FOUND: u16 = 2001;
    pub const IDENTITY_PROJECT_NOT_FOUND: u16 = 2002;
    pub const IDENTITY_MATCHED_SAMPLE_NOT_FOUND: u16 = 2003;
    pub const IDENTITY_CONFLICT: u16 = 2004;
    pub const IDENTITY_INCOMPLETE_RECORD: u16 = 2005;

    // Storage errors (3000-3999)
    pub const STORAGE_GENERIC: u16 = 3000;
    pub const STORAGE_IO_ERROR: u16 = 3001;
    pub const STORAGE_PERMISSION_DENIED: u16 = 3002;
    pub const STORAGE_NOT_FOUND: u16 = 3004;
    pub const STORAGE_TEMPORARY: u16 = 3009;
    pub const STORAGE_DESERIALIZATION_ERROR: u16 = 3012;

    // Execution errors (4000-4999)
    pub const EXEC_GENERIC: u16 = 4000;
    pub const EXEC_TRANSIENT: u16 = 4001;
    pub const EXEC_RETRIES_EXHAUSTED: u16 = 4002;
    pub const EXEC_WORKER_POOL: u16 = 4003;
    pub const EXEC_INTERRUPTED: u16 = 4006;

    // Marking errors (5000-5999)
    pub const MARKING_GENERIC: u16 = 5000;
    pub const MARKING_MISSING: u16 = 5001;
    pub const MARKING_UNKNOWN: u16 = 5002;

    // Join key errors (6000-6999)
    pub const JOIN_KEY_GENERIC: u16 = 6000;
    pub const JOIN_KEY_NOT_REGISTERED: u16 = 6001;
    pub const JOIN_KEY_FIELD_MISSING: u16 = 6002;
    pub const JOIN_KEY_FIELD_INVALID: u16 = 6003;

    // Other errors (9000-9999)
    pub const OTHER_GENERIC: u16 = 9000;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        // Configuration errors
        1000 => "Generic configuration error",
        1001 => "Configuration file not found",
        1002 => "Invalid YAML syntax in configuration",
        1005 => "Invalid value in configuration",
        1008 => "Configuration validation failed",

        // Identity resolution errors
        2000 => "Generic identity resolution error",
        2001 => "Submitted sample has no resolved identity",
        2002 => "Project has no resolved identities",
        2003 => "Matched sample has no surrogate identifier",
        2004 => "Submitted identifier resolves to conflicting identities",
        2005 => "Identity record is missing required fields",

        // Storage errors
        3000 => "Generic storage error",
        3001 => "Storage I/O error",
        3002 => "Storage permission denied",
        3004 => "Storage item not found",
        3009 => "Temporary storage error",
        3012 => "Storage deserialization error",

        // Execution errors
        4000 => "Generic execution error",
        4001 => "Transient task failure",
        4002 => "Task retry budget exhausted",
        4003 => "Worker pool failure",
        4006 => "Execution interrupted",

        // Marking errors
        5000 => "Generic marking error",
        5001 => "Record carries no access-control marking",
        5002 => "Record carries an unknown access-control marking",

        // Join key errors
        6000 => "Generic join key error",
        6001 => "No join key set registered for file type",
        6002 => "Record is missing a declared join key field",
        6003 => "Join key field holds a non-scalar value",

        // Other errors
        9000 => "Generic error",

        _ => "Unknown error code",
    }
}
