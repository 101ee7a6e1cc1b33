//! Remote protocol artifacts: the lock record and the last-updated marker
//!
//! Both artifacts are tiny unescaped comma-delimited text files living at the
//! remote root. They are the only shared mutable state between devices, and
//! they are guarded purely by read-then-write protocols, so parsing must be
//! conservative: content we cannot interpret is reported, never overwritten
//! (the single exception is empty content, treated as absence).

use chrono::NaiveDateTime;
use uuid::Uuid;

use super::identity::DeviceIdentity;

/// Timestamp format used by the marker artifact
pub const MARKER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sentinel reported when the marker's device name cannot be recovered
pub const UNKNOWN_DEVICE: &str = "unknown";

// ---------------------------------------------------------------------------
// Lock record
// ---------------------------------------------------------------------------

/// Persisted remote lock artifact: `ownerDeviceName,ownerDeviceUUID`
///
/// Absence of the file is itself a valid state ("unlocked").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    pub owner_name: String,
    pub owner_id: Uuid,
}

/// Outcome of parsing lock-file content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockParse {
    /// Exactly two fields, second a valid UUID
    Parsed(LockRecord),
    /// Zero-length content: treated as corruption-as-absence, safe to
    /// self-heal by taking ownership
    Empty,
    /// Non-empty content that is not a two-field record; might be a real,
    /// if garbled, competing lock, so it is left untouched
    Malformed,
}

impl LockRecord {
    /// Builds the record a device writes when it takes the lock
    pub fn for_device(identity: &DeviceIdentity) -> Self {
        Self {
            owner_name: identity.name.clone(),
            owner_id: identity.id,
        }
    }

    /// Wire form written to the remote lock file
    pub fn to_wire(&self) -> String {
        format!("{},{}", self.owner_name, self.owner_id)
    }

    /// Classifies raw lock-file content.
    ///
    /// Exactly two comma-separated fields with a parseable UUID yield
    /// [`LockParse::Parsed`]. A device name containing a comma breaks the
    /// format (no escaping exists) and is reported as malformed.
    pub fn parse(content: &str) -> LockParse {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return LockParse::Empty;
        }
        let fields: Vec<&str> = trimmed.split(',').collect();
        if fields.len() != 2 {
            return LockParse::Malformed;
        }
        match Uuid::parse_str(fields[1]) {
            Ok(owner_id) => LockParse::Parsed(LockRecord {
                owner_name: fields[0].to_string(),
                owner_id,
            }),
            Err(_) => LockParse::Malformed,
        }
    }
}

// ---------------------------------------------------------------------------
// Last-updated marker
// ---------------------------------------------------------------------------

/// Persisted marker artifact: `yyyy-MM-dd HH:mm:ss,deviceName`
///
/// Written only after a fully successful push; its presence, absence and age
/// are the sole signal used to decide replica precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastUpdatedRecord {
    pub timestamp: NaiveDateTime,
    pub device_name: String,
}

impl LastUpdatedRecord {
    /// Marker for a push completing now on the given device
    pub fn now(identity: &DeviceIdentity) -> Self {
        Self {
            timestamp: chrono::Utc::now().naive_utc().with_nanosecond_zeroed(),
            device_name: identity.name.clone(),
        }
    }

    /// Wire form written to `last_updated.txt`
    pub fn to_wire(&self) -> String {
        format!(
            "{},{}",
            self.timestamp.format(MARKER_TIME_FORMAT),
            self.device_name
        )
    }

    /// Parses marker content; `None` when the timestamp cannot be recovered.
    ///
    /// The device name occupies everything after the first comma (commas in
    /// device names are not escaped, so a name of `a,b` parses as `a,b`
    /// here but would corrupt a lock record - the formats differ on which
    /// side of the comma is free-form).
    pub fn parse(content: &str) -> Option<Self> {
        let trimmed = content.trim();
        let (stamp, name) = trimmed.split_once(',')?;
        let timestamp = NaiveDateTime::parse_from_str(stamp, MARKER_TIME_FORMAT).ok()?;
        Some(Self {
            timestamp,
            device_name: name.to_string(),
        })
    }
}

/// Second-precision truncation for marker timestamps
trait WithNanosecondZeroed {
    fn with_nanosecond_zeroed(self) -> Self;
}

impl WithNanosecondZeroed for NaiveDateTime {
    fn with_nanosecond_zeroed(self) -> Self {
        use chrono::Timelike;
        self.with_nanosecond(0).unwrap_or(self)
    }
}

// ---------------------------------------------------------------------------
// Comparison outcome
// ---------------------------------------------------------------------------

/// Result of comparing the local and remote markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Local replica is strictly newer; a push is warranted (lock permitting)
    DeviceNewer,
    /// Remote replica is strictly newer; a pull is warranted (pre-flight
    /// manifest check permitting)
    RemoteNewer,
    /// Timestamps are equal to the second
    Equal,
    /// Remote marker missing, unreadable, or unparseable
    RemoteMarkerMissing,
}
