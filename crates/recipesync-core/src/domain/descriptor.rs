//! Remote connection descriptor
//!
//! A descriptor identifies one remote target: either a network share
//! (host/netbios/group/credentials/share) or a cloud-backed folder (only
//! `path` is meaningful). Two descriptors are configured: the read-only
//! recipe "data source" and the synchronized "data store".
//!
//! The persisted form is one comma-joined string of exactly seven fields:
//! `host,netbios_name,group,user_name,password,share,path`. The format has
//! no escaping: a password or share name containing a comma will not
//! round-trip. This is the legacy on-disk format and is kept as-is; the
//! parser rejects anything that is not exactly seven fields rather than
//! guessing.

use serde::{Deserialize, Serialize};

use super::errors::EngineError;

/// Number of comma-joined fields in the persisted form
const FIELD_COUNT: usize = 7;

/// Connection profile for one remote target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDescriptor {
    /// Host name or address of the share server (empty for cloud folders)
    pub host: String,
    /// NetBIOS name advertised by the device
    pub netbios_name: String,
    /// Workgroup / domain
    pub group: String,
    /// Account user name
    pub user_name: String,
    /// Account password, stored in the clear in the legacy format
    pub password: String,
    /// Share name to open after connecting
    pub share: String,
    /// Directory path within the share, or the cloud folder root
    pub path: String,
}

impl RemoteDescriptor {
    /// Descriptor for a cloud-backed folder rooted at `path`
    pub fn cloud_folder(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Serializes to the persisted comma-joined form
    pub fn to_field_string(&self) -> String {
        [
            self.host.as_str(),
            self.netbios_name.as_str(),
            self.group.as_str(),
            self.user_name.as_str(),
            self.password.as_str(),
            self.share.as_str(),
            self.path.as_str(),
        ]
        .join(",")
    }

    /// Parses the persisted comma-joined form.
    ///
    /// Requires exactly seven fields; anything else reports
    /// [`EngineError::MalformedDescriptor`].
    pub fn parse(s: &str) -> Result<Self, EngineError> {
        let fields: Vec<&str> = s.split(',').collect();
        if fields.len() != FIELD_COUNT {
            return Err(EngineError::MalformedDescriptor(s.to_string()));
        }
        Ok(Self {
            host: fields[0].to_string(),
            netbios_name: fields[1].to_string(),
            group: fields[2].to_string(),
            user_name: fields[3].to_string(),
            password: fields[4].to_string(),
            share: fields[5].to_string(),
            path: fields[6].to_string(),
        })
    }
}
